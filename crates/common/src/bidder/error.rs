//! Errors produced by individual bidders during one auction.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Serialize, Serializer};

/// Closed set of bidder error kinds.
///
/// The numeric codes are stable and only used for metrics and reporting; no
/// control flow branches on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BidderErrorKind {
    /// The call did not complete before its deadline.
    Timeout,
    /// Caused by the incoming request. Not actionable for the host, so these
    /// are kept out of operational alerting.
    BadInput,
    /// The remote partner misbehaved: unexpected status, malformed body.
    BadServerResponse,
    /// An adapter produced neither requests nor errors. Signals a broken adapter.
    FailedToRequestBids,
    /// A bid failed post-hoc validation.
    InvalidBid,
    /// A bid was rejected by floor enforcement.
    RejectedIpf,
    Generic,
}

impl BidderErrorKind {
    pub const ALL: [BidderErrorKind; 7] = [
        Self::Timeout,
        Self::BadInput,
        Self::BadServerResponse,
        Self::FailedToRequestBids,
        Self::InvalidBid,
        Self::RejectedIpf,
        Self::Generic,
    ];

    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::Timeout => 1,
            Self::BadInput => 2,
            Self::BadServerResponse => 3,
            Self::FailedToRequestBids => 4,
            Self::InvalidBid => 5,
            Self::RejectedIpf => 6,
            Self::Generic => 999,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::BadInput => "bad_input",
            Self::BadServerResponse => "bad_server_response",
            Self::FailedToRequestBids => "failed_to_request_bids",
            Self::InvalidBid => "invalid_bid",
            Self::RejectedIpf => "rejected_ipf",
            Self::Generic => "generic",
        }
    }

    /// Whether an error of this kind should reach operational logs and alerts.
    #[must_use]
    pub const fn is_operational(self) -> bool {
        !matches!(self, Self::BadInput)
    }
}

impl fmt::Display for BidderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for BidderErrorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.code())
    }
}

/// A single error produced by a bidder, optionally scoped to impressions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BidderError {
    pub message: String,
    #[serde(rename = "code")]
    pub kind: BidderErrorKind,
    #[serde(rename = "impids", skip_serializing_if = "BTreeSet::is_empty")]
    pub imp_ids: BTreeSet<String>,
}

impl BidderError {
    pub fn new(kind: BidderErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            imp_ids: BTreeSet::new(),
        }
    }

    pub fn generic(message: impl Into<String>) -> Self {
        Self::new(BidderErrorKind::Generic, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(BidderErrorKind::Timeout, message)
    }

    pub fn bad_input(message: impl Into<String>) -> Self {
        Self::new(BidderErrorKind::BadInput, message)
    }

    pub fn bad_server_response(message: impl Into<String>) -> Self {
        Self::new(BidderErrorKind::BadServerResponse, message)
    }

    pub fn failed_to_request_bids(message: impl Into<String>) -> Self {
        Self::new(BidderErrorKind::FailedToRequestBids, message)
    }

    pub fn invalid_bid(message: impl Into<String>) -> Self {
        Self::new(BidderErrorKind::InvalidBid, message)
    }

    /// Floor rejections always name the impression the bid was for.
    pub fn rejected_ipf(message: impl Into<String>, imp_id: impl Into<String>) -> Self {
        Self::new(BidderErrorKind::RejectedIpf, message).with_imp_id(imp_id)
    }

    /// Scope this error to one more impression.
    #[must_use]
    pub fn with_imp_id(mut self, imp_id: impl Into<String>) -> Self {
        self.imp_ids.insert(imp_id.into());
        self
    }

    /// Scope this error to every impression in `imp_ids`.
    #[must_use]
    pub fn with_imp_ids<I, S>(mut self, imp_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.imp_ids.extend(imp_ids.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for BidderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.kind, self.kind.code(), self.message)
    }
}
