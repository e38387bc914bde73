//! Core types for auction requests and results.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::bidder::{BidderBid, BidderError, BidderResult, MediaType};
use crate::openrtb::{Bid, BidRequest};

use super::config::AuctionConfig;
use super::timeout::Timeout;

/// Privacy strings carried by the request, decoded elsewhere.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentStrings {
    /// Global Privacy Platform string.
    pub gpp: Option<String>,
    /// GPP section ids that apply to this request.
    #[serde(default)]
    pub gpp_sid: Vec<u16>,
    /// Legacy US privacy string.
    pub us_privacy: Option<String>,
}

impl ConsentStrings {
    /// Pull the consent strings out of the request's `regs` object.
    #[must_use]
    pub fn from_bid_request(request: &BidRequest) -> Self {
        let regs = request.regs.as_ref();
        Self {
            gpp: regs.and_then(|r| r.gpp.clone()),
            gpp_sid: regs.map(|r| r.gpp_sid.clone()).unwrap_or_default(),
            us_privacy: regs
                .and_then(|r| r.extra.get("us_privacy"))
                .and_then(|v| v.as_str())
                .map(str::to_string),
        }
    }
}

/// The canonical request handed to the orchestrator.
///
/// The bid request sits behind an `Arc` and is never mutated once the
/// auction starts; hooks that change it produce a new copy.
#[derive(Debug, Clone)]
pub struct AuctionRequest {
    pub bid_request: Arc<BidRequest>,
    pub consent: ConsentStrings,
    pub timeout: Timeout,
    pub account_id: Option<String>,
    pub debug: bool,
}

impl AuctionRequest {
    pub fn new(bid_request: BidRequest, timeout: Timeout) -> Self {
        let consent = ConsentStrings::from_bid_request(&bid_request);
        Self {
            bid_request: Arc::new(bid_request),
            consent,
            timeout,
            account_id: None,
            debug: false,
        }
    }

    /// Start the auction clock now, with the budget `config` allows for the
    /// request's `tmax`.
    pub fn from_config(bid_request: BidRequest, config: &AuctionConfig) -> Self {
        let timeout = Timeout::from_budget(config.resolve_budget(bid_request.tmax));
        Self::new(bid_request, timeout)
    }

    #[must_use]
    pub fn with_account(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

/// Per-bidder participation verdicts, decided outside the orchestrator.
///
/// Bidders without a verdict are eligible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BidderEligibility {
    verdicts: HashMap<String, bool>,
}

impl BidderEligibility {
    /// Every registered, enabled bidder may take part.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_verdict(mut self, bidder: impl Into<String>, eligible: bool) -> Self {
        self.verdicts.insert(bidder.into(), eligible);
        self
    }

    #[must_use]
    pub fn is_eligible(&self, bidder: &str) -> bool {
        self.verdicts.get(bidder).copied().unwrap_or(true)
    }
}

/// A bid tagged with the bidder that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct AuctionBid {
    pub bidder: String,
    /// Seat the bid is attributed to; the bidder name unless the partner named one.
    pub seat: String,
    pub currency: String,
    pub bid_type: MediaType,
    pub bid: Bid,
}

/// An error tagged with the bidder it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuctionError {
    pub bidder: String,
    pub error: BidderError,
}

/// Everything one bidder contributed to an auction.
#[derive(Debug, Clone, PartialEq)]
pub struct SeatResult {
    pub bidder: String,
    pub bids: Vec<BidderBid>,
    pub errors: Vec<BidderError>,
    pub response_time_ms: u64,
}

impl SeatResult {
    pub fn new(bidder: impl Into<String>, result: BidderResult<BidderBid>, response_time_ms: u64) -> Self {
        Self {
            bidder: bidder.into(),
            bids: result.values,
            errors: result.errors,
            response_time_ms,
        }
    }
}

/// Result of an orchestrated auction.
#[derive(Debug, Clone, Default)]
pub struct OrchestrationResult {
    /// One entry per participating bidder, in bidder order.
    pub seat_results: Vec<SeatResult>,
    /// Total orchestration time in milliseconds
    pub total_time_ms: u64,
}

impl OrchestrationResult {
    /// Merge every bidder's bids and errors into one tagged result.
    ///
    /// Each bidder's own ordering is preserved; nothing is promised about the
    /// order across bidders.
    #[must_use]
    pub fn merged(&self) -> (Vec<AuctionBid>, Vec<AuctionError>) {
        let mut bids = Vec::new();
        let mut errors = Vec::new();
        for seat in &self.seat_results {
            bids.extend(seat.bids.iter().map(|bid| AuctionBid {
                bidder: seat.bidder.clone(),
                seat: bid.seat.clone().unwrap_or_else(|| seat.bidder.clone()),
                currency: bid.bid_currency.clone(),
                bid_type: bid.bid_type,
                bid: bid.bid.clone(),
            }));
            errors.extend(seat.errors.iter().map(|error| AuctionError {
                bidder: seat.bidder.clone(),
                error: error.clone(),
            }));
        }
        (bids, errors)
    }

    /// Results for one bidder, if it took part.
    #[must_use]
    pub fn seat(&self, bidder: &str) -> Option<&SeatResult> {
        self.seat_results.iter().find(|seat| seat.bidder == bidder)
    }

    /// Get all bids from all bidders for a specific impression.
    #[must_use]
    pub fn bids_for_imp(&self, imp_id: &str) -> Vec<&BidderBid> {
        self.seat_results
            .iter()
            .flat_map(|seat| &seat.bids)
            .filter(|bid| bid.bid.impid == imp_id)
            .collect()
    }

    /// Get the total number of bids received.
    #[must_use]
    pub fn total_bids(&self) -> usize {
        self.seat_results.iter().map(|seat| seat.bids.len()).sum()
    }
}
