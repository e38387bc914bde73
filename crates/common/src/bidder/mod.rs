//! Bidder adapters and the contract they implement.
//!
//! Every third-party bidder is one implementation of [`Bidder`]. Adapters are
//! stateless: they translate the canonical request into outbound calls and
//! translate responses back into bids, while the orchestrator owns transport,
//! deadlines and error tagging.
//!
//! Individual adapters live in submodules (e.g. [`lifestreet`]) and are wired
//! into the [`BidderCatalog`] by the builder functions listed in `registry`.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::openrtb::BidRequest;

pub mod error;
pub mod lifestreet;
pub mod model;
pub mod registry;
pub mod result;

pub use error::{BidderError, BidderErrorKind};
pub use model::{json_headers, BidderBid, BidderCall, BidderRequest, HttpResponse, MediaType};
pub use registry::{BidderCatalog, BidderInfo};
pub use result::BidderResult;

/// Trait implemented by all bidder adapters.
pub trait Bidder: Send + Sync {
    /// Translate the canonical request into the calls this bidder needs.
    ///
    /// Implementations should validate per impression: an impression that
    /// cannot be sent yields a `bad_input` error scoped to it and is left out,
    /// while the remaining impressions still produce requests. Whether
    /// impressions are batched or sent one per call is up to the adapter.
    fn make_http_requests(&self, request: &BidRequest) -> BidderResult<BidderRequest>;

    /// Extract bids from a completed call.
    ///
    /// Only called for responses the framework considers successful. A body
    /// that cannot be decoded is a `bad_server_response`.
    fn make_bids(&self, call: &BidderCall, request: &BidRequest) -> BidderResult<BidderBid>;
}

/// Host configuration shared by every bidder.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct BidderConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[validate(url)]
    pub endpoint: String,
    /// Adapter default timeout; the orchestrator still caps it by the auction budget.
    #[serde(default = "default_timeout_ms")]
    #[validate(range(min = 1))]
    pub timeout_ms: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    1000
}
