use std::fmt;

use serde::{Deserialize, Serialize};

/// Named extension points of the auction pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Entrypoint,
    RawAuctionRequest,
    ProcessedAuctionRequest,
    BidderRequest,
    RawBidderResponse,
    AllProcessedBidResponses,
    AuctionResponse,
    Exitpoint,
}

impl Stage {
    pub const ALL: [Stage; 8] = [
        Self::Entrypoint,
        Self::RawAuctionRequest,
        Self::ProcessedAuctionRequest,
        Self::BidderRequest,
        Self::RawBidderResponse,
        Self::AllProcessedBidResponses,
        Self::AuctionResponse,
        Self::Exitpoint,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Entrypoint => "entrypoint",
            Self::RawAuctionRequest => "raw-auction-request",
            Self::ProcessedAuctionRequest => "processed-auction-request",
            Self::BidderRequest => "bidder-request",
            Self::RawBidderResponse => "raw-bidder-response",
            Self::AllProcessedBidResponses => "all-processed-bid-responses",
            Self::AuctionResponse => "auction-response",
            Self::Exitpoint => "exitpoint",
        }
    }

    /// Stages that run once per bidder rather than once per auction.
    #[must_use]
    pub const fn is_per_bidder(self) -> bool {
        matches!(self, Self::BidderRequest | Self::RawBidderResponse)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_kebab_case_names() {
        for stage in Stage::ALL {
            let json = serde_json::to_value(stage).expect("should serialize");
            assert_eq!(json, serde_json::Value::String(stage.to_string()));
            let back: Stage = serde_json::from_value(json).expect("should deserialize");
            assert_eq!(back, stage);
        }
    }

    #[test]
    fn order_follows_the_pipeline() {
        let mut sorted = Stage::ALL;
        sorted.sort();
        assert_eq!(sorted, Stage::ALL);
        assert!(Stage::BidderRequest.is_per_bidder());
        assert!(!Stage::Exitpoint.is_per_bidder());
    }
}
