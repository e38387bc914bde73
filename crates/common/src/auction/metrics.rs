//! Process-wide auction counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::bidder::BidderErrorKind;

const ERROR_KIND_COUNT: usize = BidderErrorKind::ALL.len();

/// Counters shared by every auction. Increments never block.
#[derive(Debug, Default)]
pub struct AuctionMetrics {
    auctions: AtomicU64,
    bidder_requests: AtomicU64,
    bids_received: AtomicU64,
    errors: [AtomicU64; ERROR_KIND_COUNT],
}

/// Point-in-time copy of [`AuctionMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub auctions: u64,
    pub bidder_requests: u64,
    pub bids_received: u64,
    /// `(error kind, count)` in code order.
    pub errors: Vec<(&'static str, u64)>,
}

fn kind_index(kind: BidderErrorKind) -> usize {
    BidderErrorKind::ALL
        .iter()
        .position(|candidate| *candidate == kind)
        .unwrap_or(ERROR_KIND_COUNT - 1)
}

impl AuctionMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_auction(&self) {
        self.auctions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bidder_requests(&self, count: usize) {
        self.bidder_requests
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_bids(&self, count: usize) {
        self.bids_received.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_error(&self, kind: BidderErrorKind) {
        self.errors[kind_index(kind)].fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn auctions(&self) -> u64 {
        self.auctions.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn bidder_requests(&self) -> u64 {
        self.bidder_requests.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn bids_received(&self) -> u64 {
        self.bids_received.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn errors_of(&self, kind: BidderErrorKind) -> u64 {
        self.errors[kind_index(kind)].load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            auctions: self.auctions(),
            bidder_requests: self.bidder_requests(),
            bids_received: self.bids_received(),
            errors: BidderErrorKind::ALL
                .iter()
                .map(|kind| (kind.as_str(), self.errors_of(*kind)))
                .collect(),
        }
    }
}
