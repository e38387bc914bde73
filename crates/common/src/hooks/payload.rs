//! Payload types handed to the hooks of each stage.

use bytes::Bytes;
use http::HeaderMap;

use crate::auction::SeatResult;
use crate::bidder::BidderBid;
use crate::openrtb::{BidRequest, BidResponse};

use super::Stage;

/// A type that can travel through the hooks of one or more stages.
pub trait StagePayload: Send + Sync + 'static {
    /// Stages whose hooks receive this payload.
    const STAGES: &'static [Stage];
}

/// Incoming HTTP request before any parsing.
#[derive(Debug, Clone, Default)]
pub struct EntrypointPayload {
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl StagePayload for EntrypointPayload {
    const STAGES: &'static [Stage] = &[Stage::Entrypoint];
}

/// The auction request, before and after host processing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuctionRequestPayload {
    pub bid_request: BidRequest,
}

impl StagePayload for AuctionRequestPayload {
    const STAGES: &'static [Stage] = &[Stage::RawAuctionRequest, Stage::ProcessedAuctionRequest];
}

/// The request one bidder is about to receive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BidderRequestPayload {
    pub bidder: String,
    pub bid_request: BidRequest,
}

impl StagePayload for BidderRequestPayload {
    const STAGES: &'static [Stage] = &[Stage::BidderRequest];
}

/// Bids one bidder returned, before they join the auction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BidderResponsePayload {
    pub bidder: String,
    pub bids: Vec<BidderBid>,
}

impl StagePayload for BidderResponsePayload {
    const STAGES: &'static [Stage] = &[Stage::RawBidderResponse];
}

/// Every bidder's processed bids and errors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllBidResponsesPayload {
    pub seat_results: Vec<SeatResult>,
}

impl StagePayload for AllBidResponsesPayload {
    const STAGES: &'static [Stage] = &[Stage::AllProcessedBidResponses];
}

/// The assembled response, before serialization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuctionResponsePayload {
    pub bid_response: BidResponse,
}

impl StagePayload for AuctionResponsePayload {
    const STAGES: &'static [Stage] = &[Stage::AuctionResponse];
}

/// What goes back on the wire.
#[derive(Debug, Clone, Default)]
pub struct ExitpointPayload {
    pub headers: HeaderMap,
    pub body: String,
}

impl StagePayload for ExitpointPayload {
    const STAGES: &'static [Stage] = &[Stage::Exitpoint];
}
