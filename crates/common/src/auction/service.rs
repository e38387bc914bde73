//! Drives one auction through the hook stages around the orchestrator.

use std::sync::Arc;

use error_stack::{Report, ResultExt};
use http::{header, HeaderMap, HeaderValue};
use serde_json::{json, Map, Value};

use crate::error::AuctionServerError;
use crate::hooks::{
    AllBidResponsesPayload, AuctionRequestPayload, AuctionResponsePayload, ExecutionScope,
    ExitpointPayload, HookExecutionContext, HookExecutor, Rejection, Stage, StagePayload,
    StageResult,
};
use crate::bidder::MediaType;
use crate::openrtb::{Bid, BidRequest, BidResponse, SeatBid};

use super::config::AuctionConfig;
use super::orchestrator::AuctionOrchestrator;
use super::types::{AuctionRequest, BidderEligibility, SeatResult};

/// Everything produced by a completed pipeline run.
#[derive(Debug)]
pub struct AuctionOutput {
    /// The response as it left the auction-response stage.
    pub response: BidResponse,
    /// Headers and body as they left the exitpoint stage.
    pub headers: HeaderMap,
    pub body: String,
    pub trace: HookExecutionContext,
}

/// How a pipeline run ended.
#[derive(Debug)]
pub enum PipelineOutcome {
    Completed(AuctionOutput),
    /// A hook rejected the request; no later stage ran.
    Rejected {
        rejection: Rejection,
        trace: HookExecutionContext,
    },
}

impl PipelineOutcome {
    #[must_use]
    pub fn trace(&self) -> &HookExecutionContext {
        match self {
            Self::Completed(output) => &output.trace,
            Self::Rejected { trace, .. } => trace,
        }
    }
}

/// Runs the stages from processed-auction-request to exitpoint.
///
/// Request parsing and the entrypoint and raw-auction-request stages belong to
/// the request layer in front of this service; it can reach the same executor
/// through [`AuctionService::hooks`].
pub struct AuctionService {
    orchestrator: AuctionOrchestrator,
    hooks: HookExecutor,
}

impl AuctionService {
    /// Build a service whose orchestrator runs the per-bidder stages with `hooks`.
    #[must_use]
    pub fn new(orchestrator: AuctionOrchestrator, hooks: HookExecutor) -> Self {
        Self {
            orchestrator: orchestrator.with_hooks(hooks.clone()),
            hooks,
        }
    }

    #[must_use]
    pub fn orchestrator(&self) -> &AuctionOrchestrator {
        &self.orchestrator
    }

    #[must_use]
    pub fn hooks(&self) -> &HookExecutor {
        &self.hooks
    }

    /// Run one auction request through the pipeline.
    ///
    /// # Errors
    ///
    /// Returns the orchestrator's terminal errors and
    /// [`AuctionServerError::Auction`] when the response cannot be serialized.
    /// A hook rejection is not an error; it is reported as
    /// [`PipelineOutcome::Rejected`].
    pub async fn run(
        &self,
        request: AuctionRequest,
        eligibility: &BidderEligibility,
    ) -> Result<PipelineOutcome, Report<AuctionServerError>> {
        let config = self.orchestrator.config();
        let scope = ExecutionScope {
            account_id: request.account_id.clone(),
            debug: request.debug || config.debug,
            entity: None,
        };
        let mut trace = HookExecutionContext::new();

        let request = if self.hooks.plan().groups(Stage::ProcessedAuctionRequest).is_empty() {
            request
        } else {
            let payload = AuctionRequestPayload {
                bid_request: request.bid_request.as_ref().clone(),
            };
            let payload = match self
                .stage(Stage::ProcessedAuctionRequest, payload, &scope, &mut trace)
                .await
            {
                Ok(payload) => payload,
                Err(rejection) => return Ok(PipelineOutcome::Rejected { rejection, trace }),
            };
            AuctionRequest {
                bid_request: Arc::new(payload.bid_request),
                ..request
            }
        };

        let result = self
            .orchestrator
            .run_auction(&request, eligibility, &mut trace)
            .await?;

        let payload = AllBidResponsesPayload {
            seat_results: result.seat_results,
        };
        let seat_results = match self
            .stage(Stage::AllProcessedBidResponses, payload, &scope, &mut trace)
            .await
        {
            Ok(payload) => payload.seat_results,
            Err(rejection) => return Ok(PipelineOutcome::Rejected { rejection, trace }),
        };

        let payload = AuctionResponsePayload {
            bid_response: build_bid_response(&request.bid_request, &seat_results, config),
        };
        let mut response = match self
            .stage(Stage::AuctionResponse, payload, &scope, &mut trace)
            .await
        {
            Ok(payload) => payload.bid_response,
            Err(rejection) => return Ok(PipelineOutcome::Rejected { rejection, trace }),
        };

        if scope.debug {
            attach_trace(&mut response, trace.to_trace());
        }

        let body = serde_json::to_string(&response).change_context(AuctionServerError::Auction {
            message: "Failed to serialize auction response".to_string(),
        })?;
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let payload = ExitpointPayload { headers, body };
        let exit = match self
            .stage(Stage::Exitpoint, payload, &scope, &mut trace)
            .await
        {
            Ok(payload) => payload,
            Err(rejection) => return Ok(PipelineOutcome::Rejected { rejection, trace }),
        };

        Ok(PipelineOutcome::Completed(AuctionOutput {
            response,
            headers: exit.headers,
            body: exit.body,
            trace,
        }))
    }

    async fn stage<P: StagePayload>(
        &self,
        stage: Stage,
        payload: P,
        scope: &ExecutionScope,
        trace: &mut HookExecutionContext,
    ) -> Result<P, Rejection> {
        match self.hooks.execute(stage, payload, scope, trace).await {
            StageResult::Continue(payload) => Ok(payload),
            StageResult::Rejected(rejection) => Err(rejection),
        }
    }
}

/// Assemble the response for `request` from every bidder's results.
///
/// Bids are grouped by seat in the order bidders appear. Bidder errors and
/// response times go under `ext`.
#[must_use]
pub fn build_bid_response(
    request: &BidRequest,
    seat_results: &[SeatResult],
    config: &AuctionConfig,
) -> BidResponse {
    let mut seatbid: Vec<SeatBid> = Vec::new();
    let mut errors = Map::new();
    let mut response_times = Map::new();

    for seat_result in seat_results {
        for bidder_bid in &seat_result.bids {
            let seat = bidder_bid
                .seat
                .clone()
                .unwrap_or_else(|| seat_result.bidder.clone());
            let mut bid = bidder_bid.bid.clone();
            annotate_bid_type(&mut bid, bidder_bid.bid_type);

            match seatbid
                .iter_mut()
                .find(|existing| existing.seat.as_deref() == Some(seat.as_str()))
            {
                Some(existing) => existing.bid.push(bid),
                None => seatbid.push(SeatBid {
                    bid: vec![bid],
                    seat: Some(seat),
                    ..SeatBid::default()
                }),
            }
        }

        if !seat_result.errors.is_empty() {
            errors.insert(seat_result.bidder.clone(), json!(seat_result.errors));
        }
        response_times.insert(
            seat_result.bidder.clone(),
            json!(seat_result.response_time_ms),
        );
    }

    let mut ext = Map::new();
    if !errors.is_empty() {
        ext.insert("errors".to_string(), Value::Object(errors));
    }
    ext.insert(
        "responsetimemillis".to_string(),
        Value::Object(response_times),
    );

    BidResponse {
        id: request.id.clone(),
        seatbid,
        cur: Some(
            request
                .cur
                .first()
                .cloned()
                .unwrap_or_else(|| config.default_currency.clone()),
        ),
        ext: Some(Value::Object(ext)),
        ..BidResponse::default()
    }
}

/// Set `ext.prebid.type` on `bid`, keeping every other key the bidder sent.
fn annotate_bid_type(bid: &mut Bid, bid_type: MediaType) {
    let ext = bid.ext.get_or_insert_with(|| Value::Object(Map::new()));
    let Some(prebid) = ext
        .as_object_mut()
        .map(|ext| ext.entry("prebid").or_insert_with(|| json!({})))
        .and_then(Value::as_object_mut)
    else {
        log::warn!("Bid {} has a non-object ext.prebid, media type not recorded", bid.id);
        return;
    };
    prebid.insert("type".to_string(), json!(bid_type));
}

/// Place `trace` at `ext.prebid.modules.trace`, keeping whatever else is there.
fn attach_trace(response: &mut BidResponse, trace: Value) {
    let ext = response
        .ext
        .get_or_insert_with(|| Value::Object(Map::new()));
    let Some(modules) = ext
        .as_object_mut()
        .map(|ext| ext.entry("prebid").or_insert_with(|| json!({})))
        .and_then(Value::as_object_mut)
        .map(|prebid| prebid.entry("modules").or_insert_with(|| json!({})))
        .and_then(Value::as_object_mut)
    else {
        log::warn!("Response ext does not leave room for ext.prebid.modules, trace not attached");
        return;
    };
    modules.insert("trace".to_string(), trace);
}
