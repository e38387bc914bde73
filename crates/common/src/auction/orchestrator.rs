//! Auction orchestrator: scatter one request to every eligible bidder and
//! gather whatever comes back before the deadline.

use std::collections::BTreeSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use error_stack::Report;
use futures::future::join_all;
use http::StatusCode;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::bidder::{
    Bidder, BidderBid, BidderCall, BidderCatalog, BidderError, BidderRequest, BidderResult,
};
use crate::error::AuctionServerError;
use crate::hooks::{
    BidderRequestPayload, BidderResponsePayload, ExecutionScope, HookExecutionContext,
    HookExecutor, Stage, StageResult,
};
use crate::http_client::{HttpClient, TransportError};
use crate::logging::is_debug_enabled;
use crate::openrtb::BidRequest;

use super::config::AuctionConfig;
use super::metrics::AuctionMetrics;
use super::timeout::Timeout;
use super::types::{AuctionRequest, BidderEligibility, OrchestrationResult, SeatResult};
use super::validation::validate_bids;

const TIMEOUT_MESSAGE: &str = "Timeout has been exceeded";

/// Runs auctions across the bidders of a catalog.
///
/// Holds no per-auction state; share one instance across requests.
pub struct AuctionOrchestrator {
    config: AuctionConfig,
    catalog: BidderCatalog,
    client: Arc<dyn HttpClient>,
    hooks: HookExecutor,
    metrics: Arc<AuctionMetrics>,
}

impl AuctionOrchestrator {
    pub fn new(config: AuctionConfig, catalog: BidderCatalog, client: Arc<dyn HttpClient>) -> Self {
        Self {
            config,
            catalog,
            client,
            hooks: HookExecutor::disabled(),
            metrics: Arc::new(AuctionMetrics::new()),
        }
    }

    /// Run bidder-request and raw-bidder-response hooks through `hooks`.
    #[must_use]
    pub fn with_hooks(mut self, hooks: HookExecutor) -> Self {
        self.hooks = hooks;
        self
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<AuctionMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    #[must_use]
    pub fn metrics(&self) -> &Arc<AuctionMetrics> {
        &self.metrics
    }

    #[must_use]
    pub fn config(&self) -> &AuctionConfig {
        &self.config
    }

    /// Get the number of registered bidders.
    #[must_use]
    pub fn bidder_count(&self) -> usize {
        self.catalog.len()
    }

    /// Run one auction.
    ///
    /// Every bidder that is registered, enabled and eligible takes part. Each
    /// outbound call gets its own deadline, the earlier of the bidder's
    /// timeout and the auction deadline less the safety margin. Calls still
    /// running when the auction deadline passes are aborted and reported as
    /// timeouts; nothing a bidder does can fail another bidder.
    ///
    /// # Errors
    ///
    /// Returns [`AuctionServerError::InvalidRequest`] when the request has no
    /// impressions and [`AuctionServerError::Auction`] when no bidder is
    /// eligible. Bidder failures are never errors here; they are recorded in
    /// the result.
    pub async fn run_auction(
        &self,
        request: &AuctionRequest,
        eligibility: &BidderEligibility,
        trace: &mut HookExecutionContext,
    ) -> Result<OrchestrationResult, Report<AuctionServerError>> {
        let start_time = Instant::now();

        if request.bid_request.imp.is_empty() {
            return Err(Report::new(AuctionServerError::InvalidRequest {
                message: "request has no impressions".to_string(),
            }));
        }

        let bidders = self.eligible_bidders(eligibility);
        if bidders.is_empty() {
            return Err(Report::new(AuctionServerError::Auction {
                message: "No eligible bidders".to_string(),
            }));
        }

        self.metrics.record_auction();
        log::info!(
            "Running auction '{}' with {} bidders ({}ms remaining)",
            request.bid_request.id,
            bidders.len(),
            request.timeout.remaining().as_millis()
        );

        let scope = ExecutionScope {
            account_id: request.account_id.clone(),
            debug: request.debug || self.config.debug,
            entity: None,
        };

        let outcomes = join_all(
            bidders
                .iter()
                .map(|(name, bidder)| self.run_bidder(name, Arc::clone(bidder), request, &scope)),
        )
        .await;

        let mut seat_results = Vec::with_capacity(outcomes.len());
        for (seat, bidder_trace) in outcomes {
            trace.extend(bidder_trace);
            if let Some(seat) = seat {
                seat_results.push(seat);
            }
        }

        let result = OrchestrationResult {
            seat_results,
            total_time_ms: start_time.elapsed().as_millis() as u64,
        };
        log::info!(
            "Auction '{}' finished with {} bids in {}ms",
            request.bid_request.id,
            result.total_bids(),
            result.total_time_ms
        );
        Ok(result)
    }

    fn eligible_bidders(&self, eligibility: &BidderEligibility) -> Vec<(String, Arc<dyn Bidder>)> {
        self.catalog
            .names()
            .filter_map(|name| {
                if !self.catalog.is_active(name) {
                    log::debug!("Bidder '{}' is disabled, skipping", name);
                    return None;
                }
                if !eligibility.is_eligible(name) {
                    log::debug!("Bidder '{}' is not eligible for this auction, skipping", name);
                    return None;
                }
                self.catalog
                    .bidder(name)
                    .map(|bidder| (name.to_string(), bidder))
            })
            .collect()
    }

    /// Everything one bidder contributes: hooks, request building, calls,
    /// parsing and validation. `None` when a hook rejected the bidder.
    async fn run_bidder(
        &self,
        name: &str,
        bidder: Arc<dyn Bidder>,
        request: &AuctionRequest,
        scope: &ExecutionScope,
    ) -> (Option<SeatResult>, HookExecutionContext) {
        let start_time = Instant::now();
        let mut trace = HookExecutionContext::new();
        let scope = scope.for_entity(name);

        let bid_request = if self.hooks.plan().groups(Stage::BidderRequest).is_empty() {
            Arc::clone(&request.bid_request)
        } else {
            let payload = BidderRequestPayload {
                bidder: name.to_string(),
                bid_request: request.bid_request.as_ref().clone(),
            };
            match self
                .hooks
                .execute(Stage::BidderRequest, payload, &scope, &mut trace)
                .await
            {
                StageResult::Continue(payload) => Arc::new(payload.bid_request),
                StageResult::Rejected(rejection) => {
                    log::info!(
                        "Bidder '{}' removed from auction by hook '{}'",
                        name,
                        rejection.hook_id
                    );
                    return (None, trace);
                }
            }
        };

        let mut result = self.request_bids(name, &bidder, &bid_request, request.timeout).await;

        if !self.hooks.plan().groups(Stage::RawBidderResponse).is_empty() {
            let payload = BidderResponsePayload {
                bidder: name.to_string(),
                bids: std::mem::take(&mut result.values),
            };
            match self
                .hooks
                .execute(Stage::RawBidderResponse, payload, &scope, &mut trace)
                .await
            {
                StageResult::Continue(payload) => result.values = payload.bids,
                StageResult::Rejected(rejection) => {
                    log::info!(
                        "Response of bidder '{}' discarded by hook '{}'",
                        name,
                        rejection.hook_id
                    );
                }
            }
        }

        let validated = validate_bids(std::mem::take(&mut result.values), &bid_request, &self.config);
        result.extend(validated);

        self.metrics.record_bids(result.values.len());
        for error in &result.errors {
            self.metrics.record_error(error.kind);
            if error.kind.is_operational() {
                log::warn!("Bidder '{}' error: {}", name, error);
            } else {
                log::debug!("Bidder '{}' error: {}", name, error);
            }
        }

        let seat = SeatResult::new(name, result, start_time.elapsed().as_millis() as u64);
        (Some(seat), trace)
    }

    /// Build, dispatch and collect every call for one bidder.
    async fn request_bids(
        &self,
        name: &str,
        bidder: &Arc<dyn Bidder>,
        bid_request: &Arc<BidRequest>,
        auction_timeout: Timeout,
    ) -> BidderResult<BidderBid> {
        let built = catch_unwind(AssertUnwindSafe(|| bidder.make_http_requests(bid_request)))
            .unwrap_or_else(|_| {
                log::error!("Bidder '{}' panicked while building requests", name);
                BidderResult::with_error(BidderError::generic(
                    "Bidder failed while building requests",
                ))
            });

        if built.is_empty() {
            return BidderResult::with_error(BidderError::failed_to_request_bids(
                "The bidder failed to generate any bid requests, but also failed to generate an error",
            ));
        }

        let BidderResult {
            values: http_requests,
            errors: build_errors,
        } = built;
        let mut result = BidderResult::with_errors(build_errors);
        if http_requests.is_empty() {
            return result;
        }
        self.metrics.record_bidder_requests(http_requests.len());

        let bidder_timeout = self
            .catalog
            .info(name)
            .map(|info| info.timeout)
            .unwrap_or_else(|| auction_timeout.remaining());
        let deadline = auction_timeout
            .minus(self.config.timeout_margin())
            .min_with(bidder_timeout);

        if deadline.is_expired() {
            log::warn!(
                "No time left for bidder '{}', skipping {} requests",
                name,
                http_requests.len()
            );
            for http_request in http_requests {
                result.push_error(BidderError::timeout(TIMEOUT_MESSAGE).with_imp_ids(http_request.imp_ids));
            }
            return result;
        }

        log::info!(
            "Launching {} requests to bidder '{}' ({}ms budget)",
            http_requests.len(),
            name,
            deadline.remaining().as_millis()
        );

        let calls: Vec<(BTreeSet<String>, JoinHandle<BidderResult<BidderBid>>)> = http_requests
            .into_iter()
            .map(|http_request| {
                if is_debug_enabled() {
                    log::debug!(
                        "Request to '{}' at {}: {}",
                        name,
                        http_request.uri,
                        String::from_utf8_lossy(&http_request.body)
                    );
                }
                let imp_ids = http_request.imp_ids.clone();
                let handle = tokio::spawn(call_bidder(
                    Arc::clone(bidder),
                    Arc::clone(&self.client),
                    http_request,
                    Arc::clone(bid_request),
                    deadline,
                ));
                (imp_ids, handle)
            })
            .collect();

        let outcomes = join_all(
            calls
                .into_iter()
                .map(|(imp_ids, handle)| await_call(name, handle, imp_ids, auction_timeout)),
        )
        .await;
        result.extend(outcomes.into_iter().collect());
        result
    }
}

/// One outbound call from send to parsed bids. Runs on its own task.
async fn call_bidder(
    bidder: Arc<dyn Bidder>,
    client: Arc<dyn HttpClient>,
    request: BidderRequest,
    bid_request: Arc<BidRequest>,
    deadline: Timeout,
) -> BidderResult<BidderBid> {
    let sent =
        tokio::time::timeout_at(deadline.deadline(), client.send(&request, deadline.remaining()))
            .await;

    let response = match sent {
        Ok(Ok(response)) => response,
        Err(_) | Ok(Err(TransportError::Timeout)) => {
            return BidderResult::with_error(
                BidderError::timeout(TIMEOUT_MESSAGE).with_imp_ids(request.imp_ids),
            );
        }
        Ok(Err(error @ TransportError::Connection { .. })) => {
            return BidderResult::with_error(
                BidderError::bad_server_response(error.to_string()).with_imp_ids(request.imp_ids),
            );
        }
    };

    match response.status {
        StatusCode::NO_CONTENT => return BidderResult::empty(),
        StatusCode::BAD_REQUEST => {
            return BidderResult::with_error(
                BidderError::bad_input(
                    "Unexpected status code: 400. Run with request.test = 1 for more info",
                )
                .with_imp_ids(request.imp_ids),
            );
        }
        StatusCode::OK => {}
        status => {
            return BidderResult::with_error(
                BidderError::bad_server_response(format!(
                    "Unexpected status code: {}",
                    status.as_u16()
                ))
                .with_imp_ids(request.imp_ids),
            );
        }
    }

    let call = BidderCall { request, response };
    bidder.make_bids(&call, &bid_request)
}

/// Wait for a call task, giving up at the auction deadline.
async fn await_call(
    name: &str,
    mut handle: JoinHandle<BidderResult<BidderBid>>,
    imp_ids: BTreeSet<String>,
    auction_timeout: Timeout,
) -> BidderResult<BidderBid> {
    match tokio::time::timeout_at(auction_timeout.deadline(), &mut handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => {
            log::error!("Call to bidder '{}' failed: {}", name, join_error);
            BidderResult::with_error(
                BidderError::generic("Bidder failed while handling the response")
                    .with_imp_ids(imp_ids),
            )
        }
        Err(_) => {
            handle.abort();
            log::warn!("Call to bidder '{}' still pending at auction deadline, aborted", name);
            BidderResult::with_error(BidderError::timeout(TIMEOUT_MESSAGE).with_imp_ids(imp_ids))
        }
    }
}
