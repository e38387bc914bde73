//! Auction orchestration: fan one request out to every eligible bidder and
//! merge whatever comes back before the deadline.
//!
//! The [`AuctionOrchestrator`] owns the scatter-gather itself; the
//! [`AuctionService`] wraps it in the hook stages that run before and after.
//! Bidder adapters live in [`crate::bidder`].

use std::sync::Arc;

use crate::bidder::BidderCatalog;
use crate::hooks::{ExecutionPlan, HookCatalog, HookExecutor};
use crate::http_client::HttpClient;
use crate::settings::Settings;

pub mod config;
pub mod metrics;
pub mod orchestrator;
pub mod service;
pub mod timeout;
pub mod types;
pub mod validation;

pub use config::AuctionConfig;
pub use metrics::{AuctionMetrics, MetricsSnapshot};
pub use orchestrator::AuctionOrchestrator;
pub use service::{build_bid_response, AuctionOutput, AuctionService, PipelineOutcome};
pub use timeout::Timeout;
pub use types::{
    AuctionBid, AuctionError, AuctionRequest, BidderEligibility, ConsentStrings,
    OrchestrationResult, SeatResult,
};

/// Build a new auction orchestrator for the current settings.
///
/// Registers every bidder the settings configure. Callers can reuse the
/// returned [`AuctionOrchestrator`] across requests.
#[must_use]
pub fn build_orchestrator(settings: &Settings, client: Arc<dyn HttpClient>) -> AuctionOrchestrator {
    log::info!("Building auction orchestrator");

    let orchestrator =
        AuctionOrchestrator::new(settings.auction.clone(), BidderCatalog::new(settings), client);

    log::info!(
        "Auction orchestrator built with {} bidders",
        orchestrator.bidder_count()
    );

    orchestrator
}

/// Build the full pipeline: orchestrator plus the hook plan from `settings`.
///
/// `hooks` holds the hook implementations the plan refers to by code.
#[must_use]
pub fn build_service(
    settings: &Settings,
    client: Arc<dyn HttpClient>,
    hooks: HookCatalog,
) -> AuctionService {
    let plan = ExecutionPlan::from_config(&settings.hooks);
    log::info!("Building auction service with {} registered hooks", hooks.len());
    let executor = HookExecutor::new(Arc::new(hooks), plan);
    AuctionService::new(build_orchestrator(settings, client), executor)
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use error_stack::Report;

    use crate::hooks::{
        AuctionRequestPayload, Hook, HookError, InvocationContext, InvocationResult, Stage,
    };
    use crate::test_support::tests::{
        bid_response_body, create_test_settings, sample_bid_request, Script, ScriptedHttpClient,
        LIFESTREET_ENDPOINT,
    };

    struct Passthrough;

    #[async_trait]
    impl Hook<AuctionRequestPayload> for Passthrough {
        fn code(&self) -> &str {
            "test-module.passthrough"
        }

        async fn call(
            &self,
            _payload: &AuctionRequestPayload,
            _context: &InvocationContext,
        ) -> Result<InvocationResult<AuctionRequestPayload>, Report<HookError>> {
            Ok(InvocationResult::no_action().with_message("seen"))
        }
    }

    #[test]
    fn test_build_orchestrator_registers_configured_bidders() {
        let settings = create_test_settings();
        let orchestrator = build_orchestrator(&settings, Arc::new(ScriptedHttpClient::new()));
        assert_eq!(orchestrator.bidder_count(), 1);
        assert!(orchestrator.config().enforce_floors);
    }

    #[tokio::test]
    async fn test_build_service_runs_the_configured_plan() {
        let settings = create_test_settings();
        let client = Arc::new(ScriptedHttpClient::new().on(
            LIFESTREET_ENDPOINT,
            Script::ok(bid_response_body(&[("b1", "imp-1", 1.0)])),
        ));
        let passthrough: Arc<dyn Hook<AuctionRequestPayload>> = Arc::new(Passthrough);
        let mut hooks = HookCatalog::new();
        hooks
            .register(Stage::ProcessedAuctionRequest, passthrough)
            .expect("should register");

        let service = build_service(&settings, client, hooks);
        let request = AuctionRequest::from_config(sample_bid_request(), &settings.auction);
        let outcome = service
            .run(request, &BidderEligibility::all())
            .await
            .expect("pipeline should run");

        let PipelineOutcome::Completed(output) = outcome else {
            unreachable!("passthrough never rejects");
        };
        let outcomes: Vec<_> = output.trace.hook_outcomes().collect();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].hook_id, "test-module.passthrough");
        assert_eq!(outcomes[0].message.as_deref(), Some("seen"));
        assert_eq!(output.response.seatbid.len(), 1);
    }
}
