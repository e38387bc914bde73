//! Runs the hooks of one stage according to the execution plan.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::time::Instant;

use super::catalog::HookCatalog;
use super::config::{ExecutionGroup, ExecutionPlan};
use super::invocation::{InvocationAction, InvocationContext, InvocationStatus};
use super::payload::StagePayload;
use super::trace::{ExecutionStatus, GroupOutcome, HookExecutionContext, HookOutcome, StageOutcome};
use super::Stage;

/// Who a stage runs on behalf of.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionScope {
    pub account_id: Option<String>,
    pub debug: bool,
    /// Bidder name on per-bidder stages.
    pub entity: Option<String>,
}

impl ExecutionScope {
    #[must_use]
    pub fn for_entity(&self, entity: impl Into<String>) -> Self {
        Self {
            entity: Some(entity.into()),
            ..self.clone()
        }
    }
}

/// A hook asked to stop the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub stage: Stage,
    pub hook_id: String,
    pub message: Option<String>,
}

/// Payload after a stage, or the rejection that ended it.
#[derive(Debug)]
pub enum StageResult<P> {
    Continue(P),
    Rejected(Rejection),
}

/// Executes stages against a shared catalog and plan.
///
/// Cheap to clone; one executor serves every auction.
#[derive(Clone, Default)]
pub struct HookExecutor {
    catalog: Arc<HookCatalog>,
    plan: Arc<ExecutionPlan>,
}

impl HookExecutor {
    #[must_use]
    pub fn new(catalog: Arc<HookCatalog>, plan: ExecutionPlan) -> Self {
        Self {
            catalog,
            plan: Arc::new(plan),
        }
    }

    /// An executor that runs no hooks.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn plan(&self) -> &ExecutionPlan {
        &self.plan
    }

    /// Run every planned group of `stage` over `payload`.
    ///
    /// Groups run in order, and so do the hooks of a group: each hook sees the
    /// payload with every earlier update applied and gets the group's timeout.
    /// A rejection ends the stage at once; no later hook of the group or later
    /// group runs. Timeouts, failures and errors only add warnings to the trace.
    pub async fn execute<P: StagePayload>(
        &self,
        stage: Stage,
        mut payload: P,
        scope: &ExecutionScope,
        trace: &mut HookExecutionContext,
    ) -> StageResult<P> {
        let groups = self.plan.groups(stage);
        if groups.is_empty() {
            return StageResult::Continue(payload);
        }

        let started = Instant::now();
        let context = InvocationContext {
            stage,
            account_id: scope.account_id.clone(),
            debug: scope.debug,
        };
        let mut stage_outcome = StageOutcome {
            stage,
            entity: scope.entity.clone(),
            duration_ms: 0,
            groups: Vec::with_capacity(groups.len()),
            rejected: false,
        };

        for group in groups {
            let mut group_outcome = GroupOutcome::default();
            let mut rejection = None;

            for code in &group.hook_codes {
                let (outcome, action) = self
                    .invoke(stage, code, &payload, &context, group.timeout)
                    .await;
                match action {
                    Some(InvocationAction::Update(update)) => payload = update.apply(payload),
                    Some(InvocationAction::Reject) => {
                        rejection = Some(Rejection {
                            stage,
                            hook_id: outcome.hook_id.clone(),
                            message: outcome.message.clone(),
                        });
                    }
                    Some(InvocationAction::NoAction) | None => {}
                }
                group_outcome.hooks.push(outcome);
                if rejection.is_some() {
                    break;
                }
            }
            stage_outcome.groups.push(group_outcome);

            if let Some(rejection) = rejection {
                log::info!(
                    "Stage {} rejected by hook '{}'{}",
                    stage,
                    rejection.hook_id,
                    scope
                        .entity
                        .as_deref()
                        .map(|entity| format!(" for {entity}"))
                        .unwrap_or_default()
                );
                stage_outcome.rejected = true;
                stage_outcome.duration_ms = started.elapsed().as_millis() as u64;
                trace.record(stage_outcome);
                return StageResult::Rejected(rejection);
            }
        }

        stage_outcome.duration_ms = started.elapsed().as_millis() as u64;
        trace.record(stage_outcome);
        StageResult::Continue(payload)
    }

    async fn invoke<P: StagePayload>(
        &self,
        stage: Stage,
        code: &str,
        payload: &P,
        context: &InvocationContext,
        timeout: Duration,
    ) -> (HookOutcome, Option<InvocationAction<P>>) {
        let Some(hook) = self.catalog.hook::<P>(stage, code) else {
            log::warn!(
                "Hook '{}' is planned for stage {} but not registered, skipping",
                code,
                stage
            );
            return (
                HookOutcome::discarded(
                    code,
                    ExecutionStatus::InvocationFailure,
                    0,
                    "hook is not registered".to_string(),
                ),
                None,
            );
        };

        let started = Instant::now();
        let call = AssertUnwindSafe(hook.call(payload, context)).catch_unwind();
        let result = tokio::time::timeout(timeout, call).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Err(_) => {
                log::warn!(
                    "Hook '{}' at stage {} timed out after {}ms",
                    code,
                    stage,
                    timeout.as_millis()
                );
                (
                    HookOutcome::discarded(
                        code,
                        ExecutionStatus::Timeout,
                        duration_ms,
                        format!("timed out after {}ms, changes discarded", timeout.as_millis()),
                    ),
                    None,
                )
            }
            Ok(Err(_)) => {
                log::error!("Hook '{}' at stage {} panicked", code, stage);
                (
                    HookOutcome::discarded(
                        code,
                        ExecutionStatus::ExecutionFailure,
                        duration_ms,
                        "panicked, changes discarded".to_string(),
                    ),
                    None,
                )
            }
            Ok(Ok(Err(report))) => {
                log::warn!("Hook '{}' at stage {} failed: {:?}", code, stage, report);
                let mut outcome = HookOutcome::discarded(
                    code,
                    ExecutionStatus::ExecutionFailure,
                    duration_ms,
                    "failed, changes discarded".to_string(),
                );
                outcome.errors.push(report.current_context().to_string());
                (outcome, None)
            }
            Ok(Ok(Ok(result))) => {
                let debug_messages = if context.debug {
                    result.debug_messages
                } else {
                    Vec::new()
                };

                if result.status == InvocationStatus::Failure {
                    log::warn!(
                        "Hook '{}' at stage {} reported failure: {}",
                        code,
                        stage,
                        result.message.as_deref().unwrap_or("no message")
                    );
                    let outcome = HookOutcome {
                        hook_id: code.to_string(),
                        status: ExecutionStatus::Failure,
                        action: None,
                        duration_ms,
                        message: result.message,
                        warnings: result.warnings,
                        errors: result.errors,
                        debug_messages,
                    };
                    return (outcome, None);
                }

                let outcome = HookOutcome {
                    hook_id: code.to_string(),
                    status: ExecutionStatus::Success,
                    action: Some(result.action.kind()),
                    duration_ms,
                    message: result.message,
                    warnings: result.warnings,
                    errors: result.errors,
                    debug_messages,
                };
                (outcome, Some(result.action))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::{
        ActionKind, AuctionRequestPayload, Hook, HookError, InvocationResult,
    };
    use async_trait::async_trait;
    use error_stack::Report;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Copy)]
    enum Behavior {
        Append(&'static str),
        Reject,
        Fail,
        Error,
        Panic,
    }

    struct TestHook {
        code: &'static str,
        behavior: Behavior,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl TestHook {
        fn new(code: &'static str, behavior: Behavior) -> Arc<Self> {
            Self::delayed(code, behavior, Duration::ZERO)
        }

        fn delayed(code: &'static str, behavior: Behavior, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                code,
                behavior,
                delay,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[allow(clippy::panic)]
    #[async_trait]
    impl Hook<AuctionRequestPayload> for TestHook {
        fn code(&self) -> &str {
            self.code
        }

        async fn call(
            &self,
            _payload: &AuctionRequestPayload,
            _context: &InvocationContext,
        ) -> Result<InvocationResult<AuctionRequestPayload>, Report<HookError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;

            match self.behavior {
                Behavior::Append(suffix) => Ok(InvocationResult::<AuctionRequestPayload>::update(
                    move |mut payload: AuctionRequestPayload| {
                        payload.bid_request.id.push_str(suffix);
                        payload
                    },
                )
                .with_debug_message(format!("appended {suffix}"))),
                Behavior::Reject => Ok(InvocationResult::reject("request blocked")),
                Behavior::Fail => Ok(InvocationResult::<AuctionRequestPayload>::failure(
                    "no data",
                )),
                Behavior::Error => Err(Report::new(HookError::Execution {
                    hook_id: self.code.to_string(),
                    message: "backend unavailable".to_string(),
                })),
                Behavior::Panic => panic!("hook blew up"),
            }
        }
    }

    const STAGE: Stage = Stage::ProcessedAuctionRequest;

    fn executor(hooks: &[&Arc<TestHook>], plan: ExecutionPlan) -> HookExecutor {
        let mut catalog = HookCatalog::new();
        for hook in hooks {
            let hook: Arc<dyn Hook<AuctionRequestPayload>> = Arc::clone(*hook) as _;
            catalog.register(STAGE, hook).expect("should register");
        }
        HookExecutor::new(Arc::new(catalog), plan)
    }

    fn payload() -> AuctionRequestPayload {
        let mut payload = AuctionRequestPayload::default();
        payload.bid_request.id = "req".into();
        payload
    }

    fn statuses(trace: &HookExecutionContext) -> Vec<(String, ExecutionStatus)> {
        trace
            .hook_outcomes()
            .map(|outcome| (outcome.hook_id.clone(), outcome.status))
            .collect()
    }

    #[tokio::test]
    async fn reject_short_circuits_remaining_hooks() {
        let first = TestHook::new("m.first", Behavior::Append("-1"));
        let second = TestHook::new("m.second", Behavior::Reject);
        let third = TestHook::new("m.third", Behavior::Append("-3"));
        let plan = ExecutionPlan::empty()
            .with_group(STAGE, Duration::from_millis(100), &["m.first"])
            .with_group(STAGE, Duration::from_millis(100), &["m.second"])
            .with_group(STAGE, Duration::from_millis(100), &["m.third"]);
        let executor = executor(&[&first, &second, &third], plan);

        let mut trace = HookExecutionContext::new();
        let result = executor
            .execute(STAGE, payload(), &ExecutionScope::default(), &mut trace)
            .await;

        let StageResult::Rejected(rejection) = result else {
            unreachable!("second hook rejects");
        };
        assert_eq!(rejection.hook_id, "m.second");
        assert_eq!(rejection.stage, STAGE);
        assert_eq!(rejection.message.as_deref(), Some("request blocked"));
        assert_eq!(first.calls(), 1);
        assert_eq!(second.calls(), 1);
        assert_eq!(third.calls(), 0);
        assert_eq!(trace.stages.len(), 1);
        assert!(trace.stages[0].rejected);
        assert_eq!(trace.stages[0].groups.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_hook_is_a_warning_and_its_change_is_dropped() {
        let slow = TestHook::delayed("m.slow", Behavior::Append("-slow"), Duration::from_millis(50));
        let fast = TestHook::new("m.fast", Behavior::Append("-fast"));
        let plan = ExecutionPlan::empty().with_group(
            STAGE,
            Duration::from_millis(10),
            &["m.slow", "m.fast"],
        );
        let executor = executor(&[&slow, &fast], plan);

        let mut trace = HookExecutionContext::new();
        let result = executor
            .execute(STAGE, payload(), &ExecutionScope::default(), &mut trace)
            .await;

        let StageResult::Continue(payload) = result else {
            unreachable!("timeouts never reject");
        };
        assert_eq!(payload.bid_request.id, "req-fast");
        assert_eq!(
            statuses(&trace),
            vec![
                ("m.slow".to_string(), ExecutionStatus::Timeout),
                ("m.fast".to_string(), ExecutionStatus::Success),
            ]
        );
        assert_eq!(trace.warnings().len(), 1);
        assert!(trace.warnings()[0].starts_with("m.slow: timed out"));
    }

    #[tokio::test]
    async fn reject_inside_a_group_stops_later_hooks() {
        let first = TestHook::new("m.first", Behavior::Append("-1"));
        let second = TestHook::new("m.second", Behavior::Reject);
        let third = TestHook::new("m.third", Behavior::Append("-3"));
        let plan = ExecutionPlan::empty().with_group(
            STAGE,
            Duration::from_millis(100),
            &["m.first", "m.second", "m.third"],
        );
        let executor = executor(&[&first, &second, &third], plan);

        let mut trace = HookExecutionContext::new();
        let result = executor
            .execute(STAGE, payload(), &ExecutionScope::default(), &mut trace)
            .await;

        let StageResult::Rejected(rejection) = result else {
            unreachable!("second hook rejects");
        };
        assert_eq!(rejection.hook_id, "m.second");
        assert_eq!(first.calls(), 1);
        assert_eq!(second.calls(), 1);
        assert_eq!(third.calls(), 0);
        assert_eq!(
            statuses(&trace),
            vec![
                ("m.first".to_string(), ExecutionStatus::Success),
                ("m.second".to_string(), ExecutionStatus::Success),
            ]
        );
        assert!(trace.stages[0].rejected);
    }

    #[tokio::test(start_paused = true)]
    async fn hooks_in_a_group_run_in_declared_order() {
        let slow = TestHook::delayed("m.slow", Behavior::Append("-a"), Duration::from_millis(30));
        let quick = TestHook::delayed("m.quick", Behavior::Append("-b"), Duration::from_millis(5));
        let plan = ExecutionPlan::empty().with_group(
            STAGE,
            Duration::from_millis(100),
            &["m.slow", "m.quick"],
        );
        let executor = executor(&[&slow, &quick], plan);

        let started = Instant::now();
        let mut trace = HookExecutionContext::new();
        let result = executor
            .execute(STAGE, payload(), &ExecutionScope::default(), &mut trace)
            .await;

        let StageResult::Continue(payload) = result else {
            unreachable!("no hook rejects");
        };
        assert_eq!(payload.bid_request.id, "req-a-b");
        assert!(started.elapsed() >= Duration::from_millis(35));
    }

    #[tokio::test]
    async fn failures_errors_and_panics_do_not_stop_the_stage() {
        let failing = TestHook::new("m.failing", Behavior::Fail);
        let erroring = TestHook::new("m.erroring", Behavior::Error);
        let panicking = TestHook::new("m.panicking", Behavior::Panic);
        let ok = TestHook::new("m.ok", Behavior::Append("-ok"));
        let plan = ExecutionPlan::empty()
            .with_group(
                STAGE,
                Duration::from_millis(100),
                &["m.failing", "m.erroring", "m.panicking"],
            )
            .with_group(STAGE, Duration::from_millis(100), &["m.missing", "m.ok"]);
        let executor = executor(&[&failing, &erroring, &panicking, &ok], plan);

        let mut trace = HookExecutionContext::new();
        let result = executor
            .execute(STAGE, payload(), &ExecutionScope::default(), &mut trace)
            .await;

        let StageResult::Continue(payload) = result else {
            unreachable!("no hook rejects");
        };
        assert_eq!(payload.bid_request.id, "req-ok");
        assert_eq!(
            statuses(&trace),
            vec![
                ("m.failing".to_string(), ExecutionStatus::Failure),
                ("m.erroring".to_string(), ExecutionStatus::ExecutionFailure),
                ("m.panicking".to_string(), ExecutionStatus::ExecutionFailure),
                ("m.missing".to_string(), ExecutionStatus::InvocationFailure),
                ("m.ok".to_string(), ExecutionStatus::Success),
            ]
        );
        let erroring_outcome = trace
            .hook_outcomes()
            .find(|outcome| outcome.hook_id == "m.erroring")
            .expect("erroring outcome");
        assert_eq!(
            erroring_outcome.errors,
            vec!["Hook 'm.erroring' failed: backend unavailable"]
        );
    }

    #[tokio::test]
    async fn stage_without_plan_passes_payload_through() {
        let executor = HookExecutor::disabled();
        let mut trace = HookExecutionContext::new();

        let result = executor
            .execute(STAGE, payload(), &ExecutionScope::default(), &mut trace)
            .await;

        assert!(matches!(result, StageResult::Continue(p) if p.bid_request.id == "req"));
        assert!(trace.stages.is_empty());
    }

    #[tokio::test]
    async fn debug_messages_only_kept_in_debug_mode() {
        let hook = TestHook::new("m.hook", Behavior::Append("-x"));
        let plan =
            ExecutionPlan::empty().with_group(STAGE, Duration::from_millis(100), &["m.hook"]);
        let executor = executor(&[&hook], plan);

        let mut quiet = HookExecutionContext::new();
        executor
            .execute(STAGE, payload(), &ExecutionScope::default(), &mut quiet)
            .await;
        let outcome = quiet.hook_outcomes().next().expect("one outcome");
        assert!(outcome.debug_messages.is_empty());
        assert_eq!(outcome.action, Some(ActionKind::Update));

        let scope = ExecutionScope {
            debug: true,
            ..ExecutionScope::default()
        }
        .for_entity("lifestreet");
        let mut verbose = HookExecutionContext::new();
        executor.execute(STAGE, payload(), &scope, &mut verbose).await;
        let outcome = verbose.hook_outcomes().next().expect("one outcome");
        assert_eq!(outcome.debug_messages, vec!["appended -x"]);
        assert_eq!(verbose.stages[0].entity.as_deref(), Some("lifestreet"));
    }
}
