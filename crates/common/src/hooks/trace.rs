//! Execution trace of the hooks that ran during one pipeline invocation.

use serde::Serialize;

use super::invocation::ActionKind;
use super::Stage;

/// How one hook run ended, from the executor's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    /// The hook reported failure itself.
    Failure,
    /// The group timeout elapsed first.
    Timeout,
    /// The hook returned an error or panicked.
    ExecutionFailure,
    /// The plan names a hook the catalog does not have.
    InvocationFailure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookOutcome {
    pub hook_id: String,
    pub status: ExecutionStatus,
    /// Action that took effect; `None` when the hook's result was discarded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionKind>,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub debug_messages: Vec<String>,
}

impl HookOutcome {
    pub(crate) fn discarded(
        hook_id: &str,
        status: ExecutionStatus,
        duration_ms: u64,
        warning: String,
    ) -> Self {
        Self {
            hook_id: hook_id.to_string(),
            status,
            action: None,
            duration_ms,
            message: None,
            warnings: vec![warning],
            errors: Vec::new(),
            debug_messages: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupOutcome {
    pub hooks: Vec<HookOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageOutcome {
    pub stage: Stage,
    /// Bidder the stage ran for, on per-bidder stages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    pub duration_ms: u64,
    pub groups: Vec<GroupOutcome>,
    pub rejected: bool,
}

/// Accumulates stage outcomes for one pipeline invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HookExecutionContext {
    pub stages: Vec<StageOutcome>,
}

impl HookExecutionContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: StageOutcome) {
        self.stages.push(outcome);
    }

    /// Append another context's outcomes after this one's.
    pub fn extend(&mut self, other: HookExecutionContext) {
        self.stages.extend(other.stages);
    }

    /// Every hook outcome, in execution order.
    pub fn hook_outcomes(&self) -> impl Iterator<Item = &HookOutcome> {
        self.stages
            .iter()
            .flat_map(|stage| &stage.groups)
            .flat_map(|group| &group.hooks)
    }

    /// Warnings from every hook, prefixed with the hook id.
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        self.hook_outcomes()
            .flat_map(|outcome| {
                outcome
                    .warnings
                    .iter()
                    .map(move |warning| format!("{}: {}", outcome.hook_id, warning))
            })
            .collect()
    }

    /// JSON form attached to the response as `ext.prebid.modules.trace`.
    #[must_use]
    pub fn to_trace(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(hook_id: &str, warning: &str) -> HookOutcome {
        HookOutcome::discarded(hook_id, ExecutionStatus::Timeout, 5, warning.to_string())
    }

    #[test]
    fn trace_serializes_nested_outcomes() {
        let mut context = HookExecutionContext::new();
        context.record(StageOutcome {
            stage: Stage::BidderRequest,
            entity: Some("lifestreet".into()),
            duration_ms: 7,
            groups: vec![GroupOutcome {
                hooks: vec![outcome("m.slow", "timed out")],
            }],
            rejected: false,
        });

        let trace = context.to_trace();
        assert_eq!(trace["stages"][0]["stage"], "bidder-request");
        assert_eq!(trace["stages"][0]["entity"], "lifestreet");
        let hook = &trace["stages"][0]["groups"][0]["hooks"][0];
        assert_eq!(hook["hook_id"], "m.slow");
        assert_eq!(hook["status"], "timeout");
        assert!(hook.get("action").is_none());
        assert_eq!(context.warnings(), vec!["m.slow: timed out"]);
    }

    #[test]
    fn extend_keeps_order() {
        let stage = |entity: &str| StageOutcome {
            stage: Stage::RawBidderResponse,
            entity: Some(entity.into()),
            duration_ms: 0,
            groups: Vec::new(),
            rejected: false,
        };
        let mut first = HookExecutionContext::new();
        first.record(stage("a"));
        let mut second = HookExecutionContext::new();
        second.record(stage("b"));

        first.extend(second);
        let entities: Vec<_> = first
            .stages
            .iter()
            .filter_map(|s| s.entity.as_deref())
            .collect();
        assert_eq!(entities, vec!["a", "b"]);
    }
}
