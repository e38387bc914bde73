//! Host configuration of the hook pipeline and the execution plan built from it.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::Stage;

/// `[hooks]` section of the settings.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct HooksConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Execution plan per stage; stages without an entry run no hooks.
    #[serde(default)]
    pub plan: BTreeMap<Stage, StagePlanConfig>,
}

impl Default for HooksConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            plan: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StagePlanConfig {
    #[serde(default)]
    pub groups: Vec<GroupConfig>,
}

/// Hooks that run together, sharing one timeout.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GroupConfig {
    #[serde(default = "default_group_timeout_ms")]
    pub timeout_ms: u64,
    pub hooks: Vec<String>,
}

fn default_enabled() -> bool {
    true
}

fn default_group_timeout_ms() -> u64 {
    100
}

/// One group of an execution plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionGroup {
    pub timeout: Duration,
    pub hook_codes: Vec<String>,
}

/// Which hooks run at each stage and how they are grouped.
///
/// Groups of a stage run one after another, as do the hooks inside a group.
/// The group timeout bounds each of its hooks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionPlan {
    stages: BTreeMap<Stage, Vec<ExecutionGroup>>,
}

impl ExecutionPlan {
    /// A plan that runs nothing anywhere.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_config(config: &HooksConfig) -> Self {
        if !config.enabled {
            log::info!("Hooks are disabled, using an empty execution plan");
            return Self::empty();
        }

        let stages = config
            .plan
            .iter()
            .map(|(stage, plan)| {
                let groups = plan
                    .groups
                    .iter()
                    .filter(|group| !group.hooks.is_empty())
                    .map(|group| ExecutionGroup {
                        timeout: Duration::from_millis(group.timeout_ms),
                        hook_codes: group.hooks.clone(),
                    })
                    .collect();
                (*stage, groups)
            })
            .collect();

        Self { stages }
    }

    /// Append a group to `stage`.
    #[must_use]
    pub fn with_group(mut self, stage: Stage, timeout: Duration, hook_codes: &[&str]) -> Self {
        self.stages.entry(stage).or_default().push(ExecutionGroup {
            timeout,
            hook_codes: hook_codes.iter().map(|code| (*code).to_string()).collect(),
        });
        self
    }

    #[must_use]
    pub fn groups(&self, stage: Stage) -> &[ExecutionGroup] {
        self.stages
            .get(&stage)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.values().all(Vec::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::tests::create_test_settings;

    #[test]
    fn builds_plan_from_settings() {
        let settings = create_test_settings();
        let plan = ExecutionPlan::from_config(&settings.hooks);

        let groups = plan.groups(Stage::ProcessedAuctionRequest);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].timeout, Duration::from_millis(20));
        assert_eq!(groups[0].hook_codes, vec!["test-module.passthrough"]);
        assert!(plan.groups(Stage::Exitpoint).is_empty());
    }

    #[test]
    fn disabled_hooks_yield_empty_plan() {
        let mut config = create_test_settings().hooks;
        config.enabled = false;
        assert!(ExecutionPlan::from_config(&config).is_empty());
    }

    #[test]
    fn group_timeout_has_a_default() {
        let group: GroupConfig =
            serde_json::from_value(serde_json::json!({"hooks": ["a.b"]})).expect("should parse");
        assert_eq!(group.timeout_ms, 100);
    }
}
