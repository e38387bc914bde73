use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use error_stack::Report;

use super::invocation::{Hook, HookError};
use super::payload::StagePayload;
use super::Stage;

type ErasedHook = Box<dyn Any + Send + Sync>;

/// Registry of hook implementations keyed by stage and hook code.
///
/// Hooks for different stages take different payload types, so entries are
/// stored type-erased and recovered by downcasting on lookup.
#[derive(Default)]
pub struct HookCatalog {
    hooks: HashMap<(Stage, String), ErasedHook>,
}

impl HookCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `hook` for `stage` under its own code.
    ///
    /// A hook registered twice for the same stage replaces the earlier one.
    ///
    /// # Errors
    ///
    /// Returns [`HookError::StageMismatch`] when `P` is not the payload of `stage`.
    pub fn register<P: StagePayload>(
        &mut self,
        stage: Stage,
        hook: Arc<dyn Hook<P>>,
    ) -> Result<(), Report<HookError>> {
        let code = hook.code().to_string();
        if !P::STAGES.contains(&stage) {
            return Err(Report::new(HookError::StageMismatch {
                hook_id: code,
                stage,
            }));
        }

        log::info!("Registering hook '{}' for stage {}", code, stage);
        self.hooks.insert((stage, code), Box::new(hook));
        Ok(())
    }

    /// Look up the hook registered for `stage` under `code`.
    #[must_use]
    pub fn hook<P: StagePayload>(&self, stage: Stage, code: &str) -> Option<Arc<dyn Hook<P>>> {
        self.hooks
            .get(&(stage, code.to_string()))
            .and_then(|hook| hook.downcast_ref::<Arc<dyn Hook<P>>>())
            .cloned()
    }

    #[must_use]
    pub fn contains(&self, stage: Stage, code: &str) -> bool {
        self.hooks.contains_key(&(stage, code.to_string()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::{
        AuctionRequestPayload, ExitpointPayload, InvocationContext, InvocationResult,
    };
    use async_trait::async_trait;

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
            Ok(InvocationResult::no_action())
        }
    }

    #[test]
    fn lookup_is_typed_by_stage_payload() {
        let mut catalog = HookCatalog::new();
        catalog
            .register::<AuctionRequestPayload>(Stage::ProcessedAuctionRequest, Arc::new(Passthrough))
            .expect("should register");

        assert!(catalog.contains(Stage::ProcessedAuctionRequest, "test-module.passthrough"));
        assert!(catalog
            .hook::<AuctionRequestPayload>(Stage::ProcessedAuctionRequest, "test-module.passthrough")
            .is_some());
        assert!(catalog
            .hook::<ExitpointPayload>(Stage::ProcessedAuctionRequest, "test-module.passthrough")
            .is_none());
        assert!(catalog
            .hook::<AuctionRequestPayload>(Stage::RawAuctionRequest, "test-module.passthrough")
            .is_none());
    }

    #[test]
    fn rejects_registration_for_foreign_stage() {
        let mut catalog = HookCatalog::new();
        let err = catalog
            .register::<AuctionRequestPayload>(Stage::Exitpoint, Arc::new(Passthrough))
            .expect_err("payload does not belong to exitpoint");

        assert!(matches!(
            err.current_context(),
            HookError::StageMismatch {
                stage: Stage::Exitpoint,
                ..
            }
        ));
        assert!(catalog.is_empty());
    }
}
