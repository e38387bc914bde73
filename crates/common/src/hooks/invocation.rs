//! The contract between the executor and a single hook.

use std::fmt;

use async_trait::async_trait;
use derive_more::{Display, Error};
use error_stack::Report;
use serde::{Deserialize, Serialize};

use super::payload::StagePayload;
use super::Stage;

/// Failure raised by a hook implementation.
#[derive(Debug, Display, Error)]
pub enum HookError {
    #[display("Hook '{hook_id}' failed: {message}")]
    Execution { hook_id: String, message: String },

    #[display("Hook '{hook_id}' cannot run at stage {stage}")]
    StageMismatch { hook_id: String, stage: Stage },
}

/// Read-only facts about the invocation a hook runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationContext {
    pub stage: Stage,
    pub account_id: Option<String>,
    pub debug: bool,
}

/// Whether the hook itself considers its run successful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationStatus {
    Success,
    Failure,
}

/// A deferred change to a stage payload.
///
/// Hooks never mutate the payload they are shown. They return an update and
/// the executor applies it once every hook of the group has finished.
pub struct PayloadUpdate<P>(Box<dyn FnOnce(P) -> P + Send>);

impl<P> PayloadUpdate<P> {
    pub fn new<F>(update: F) -> Self
    where
        F: FnOnce(P) -> P + Send + 'static,
    {
        Self(Box::new(update))
    }

    #[must_use]
    pub fn apply(self, payload: P) -> P {
        (self.0)(payload)
    }
}

impl<P> fmt::Debug for PayloadUpdate<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PayloadUpdate")
    }
}

/// What the hook asks the executor to do.
#[derive(Debug)]
pub enum InvocationAction<P> {
    NoAction,
    Update(PayloadUpdate<P>),
    /// Stop the stage and the whole pipeline invocation.
    Reject,
}

impl<P> InvocationAction<P> {
    #[must_use]
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::NoAction => ActionKind::NoAction,
            Self::Update(_) => ActionKind::Update,
            Self::Reject => ActionKind::Reject,
        }
    }
}

/// Payload-free tag of an [`InvocationAction`], as recorded in the trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    NoAction,
    Update,
    Reject,
}

/// Everything a hook reports back from one run.
#[derive(Debug)]
pub struct InvocationResult<P> {
    pub status: InvocationStatus,
    pub action: InvocationAction<P>,
    pub message: Option<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub debug_messages: Vec<String>,
}

impl<P> InvocationResult<P> {
    fn with_action(status: InvocationStatus, action: InvocationAction<P>) -> Self {
        Self {
            status,
            action,
            message: None,
            warnings: Vec::new(),
            errors: Vec::new(),
            debug_messages: Vec::new(),
        }
    }

    #[must_use]
    pub fn no_action() -> Self {
        Self::with_action(InvocationStatus::Success, InvocationAction::NoAction)
    }

    pub fn update<F>(update: F) -> Self
    where
        F: FnOnce(P) -> P + Send + 'static,
    {
        Self::with_action(
            InvocationStatus::Success,
            InvocationAction::Update(PayloadUpdate::new(update)),
        )
    }

    pub fn reject(message: impl Into<String>) -> Self {
        Self::with_action(InvocationStatus::Success, InvocationAction::Reject).with_message(message)
    }

    /// The hook ran but could not do its job; the pipeline carries on.
    pub fn failure(message: impl Into<String>) -> Self {
        Self::with_action(InvocationStatus::Failure, InvocationAction::NoAction)
            .with_message(message)
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    #[must_use]
    pub fn with_debug_message(mut self, message: impl Into<String>) -> Self {
        self.debug_messages.push(message.into());
        self
    }
}

/// An extension hook for the stages carrying payload `P`.
#[async_trait]
pub trait Hook<P: StagePayload>: Send + Sync {
    /// Identifier used in execution plans and traces, e.g. `"my-module.my-hook"`.
    fn code(&self) -> &str;

    /// Inspect `payload` and decide what should happen to it.
    ///
    /// # Errors
    ///
    /// An error is recorded in the trace as an execution failure and the
    /// pipeline continues without this hook's change.
    async fn call(
        &self,
        payload: &P,
        context: &InvocationContext,
    ) -> Result<InvocationResult<P>, Report<HookError>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::AuctionRequestPayload;

    #[test]
    fn update_applies_to_the_payload() {
        let result = InvocationResult::<AuctionRequestPayload>::update(|mut payload| {
            payload.bid_request.id = "changed".into();
            payload
        });
        assert_eq!(result.action.kind(), ActionKind::Update);

        let InvocationAction::Update(update) = result.action else {
            unreachable!("constructed as an update");
        };
        let payload = update.apply(AuctionRequestPayload::default());
        assert_eq!(payload.bid_request.id, "changed");
    }

    #[test]
    fn reject_carries_message() {
        let result = InvocationResult::<AuctionRequestPayload>::reject("blocked");
        assert_eq!(result.action.kind(), ActionKind::Reject);
        assert_eq!(result.message.as_deref(), Some("blocked"));
        assert_eq!(result.status, InvocationStatus::Success);
    }

    #[test]
    fn failure_never_acts() {
        let result = InvocationResult::<AuctionRequestPayload>::failure("no data");
        assert_eq!(result.status, InvocationStatus::Failure);
        assert_eq!(result.action.kind(), ActionKind::NoAction);
    }
}
