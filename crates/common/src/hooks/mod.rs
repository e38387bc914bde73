//! Staged hook pipeline.
//!
//! External modules register [`Hook`] implementations in a [`HookCatalog`].
//! The host's [`ExecutionPlan`] decides which hooks run at each [`Stage`] and
//! how they are grouped, and the [`HookExecutor`] runs them, collecting a
//! [`HookExecutionContext`] trace along the way.
//!
//! Hooks never touch the payload directly: they return an
//! [`InvocationResult`] whose action is applied by the executor. A hook that
//! times out, errors or panics only leaves a warning in the trace. A hook
//! that rejects ends the whole pipeline invocation.

mod catalog;
mod config;
mod executor;
mod invocation;
mod payload;
mod stage;
mod trace;

pub use catalog::HookCatalog;
pub use config::{ExecutionGroup, ExecutionPlan, GroupConfig, HooksConfig, StagePlanConfig};
pub use executor::{ExecutionScope, HookExecutor, Rejection, StageResult};
pub use invocation::{
    ActionKind, Hook, HookError, InvocationAction, InvocationContext, InvocationResult,
    InvocationStatus, PayloadUpdate,
};
pub use payload::{
    AllBidResponsesPayload, AuctionRequestPayload, AuctionResponsePayload, BidderRequestPayload,
    BidderResponsePayload, EntrypointPayload, ExitpointPayload, StagePayload,
};
pub use stage::Stage;
pub use trace::{ExecutionStatus, GroupOutcome, HookExecutionContext, HookOutcome, StageOutcome};
