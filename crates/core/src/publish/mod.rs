//! Publish state machine.
//!
//! Publishing a document is a guarded transition run by the [`Committer`]:
//! strategy checks decide whether the transition may happen, the
//! [`PublishIntent`] command describes what changes, and the repository
//! persists the settled outcome. Expected refusals come back as failed
//! [`PublishResult`] values; only broken preconditions are errors.

mod branch;
mod intent;
mod result;
mod state_machine;

pub use branch::{publish_branch_locked, BranchFilter};
pub use intent::{IntentAction, PublishIntent};
pub use result::{OperationResult, PublishResult, PublishResultType};
pub use state_machine::{CommitContext, Committer};
