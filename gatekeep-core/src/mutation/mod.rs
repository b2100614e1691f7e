//! Per-attendee state changes: the lock table, single mutations and bulk
//! runs.

pub mod bulk;
pub mod coordinator;
pub mod lock;

pub use bulk::{BulkFailure, BulkOperationExecutor, BulkPlan, BulkReport};
pub use coordinator::{
    MutationCoordinator, MutationOutcome, MutationRequest, Settled,
};
pub use lock::{
    MutationGuard, MutationKind, PendingMutation, PendingMutations,
};
