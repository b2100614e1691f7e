//! Core data model definitions shared across Gatekeep crates.
#![allow(missing_docs)]

pub mod attendee;
pub mod gate;
pub mod ids;
pub mod page;
pub mod prelude;
pub mod queue;

// Intentionally curated re-exports for downstream consumers.
pub use attendee::AttendeeRecord;
pub use gate::{Gate, GateScope, ScopeKind, SessionArea};
pub use ids::{
    AgendaId, AttendeeId, CheckOutStatusId, EventId, GateId, SessionAreaId,
};
pub use page::{Page, PageRequest};
pub use queue::QueueKind;
