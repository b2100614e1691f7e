//! Station focused snapshot of the types surface.
//! Prefer importing from this module when wiring sessions or presentation
//! layers instead of reaching into individual modules.

pub use super::attendee::AttendeeRecord;
pub use super::gate::{Gate, GateScope, ScopeKind, SessionArea};
pub use super::ids::{
    AgendaId, AttendeeId, CheckOutStatusId, EventId, GateId, SessionAreaId,
};
pub use super::page::{Page, PageRequest};
pub use super::queue::QueueKind;
