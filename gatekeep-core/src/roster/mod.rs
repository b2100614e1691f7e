//! Access to the remote attendee roster.
//!
//! [`RosterSource`] is the one seam between the coordinator and the roster
//! service. [`HttpRosterClient`] talks to the real service;
//! [`InMemoryRoster`] backs the demo station and the test-suite.

pub mod http;
pub mod memory;
pub mod search;

use std::fmt::Debug;

use async_trait::async_trait;

use gatekeep_model::{
    AttendeeId, AttendeeRecord, CheckOutStatusId, EventId, GateScope, Page,
    PageRequest, QueueKind, SessionAreaId,
};

use crate::error::RosterResult;

pub use http::HttpRosterClient;
pub use memory::InMemoryRoster;
pub use search::SearchAggregator;

#[async_trait]
pub trait RosterSource: Send + Sync + Debug {
    /// Fetch one page of a queue. Check-out queues are area scoped, so
    /// `NeedsCheckOut` fails with `MissingSessionArea` when `scope` has no
    /// area.
    async fn fetch_page(
        &self,
        scope: &GateScope,
        kind: QueueKind,
        request: PageRequest,
    ) -> RosterResult<Page<AttendeeRecord>>;

    async fn check_in(
        &self,
        event: &EventId,
        attendee: &AttendeeId,
    ) -> RosterResult<()>;

    async fn check_out(
        &self,
        event: &EventId,
        area: &SessionAreaId,
        attendee: &AttendeeId,
        status: &CheckOutStatusId,
    ) -> RosterResult<()>;

    /// Batched check-in. The service applies it all-or-nothing.
    async fn bulk_check_in(
        &self,
        event: &EventId,
        attendees: &[AttendeeId],
    ) -> RosterResult<()>;
}
