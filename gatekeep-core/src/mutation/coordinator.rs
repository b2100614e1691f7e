use std::sync::Arc;

use tracing::{debug, info, warn};

use gatekeep_model::{
    AttendeeId, AttendeeRecord, CheckOutStatusId, GateScope, QueueKind,
    SessionAreaId,
};

use crate::error::MutationError;
use crate::queue::{QueueView, SelectionSet};
use crate::roster::RosterSource;

use super::lock::{MutationGuard, MutationKind, PendingMutations};

/// What happened to a mutation request that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The server accepted the change.
    Applied,
    /// A request for the same attendee was already in flight; nothing was
    /// sent.
    Ignored,
}

/// One check-in or check-out, with everything needed to send it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRequest {
    pub attendee: AttendeeRecord,
    pub kind: MutationKind,
    pub scope: GateScope,
}

impl MutationRequest {
    /// The mutation that moves `record` out of `queue`.
    pub fn for_queue(
        record: AttendeeRecord,
        queue: QueueKind,
        scope: GateScope,
    ) -> Self {
        Self {
            attendee: record,
            kind: MutationKind::leaving(queue),
            scope,
        }
    }

    pub fn attendee_id(&self) -> &AttendeeId {
        &self.attendee.id
    }

    /// Whether `view` shows the queue this request moves the attendee out
    /// of.
    pub fn leaves(&self, view: &QueueView) -> bool {
        MutationKind::leaving(view.kind()) == self.kind
            && view.scope() == &self.scope
    }

    fn check_out_target(
        &self,
    ) -> Result<(SessionAreaId, CheckOutStatusId), MutationError> {
        let status = self
            .attendee
            .check_out_status_id
            .clone()
            .ok_or_else(|| {
                MutationError::MissingCheckOutStatus(self.attendee.id.clone())
            })?;
        let area = self
            .scope
            .session_area_id
            .clone()
            .or_else(|| self.attendee.session_area_id.clone())
            .ok_or(MutationError::MissingSessionArea)?;
        Ok((area, status))
    }
}

/// Result of folding a finished mutation into local state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Settled {
    pub view_changed: bool,
    pub selection_changed: bool,
}

/// Serializes state-changing requests per attendee.
///
/// A request for an attendee that already has one in flight is dropped, not
/// queued. The lock is held by a [`MutationGuard`] so it is released on
/// every exit path, including cancellation of the request future.
#[derive(Debug, Clone)]
pub struct MutationCoordinator {
    source: Arc<dyn RosterSource>,
    pending: PendingMutations,
}

impl MutationCoordinator {
    pub fn new(source: Arc<dyn RosterSource>) -> Self {
        Self {
            source,
            pending: PendingMutations::new(),
        }
    }

    pub fn pending(&self) -> &PendingMutations {
        &self.pending
    }

    pub fn source(&self) -> &Arc<dyn RosterSource> {
        &self.source
    }

    pub async fn check_in(
        &self,
        record: AttendeeRecord,
        scope: GateScope,
    ) -> Result<MutationOutcome, MutationError> {
        self.run(MutationRequest {
            attendee: record,
            kind: MutationKind::CheckIn,
            scope,
        })
        .await
    }

    pub async fn check_out(
        &self,
        record: AttendeeRecord,
        scope: GateScope,
    ) -> Result<MutationOutcome, MutationError> {
        self.run(MutationRequest {
            attendee: record,
            kind: MutationKind::CheckOut,
            scope,
        })
        .await
    }

    /// Validate and lock in one step, then send.
    pub async fn run(
        &self,
        request: MutationRequest,
    ) -> Result<MutationOutcome, MutationError> {
        match self.begin(&request)? {
            Some(guard) => self.execute(guard, &request).await,
            None => Ok(MutationOutcome::Ignored),
        }
    }

    /// Synchronous half of [`MutationCoordinator::run`]: reject requests
    /// that cannot be sent and take the attendee's lock. `Ok(None)` means a
    /// request for the attendee is already in flight.
    pub fn begin(
        &self,
        request: &MutationRequest,
    ) -> Result<Option<MutationGuard>, MutationError> {
        if request.kind == MutationKind::CheckOut {
            request.check_out_target()?;
        }

        let guard = self.pending.try_acquire(request.attendee_id(), request.kind);
        if guard.is_none() {
            debug!(
                target: "gate::mutation",
                attendee = %request.attendee_id(),
                kind = %request.kind,
                "request already in flight; ignoring"
            );
        }
        Ok(guard)
    }

    /// Send a request whose lock is already held.
    pub async fn execute(
        &self,
        guard: MutationGuard,
        request: &MutationRequest,
    ) -> Result<MutationOutcome, MutationError> {
        let event = &request.scope.event_id;
        let id = request.attendee_id();

        let result = match request.kind {
            MutationKind::CheckIn => self.source.check_in(event, id).await,
            MutationKind::CheckOut => {
                let (area, status) = request.check_out_target()?;
                self.source.check_out(event, &area, id, &status).await
            }
        };

        match result {
            Ok(()) => {
                info!(
                    target: "gate::mutation",
                    attendee = %id,
                    kind = %request.kind,
                    "mutation applied"
                );
                drop(guard);
                Ok(MutationOutcome::Applied)
            }
            Err(err) => {
                warn!(
                    target: "gate::mutation",
                    attendee = %id,
                    kind = %request.kind,
                    error = %err,
                    "mutation failed"
                );
                drop(guard);
                Err(err.into())
            }
        }
    }

    /// Fold a finished mutation into the view and selection. Success removes
    /// the attendee from the queue; failure leaves it where it is. A view
    /// that has since switched to another queue or scope is not touched.
    pub fn settle(
        view: &mut QueueView,
        selection: &mut SelectionSet,
        request: &MutationRequest,
        result: &Result<MutationOutcome, MutationError>,
    ) -> Settled {
        if !request.leaves(view) {
            return Settled::default();
        }
        let view_changed = match result {
            Ok(MutationOutcome::Applied) => {
                view.apply_optimistic_removal(request.attendee_id())
            }
            Ok(MutationOutcome::Ignored) => false,
            Err(_) => view.apply_optimistic_restore(request.attendee.clone()),
        };
        Settled {
            view_changed,
            selection_changed: selection.prune(view),
        }
    }
}
