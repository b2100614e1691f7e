use std::fmt;

use futures::future::join_all;
use tracing::{info, warn};

use gatekeep_model::{AttendeeId, GateScope};

use crate::error::{MutationError, RosterError};
use crate::queue::{QueueView, SelectionSet};

use super::coordinator::{MutationCoordinator, MutationOutcome, MutationRequest};
use super::lock::{MutationGuard, MutationKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkFailure {
    pub id: AttendeeId,
    pub error: MutationError,
}

/// Aggregate result of one bulk run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkReport {
    pub kind: MutationKind,
    pub scope: GateScope,
    pub succeeded: Vec<AttendeeId>,
    pub failed: Vec<BulkFailure>,
}

impl BulkReport {
    pub fn failed_ids(&self) -> impl Iterator<Item = &AttendeeId> {
        self.failed.iter().map(|failure| &failure.id)
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// One line for the operator, e.g. `3 succeeded, 2 failed`.
    pub fn summary(&self) -> String {
        format!(
            "{} succeeded, {} failed",
            self.succeeded.len(),
            self.failed.len()
        )
    }

    /// Remove the successes from the view and leave exactly the failures
    /// selected. Rows are only removed while the view still shows the queue
    /// and scope the run was planned against.
    pub fn apply(&self, view: &mut QueueView, selection: &mut SelectionSet) {
        if MutationKind::leaving(view.kind()) == self.kind
            && view.scope() == &self.scope
        {
            for id in &self.succeeded {
                view.apply_optimistic_removal(id);
            }
        }
        selection.retain_only(self.failed_ids(), view);
    }
}

impl fmt::Display for BulkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bulk {}: {}", self.kind, self.summary())
    }
}

/// Work for one bulk run, built against the view the operator is looking
/// at. Ids that cannot be sent are already failed here.
#[derive(Debug, Clone)]
pub struct BulkPlan {
    pub kind: MutationKind,
    pub scope: GateScope,
    pub requests: Vec<MutationRequest>,
    pub rejected: Vec<BulkFailure>,
}

impl BulkPlan {
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty() && self.rejected.is_empty()
    }
}

/// Fans one operator action out over a set of attendees with settle-all
/// semantics: one id failing never cancels or blocks another.
#[derive(Debug, Clone)]
pub struct BulkOperationExecutor {
    coordinator: MutationCoordinator,
    batched_check_in: bool,
}

impl BulkOperationExecutor {
    pub fn new(coordinator: MutationCoordinator, batched_check_in: bool) -> Self {
        Self {
            coordinator,
            batched_check_in,
        }
    }

    /// The mutation follows the queue `view` shows. Ids that are not on the
    /// loaded page are failed with [`MutationError::NotInQueue`].
    pub fn plan<'a>(
        ids: impl IntoIterator<Item = &'a AttendeeId>,
        view: &QueueView,
    ) -> BulkPlan {
        let scope = view.scope().clone();
        let mut requests = Vec::new();
        let mut rejected = Vec::new();

        for id in ids {
            match view.find(id) {
                Some(record) => requests.push(MutationRequest::for_queue(
                    record.clone(),
                    view.kind(),
                    scope.clone(),
                )),
                None => rejected.push(BulkFailure {
                    id: id.clone(),
                    error: MutationError::NotInQueue(id.clone()),
                }),
            }
        }

        BulkPlan {
            kind: MutationKind::leaving(view.kind()),
            scope,
            requests,
            rejected,
        }
    }

    pub async fn run_bulk<'a>(
        &self,
        ids: impl IntoIterator<Item = &'a AttendeeId>,
        view: &QueueView,
    ) -> BulkReport {
        self.execute(Self::plan(ids, view)).await
    }

    pub async fn execute(&self, plan: BulkPlan) -> BulkReport {
        let mut report = BulkReport {
            kind: plan.kind,
            scope: plan.scope.clone(),
            succeeded: Vec::new(),
            failed: plan.rejected,
        };

        // Every lock is taken before the first request goes out, so ids
        // already claimed by a single mutation are reported, not raced.
        let mut locked = Vec::new();
        for request in plan.requests {
            match self.coordinator.begin(&request) {
                Ok(Some(guard)) => locked.push((guard, request)),
                Ok(None) => report.failed.push(BulkFailure {
                    id: request.attendee.id.clone(),
                    error: MutationError::AlreadyPending(request.attendee.id),
                }),
                Err(error) => report.failed.push(BulkFailure {
                    id: request.attendee.id,
                    error,
                }),
            }
        }

        if plan.kind == MutationKind::CheckIn
            && self.batched_check_in
            && locked.len() > 1
        {
            locked = self
                .batched(&plan.scope, locked, &mut report)
                .await
                .unwrap_or_default();
        }

        let results =
            join_all(locked.into_iter().map(|(guard, request)| async move {
                let result = self.coordinator.execute(guard, &request).await;
                (request, result)
            }))
            .await;

        for (request, result) in results {
            match result {
                Ok(MutationOutcome::Applied) => {
                    report.succeeded.push(request.attendee.id)
                }
                Ok(MutationOutcome::Ignored) => report.failed.push(BulkFailure {
                    id: request.attendee.id.clone(),
                    error: MutationError::AlreadyPending(request.attendee.id),
                }),
                Err(error) => report.failed.push(BulkFailure {
                    id: request.attendee.id,
                    error,
                }),
            }
        }

        if report.is_clean() {
            info!(
                target: "gate::bulk",
                kind = %report.kind,
                succeeded = report.succeeded.len(),
                "bulk run complete"
            );
        } else {
            warn!(
                target: "gate::bulk",
                kind = %report.kind,
                succeeded = report.succeeded.len(),
                failed = report.failed.len(),
                "bulk run partially failed"
            );
        }
        report
    }

    /// Try the batched endpoint. It is all-or-nothing, so when the server
    /// rejects the batch the locked requests are handed back to be sent one
    /// by one, which tells the operator exactly which ids are at fault.
    /// Transport failures fail the whole batch.
    async fn batched(
        &self,
        scope: &GateScope,
        locked: Vec<(MutationGuard, MutationRequest)>,
        report: &mut BulkReport,
    ) -> Option<Vec<(MutationGuard, MutationRequest)>> {
        let ids = locked
            .iter()
            .map(|(_, request)| request.attendee.id.clone())
            .collect::<Vec<_>>();

        match self
            .coordinator
            .source()
            .bulk_check_in(&scope.event_id, &ids)
            .await
        {
            Ok(()) => {
                drop(locked);
                report.succeeded.extend(ids);
                None
            }
            Err(err @ RosterError::Server { .. }) => {
                warn!(
                    target: "gate::bulk",
                    error = %err,
                    count = ids.len(),
                    "batched check-in rejected; retrying per attendee"
                );
                Some(locked)
            }
            Err(err) => {
                warn!(target: "gate::bulk", error = %err, "batched check-in failed");
                for (_guard, request) in locked {
                    report.failed.push(BulkFailure {
                        id: request.attendee.id,
                        error: err.clone().into(),
                    });
                }
                None
            }
        }
    }
}
