use std::{collections::HashMap, fmt, sync::Arc};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::trace;

use gatekeep_model::{AttendeeId, QueueKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    CheckIn,
    CheckOut,
}

impl MutationKind {
    /// The mutation that moves an attendee out of `queue`.
    pub fn leaving(queue: QueueKind) -> Self {
        match queue {
            QueueKind::NeedsCheckIn => MutationKind::CheckIn,
            QueueKind::NeedsCheckOut => MutationKind::CheckOut,
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationKind::CheckIn => f.write_str("check-in"),
            MutationKind::CheckOut => f.write_str("check-out"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMutation {
    pub attendee_id: AttendeeId,
    pub kind: MutationKind,
    pub started_at: DateTime<Utc>,
}

/// Per-attendee lock table. At most one entry exists per id; the entry
/// lives exactly as long as the [`MutationGuard`] that created it.
#[derive(Debug, Clone, Default)]
pub struct PendingMutations {
    inner: Arc<Mutex<HashMap<AttendeeId, PendingMutation>>>,
}

impl PendingMutations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lock for `id`, or `None` when a request for it is already
    /// in flight.
    pub fn try_acquire(
        &self,
        id: &AttendeeId,
        kind: MutationKind,
    ) -> Option<MutationGuard> {
        let mut table = self.inner.lock();
        if table.contains_key(id) {
            return None;
        }
        table.insert(
            id.clone(),
            PendingMutation {
                attendee_id: id.clone(),
                kind,
                started_at: Utc::now(),
            },
        );
        trace!(target: "gate::mutation", attendee = %id, %kind, "lock acquired");

        Some(MutationGuard {
            table: self.clone(),
            id: id.clone(),
        })
    }

    pub fn is_pending(&self, id: &AttendeeId) -> bool {
        self.inner.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn snapshot(&self) -> Vec<PendingMutation> {
        self.inner.lock().values().cloned().collect()
    }
}

/// Scoped ownership of one attendee's lock. Dropping it, on any path,
/// removes the table entry.
#[derive(Debug)]
pub struct MutationGuard {
    table: PendingMutations,
    id: AttendeeId,
}

impl MutationGuard {
    pub fn attendee_id(&self) -> &AttendeeId {
        &self.id
    }
}

impl Drop for MutationGuard {
    fn drop(&mut self) {
        self.table.inner.lock().remove(&self.id);
        trace!(target: "gate::mutation", attendee = %self.id, "lock released");
    }
}
