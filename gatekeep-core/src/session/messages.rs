use std::fmt;

use gatekeep_model::{AttendeeId, AttendeeRecord, Gate, GateScope, QueueKind};

use crate::error::ErrorKind;
use crate::mutation::{BulkReport, MutationKind};
use crate::queue::Pagination;

/// Messages accepted by a [`GateSession`](super::GateSession).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GateCommand {
    /// Reload the current page (re-running the search when one is active).
    Refresh,
    FetchPage(u32),
    /// Debounced; an empty query returns to plain paging.
    SetQuery(String),
    SwitchQueue(QueueKind),
    SwitchGate(Gate),
    Toggle(AttendeeId),
    SelectAll,
    ClearSelection,
    CheckIn(AttendeeId),
    CheckOut(AttendeeId),
    /// Run the mutation matching the displayed queue over the selection.
    BulkMutate,
    StartScan,
    StopScan,
    Shutdown,
}

/// Events emitted by a [`GateSession`](super::GateSession).
#[derive(Clone, Debug)]
pub enum GateEvent {
    QueueUpdated(QueueSnapshot),
    SelectionChanged(Vec<AttendeeId>),
    MutationApplied {
        id: AttendeeId,
        kind: MutationKind,
    },
    /// A request for the attendee was already in flight.
    MutationIgnored {
        id: AttendeeId,
    },
    MutationFailed {
        id: AttendeeId,
        kind: MutationKind,
        notice: Notice,
    },
    BulkCompleted(BulkReport),
    ScanStarted,
    ScanStopped,
    ScanRejected {
        code: String,
    },
    BadgeCount(u64),
    Notice(Notice),
    Closed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Something the operator should see, already phrased for display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub kind: Option<ErrorKind>,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            kind: None,
            message: message.into(),
        }
    }

    /// Warning-level notice for a failure of the given kind.
    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        let level = match kind {
            ErrorKind::NotFound | ErrorKind::Validation => NoticeLevel::Warning,
            ErrorKind::Network | ErrorKind::Server | ErrorKind::Device => {
                NoticeLevel::Error
            }
        };
        Self {
            level,
            kind: Some(kind),
            message: message.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// What the queue looks like after a change, ready to render.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub scope: GateScope,
    pub kind: QueueKind,
    pub query: Option<String>,
    pub records: Vec<AttendeeRecord>,
    pub pagination: Pagination,
    /// Ids on this page with a request in flight.
    pub pending: Vec<AttendeeId>,
}

impl QueueSnapshot {
    pub fn ids(&self) -> impl Iterator<Item = &AttendeeId> {
        self.records.iter().map(|record| &record.id)
    }
}
