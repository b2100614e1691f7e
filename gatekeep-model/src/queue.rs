use std::fmt;

use crate::attendee::AttendeeRecord;
use crate::gate::GateScope;

/// The two mutually exclusive partitions of a gate's roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum QueueKind {
    NeedsCheckIn,
    NeedsCheckOut,
}

impl QueueKind {
    /// Queue membership predicate.
    ///
    /// Membership hinges on the check-in timestamp, so for any record and
    /// scope at most one kind admits it.
    pub fn admits(self, record: &AttendeeRecord, scope: &GateScope) -> bool {
        if record.event_id != scope.event_id {
            return false;
        }

        match self {
            QueueKind::NeedsCheckIn => !record.is_checked_in(),
            QueueKind::NeedsCheckOut => {
                record.is_checked_in()
                    && match (&scope.session_area_id, &record.session_area_id)
                    {
                        (Some(wanted), Some(actual)) => wanted == actual,
                        _ => true,
                    }
            }
        }
    }
}

impl fmt::Display for QueueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueKind::NeedsCheckIn => f.write_str("needs check-in"),
            QueueKind::NeedsCheckOut => f.write_str("needs check-out"),
        }
    }
}
