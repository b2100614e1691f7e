use chrono::{DateTime, Utc};

use crate::ids::{AttendeeId, CheckOutStatusId, EventId, SessionAreaId};

/// Locally cached copy of a registered attendee.
///
/// The roster service owns these records; the station only re-classifies
/// them (needs check-in, needs check-out, done) and never creates or deletes
/// them.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttendeeRecord {
    pub id: AttendeeId,
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub email: String,
    #[cfg_attr(
        feature = "serde",
        serde(default, alias = "phoneNumber", alias = "phone_number")
    )]
    pub phone: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub organization: Option<String>,
    #[cfg_attr(
        feature = "serde",
        serde(default, alias = "userType", alias = "type")
    )]
    pub user_type: Option<String>,
    #[cfg_attr(
        feature = "serde",
        serde(
            default,
            alias = "checkInTimestamp",
            alias = "check_in_timestamp",
            alias = "checked_in_at"
        )
    )]
    pub check_in_at: Option<DateTime<Utc>>,
    #[cfg_attr(
        feature = "serde",
        serde(default, alias = "checkOutStatusId")
    )]
    pub check_out_status_id: Option<CheckOutStatusId>,
    #[cfg_attr(feature = "serde", serde(alias = "eventId"))]
    pub event_id: EventId,
    #[cfg_attr(
        feature = "serde",
        serde(default, alias = "sessionAreaId")
    )]
    pub session_area_id: Option<SessionAreaId>,
}

impl AttendeeRecord {
    /// Minimal record used by fixtures and the demo roster.
    pub fn new(
        id: impl Into<AttendeeId>,
        event_id: impl Into<EventId>,
        name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            phone: None,
            organization: None,
            user_type: None,
            check_in_at: None,
            check_out_status_id: None,
            event_id: event_id.into(),
            session_area_id: None,
        }
    }

    pub fn is_checked_in(&self) -> bool {
        self.check_in_at.is_some()
    }

    /// Case-insensitive substring match over name, email, organization and
    /// phone number. `needle` must already be lowercased; an empty needle
    /// matches everything.
    pub fn matches_lowercase(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }

        let contains = |field: &str| field.to_lowercase().contains(needle);

        contains(&self.name)
            || contains(&self.email)
            || self.organization.as_deref().is_some_and(contains)
            || self.phone.as_deref().is_some_and(contains)
    }
}
