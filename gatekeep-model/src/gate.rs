use crate::ids::{AgendaId, EventId, GateId, SessionAreaId};

/// Whether a gate admits attendees for a whole event or for one area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum ScopeKind {
    Event,
    Area,
}

/// A physical or logical entry point. Gates are created and deleted through
/// the roster service and are otherwise immutable.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Gate {
    pub id: GateId,
    #[cfg_attr(feature = "serde", serde(alias = "eventId"))]
    pub event_id: EventId,
    #[cfg_attr(
        feature = "serde",
        serde(default, alias = "sessionAreaId")
    )]
    pub session_area_id: Option<SessionAreaId>,
    #[cfg_attr(feature = "serde", serde(default, alias = "agendaId"))]
    pub agenda_id: Option<AgendaId>,
    #[cfg_attr(
        feature = "serde",
        serde(default, alias = "share_url", alias = "shareUrl")
    )]
    pub url: Option<String>,
}

impl Gate {
    pub fn scope_kind(&self) -> ScopeKind {
        if self.session_area_id.is_some() {
            ScopeKind::Area
        } else {
            ScopeKind::Event
        }
    }

    pub fn scope(&self) -> GateScope {
        GateScope {
            event_id: self.event_id.clone(),
            session_area_id: self.session_area_id.clone(),
        }
    }
}

/// The slice of the roster a gate operates on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GateScope {
    pub event_id: EventId,
    pub session_area_id: Option<SessionAreaId>,
}

impl GateScope {
    pub fn event(event_id: impl Into<EventId>) -> Self {
        Self {
            event_id: event_id.into(),
            session_area_id: None,
        }
    }

    pub fn area(
        event_id: impl Into<EventId>,
        area: impl Into<SessionAreaId>,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            session_area_id: Some(area.into()),
        }
    }

    pub fn kind(&self) -> ScopeKind {
        if self.session_area_id.is_some() {
            ScopeKind::Area
        } else {
            ScopeKind::Event
        }
    }
}

/// Named sub-location of an event with its own check-out queue.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionArea {
    pub id: SessionAreaId,
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: String,
}
