//! Gate management: list, create and delete gates for an event.

use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;
use tracing::{info, warn};

use gatekeep_model::{
    AgendaId, EventId, Gate, GateId, SessionArea, SessionAreaId,
};

use crate::api::CreateGateRequest;
use crate::error::{GateError, RosterResult};

#[async_trait]
pub trait GateDirectory: Send + Sync + Debug {
    async fn list_gates(&self, event: &EventId) -> RosterResult<Vec<Gate>>;

    async fn create_gate(
        &self,
        request: &CreateGateRequest,
    ) -> RosterResult<Gate>;

    async fn delete_gate(&self, gate: &GateId) -> RosterResult<()>;

    async fn list_session_areas(
        &self,
        event: &EventId,
    ) -> RosterResult<Vec<SessionArea>>;
}

/// Scope picked by the operator when creating a gate. `Area(None)` is an
/// area gate whose area has not been chosen yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateScopeDraft {
    Event,
    Area(Option<SessionAreaId>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateDraft {
    pub event_id: EventId,
    pub scope: GateScopeDraft,
    pub agenda_id: Option<AgendaId>,
}

impl GateDraft {
    pub fn event(event_id: impl Into<EventId>) -> Self {
        Self {
            event_id: event_id.into(),
            scope: GateScopeDraft::Event,
            agenda_id: None,
        }
    }

    pub fn area(
        event_id: impl Into<EventId>,
        area: Option<SessionAreaId>,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            scope: GateScopeDraft::Area(area),
            agenda_id: None,
        }
    }

    pub fn with_agenda(mut self, agenda: impl Into<AgendaId>) -> Self {
        self.agenda_id = Some(agenda.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct GateService {
    directory: Arc<dyn GateDirectory>,
    station_base_url: String,
}

impl GateService {
    pub fn new(
        directory: Arc<dyn GateDirectory>,
        station_base_url: impl Into<String>,
    ) -> Self {
        Self {
            directory,
            station_base_url: station_base_url
                .into()
                .trim_end_matches('/')
                .to_string(),
        }
    }

    pub fn share_url(&self, gate: &GateId) -> String {
        format!("{}/{}", self.station_base_url, gate)
    }

    pub async fn list_gates(
        &self,
        event: &EventId,
    ) -> Result<Vec<Gate>, GateError> {
        let gates = self.directory.list_gates(event).await?;
        Ok(gates.into_iter().map(|gate| self.with_share_url(gate)).collect())
    }

    pub async fn session_areas(
        &self,
        event: &EventId,
    ) -> Result<Vec<SessionArea>, GateError> {
        Ok(self.directory.list_session_areas(event).await?)
    }

    /// Validate `draft` and create the gate. Nothing is sent when an area
    /// gate has no area, or names an area the event does not have.
    pub async fn create_gate(
        &self,
        draft: GateDraft,
    ) -> Result<Gate, GateError> {
        let session_area_id = match draft.scope {
            GateScopeDraft::Event => None,
            GateScopeDraft::Area(None) => {
                return Err(GateError::Validation(
                    "an area gate needs a session area".to_string(),
                ));
            }
            GateScopeDraft::Area(Some(area)) => {
                let areas =
                    self.directory.list_session_areas(&draft.event_id).await?;
                if !areas.iter().any(|known| known.id == area) {
                    warn!(
                        target: "gate::gates",
                        event = %draft.event_id,
                        area = %area,
                        "rejecting gate for unknown session area"
                    );
                    return Err(GateError::Validation(format!(
                        "session area {area} does not belong to event {}",
                        draft.event_id
                    )));
                }
                Some(area)
            }
        };

        let request = CreateGateRequest {
            event_id: draft.event_id,
            session_area_id,
            agenda_id: draft.agenda_id,
        };
        let gate = self.directory.create_gate(&request).await?;
        info!(
            target: "gate::gates",
            gate = %gate.id,
            event = %gate.event_id,
            "gate created"
        );
        Ok(self.with_share_url(gate))
    }

    pub async fn delete_gate(&self, gate: &GateId) -> Result<(), GateError> {
        self.directory.delete_gate(gate).await?;
        info!(target: "gate::gates", gate = %gate, "gate deleted");
        Ok(())
    }

    fn with_share_url(&self, mut gate: Gate) -> Gate {
        if gate.url.as_deref().is_none_or(str::is_empty) {
            gate.url = Some(self.share_url(&gate.id));
        }
        gate
    }
}
