use std::{
    collections::{HashMap, HashSet},
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use gatekeep_model::{
    AttendeeId, AttendeeRecord, CheckOutStatusId, EventId, Gate, GateId,
    GateScope, Page, PageRequest, QueueKind, SessionArea, SessionAreaId,
};

use crate::api::CreateGateRequest;
use crate::error::{RosterError, RosterResult};
use crate::gates::GateDirectory;

use super::RosterSource;

/// In-process roster service with the same observable behaviour as the
/// remote one: paginated queue reads, per-attendee check-in/check-out,
/// all-or-nothing batched check-in and gate bookkeeping.
///
/// Also records how often each endpoint was hit so callers can assert on
/// request counts.
#[derive(Debug, Default)]
pub struct InMemoryRoster {
    state: Mutex<MemoryState>,
    latency: Option<Duration>,
}

#[derive(Debug, Default)]
struct MemoryState {
    records: Vec<AttendeeRecord>,
    checked_out: HashSet<AttendeeId>,
    rejecting: HashMap<AttendeeId, String>,
    offline: bool,
    gates: Vec<Gate>,
    areas: HashMap<EventId, Vec<SessionArea>>,
    next_gate: u64,
    calls: CallLog,
}

/// Request counters, by endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallLog {
    pub fetches: usize,
    pub check_ins: HashMap<AttendeeId, usize>,
    pub check_outs: HashMap<AttendeeId, usize>,
    pub bulk_check_ins: usize,
}

impl CallLog {
    pub fn check_ins_for(&self, id: &AttendeeId) -> usize {
        self.check_ins.get(id).copied().unwrap_or_default()
    }

    pub fn check_outs_for(&self, id: &AttendeeId) -> usize {
        self.check_outs.get(id).copied().unwrap_or_default()
    }
}

impl InMemoryRoster {
    pub fn new(records: impl IntoIterator<Item = AttendeeRecord>) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                records: records.into_iter().collect(),
                ..MemoryState::default()
            }),
            latency: None,
        }
    }

    /// Synthetic roster used by the demo station: `count` attendees for
    /// `event`, the first third already checked in to `area`.
    pub fn demo(event: &EventId, area: &SessionAreaId, count: usize) -> Self {
        const FIRST: &[&str] = &[
            "Ada", "Grace", "Linus", "Barbara", "Ken", "Margaret", "Dennis",
            "Radia", "John", "Frances",
        ];
        const LAST: &[&str] = &[
            "Lovelace", "Hopper", "Torvalds", "Liskov", "Thompson",
            "Hamilton", "Ritchie", "Perlman", "Backus", "Allen",
        ];
        const ORGS: &[&str] = &["Analytical", "Compiler Co", "Kernel Labs"];

        let now = Utc::now();
        let records = (0..count).map(|idx| {
            let first = FIRST[idx % FIRST.len()];
            let last = LAST[(idx / FIRST.len()) % LAST.len()];
            let mut record = AttendeeRecord::new(
                (idx as u64 + 1).to_string(),
                event.clone(),
                format!("{first} {last}"),
                format!(
                    "{}.{}@example.test",
                    first.to_lowercase(),
                    last.to_lowercase()
                ),
            );
            record.organization = Some(ORGS[idx % ORGS.len()].to_string());
            record.phone = Some(format!("+1 555 01{:02}", idx % 100));
            record.user_type = Some("attendee".to_string());
            record.session_area_id = Some(area.clone());
            if idx % 3 == 0 {
                record.check_in_at = Some(now);
                record.check_out_status_id =
                    Some(CheckOutStatusId::new(format!("status-{}", idx + 1)));
            }
            record
        });

        let roster = Self::new(records);
        roster.add_session_area(
            event,
            SessionArea {
                id: area.clone(),
                name: "Main hall".to_string(),
            },
        );
        roster
    }

    /// Delay every call by `latency` so callers can overlap requests.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn add_session_area(&self, event: &EventId, area: SessionArea) {
        self.state
            .lock()
            .areas
            .entry(event.clone())
            .or_default()
            .push(area);
    }

    /// Every check-in/check-out for `id` fails with a 422 carrying `message`.
    pub fn reject(&self, id: impl Into<AttendeeId>, message: impl Into<String>) {
        self.state.lock().rejecting.insert(id.into(), message.into());
    }

    /// Simulate a transport outage: every call fails with a network error.
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    pub fn calls(&self) -> CallLog {
        self.state.lock().calls.clone()
    }

    pub fn record(&self, id: &AttendeeId) -> Option<AttendeeRecord> {
        self.state
            .lock()
            .records
            .iter()
            .find(|record| &record.id == id)
            .cloned()
    }

    pub fn is_checked_out(&self, id: &AttendeeId) -> bool {
        self.state.lock().checked_out.contains(id)
    }

    async fn simulate_latency(&self) -> RosterResult<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.state.lock().offline {
            return Err(RosterError::Network(
                "connection refused (simulated)".to_string(),
            ));
        }
        Ok(())
    }
}

impl MemoryState {
    fn rejection(&self, id: &AttendeeId) -> Option<RosterError> {
        self.rejecting.get(id).map(|message| RosterError::Server {
            status: 422,
            message: message.clone(),
        })
    }

    fn check_in(&mut self, id: &AttendeeId) -> RosterResult<()> {
        if let Some(err) = self.rejection(id) {
            return Err(err);
        }
        let record = self
            .records
            .iter_mut()
            .find(|record| &record.id == id)
            .ok_or_else(|| RosterError::Server {
                status: 404,
                message: format!("attendee {id} not found"),
            })?;
        if record.check_in_at.is_some() {
            return Err(RosterError::Server {
                status: 409,
                message: format!("attendee {id} is already checked in"),
            });
        }
        record.check_in_at = Some(Utc::now());
        record
            .check_out_status_id
            .get_or_insert_with(|| CheckOutStatusId::new(format!("status-{id}")));
        Ok(())
    }

    /// Same checks as [`MemoryState::check_in`] without mutating anything.
    fn can_check_in(&self, id: &AttendeeId) -> RosterResult<()> {
        if let Some(err) = self.rejection(id) {
            return Err(err);
        }
        match self.records.iter().find(|record| &record.id == id) {
            None => Err(RosterError::Server {
                status: 404,
                message: format!("attendee {id} not found"),
            }),
            Some(record) if record.is_checked_in() => Err(RosterError::Server {
                status: 409,
                message: format!("attendee {id} is already checked in"),
            }),
            Some(_) => Ok(()),
        }
    }
}

#[async_trait]
impl RosterSource for InMemoryRoster {
    async fn fetch_page(
        &self,
        scope: &GateScope,
        kind: QueueKind,
        request: PageRequest,
    ) -> RosterResult<Page<AttendeeRecord>> {
        if kind == QueueKind::NeedsCheckOut && scope.session_area_id.is_none()
        {
            return Err(RosterError::MissingSessionArea);
        }
        self.simulate_latency().await?;

        let mut state = self.state.lock();
        state.calls.fetches += 1;
        let matching = state
            .records
            .iter()
            .filter(|record| !state.checked_out.contains(&record.id))
            .filter(|record| kind.admits(record, scope))
            .cloned()
            .collect::<Vec<_>>();
        Ok(Page::slice(matching, request))
    }

    async fn check_in(
        &self,
        event: &EventId,
        attendee: &AttendeeId,
    ) -> RosterResult<()> {
        self.simulate_latency().await?;
        let mut state = self.state.lock();
        *state.calls.check_ins.entry(attendee.clone()).or_default() += 1;
        if state
            .records
            .iter()
            .any(|record| &record.id == attendee && &record.event_id != event)
        {
            return Err(RosterError::Server {
                status: 404,
                message: format!("attendee {attendee} is not registered for {event}"),
            });
        }
        state.check_in(attendee)
    }

    async fn check_out(
        &self,
        _event: &EventId,
        _area: &SessionAreaId,
        attendee: &AttendeeId,
        status: &CheckOutStatusId,
    ) -> RosterResult<()> {
        self.simulate_latency().await?;
        let mut state = self.state.lock();
        *state.calls.check_outs.entry(attendee.clone()).or_default() += 1;
        if let Some(err) = state.rejection(attendee) {
            return Err(err);
        }

        let known_status = state
            .records
            .iter()
            .find(|record| &record.id == attendee)
            .and_then(|record| record.check_out_status_id.clone());
        if known_status.as_ref() != Some(status) {
            return Err(RosterError::Server {
                status: 422,
                message: format!("attendee {attendee} has no matching check-out status"),
            });
        }
        if !state.checked_out.insert(attendee.clone()) {
            return Err(RosterError::Server {
                status: 409,
                message: format!("attendee {attendee} is already checked out"),
            });
        }
        Ok(())
    }

    async fn bulk_check_in(
        &self,
        _event: &EventId,
        attendees: &[AttendeeId],
    ) -> RosterResult<()> {
        self.simulate_latency().await?;
        let mut state = self.state.lock();
        state.calls.bulk_check_ins += 1;

        // Validate every id before touching any record.
        for id in attendees {
            state.can_check_in(id)?;
        }
        for id in attendees {
            state.check_in(id)?;
        }
        Ok(())
    }
}

#[async_trait]
impl GateDirectory for InMemoryRoster {
    async fn list_gates(&self, event: &EventId) -> RosterResult<Vec<Gate>> {
        self.simulate_latency().await?;
        Ok(self
            .state
            .lock()
            .gates
            .iter()
            .filter(|gate| &gate.event_id == event)
            .cloned()
            .collect())
    }

    async fn create_gate(
        &self,
        request: &CreateGateRequest,
    ) -> RosterResult<Gate> {
        self.simulate_latency().await?;
        let mut state = self.state.lock();
        state.next_gate += 1;
        let gate = Gate {
            id: GateId::from(state.next_gate),
            event_id: request.event_id.clone(),
            session_area_id: request.session_area_id.clone(),
            agenda_id: request.agenda_id.clone(),
            url: None,
        };
        state.gates.push(gate.clone());
        Ok(gate)
    }

    async fn delete_gate(&self, gate: &GateId) -> RosterResult<()> {
        self.simulate_latency().await?;
        let mut state = self.state.lock();
        let before = state.gates.len();
        state.gates.retain(|existing| &existing.id != gate);
        if state.gates.len() == before {
            return Err(RosterError::Server {
                status: 404,
                message: format!("gate {gate} not found"),
            });
        }
        Ok(())
    }

    async fn list_session_areas(
        &self,
        event: &EventId,
    ) -> RosterResult<Vec<SessionArea>> {
        self.simulate_latency().await?;
        Ok(self
            .state
            .lock()
            .areas
            .get(event)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> InMemoryRoster {
        InMemoryRoster::demo(&EventId::from("ev"), &SessionAreaId::from("hall"), 9)
    }

    #[tokio::test]
    async fn check_in_moves_attendee_between_queues() {
        let roster = roster();
        let scope = GateScope::area("ev", "hall");
        let id = AttendeeId::from("2");

        roster.check_in(&scope.event_id, &id).await.unwrap();

        let waiting = roster
            .fetch_page(&scope, QueueKind::NeedsCheckIn, PageRequest::first(50))
            .await
            .unwrap();
        let inside = roster
            .fetch_page(&scope, QueueKind::NeedsCheckOut, PageRequest::first(50))
            .await
            .unwrap();
        assert!(!waiting.records.iter().any(|r| r.id == id));
        assert!(inside.records.iter().any(|r| r.id == id));
    }

    #[tokio::test]
    async fn second_check_in_conflicts() {
        let roster = roster();
        let event = EventId::from("ev");
        let id = AttendeeId::from("2");
        roster.check_in(&event, &id).await.unwrap();

        let err = roster.check_in(&event, &id).await.unwrap_err();
        assert!(matches!(err, RosterError::Server { status: 409, .. }));
        assert_eq!(roster.calls().check_ins_for(&id), 2);
    }

    #[tokio::test]
    async fn bulk_check_in_is_all_or_nothing() {
        let roster = roster();
        let event = EventId::from("ev");
        roster.reject("3", "badge revoked");

        let ids = [AttendeeId::from("2"), AttendeeId::from("3")];
        assert!(roster.bulk_check_in(&event, &ids).await.is_err());
        assert!(!roster.record(&ids[0]).unwrap().is_checked_in());
    }

    #[tokio::test]
    async fn checked_out_attendees_leave_both_queues() {
        let roster = roster();
        let scope = GateScope::area("ev", "hall");
        let inside = roster.record(&AttendeeId::from("1")).unwrap();
        let status = inside.check_out_status_id.clone().unwrap();

        roster
            .check_out(&scope.event_id, &SessionAreaId::from("hall"), &inside.id, &status)
            .await
            .unwrap();

        for kind in [QueueKind::NeedsCheckIn, QueueKind::NeedsCheckOut] {
            let page = roster
                .fetch_page(&scope, kind, PageRequest::first(50))
                .await
                .unwrap();
            assert!(!page.records.iter().any(|r| r.id == inside.id));
        }
    }
}
