//! End-to-end gate sessions against the in-memory roster and software camera.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
    time::timeout,
};

use async_trait::async_trait;
use gatekeep_core::{
    ErrorKind, MutationError, RosterResult, SessionError,
    mutation::MutationKind,
    roster::{InMemoryRoster, RosterSource},
    scan::ChannelCamera,
    session::{
        GateCommand, GateEvent, GateHandle, GateSession, QueueSnapshot,
        SessionSettings,
    },
};
use gatekeep_model::{
    AttendeeId, AttendeeRecord, CheckOutStatusId, EventId, Gate, GateScope,
    Page, PageRequest, QueueKind, SessionAreaId,
};

const WAIT: Duration = Duration::from_secs(5);

fn settings() -> SessionSettings {
    SessionSettings {
        page_size: 10,
        search_debounce: Duration::from_millis(20),
        search_concurrency: 2,
        badge_interval: None,
        batched_check_in: true,
        resume_scan_after_decode: true,
        event_capacity: 1024,
    }
}

fn attendee(id: u64, name: &str) -> AttendeeRecord {
    let mut record = AttendeeRecord::new(
        id,
        "ev",
        name,
        format!("{}@example.test", name.to_lowercase().replace(' ', ".")),
    );
    record.session_area_id = Some(SessionAreaId::from("hall"));
    record
}

fn guests(count: u64) -> Vec<AttendeeRecord> {
    (1..=count)
        .map(|id| attendee(id, &format!("Guest {id}")))
        .collect()
}

struct Station {
    handle: GateHandle,
    events: broadcast::Receiver<GateEvent>,
    camera: ChannelCamera,
    task: JoinHandle<()>,
}

fn start_with(
    settings: SessionSettings,
    roster: &Arc<InMemoryRoster>,
    scope: GateScope,
    kind: QueueKind,
) -> Station {
    start_source(settings, roster.clone(), scope, kind)
}

fn start_source(
    settings: SessionSettings,
    source: Arc<dyn RosterSource>,
    scope: GateScope,
    kind: QueueKind,
) -> Station {
    let camera = ChannelCamera::new();
    let (session, handle) = GateSession::new(
        settings,
        source,
        Arc::new(camera.clone()),
        scope,
        kind,
    );
    let events = handle.subscribe();
    let task = session.spawn();
    Station {
        handle,
        events,
        camera,
        task,
    }
}

fn start(roster: &Arc<InMemoryRoster>, kind: QueueKind) -> Station {
    start_with(settings(), roster, GateScope::area("ev", "hall"), kind)
}

/// Skip events until `pick` accepts one.
async fn wait_for<T>(
    events: &mut broadcast::Receiver<GateEvent>,
    mut pick: impl FnMut(&GateEvent) -> Option<T>,
) -> T {
    let found = timeout(WAIT, async {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Some(found) = pick(&event) {
                        return found;
                    }
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => panic!("session closed"),
            }
        }
    })
    .await;
    found.expect("timed out waiting for a session event")
}

async fn next_queue(
    events: &mut broadcast::Receiver<GateEvent>,
    mut accept: impl FnMut(&QueueSnapshot) -> bool,
) -> QueueSnapshot {
    wait_for(events, |event| match event {
        GateEvent::QueueUpdated(snapshot) if accept(snapshot) => {
            Some(snapshot.clone())
        }
        _ => None,
    })
    .await
}

fn ids(snapshot: &QueueSnapshot) -> Vec<&str> {
    snapshot.ids().map(AttendeeId::as_str).collect()
}

/// Commits check-ins on the wrapped roster straight away but answers only
/// after `ack_delay`, like a server whose response is slow to arrive.
#[derive(Debug)]
struct LateAckRoster {
    inner: Arc<InMemoryRoster>,
    ack_delay: Duration,
}

#[async_trait]
impl RosterSource for LateAckRoster {
    async fn fetch_page(
        &self,
        scope: &GateScope,
        kind: QueueKind,
        request: PageRequest,
    ) -> RosterResult<Page<AttendeeRecord>> {
        self.inner.fetch_page(scope, kind, request).await
    }

    async fn check_in(
        &self,
        event: &EventId,
        attendee: &AttendeeId,
    ) -> RosterResult<()> {
        self.inner.check_in(event, attendee).await?;
        tokio::time::sleep(self.ack_delay).await;
        Ok(())
    }

    async fn check_out(
        &self,
        event: &EventId,
        area: &SessionAreaId,
        attendee: &AttendeeId,
        status: &CheckOutStatusId,
    ) -> RosterResult<()> {
        self.inner.check_out(event, area, attendee, status).await
    }

    async fn bulk_check_in(
        &self,
        event: &EventId,
        attendees: &[AttendeeId],
    ) -> RosterResult<()> {
        self.inner.bulk_check_in(event, attendees).await
    }
}

async fn until(mut ready: impl FnMut() -> bool) {
    timeout(WAIT, async {
        while !ready() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("timed out waiting for the roster");
}

#[tokio::test]
async fn search_finds_matches_beyond_the_visible_page() {
    let mut records = guests(25);
    records[16].name = "John Smith".into();
    records[22].name = "Johnny Cash".into();
    let roster = Arc::new(InMemoryRoster::new(records));
    let mut station = start(&roster, QueueKind::NeedsCheckIn);

    let first = next_queue(&mut station.events, |s| !s.records.is_empty()).await;
    assert_eq!(first.pagination.total_pages, 3);
    assert!(!ids(&first).contains(&"17"));

    station
        .handle
        .send(GateCommand::SetQuery("john".into()))
        .await
        .unwrap();
    let found = next_queue(&mut station.events, |s| s.query.is_some()).await;

    assert_eq!(found.query.as_deref(), Some("john"));
    assert_eq!(ids(&found), ["17", "23"]);
    assert_eq!(found.pagination.total_count, 2);
    // One plain page load, then every page for the search.
    assert_eq!(roster.calls().fetches, 4);

    // Clearing the query goes back to plain paging.
    station
        .handle
        .send(GateCommand::SetQuery("  ".into()))
        .await
        .unwrap();
    let plain = next_queue(&mut station.events, |s| s.query.is_none()).await;
    assert_eq!(plain.records.len(), 10);
}

#[tokio::test]
async fn only_the_latest_query_is_rendered() {
    let mut records = guests(12);
    records[2].name = "Alice Ames".into();
    records[8].name = "Bob Burns".into();
    let roster = Arc::new(InMemoryRoster::new(records));
    let settings = SessionSettings {
        search_debounce: Duration::from_millis(150),
        ..settings()
    };
    let mut station = start_with(
        settings,
        &roster,
        GateScope::area("ev", "hall"),
        QueueKind::NeedsCheckIn,
    );
    next_queue(&mut station.events, |_| true).await;

    for query in ["ali", "alice", "bob"] {
        station
            .handle
            .send(GateCommand::SetQuery(query.into()))
            .await
            .unwrap();
    }

    let found = next_queue(&mut station.events, |s| s.query.is_some()).await;
    assert_eq!(found.query.as_deref(), Some("bob"));
    assert_eq!(ids(&found), ["9"]);
}

#[tokio::test]
async fn double_decode_sends_one_check_in() {
    let roster = Arc::new(
        InMemoryRoster::new(vec![attendee(42, "Zed Zulu"), attendee(7, "Amy")])
            .with_latency(Duration::from_millis(200)),
    );
    let mut station = start(&roster, QueueKind::NeedsCheckIn);
    next_queue(&mut station.events, |s| ids(s).contains(&"42")).await;

    station.handle.send(GateCommand::StartScan).await.unwrap();
    wait_for(&mut station.events, |event| {
        matches!(event, GateEvent::ScanStarted).then_some(())
    })
    .await;

    assert!(station.camera.feed("42"));
    // Either still queued behind the first code or the capture is closed.
    assert!(!station.camera.feed("42"));

    let pending =
        next_queue(&mut station.events, |s| !s.pending.is_empty()).await;
    assert_eq!(pending.pending, vec![AttendeeId::from("42")]);

    // A manual tap while the scan's request is in flight is a no-op.
    station
        .handle
        .send(GateCommand::CheckIn("42".into()))
        .await
        .unwrap();
    wait_for(&mut station.events, |event| match event {
        GateEvent::MutationIgnored { id } if id.as_str() == "42" => Some(()),
        _ => None,
    })
    .await;

    let kind = wait_for(&mut station.events, |event| match event {
        GateEvent::MutationApplied { id, kind } if id.as_str() == "42" => {
            Some(*kind)
        }
        _ => None,
    })
    .await;
    assert_eq!(kind, MutationKind::CheckIn);
    assert_eq!(roster.calls().check_ins_for(&"42".into()), 1);

    // The camera re-arms after the request settles; the attendee is gone
    // from the queue so a third decode is rejected.
    wait_for(&mut station.events, |event| {
        matches!(event, GateEvent::ScanStarted).then_some(())
    })
    .await;
    assert!(station.camera.feed("42"));
    let code = wait_for(&mut station.events, |event| match event {
        GateEvent::ScanRejected { code } => Some(code.clone()),
        _ => None,
    })
    .await;
    assert_eq!(code, "42");
    assert_eq!(roster.calls().check_ins_for(&"42".into()), 1);
}

#[tokio::test]
async fn bulk_run_keeps_exactly_the_failures_selected() {
    let roster = Arc::new(InMemoryRoster::new(guests(5)));
    roster.reject("2", "badge not printed");
    roster.reject("4", "badge not printed");
    let mut station = start(&roster, QueueKind::NeedsCheckIn);
    next_queue(&mut station.events, |s| s.records.len() == 5).await;

    station.handle.send(GateCommand::SelectAll).await.unwrap();
    let selected = wait_for(&mut station.events, |event| match event {
        GateEvent::SelectionChanged(ids) => Some(ids.clone()),
        _ => None,
    })
    .await;
    assert_eq!(selected.len(), 5);

    station.handle.send(GateCommand::BulkMutate).await.unwrap();
    let mut selection = Vec::new();
    let report = wait_for(&mut station.events, |event| match event {
        GateEvent::SelectionChanged(ids) => {
            selection = ids.clone();
            None
        }
        GateEvent::BulkCompleted(report) => Some(report.clone()),
        _ => None,
    })
    .await;

    assert_eq!(report.kind, MutationKind::CheckIn);
    assert_eq!(report.succeeded.len(), 3);
    assert_eq!(report.failed.len(), 2);
    assert_eq!(selection, vec![AttendeeId::from("2"), AttendeeId::from("4")]);
    assert_eq!(
        report.failed[0].error.kind(),
        ErrorKind::Server,
        "{:?}",
        report.failed[0].error
    );

    // Reconciliation refetch shows only the failures left to check in.
    let reconciled = next_queue(&mut station.events, |s| s.records.len() == 2).await;
    assert_eq!(ids(&reconciled), ["2", "4"]);
}

#[tokio::test]
async fn switching_queues_clears_the_selection_first() {
    let event = "ev".into();
    let area: SessionAreaId = "hall".into();
    let roster = Arc::new(InMemoryRoster::demo(&event, &area, 12));
    let mut station = start(&roster, QueueKind::NeedsCheckIn);
    let loaded = next_queue(&mut station.events, |s| !s.records.is_empty()).await;

    for id in loaded.ids().take(3) {
        station
            .handle
            .send(GateCommand::Toggle(id.clone()))
            .await
            .unwrap();
    }
    wait_for(&mut station.events, |event| match event {
        GateEvent::SelectionChanged(ids) if ids.len() == 3 => Some(()),
        _ => None,
    })
    .await;

    station
        .handle
        .send(GateCommand::SwitchQueue(QueueKind::NeedsCheckOut))
        .await
        .unwrap();

    // The cleared selection is published before anything of the new queue.
    let first = wait_for(&mut station.events, |event| match event {
        GateEvent::SelectionChanged(ids) => Some(Ok(ids.clone())),
        GateEvent::QueueUpdated(snapshot)
            if snapshot.kind == QueueKind::NeedsCheckOut =>
        {
            Some(Err(snapshot.kind))
        }
        _ => None,
    })
    .await;
    assert_eq!(first, Ok(Vec::new()));

    let checked_in = next_queue(&mut station.events, |s| {
        s.kind == QueueKind::NeedsCheckOut && !s.records.is_empty()
    })
    .await;
    assert!(checked_in.records.iter().all(AttendeeRecord::is_checked_in));
}

#[tokio::test]
async fn decodes_after_stop_are_discarded() {
    let roster = Arc::new(InMemoryRoster::new(guests(3)));
    let mut station = start(&roster, QueueKind::NeedsCheckIn);
    next_queue(&mut station.events, |s| !s.records.is_empty()).await;

    station.handle.send(GateCommand::StartScan).await.unwrap();
    wait_for(&mut station.events, |event| {
        matches!(event, GateEvent::ScanStarted).then_some(())
    })
    .await;
    station.handle.send(GateCommand::StopScan).await.unwrap();
    wait_for(&mut station.events, |event| {
        matches!(event, GateEvent::ScanStopped).then_some(())
    })
    .await;

    assert!(!station.camera.is_open());
    assert!(!station.camera.feed("1"));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(roster.calls().check_ins_for(&"1".into()), 0);
}

#[tokio::test]
async fn checked_in_attendee_moves_to_the_check_out_queue() {
    let roster = Arc::new(InMemoryRoster::new(guests(4)));
    let mut station = start(&roster, QueueKind::NeedsCheckIn);
    next_queue(&mut station.events, |s| s.records.len() == 4).await;

    station
        .handle
        .send(GateCommand::CheckIn("3".into()))
        .await
        .unwrap();
    let applied = next_queue(&mut station.events, |s| s.pending.is_empty()).await;
    let after = if ids(&applied).contains(&"3") {
        next_queue(&mut station.events, |s| !ids(s).contains(&"3")).await
    } else {
        applied
    };
    assert_eq!(ids(&after), ["1", "2", "4"]);

    station
        .handle
        .send(GateCommand::SwitchQueue(QueueKind::NeedsCheckOut))
        .await
        .unwrap();
    let out = next_queue(&mut station.events, |s| {
        s.kind == QueueKind::NeedsCheckOut && !s.records.is_empty()
    })
    .await;
    assert_eq!(ids(&out), ["3"]);

    // And back out again.
    station
        .handle
        .send(GateCommand::CheckOut("3".into()))
        .await
        .unwrap();
    let kind = wait_for(&mut station.events, |event| match event {
        GateEvent::MutationApplied { id, kind } if id.as_str() == "3" => {
            Some(*kind)
        }
        _ => None,
    })
    .await;
    assert_eq!(kind, MutationKind::CheckOut);
    assert!(roster.is_checked_out(&"3".into()));
}

#[tokio::test]
async fn late_check_in_result_does_not_hide_the_attendee_in_the_check_out_queue()
{
    let roster = Arc::new(InMemoryRoster::new(guests(3)));
    let source = Arc::new(LateAckRoster {
        inner: roster.clone(),
        ack_delay: Duration::from_millis(300),
    });
    let mut station = start_source(
        settings(),
        source,
        GateScope::area("ev", "hall"),
        QueueKind::NeedsCheckIn,
    );
    next_queue(&mut station.events, |s| s.records.len() == 3).await;

    station
        .handle
        .send(GateCommand::CheckIn("1".into()))
        .await
        .unwrap();
    until(|| {
        roster
            .record(&"1".into())
            .is_some_and(|record| record.is_checked_in())
    })
    .await;

    station
        .handle
        .send(GateCommand::SwitchQueue(QueueKind::NeedsCheckOut))
        .await
        .unwrap();
    let out = next_queue(&mut station.events, |s| {
        s.kind == QueueKind::NeedsCheckOut && !s.records.is_empty()
    })
    .await;
    assert_eq!(ids(&out), ["1"]);

    // The reconciliation refetch fails, so only the completion itself can
    // change what the operator sees.
    roster.set_offline(true);
    wait_for(&mut station.events, |event| match event {
        GateEvent::MutationApplied { id, kind } if id.as_str() == "1" => {
            Some(*kind)
        }
        _ => None,
    })
    .await;
    let settled = next_queue(&mut station.events, |_| true).await;
    assert_eq!(settled.kind, QueueKind::NeedsCheckOut);
    assert_eq!(ids(&settled), ["1"]);
    assert!(settled.pending.is_empty());

    roster.set_offline(false);
    station
        .handle
        .send(GateCommand::CheckOut("1".into()))
        .await
        .unwrap();
    let kind = wait_for(&mut station.events, |event| match event {
        GateEvent::MutationApplied { id, kind } if id.as_str() == "1" => {
            Some(*kind)
        }
        GateEvent::MutationFailed { id, notice, .. } if id.as_str() == "1" => {
            panic!("check-out failed: {notice}")
        }
        _ => None,
    })
    .await;
    assert_eq!(kind, MutationKind::CheckOut);
    assert!(roster.is_checked_out(&"1".into()));
}

#[tokio::test]
async fn changing_page_drops_selected_rows_that_left_the_screen() {
    let roster = Arc::new(InMemoryRoster::new(guests(25)));
    let mut station = start(&roster, QueueKind::NeedsCheckIn);
    next_queue(&mut station.events, |s| s.records.len() == 10).await;

    station.handle.send(GateCommand::SelectAll).await.unwrap();
    wait_for(&mut station.events, |event| match event {
        GateEvent::SelectionChanged(ids) if ids.len() == 10 => Some(()),
        _ => None,
    })
    .await;

    station.handle.send(GateCommand::FetchPage(2)).await.unwrap();
    let second =
        next_queue(&mut station.events, |s| s.pagination.current_page == 2)
            .await;
    assert_eq!(ids(&second)[0], "11");

    let selection = wait_for(&mut station.events, |event| match event {
        GateEvent::SelectionChanged(ids) => Some(ids.clone()),
        _ => None,
    })
    .await;
    assert!(selection.iter().all(|id| second.ids().any(|shown| shown == id)));
    assert!(selection.is_empty());

    // Rows of the new page can be picked up again.
    station
        .handle
        .send(GateCommand::Toggle("12".into()))
        .await
        .unwrap();
    let picked = wait_for(&mut station.events, |event| match event {
        GateEvent::SelectionChanged(ids) => Some(ids.clone()),
        _ => None,
    })
    .await;
    assert_eq!(picked, vec![AttendeeId::from("12")]);
}

#[tokio::test]
async fn new_query_starts_from_the_first_page() {
    let roster = Arc::new(InMemoryRoster::new(guests(25)));
    let mut station = start(&roster, QueueKind::NeedsCheckIn);
    next_queue(&mut station.events, |_| true).await;

    station.handle.send(GateCommand::FetchPage(2)).await.unwrap();
    next_queue(&mut station.events, |s| s.pagination.current_page == 2).await;

    station
        .handle
        .send(GateCommand::SetQuery("guest".into()))
        .await
        .unwrap();
    let found = next_queue(&mut station.events, |s| s.query.is_some()).await;
    assert_eq!(found.pagination.current_page, 1);
    assert_eq!(found.pagination.total_count, 25);
    assert_eq!(ids(&found)[0], "1");
}

#[tokio::test]
async fn page_change_during_a_search_supersedes_the_running_one() {
    let roster = Arc::new(
        InMemoryRoster::new(guests(25)).with_latency(Duration::from_millis(80)),
    );
    let mut station = start(&roster, QueueKind::NeedsCheckIn);
    next_queue(&mut station.events, |_| true).await;

    station
        .handle
        .send(GateCommand::SetQuery("guest".into()))
        .await
        .unwrap();
    // Past the debounce, while the three page fetches are still running.
    tokio::time::sleep(Duration::from_millis(60)).await;
    station.handle.send(GateCommand::FetchPage(2)).await.unwrap();

    let found = next_queue(&mut station.events, |s| s.query.is_some()).await;
    assert_eq!(found.pagination.current_page, 2);
    assert_eq!(ids(&found)[0], "11");

    // Nothing from the first-page search shows up afterwards.
    station.handle.send(GateCommand::Shutdown).await.unwrap();
    let mut late = Vec::new();
    wait_for(&mut station.events, |event| match event {
        GateEvent::QueueUpdated(snapshot) => {
            late.push(snapshot.pagination.current_page);
            None
        }
        GateEvent::Closed => Some(()),
        _ => None,
    })
    .await;
    assert!(late.iter().all(|page| *page == 2), "{late:?}");
}

#[tokio::test]
async fn failed_check_in_keeps_the_attendee_and_reports_the_server_message() {
    let roster = Arc::new(InMemoryRoster::new(guests(2)));
    roster.reject("1", "registration is on hold");
    let mut station = start(&roster, QueueKind::NeedsCheckIn);
    next_queue(&mut station.events, |s| s.records.len() == 2).await;

    station
        .handle
        .send(GateCommand::CheckIn("1".into()))
        .await
        .unwrap();
    let notice = wait_for(&mut station.events, |event| match event {
        GateEvent::MutationFailed { id, notice, .. } if id.as_str() == "1" => {
            Some(notice.clone())
        }
        _ => None,
    })
    .await;
    assert_eq!(notice.kind, Some(ErrorKind::Server));
    assert!(notice.message.contains("registration is on hold"));

    let settled = next_queue(&mut station.events, |_| true).await;
    assert!(settled.pending.is_empty());
    assert_eq!(ids(&settled), ["1", "2"]);
}

#[tokio::test]
async fn wrong_mutation_for_the_queue_is_rejected_locally() {
    let roster = Arc::new(InMemoryRoster::new(guests(2)));
    let mut station = start(&roster, QueueKind::NeedsCheckIn);
    next_queue(&mut station.events, |_| true).await;

    station
        .handle
        .send(GateCommand::CheckOut("1".into()))
        .await
        .unwrap();
    let notice = wait_for(&mut station.events, |event| match event {
        GateEvent::MutationFailed { notice, .. } => Some(notice.clone()),
        _ => None,
    })
    .await;
    assert_eq!(notice.kind, Some(ErrorKind::Validation));

    station
        .handle
        .send(GateCommand::CheckIn("99".into()))
        .await
        .unwrap();
    let notice = wait_for(&mut station.events, |event| match event {
        GateEvent::MutationFailed { notice, .. } => Some(notice.clone()),
        _ => None,
    })
    .await;
    assert_eq!(
        notice.message,
        MutationError::NotInQueue("99".into()).to_string()
    );
    assert_eq!(roster.calls().check_outs_for(&"1".into()), 0);
}

#[tokio::test]
async fn event_gate_cannot_open_the_check_out_queue() {
    let roster = Arc::new(InMemoryRoster::new(guests(2)));
    let mut station = start_with(
        settings(),
        &roster,
        GateScope::event("ev"),
        QueueKind::NeedsCheckOut,
    );
    let opened = next_queue(&mut station.events, |_| true).await;
    assert_eq!(opened.kind, QueueKind::NeedsCheckIn);

    station
        .handle
        .send(GateCommand::SwitchQueue(QueueKind::NeedsCheckOut))
        .await
        .unwrap();
    let notice = wait_for(&mut station.events, |event| match event {
        GateEvent::Notice(notice) => Some(notice.clone()),
        _ => None,
    })
    .await;
    assert_eq!(notice.kind, Some(ErrorKind::Validation));
}

#[tokio::test]
async fn load_failures_become_network_notices() {
    let roster = Arc::new(InMemoryRoster::new(guests(2)));
    roster.set_offline(true);
    let mut station = start(&roster, QueueKind::NeedsCheckIn);

    let notice = wait_for(&mut station.events, |event| match event {
        GateEvent::Notice(notice) => Some(notice.clone()),
        _ => None,
    })
    .await;
    assert_eq!(notice.kind, Some(ErrorKind::Network));

    roster.set_offline(false);
    station.handle.send(GateCommand::Refresh).await.unwrap();
    let loaded = next_queue(&mut station.events, |_| true).await;
    assert_eq!(loaded.records.len(), 2);
}

#[tokio::test]
async fn badge_reports_the_event_backlog() {
    let roster = Arc::new(InMemoryRoster::new(guests(7)));
    let settings = SessionSettings {
        badge_interval: Some(Duration::from_millis(20)),
        ..settings()
    };
    let mut station = start_with(
        settings,
        &roster,
        GateScope::area("ev", "hall"),
        QueueKind::NeedsCheckIn,
    );

    let count = wait_for(&mut station.events, |event| match event {
        GateEvent::BadgeCount(count) => Some(*count),
        _ => None,
    })
    .await;
    assert_eq!(count, 7);
}

#[tokio::test]
async fn switching_gates_releases_the_camera() {
    let roster = Arc::new(InMemoryRoster::new(guests(2)));
    let mut station = start(&roster, QueueKind::NeedsCheckOut);
    next_queue(&mut station.events, |_| true).await;

    station.handle.send(GateCommand::StartScan).await.unwrap();
    wait_for(&mut station.events, |event| {
        matches!(event, GateEvent::ScanStarted).then_some(())
    })
    .await;

    let gate = Gate {
        id: "g2".into(),
        event_id: "ev".into(),
        session_area_id: None,
        agenda_id: None,
        url: None,
    };
    station
        .handle
        .send(GateCommand::SwitchGate(gate))
        .await
        .unwrap();
    wait_for(&mut station.events, |event| {
        matches!(event, GateEvent::ScanStopped).then_some(())
    })
    .await;
    assert!(!station.camera.is_open());

    // Event gates fall back to the check-in queue.
    let switched = next_queue(&mut station.events, |s| {
        s.scope == GateScope::event("ev")
    })
    .await;
    assert_eq!(switched.kind, QueueKind::NeedsCheckIn);
}

#[tokio::test]
async fn dropping_every_handle_tears_the_session_down() {
    let roster = Arc::new(InMemoryRoster::new(guests(2)));
    let Station {
        handle,
        mut events,
        camera,
        task,
    } = start(&roster, QueueKind::NeedsCheckIn);
    next_queue(&mut events, |_| true).await;

    handle.send(GateCommand::StartScan).await.unwrap();
    wait_for(&mut events, |event| {
        matches!(event, GateEvent::ScanStarted).then_some(())
    })
    .await;
    assert!(camera.is_open());

    drop(handle);
    wait_for(&mut events, |event| {
        matches!(event, GateEvent::Closed).then_some(())
    })
    .await;
    timeout(WAIT, task).await.unwrap().unwrap();
    assert!(!camera.is_open());
}

#[tokio::test]
async fn shutting_down_twice_is_harmless() {
    let roster = Arc::new(InMemoryRoster::new(guests(1)));
    let Station {
        handle,
        mut events,
        task,
        ..
    } = start(&roster, QueueKind::NeedsCheckIn);
    next_queue(&mut events, |_| true).await;

    handle.shutdown().await;
    wait_for(&mut events, |event| {
        matches!(event, GateEvent::Closed).then_some(())
    })
    .await;
    timeout(WAIT, task).await.unwrap().unwrap();

    handle.shutdown().await;
    assert!(handle.is_closed());
    assert_eq!(
        handle.send(GateCommand::Refresh).await,
        Err(SessionError::Closed)
    );
}
