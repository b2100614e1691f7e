use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{broadcast, mpsc},
    task::{JoinError, JoinHandle, JoinSet},
};
use tracing::{debug, info, warn};

use gatekeep_model::{
    AttendeeId, AttendeeRecord, Gate, GateScope, Page, QueueKind,
};

use crate::badge::BadgePoller;
use crate::config::StationConfig;
use crate::error::{ErrorKind, MutationError, RosterError, SessionError};
use crate::mutation::{
    BulkOperationExecutor, BulkReport, MutationCoordinator, MutationKind,
    MutationOutcome, MutationRequest,
};
use crate::queue::RequestToken;
use crate::roster::{RosterSource, SearchAggregator};
use crate::scan::{CameraDevice, QrScanDispatcher};

use super::messages::{GateCommand, GateEvent, Notice};
use super::state::GateState;

const COMMAND_CAPACITY: usize = 64;

/// Session tunables, usually taken from [`StationConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub page_size: u32,
    pub search_debounce: Duration,
    pub search_concurrency: usize,
    pub badge_interval: Option<Duration>,
    pub batched_check_in: bool,
    pub resume_scan_after_decode: bool,
    pub event_capacity: usize,
}

impl From<&StationConfig> for SessionSettings {
    fn from(config: &StationConfig) -> Self {
        Self {
            page_size: config.page_size.max(1),
            search_debounce: config.search_debounce(),
            search_concurrency: config.search_concurrency,
            badge_interval: config.badge_poll_interval(),
            batched_check_in: config.batched_check_in,
            resume_scan_after_decode: config.resume_scan_after_decode,
            event_capacity: config.event_capacity.max(1),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&StationConfig::default())
    }
}

/// Background work finished on behalf of the session.
#[derive(Debug)]
enum Completion {
    Loaded {
        token: RequestToken,
        result: Result<Page<AttendeeRecord>, RosterError>,
    },
    DebounceElapsed {
        generation: u64,
        query: String,
    },
    Mutation {
        request: MutationRequest,
        result: Result<MutationOutcome, MutationError>,
        from_scan: bool,
    },
    Bulk(BulkReport),
}

enum Step {
    Command(Option<GateCommand>),
    Task(Result<Completion, JoinError>),
    Decode(Option<String>),
}

/// One gate's coordinator, run as a single task.
///
/// Commands arrive on an mpsc mailbox, results of background work on a
/// [`JoinSet`] and decoded codes from the scanner; all three are drained by
/// one `select!` loop, so the state has a single writer. Everything the
/// presentation layer needs is published as a [`GateEvent`].
#[derive(Debug)]
pub struct GateSession {
    settings: SessionSettings,
    state: GateState,
    source: Arc<dyn RosterSource>,
    search: SearchAggregator,
    coordinator: MutationCoordinator,
    bulk: BulkOperationExecutor,
    scanner: QrScanDispatcher,
    scan_wanted: bool,
    badge: Option<BadgePoller>,
    tasks: JoinSet<Completion>,
    commands: mpsc::Receiver<GateCommand>,
    events: broadcast::Sender<GateEvent>,
}

impl GateSession {
    /// Build a session for `scope` and the handle that drives it. A
    /// check-out queue needs an area; without one the session opens on the
    /// check-in queue instead.
    ///
    /// The session ends when every handle clone is dropped. Subscribe to the
    /// handle before [`GateSession::spawn`] to see the initial load.
    pub fn new(
        settings: SessionSettings,
        source: Arc<dyn RosterSource>,
        camera: Arc<dyn CameraDevice>,
        scope: GateScope,
        kind: QueueKind,
    ) -> (Self, GateHandle) {
        let kind = if GateState::can_show(&scope, kind) {
            kind
        } else {
            warn!(
                target: "gate::session",
                event = %scope.event_id,
                "check-out queue needs a session area; opening check-in"
            );
            QueueKind::NeedsCheckIn
        };

        let (command_tx, commands) = mpsc::channel(COMMAND_CAPACITY);
        let (events, _) = broadcast::channel(settings.event_capacity);
        let coordinator = MutationCoordinator::new(source.clone());

        let handle = GateHandle {
            commands: command_tx,
            events: events.clone(),
        };
        let session = Self {
            state: GateState::new(scope, kind, settings.page_size),
            search: SearchAggregator::new(
                source.clone(),
                settings.page_size,
                settings.search_concurrency,
            ),
            bulk: BulkOperationExecutor::new(
                coordinator.clone(),
                settings.batched_check_in,
            ),
            coordinator,
            scanner: QrScanDispatcher::new(camera),
            scan_wanted: false,
            badge: None,
            tasks: JoinSet::new(),
            commands,
            events,
            source,
            settings,
        };
        (session, handle)
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        info!(
            target: "gate::session",
            event = %self.state.scope().event_id,
            queue = %self.state.kind(),
            "gate session started"
        );
        self.restart_badge();
        self.reload();

        loop {
            let step = tokio::select! {
                command = self.commands.recv() => Step::Command(command),
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    Step::Task(joined)
                }
                code = self.scanner.next_decode(), if self.scanner.is_active() => {
                    Step::Decode(code)
                }
            };

            match step {
                Step::Command(None | Some(GateCommand::Shutdown)) => break,
                Step::Command(Some(command)) => self.on_command(command),
                Step::Task(Ok(completion)) => self.on_completion(completion),
                Step::Task(Err(err)) => {
                    if !err.is_cancelled() {
                        warn!(
                            target: "gate::session",
                            error = %err,
                            "session task failed"
                        );
                    }
                }
                Step::Decode(Some(code)) => self.on_decode(code),
                Step::Decode(None) => {
                    self.scan_wanted = false;
                    self.emit(GateEvent::ScanStopped);
                }
            }
        }

        self.teardown();
    }

    fn teardown(&mut self) {
        self.scan_wanted = false;
        if self.scanner.stop() {
            self.emit(GateEvent::ScanStopped);
        }
        if let Some(mut badge) = self.badge.take() {
            badge.stop();
        }
        self.tasks.abort_all();
        info!(target: "gate::session", "gate session closed");
        self.emit(GateEvent::Closed);
    }

    fn emit(&self, event: GateEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn notify(&self, notice: Notice) {
        self.emit(GateEvent::Notice(notice));
    }

    fn publish_queue(&self) {
        self.emit(GateEvent::QueueUpdated(
            self.state.snapshot(self.coordinator.pending()),
        ));
    }

    fn publish_selection(&self) {
        self.emit(GateEvent::SelectionChanged(self.state.selection.to_vec()));
    }

    fn on_command(&mut self, command: GateCommand) {
        debug!(target: "gate::session", ?command, "command");
        match command {
            GateCommand::Refresh => self.reload(),
            GateCommand::FetchPage(page) => {
                self.state.page = page.max(1);
                self.reload();
            }
            GateCommand::SetQuery(query) => self.set_query(query),
            GateCommand::SwitchQueue(kind) => self.switch_queue(kind),
            GateCommand::SwitchGate(gate) => self.switch_gate(gate),
            GateCommand::Toggle(id) => {
                if self.state.selection.toggle(&id, &self.state.view) {
                    self.publish_selection();
                }
            }
            GateCommand::SelectAll => {
                if self.state.selection.select_all(&self.state.view) {
                    self.publish_selection();
                }
            }
            GateCommand::ClearSelection => {
                if self.state.selection.clear() {
                    self.publish_selection();
                }
            }
            GateCommand::CheckIn(id) => {
                self.mutate_one(id, MutationKind::CheckIn);
            }
            GateCommand::CheckOut(id) => {
                self.mutate_one(id, MutationKind::CheckOut);
            }
            GateCommand::BulkMutate => self.bulk_mutate(),
            GateCommand::StartScan => self.start_scan(),
            GateCommand::StopScan => {
                self.scan_wanted = false;
                if self.scanner.stop() {
                    self.emit(GateEvent::ScanStopped);
                }
            }
            // Handled by the run loop.
            GateCommand::Shutdown => {}
        }
    }

    fn on_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Loaded { token, result } => self.on_loaded(token, result),
            Completion::DebounceElapsed { generation, query } => {
                if !self.state.is_current_debounce(generation) {
                    return;
                }
                let query = query.trim();
                self.state.query =
                    (!query.is_empty()).then(|| query.to_string());
                self.reload();
            }
            Completion::Mutation {
                request,
                result,
                from_scan,
            } => {
                self.on_mutation(request, result);
                if from_scan {
                    self.resume_scan();
                }
            }
            Completion::Bulk(report) => self.on_bulk(report),
        }
    }

    /// Fetch the current page again, or re-run the active search. Any
    /// outstanding load is superseded.
    fn reload(&mut self) {
        let token = self.state.view.issue_token();
        let scope = self.state.scope().clone();
        let kind = self.state.kind();
        let request = self.state.page_request();

        match self.state.query.clone() {
            Some(query) => {
                let search = self.search.clone();
                self.tasks.spawn(async move {
                    let result =
                        search.search(&scope, kind, &query, request).await;
                    Completion::Loaded { token, result }
                });
            }
            None => {
                let source = self.source.clone();
                self.tasks.spawn(async move {
                    let result = source.fetch_page(&scope, kind, request).await;
                    Completion::Loaded { token, result }
                });
            }
        }
    }

    fn on_loaded(
        &mut self,
        token: RequestToken,
        result: Result<Page<AttendeeRecord>, RosterError>,
    ) {
        match result {
            Ok(page) => {
                if !self.state.view.apply_page(token, page) {
                    return;
                }
                self.state.page = self.state.view.pagination().current_page;
                let pruned = self.state.selection.prune(&self.state.view);
                self.publish_queue();
                if pruned {
                    self.publish_selection();
                }
            }
            Err(err) if self.state.view.is_current(token) => {
                warn!(target: "gate::roster", error = %err, "queue load failed");
                self.notify(Notice::failure(err.kind(), err.to_string()));
            }
            Err(err) => {
                debug!(
                    target: "gate::roster",
                    token = token.get(),
                    error = %err,
                    "superseded load failed"
                );
            }
        }
    }

    fn set_query(&mut self, query: String) {
        let generation = self.state.bump_debounce();
        // Whatever was in flight answers a query the operator is no longer
        // looking at.
        self.state.view.issue_token();
        self.state.page = 1;

        let delay = self.settings.search_debounce;
        self.tasks.spawn(async move {
            tokio::time::sleep(delay).await;
            Completion::DebounceElapsed { generation, query }
        });
    }

    fn switch_queue(&mut self, kind: QueueKind) {
        let scope = self.state.scope().clone();
        if !GateState::can_show(&scope, kind) {
            self.notify(Notice::failure(
                ErrorKind::Validation,
                "the check-out queue needs a session area",
            ));
            return;
        }
        if kind == self.state.kind() {
            return;
        }

        if self.state.switch(scope, kind) {
            self.publish_selection();
        }
        self.publish_queue();
        self.reload();
    }

    fn switch_gate(&mut self, gate: Gate) {
        self.scan_wanted = false;
        if self.scanner.stop() {
            self.emit(GateEvent::ScanStopped);
        }

        let scope = gate.scope();
        let kind = if GateState::can_show(&scope, self.state.kind()) {
            self.state.kind()
        } else {
            QueueKind::NeedsCheckIn
        };
        info!(
            target: "gate::session",
            gate = %gate.id,
            event = %scope.event_id,
            queue = %kind,
            "switching gate"
        );

        if self.state.switch(scope, kind) {
            self.publish_selection();
        }
        self.publish_queue();
        self.restart_badge();
        self.reload();
    }

    fn restart_badge(&mut self) {
        if let Some(mut badge) = self.badge.take() {
            badge.stop();
        }
        let Some(interval) = self.settings.badge_interval else {
            return;
        };

        let events = self.events.clone();
        self.badge = Some(BadgePoller::spawn(
            self.source.clone(),
            self.state.scope().clone(),
            interval,
            move |count| {
                let _ = events.send(GateEvent::BadgeCount(count));
            },
        ));
    }

    fn mutate_one(&mut self, id: AttendeeId, kind: MutationKind) {
        let Some(record) = self.state.view.find(&id).cloned() else {
            let err = MutationError::NotInQueue(id.clone());
            self.emit(GateEvent::MutationFailed {
                id,
                kind,
                notice: Notice::failure(err.kind(), err.to_string()),
            });
            return;
        };

        let request = MutationRequest::for_queue(
            record,
            self.state.kind(),
            self.state.scope().clone(),
        );
        if request.kind != kind {
            self.emit(GateEvent::MutationFailed {
                id,
                kind,
                notice: Notice::failure(
                    ErrorKind::Validation,
                    format!(
                        "{kind} is not available on the {} queue",
                        self.state.kind()
                    ),
                ),
            });
            return;
        }

        self.dispatch(request, false);
    }

    /// Lock and send `request` in the background. Returns whether a request
    /// was actually sent.
    fn dispatch(&mut self, request: MutationRequest, from_scan: bool) -> bool {
        let guard = match self.coordinator.begin(&request) {
            Ok(Some(guard)) => guard,
            Ok(None) => {
                self.emit(GateEvent::MutationIgnored {
                    id: request.attendee.id,
                });
                return false;
            }
            Err(err) => {
                self.emit(GateEvent::MutationFailed {
                    id: request.attendee.id,
                    kind: request.kind,
                    notice: Notice::failure(err.kind(), err.to_string()),
                });
                return false;
            }
        };

        let coordinator = self.coordinator.clone();
        self.tasks.spawn(async move {
            let result = coordinator.execute(guard, &request).await;
            Completion::Mutation {
                request,
                result,
                from_scan,
            }
        });
        self.publish_queue();
        true
    }

    fn on_mutation(
        &mut self,
        request: MutationRequest,
        result: Result<MutationOutcome, MutationError>,
    ) {
        let settled = MutationCoordinator::settle(
            &mut self.state.view,
            &mut self.state.selection,
            &request,
            &result,
        );

        let id = request.attendee.id.clone();
        match &result {
            Ok(MutationOutcome::Applied) => {
                self.emit(GateEvent::MutationApplied {
                    id,
                    kind: request.kind,
                })
            }
            Ok(MutationOutcome::Ignored) => {
                self.emit(GateEvent::MutationIgnored { id })
            }
            Err(err) => self.emit(GateEvent::MutationFailed {
                id,
                kind: request.kind,
                notice: Notice::failure(err.kind(), err.to_string()),
            }),
        }

        // Pending markers changed either way.
        self.publish_queue();
        if settled.selection_changed {
            self.publish_selection();
        }
        if matches!(result, Ok(MutationOutcome::Applied)) {
            self.reload();
        }
    }

    fn bulk_mutate(&mut self) {
        if self.state.selection.is_empty() {
            self.notify(Notice::info("nothing selected"));
            return;
        }

        let plan = BulkOperationExecutor::plan(
            self.state.selection.ids(),
            &self.state.view,
        );
        info!(
            target: "gate::bulk",
            kind = %plan.kind,
            count = plan.requests.len() + plan.rejected.len(),
            "bulk run started"
        );
        let bulk = self.bulk.clone();
        self.tasks
            .spawn(async move { Completion::Bulk(bulk.execute(plan).await) });
    }

    fn on_bulk(&mut self, report: BulkReport) {
        report.apply(&mut self.state.view, &mut self.state.selection);
        self.publish_queue();
        self.publish_selection();

        let notice = if report.is_clean() {
            Notice::info(report.summary())
        } else {
            let kind = report
                .failed
                .first()
                .map(|failure| failure.error.kind())
                .unwrap_or(ErrorKind::Server);
            Notice::failure(kind, report.summary())
        };
        let reconcile = !report.succeeded.is_empty();
        self.emit(GateEvent::BulkCompleted(report));
        self.notify(notice);

        if reconcile {
            self.reload();
        }
    }

    fn start_scan(&mut self) {
        self.scan_wanted = true;
        match self.scanner.start() {
            Ok(()) => self.emit(GateEvent::ScanStarted),
            Err(err) => {
                self.scan_wanted = self.scanner.is_active();
                self.notify(Notice::failure(err.kind(), err.to_string()));
            }
        }
    }

    fn on_decode(&mut self, code: String) {
        debug!(target: "gate::scan", code = %code, "code decoded");
        let sent = match QrScanDispatcher::resolve(&code, &self.state.view) {
            Ok(request) => self.dispatch(request, true),
            Err(err) => {
                self.notify(Notice::failure(err.kind(), err.to_string()));
                self.emit(GateEvent::ScanRejected { code });
                false
            }
        };

        if !sent {
            self.resume_scan();
        }
    }

    /// Re-arm the camera after a decode has been dealt with, unless the
    /// operator stopped scanning in the meantime.
    fn resume_scan(&mut self) {
        if !self.scan_wanted || self.scanner.is_active() {
            return;
        }
        if !self.settings.resume_scan_after_decode {
            self.scan_wanted = false;
            self.emit(GateEvent::ScanStopped);
            return;
        }
        match self.scanner.start() {
            Ok(()) => self.emit(GateEvent::ScanStarted),
            Err(err) => {
                self.scan_wanted = false;
                self.notify(Notice::failure(err.kind(), err.to_string()));
                self.emit(GateEvent::ScanStopped);
            }
        }
    }
}

/// Cheap, cloneable entry point to a running [`GateSession`].
#[derive(Debug, Clone)]
pub struct GateHandle {
    commands: mpsc::Sender<GateCommand>,
    events: broadcast::Sender<GateEvent>,
}

impl GateHandle {
    pub async fn send(&self, command: GateCommand) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::Closed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GateEvent> {
        self.events.subscribe()
    }

    /// Ask the session to stop. Stopping one that has already closed is a
    /// no-op.
    pub async fn shutdown(&self) {
        if self.send(GateCommand::Shutdown).await.is_err() {
            debug!(target: "gate::session", "shutdown requested after close");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}
