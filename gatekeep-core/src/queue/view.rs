use std::collections::HashMap;

use tracing::debug;

use gatekeep_model::{AttendeeId, AttendeeRecord, GateScope, Page, QueueKind};

/// Monotonic ticket handed to every fetch or search. Only the newest ticket
/// may publish into the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// The currently materialized slice of one queue for one gate scope.
///
/// Records removed optimistically stay hidden from results of requests that
/// were already outstanding when the removal happened; the first fetch
/// issued afterwards is authoritative.
#[derive(Debug, Clone)]
pub struct QueueView {
    scope: GateScope,
    kind: QueueKind,
    records: Vec<AttendeeRecord>,
    current_page: u32,
    total_pages: u32,
    total_count: u64,
    latest: u64,
    /// attendee -> newest token that was outstanding at removal time
    suppressed: HashMap<AttendeeId, u64>,
}

/// Pagination metadata for pagers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_count: u64,
}

impl QueueView {
    pub fn new(scope: GateScope, kind: QueueKind) -> Self {
        Self {
            scope,
            kind,
            records: Vec::new(),
            current_page: 1,
            total_pages: 0,
            total_count: 0,
            latest: 0,
            suppressed: HashMap::new(),
        }
    }

    pub fn scope(&self) -> &GateScope {
        &self.scope
    }

    pub fn kind(&self) -> QueueKind {
        self.kind
    }

    pub fn records(&self) -> &[AttendeeRecord] {
        &self.records
    }

    pub fn ids(&self) -> impl Iterator<Item = &AttendeeId> {
        self.records.iter().map(|record| &record.id)
    }

    pub fn contains(&self, id: &AttendeeId) -> bool {
        self.find(id).is_some()
    }

    pub fn find(&self, id: &AttendeeId) -> Option<&AttendeeRecord> {
        self.records.iter().find(|record| &record.id == id)
    }

    pub fn pagination(&self) -> Pagination {
        Pagination {
            current_page: self.current_page,
            total_pages: self.total_pages,
            total_count: self.total_count,
        }
    }

    /// Issue a token for a new fetch. Every earlier token becomes stale.
    pub fn issue_token(&mut self) -> RequestToken {
        self.latest += 1;
        RequestToken(self.latest)
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        token.0 == self.latest
    }

    /// Replace the contents with a fetched page. Returns `false`, leaving the
    /// view untouched, when `token` has been superseded.
    pub fn apply_page(
        &mut self,
        token: RequestToken,
        page: Page<AttendeeRecord>,
    ) -> bool {
        if !self.is_current(token) {
            debug!(
                target: "gate::session",
                token = token.0,
                latest = self.latest,
                "discarding superseded page"
            );
            return false;
        }

        // Removals made after this request went out still win; older ones
        // are settled by this fetch.
        self.suppressed.retain(|_, epoch| *epoch >= token.0);

        let before = page.records.len();
        let records = page
            .records
            .into_iter()
            .filter(|record| self.kind.admits(record, &self.scope))
            .filter(|record| !self.suppressed.contains_key(&record.id))
            .collect::<Vec<_>>();
        let hidden = (before - records.len()) as u64;

        self.records = records;
        self.current_page = page.current_page;
        self.total_pages = page.total_pages;
        self.total_count = page.total_count.saturating_sub(hidden);
        true
    }

    /// Drop `id` from the view without waiting for a refetch.
    pub fn apply_optimistic_removal(&mut self, id: &AttendeeId) -> bool {
        self.suppressed.insert(id.clone(), self.latest);
        let before = self.records.len();
        self.records.retain(|record| &record.id != id);
        let removed = self.records.len() != before;
        if removed {
            self.total_count = self.total_count.saturating_sub(1);
        }
        removed
    }

    /// Undo an optimistic removal. The record is only reinserted when it was
    /// removed from this view, still belongs to this queue and is not
    /// already shown.
    pub fn apply_optimistic_restore(&mut self, record: AttendeeRecord) -> bool {
        if self.suppressed.remove(&record.id).is_none()
            || self.contains(&record.id)
            || !self.kind.admits(&record, &self.scope)
        {
            return false;
        }
        self.records.push(record);
        self.total_count += 1;
        true
    }

    /// Point the view at another scope or queue. Outstanding requests are
    /// invalidated and the contents cleared.
    pub fn reset(&mut self, scope: GateScope, kind: QueueKind) {
        self.scope = scope;
        self.kind = kind;
        self.records.clear();
        self.suppressed.clear();
        self.current_page = 1;
        self.total_pages = 0;
        self.total_count = 0;
        self.latest += 1;
    }
}
