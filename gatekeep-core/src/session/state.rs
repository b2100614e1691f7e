use gatekeep_model::{GateScope, PageRequest, QueueKind};

use crate::mutation::PendingMutations;
use crate::queue::{QueueView, SelectionSet};

use super::messages::QueueSnapshot;

/// Everything a gate session knows. Only the session task writes to it.
#[derive(Debug, Clone)]
pub struct GateState {
    pub view: QueueView,
    pub selection: SelectionSet,
    /// Query the displayed results were searched with.
    pub query: Option<String>,
    pub page: u32,
    page_size: u32,
    debounce_generation: u64,
}

impl GateState {
    pub fn new(scope: GateScope, kind: QueueKind, page_size: u32) -> Self {
        Self {
            view: QueueView::new(scope, kind),
            selection: SelectionSet::new(),
            query: None,
            page: 1,
            page_size: page_size.max(1),
            debounce_generation: 0,
        }
    }

    pub fn scope(&self) -> &GateScope {
        self.view.scope()
    }

    pub fn kind(&self) -> QueueKind {
        self.view.kind()
    }

    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.page_size)
    }

    /// Check-out queues are area scoped.
    pub fn can_show(scope: &GateScope, kind: QueueKind) -> bool {
        kind == QueueKind::NeedsCheckIn || scope.session_area_id.is_some()
    }

    /// Start a new debounce window; earlier windows become stale.
    pub fn bump_debounce(&mut self) -> u64 {
        self.debounce_generation += 1;
        self.debounce_generation
    }

    pub fn is_current_debounce(&self, generation: u64) -> bool {
        self.debounce_generation == generation
    }

    /// Point the state at another scope or queue. Returns whether the
    /// selection had to be cleared.
    pub fn switch(&mut self, scope: GateScope, kind: QueueKind) -> bool {
        self.view.reset(scope, kind);
        self.page = 1;
        self.selection.clear()
    }

    pub fn snapshot(&self, pending: &PendingMutations) -> QueueSnapshot {
        QueueSnapshot {
            scope: self.scope().clone(),
            kind: self.kind(),
            query: self.query.clone(),
            records: self.view.records().to_vec(),
            pagination: self.view.pagination(),
            pending: self
                .view
                .ids()
                .filter(|id| pending.is_pending(id))
                .cloned()
                .collect(),
        }
    }
}
