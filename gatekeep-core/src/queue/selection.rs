use std::collections::BTreeSet;

use gatekeep_model::AttendeeId;

use super::QueueView;

/// Attendee ids marked for the next bulk action.
///
/// Always a subset of the ids the view currently shows: ids that are not
/// visible cannot be toggled on, and [`SelectionSet::prune`] drops ids that
/// have left the view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    ids: BTreeSet<AttendeeId>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> &BTreeSet<AttendeeId> {
        &self.ids
    }

    pub fn contains(&self, id: &AttendeeId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Flip `id`. Returns whether the set changed.
    pub fn toggle(&mut self, id: &AttendeeId, view: &QueueView) -> bool {
        if self.ids.remove(id) {
            return true;
        }
        if !view.contains(id) {
            return false;
        }
        self.ids.insert(id.clone())
    }

    /// Select every id on the current page, or deselect them all when they
    /// are already selected. Never reaches past the loaded page.
    pub fn select_all(&mut self, view: &QueueView) -> bool {
        let visible = view.ids().cloned().collect::<BTreeSet<_>>();
        if visible.is_empty() {
            return false;
        }
        if visible.is_subset(&self.ids) {
            self.ids.retain(|id| !visible.contains(id));
        } else {
            self.ids.extend(visible);
        }
        true
    }

    pub fn clear(&mut self) -> bool {
        let changed = !self.ids.is_empty();
        self.ids.clear();
        changed
    }

    /// Drop ids the view no longer shows. Returns whether anything was
    /// dropped.
    pub fn prune(&mut self, view: &QueueView) -> bool {
        let before = self.ids.len();
        self.ids.retain(|id| view.contains(id));
        self.ids.len() != before
    }

    /// Keep exactly `ids`, restricted to what the view shows.
    pub fn retain_only<'a>(
        &mut self,
        ids: impl IntoIterator<Item = &'a AttendeeId>,
        view: &QueueView,
    ) -> bool {
        let next = ids
            .into_iter()
            .filter(|id| view.contains(id))
            .cloned()
            .collect::<BTreeSet<_>>();
        let changed = next != self.ids;
        self.ids = next;
        changed
    }

    pub fn to_vec(&self) -> Vec<AttendeeId> {
        self.ids.iter().cloned().collect()
    }
}
