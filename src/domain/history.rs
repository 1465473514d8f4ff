//! View history
//!
//! Remembers which items were retrieved by id, oldest first, with at most
//! one entry per id: re-viewing an item moves it to the most-recent slot.
//! Entries are snapshots taken at view time, so a later update does not
//! rewrite what was seen. The core keeps no capacity bound; callers that
//! want one truncate the snapshot themselves.

use super::item::{ItemId, WorkItem};

#[derive(Debug, Default)]
pub struct History {
    entries: Vec<WorkItem>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a view, moving an already-present id to the most-recent
    /// position instead of duplicating it.
    pub fn record(&mut self, item: WorkItem) {
        self.remove(item.id());
        self.entries.push(item);
    }

    /// Drops the entry for `id`. Absent ids are ignored.
    pub fn remove(&mut self, id: ItemId) {
        self.entries.retain(|entry| entry.id() != id);
    }

    /// Returns the recorded views, oldest first
    pub fn snapshot(&self) -> Vec<WorkItem> {
        self.entries.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::item::Task;

    fn view(id: ItemId) -> WorkItem {
        WorkItem::Task(Task::new(id, format!("Task {}", id), ""))
    }

    #[test]
    fn records_in_view_order() {
        let mut history = History::new();
        history.record(view(1));
        history.record(view(2));
        history.record(view(3));

        let ids: Vec<_> = history.snapshot().iter().map(|item| item.id()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn reviewing_moves_to_most_recent() {
        let mut history = History::new();
        history.record(view(1));
        history.record(view(2));
        history.record(view(1));

        let ids: Vec<_> = history.snapshot().iter().map(|item| item.id()).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn remove_is_total() {
        let mut history = History::new();
        history.record(view(1));

        history.remove(1);
        assert!(history.is_empty());

        // Removing an absent id is a no-op
        history.remove(42);
        assert!(history.is_empty());
    }

    #[test]
    fn snapshot_keeps_viewed_state() {
        let mut task = Task::new(1, "Before", "");
        let mut history = History::new();
        history.record(WorkItem::Task(task.clone()));

        // Mutating the caller's copy must not rewrite the history
        task.title = "After".to_string();
        assert_eq!(history.snapshot()[0].title(), "Before");
    }
}
