#![forbid(unsafe_code)]

use crate::ai::GeneratedTask;
use crate::task::model::Task;

/// Ordered in-memory task list plus the task awaiting delete confirmation.
///
/// Every mutator returns whether it changed anything so the caller can decide
/// whether observers need to hear about it. Invalid input (blank text, an id
/// that isn't in the list) is ignored rather than reported.
#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
    pending_delete: Option<String>,
}

impl TaskStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.completed).count()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    #[must_use]
    pub fn pending_delete(&self) -> Option<&Task> {
        self.pending_delete.as_deref().and_then(|id| self.get(id))
    }

    pub fn add(&mut self, text: &str, due_date: Option<String>) -> Option<&Task> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let due_date = due_date.filter(|d| !d.trim().is_empty());
        self.tasks.push(Task::new(text, due_date));
        self.tasks.last()
    }

    /// Appends one generated batch as a contiguous run, keeping its order.
    pub fn append_generated(&mut self, batch: Vec<GeneratedTask>) -> usize {
        let before = self.tasks.len();
        self.tasks.extend(
            batch
                .into_iter()
                .map(|g| Task::new(g.text, g.due_date)),
        );
        self.tasks.len() - before
    }

    pub fn toggle(&mut self, id: &str) -> bool {
        let Some(task) = self.get_mut(id) else {
            return false;
        };
        task.completed = !task.completed;
        true
    }

    /// Blank text leaves the task untouched; the editor reverts on its side.
    pub fn update_text(&mut self, id: &str, new_text: &str) -> bool {
        let new_text = new_text.trim();
        if new_text.is_empty() {
            return false;
        }
        let Some(task) = self.get_mut(id) else {
            return false;
        };
        if task.text == new_text {
            return false;
        }
        new_text.clone_into(&mut task.text);
        true
    }

    pub fn request_delete(&mut self, id: &str) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        self.pending_delete = Some(id.to_owned());
        true
    }

    /// Removes the pending task, returning it.
    pub fn confirm_delete(&mut self) -> Option<Task> {
        let id = self.pending_delete.take()?;
        let idx = self.tasks.iter().position(|t| t.id == id)?;
        Some(self.tasks.remove(idx))
    }

    pub fn cancel_delete(&mut self) -> bool {
        self.pending_delete.take().is_some()
    }

    pub fn clear(&mut self) -> usize {
        let removed = self.tasks.len();
        self.tasks.clear();
        self.pending_delete = None;
        removed
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(texts: &[&str]) -> TaskStore {
        let mut store = TaskStore::new();
        for t in texts {
            store.add(t, None);
        }
        store
    }

    fn id_at(store: &TaskStore, idx: usize) -> String {
        store.tasks()[idx].id.clone()
    }

    #[test]
    fn add_appends_open_trimmed_task() {
        let mut store = store_with(&["first"]);
        let added = store
            .add("  Buy groceries ", Some("2025-03-01".to_owned()))
            .cloned()
            .unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(added.text, "Buy groceries");
        assert!(!added.completed);
        assert_eq!(added.due_date.as_deref(), Some("2025-03-01"));
        assert_eq!(store.tasks()[1].id, added.id);
    }

    #[test]
    fn add_rejects_blank_text() {
        let mut store = store_with(&["first"]);
        assert!(store.add("", None).is_none());
        assert!(store.add("   ", Some("2025-03-01".to_owned())).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn add_treats_blank_due_date_as_absent() {
        let mut store = TaskStore::new();
        let t = store.add("x", Some("  ".to_owned())).cloned().unwrap();
        assert_eq!(t.due_date, None);
    }

    #[test]
    fn toggle_twice_restores_state() {
        let mut store = store_with(&["a"]);
        let id = id_at(&store, 0);
        assert!(store.toggle(&id));
        assert!(store.tasks()[0].completed);
        assert!(store.toggle(&id));
        assert!(!store.tasks()[0].completed);
        assert!(!store.toggle("missing"));
    }

    #[test]
    fn update_text_trims_and_rejects_blank() {
        let mut store = store_with(&["old"]);
        let id = id_at(&store, 0);
        assert!(!store.update_text(&id, ""));
        assert!(!store.update_text(&id, "   "));
        assert_eq!(store.tasks()[0].text, "old");
        assert!(store.update_text(&id, "  new  "));
        assert_eq!(store.tasks()[0].text, "new");
        assert!(!store.update_text("missing", "other"));
    }

    #[test]
    fn request_then_cancel_keeps_task() {
        let mut store = store_with(&["a", "b"]);
        let id = id_at(&store, 1);
        assert!(store.request_delete(&id));
        assert_eq!(store.pending_delete().map(|t| t.text.as_str()), Some("b"));
        assert!(store.cancel_delete());
        assert!(store.pending_delete().is_none());
        assert_eq!(store.len(), 2);
        assert!(!store.cancel_delete());
    }

    #[test]
    fn request_then_confirm_removes_exactly_that_task() {
        let mut store = store_with(&["a", "b", "c"]);
        let id = id_at(&store, 1);
        store.request_delete(&id);
        let removed = store.confirm_delete().unwrap();
        assert_eq!(removed.id, id);
        let texts: Vec<&str> = store.tasks().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["a", "c"]);
        assert!(store.pending_delete().is_none());
        assert!(store.confirm_delete().is_none());
    }

    #[test]
    fn second_request_replaces_pending_without_deleting() {
        let mut store = store_with(&["a", "b"]);
        let first = id_at(&store, 0);
        let second = id_at(&store, 1);
        store.request_delete(&first);
        store.request_delete(&second);
        assert_eq!(store.len(), 2);
        assert_eq!(store.pending_delete().map(|t| t.id.clone()), Some(second));
        assert!(!store.request_delete("missing"));
        assert_eq!(store.pending_delete().map(|t| t.text.as_str()), Some("b"));
    }

    #[test]
    fn clear_empties_store_and_pending() {
        let mut store = store_with(&["a", "b", "c"]);
        let id = id_at(&store, 0);
        store.request_delete(&id);
        assert_eq!(store.clear(), 3);
        assert!(store.is_empty());
        assert!(store.pending_delete().is_none());
    }

    #[test]
    fn generated_batch_lands_at_the_end_in_order() {
        let mut store = store_with(&["manual"]);
        let added = store.append_generated(vec![
            GeneratedTask {
                text: "Book hotel".to_owned(),
                due_date: Some("2025-03-01".to_owned()),
            },
            GeneratedTask {
                text: "Pack bags".to_owned(),
                due_date: None,
            },
        ]);
        assert_eq!(added, 2);
        let texts: Vec<&str> = store.tasks().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["manual", "Book hotel", "Pack bags"]);
        assert!(store.tasks().iter().all(|t| !t.completed));
        assert_eq!(store.completed_count(), 0);
    }
}
