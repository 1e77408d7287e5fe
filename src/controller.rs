#![forbid(unsafe_code)]

//! The task list state machine.
//!
//! The controller owns the store, the pending-delete selection and the
//! generation request flags. Manual intents are synchronous; generation is
//! split into [`TaskListController::begin_generation`] and
//! [`TaskListController::finish_generation`] so the UI can run the network
//! call off its event loop, with [`TaskListController::generate`] doing both
//! halves in one await.

use crate::ai::{GeneratedTask, GenerationError, TaskGenerator};
use crate::task::model::Task;
use crate::task::store::TaskStore;

type Observer = Box<dyn FnMut(&TaskListController) + Send>;

/// Proof that a generation was admitted; consumed by `finish_generation`.
#[derive(Debug)]
#[must_use]
pub struct GenerationTicket {
    goal: String,
}

impl GenerationTicket {
    #[must_use]
    pub fn goal(&self) -> &str {
        &self.goal
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// Request was not sent: blank goal or one already in flight.
    Ignored,
    Appended(usize),
    Failed(String),
}

#[derive(Default)]
pub struct TaskListController {
    store: TaskStore,
    goal: String,
    is_loading: bool,
    last_error: Option<String>,
    observer: Option<Observer>,
}

impl std::fmt::Debug for TaskListController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskListController")
            .field("store", &self.store)
            .field("goal", &self.goal)
            .field("is_loading", &self.is_loading)
            .field("last_error", &self.last_error)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl TaskListController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the observer; it runs after every state change.
    pub fn subscribe(&mut self, observer: impl FnMut(&TaskListController) + Send + 'static) {
        self.observer = Some(Box::new(observer));
    }

    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        self.store.tasks()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.store.completed_count()
    }

    #[must_use]
    pub fn pending_deletion(&self) -> Option<&Task> {
        self.store.pending_delete()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    #[must_use]
    pub fn goal(&self) -> &str {
        &self.goal
    }

    /// Goal input is frozen while a request is outstanding.
    pub fn set_goal(&mut self, goal: impl Into<String>) {
        let goal = goal.into();
        if self.is_loading || goal == self.goal {
            return;
        }
        self.goal = goal;
        self.notify();
    }

    pub fn add_task(&mut self, text: &str, due_date: Option<String>) {
        let Some(task) = self.store.add(text, due_date) else {
            return;
        };
        tracing::debug!(id = %task.id, "task added");
        self.notify();
    }

    pub fn toggle_task(&mut self, id: &str) {
        if self.store.toggle(id) {
            self.notify();
        }
    }

    pub fn update_task(&mut self, id: &str, new_text: &str) {
        if self.store.update_text(id, new_text) {
            self.notify();
        }
    }

    pub fn request_delete(&mut self, id: &str) {
        if self.store.request_delete(id) {
            self.notify();
        }
    }

    pub fn confirm_delete(&mut self) {
        if let Some(task) = self.store.confirm_delete() {
            tracing::debug!(id = %task.id, "task deleted");
            self.notify();
        }
    }

    pub fn cancel_delete(&mut self) {
        if self.store.cancel_delete() {
            self.notify();
        }
    }

    pub fn clear_all(&mut self) {
        let had_pending = self.store.pending_delete().is_some();
        let removed = self.store.clear();
        if removed > 0 || had_pending {
            tracing::debug!(removed, "cleared all tasks");
            self.notify();
        }
    }

    /// `Idle -> Requesting`. Returns `None`, touching nothing, when the goal
    /// is blank or a request is already in flight.
    pub fn begin_generation(&mut self, goal: &str) -> Option<GenerationTicket> {
        let goal = goal.trim();
        if goal.is_empty() || self.is_loading {
            return None;
        }
        self.is_loading = true;
        self.last_error = None;
        tracing::info!(goal, "generation started");
        self.notify();
        Some(GenerationTicket {
            goal: goal.to_owned(),
        })
    }

    /// `Requesting -> Idle`. A successful batch is appended in one step and
    /// clears the goal input; a failure only records the message.
    pub fn finish_generation(
        &mut self,
        ticket: GenerationTicket,
        result: Result<Vec<GeneratedTask>, GenerationError>,
    ) -> GenerationOutcome {
        let GenerationTicket { goal } = ticket;
        let outcome = match result {
            Ok(batch) => {
                let added = self.store.append_generated(batch);
                self.goal.clear();
                tracing::info!(goal = %goal, added, "generation finished");
                GenerationOutcome::Appended(added)
            }
            Err(e) => {
                let msg = e.to_string();
                tracing::warn!(goal = %goal, error = %msg, "generation failed");
                self.last_error = Some(msg.clone());
                GenerationOutcome::Failed(msg)
            }
        };
        self.is_loading = false;
        self.notify();
        outcome
    }

    /// Runs one generation to completion against `generator`.
    pub async fn generate(
        &mut self,
        generator: &dyn TaskGenerator,
        goal: &str,
    ) -> GenerationOutcome {
        let Some(ticket) = self.begin_generation(goal) else {
            return GenerationOutcome::Ignored;
        };
        let result = generator.generate(ticket.goal()).await;
        self.finish_generation(ticket, result)
    }

    /// Generates from the stored goal input.
    pub async fn generate_from_input(&mut self, generator: &dyn TaskGenerator) -> GenerationOutcome {
        let goal = self.goal.clone();
        self.generate(generator, &goal).await
    }

    fn notify(&mut self) {
        if let Some(mut observer) = self.observer.take() {
            observer(self);
            self.observer = Some(observer);
        }
    }
}
