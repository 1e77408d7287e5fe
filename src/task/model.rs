#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub text: String,
    pub completed: bool,
    /// `YYYY-MM-DD`, kept exactly as it was supplied.
    #[serde(default)]
    pub due_date: Option<String>,
}

impl Task {
    /// Builds an open task with a fresh id. Callers are responsible for
    /// rejecting empty text before getting here.
    #[must_use]
    pub fn new(text: impl Into<String>, due_date: Option<String>) -> Self {
        Self {
            id: Self::new_id(),
            text: text.into(),
            completed: false,
            due_date,
        }
    }

    #[must_use]
    pub fn new_id() -> String {
        Uuid::new_v4().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_task_is_open_with_unique_id() {
        let a = Task::new("Book hotel", Some("2025-03-01".to_owned()));
        let b = Task::new("Book hotel", None);
        assert!(!a.completed);
        assert_eq!(a.due_date.as_deref(), Some("2025-03-01"));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn serializes_with_camel_case_due_date() {
        let t = Task {
            id: "abc".to_owned(),
            text: "Pack bags".to_owned(),
            completed: false,
            due_date: None,
        };
        let v = serde_json::to_value(&t).unwrap();
        assert_eq!(v["dueDate"], serde_json::Value::Null);
        assert_eq!(v["text"], "Pack bags");
    }
}
