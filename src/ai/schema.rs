#![forbid(unsafe_code)]

use serde_json::{Value, json};

use crate::ai::{GenerationError, GeneratedTask};

pub const MIN_STEPS: usize = 5;
pub const MAX_STEPS: usize = 7;

#[must_use]
pub fn build_prompt(goal: &str) -> String {
    format!(
        "Based on the following high-level goal, generate a concise and actionable to-do list of \
         {MIN_STEPS} to {MAX_STEPS} steps. For each task, provide a suggested due date in \
         YYYY-MM-DD format if applicable. If a due date isn't relevant for a specific task, the \
         dueDate can be null. Goal: \"{goal}\""
    )
}

/// Response schema the service is asked to conform to: `{ tasks: [{ task, dueDate? }] }`.
#[must_use]
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "tasks": {
                "type": "ARRAY",
                "description": "A list of actionable tasks to accomplish the goal.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "task": {
                            "type": "STRING",
                            "description": "A single, concise to-do item. Should be a clear action."
                        },
                        "dueDate": {
                            "type": "STRING",
                            "nullable": true,
                            "description": "An optional suggested due date for the task in YYYY-MM-DD format. If a date is not relevant, this can be null."
                        }
                    },
                    "required": ["task"]
                }
            }
        },
        "required": ["tasks"]
    })
}

/// Validates the structured text returned by the service.
///
/// Items without a usable `task` string are dropped; `dueDate` is kept
/// verbatim when it is a non-empty string and becomes `None` otherwise.
pub fn parse_tasks(raw: &str) -> Result<Vec<GeneratedTask>, GenerationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(GenerationError::empty_response());
    }

    let parsed: Value = serde_json::from_str(raw)
        .map_err(|e| GenerationError::malformed(format!("response is not JSON: {e}")))?;

    let Some(items) = parsed.get("tasks").and_then(Value::as_array) else {
        return Err(GenerationError::malformed(
            "response has no `tasks` array".to_owned(),
        ));
    };

    let mut out = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let text = item
            .get("task")
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default();
        if text.is_empty() {
            tracing::warn!(index = idx, "dropping generated item without task text");
            continue;
        }
        let due_date = item
            .get("dueDate")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(ToOwned::to_owned);
        out.push(GeneratedTask {
            text: text.to_owned(),
            due_date,
        });
    }
    Ok(out)
}
