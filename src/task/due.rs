#![forbid(unsafe_code)]

//! Calendar helpers for the optional `YYYY-MM-DD` due date on a task.
//!
//! Dates coming back from the generator are stored verbatim, so every helper
//! here tolerates strings that don't parse.

use time::Date;
use time::macros::format_description;

use crate::task::model::Task;

pub fn parse_due_date(s: &str) -> Option<Date> {
    Date::parse(s.trim(), format_description!("[year]-[month]-[day]")).ok()
}

/// Trimmed due-date input; blank means "no due date".
#[must_use]
pub fn normalize_due_input(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_owned())
    }
}

#[must_use]
pub fn is_overdue(task: &Task, today: Date) -> bool {
    if task.completed {
        return false;
    }
    task.due_date
        .as_deref()
        .and_then(parse_due_date)
        .is_some_and(|d| d < today)
}

/// `Mar 1` within the current year, `Mar 1, 2027` otherwise.
#[must_use]
pub fn format_due_date(s: &str, today: Date) -> String {
    let Some(date) = parse_due_date(s) else {
        return s.to_owned();
    };
    let formatted = if date.year() == today.year() {
        date.format(format_description!("[month repr:short] [day padding:none]"))
    } else {
        date.format(format_description!(
            "[month repr:short] [day padding:none], [year]"
        ))
    };
    formatted.unwrap_or_else(|_| s.to_owned())
}

/// Local calendar day, falling back to UTC when the offset can't be read.
#[must_use]
pub fn today() -> Date {
    time::OffsetDateTime::now_local()
        .unwrap_or_else(|_| time::OffsetDateTime::now_utc())
        .date()
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    fn task_due(due: &str, completed: bool) -> Task {
        let mut t = Task::new("x", Some(due.to_owned()));
        t.completed = completed;
        t
    }

    #[test]
    fn parses_strict_iso_dates() {
        assert_eq!(parse_due_date("2025-03-01"), Some(date!(2025 - 03 - 01)));
        assert_eq!(parse_due_date(" 2025-03-01 "), Some(date!(2025 - 03 - 01)));
        assert_eq!(parse_due_date("03/01/2025"), None);
        assert_eq!(parse_due_date("2025-02-30"), None);
        assert_eq!(parse_due_date("next week"), None);
    }

    #[test]
    fn blank_due_input_is_none() {
        assert_eq!(normalize_due_input(""), None);
        assert_eq!(normalize_due_input("   "), None);
        assert_eq!(
            normalize_due_input(" 2025-03-01 ").as_deref(),
            Some("2025-03-01")
        );
    }

    #[test]
    fn overdue_only_for_open_tasks_before_today() {
        let today = date!(2025 - 03 - 10);
        assert!(is_overdue(&task_due("2025-03-09", false), today));
        assert!(!is_overdue(&task_due("2025-03-10", false), today));
        assert!(!is_overdue(&task_due("2025-03-09", true), today));
        assert!(!is_overdue(&task_due("someday", false), today));
        assert!(!is_overdue(&Task::new("x", None), today));
    }

    #[test]
    fn formats_with_year_only_when_it_differs() {
        let today = date!(2025 - 06 - 15);
        assert_eq!(format_due_date("2025-03-01", today), "Mar 1");
        assert_eq!(format_due_date("2026-12-24", today), "Dec 24, 2026");
        assert_eq!(format_due_date("tomorrow", today), "tomorrow");
    }
}
