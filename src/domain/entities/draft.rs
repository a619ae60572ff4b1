//! Task form model and validation.

use chrono::NaiveDate;

use super::task::{Category, Task, TaskFields};
use crate::domain::errors::TaskValidationError;

const DEADLINE_FORMAT: &str = "%Y-%m-%d";

/// Unvalidated task form contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub deadline: String,
}

impl TaskDraft {
    /// Creates an empty draft in the default category.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefills a draft from an existing task for editing.
    #[must_use]
    pub fn from_task(task: &Task) -> Self {
        Self {
            title: task.title().to_string(),
            description: task.description().to_string(),
            category: task.category(),
            deadline: task
                .deadline()
                .map(|d| d.format(DEADLINE_FORMAT).to_string())
                .unwrap_or_default(),
        }
    }

    /// Validates the draft.
    ///
    /// New tasks must carry a deadline; edits may clear it.
    ///
    /// # Errors
    /// Returns the first failing rule.
    pub fn validate(&self, deadline_required: bool) -> Result<TaskFields, TaskValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(TaskValidationError::EmptyTitle);
        }

        let title_len = title.chars().count();
        if title_len > Task::MAX_TITLE_LEN {
            return Err(TaskValidationError::TitleTooLong {
                len: title_len,
                max: Task::MAX_TITLE_LEN,
            });
        }

        let description = self.description.trim();
        let description_len = description.chars().count();
        if description_len > Task::MAX_DESCRIPTION_LEN {
            return Err(TaskValidationError::DescriptionTooLong {
                len: description_len,
                max: Task::MAX_DESCRIPTION_LEN,
            });
        }

        let deadline = parse_deadline(&self.deadline)?;
        if deadline_required && deadline.is_none() {
            return Err(TaskValidationError::MissingDeadline);
        }

        Ok(TaskFields {
            title: title.to_string(),
            description: description.to_string(),
            category: self.category,
            deadline,
        })
    }
}

/// Parses a `YYYY-MM-DD` deadline; blank input means no deadline.
///
/// # Errors
/// Returns `InvalidDeadline` for non-blank input that is not a calendar date.
pub fn parse_deadline(value: &str) -> Result<Option<NaiveDate>, TaskValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }

    NaiveDate::parse_from_str(value, DEADLINE_FORMAT)
        .map(Some)
        .map_err(|_| TaskValidationError::InvalidDeadline {
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(title: &str, description: &str, deadline: &str) -> TaskDraft {
        TaskDraft {
            title: title.to_string(),
            description: description.to_string(),
            category: Category::InProgress,
            deadline: deadline.to_string(),
        }
    }

    #[test]
    fn test_valid_draft() {
        let fields = draft("  Buy milk ", "two litres", "2025-06-01")
            .validate(true)
            .unwrap();

        assert_eq!(fields.title, "Buy milk");
        assert_eq!(fields.category, Category::InProgress);
        assert_eq!(fields.deadline, NaiveDate::from_ymd_opt(2025, 6, 1));
    }

    #[test]
    fn test_empty_title_rejected() {
        let result = draft("   ", "", "2025-06-01").validate(true);
        assert_eq!(result, Err(TaskValidationError::EmptyTitle));
    }

    #[test]
    fn test_title_limit_counts_characters() {
        let at_limit = "é".repeat(Task::MAX_TITLE_LEN);
        assert!(draft(&at_limit, "", "2025-06-01").validate(true).is_ok());

        let over = "x".repeat(Task::MAX_TITLE_LEN + 1);
        assert!(matches!(
            draft(&over, "", "2025-06-01").validate(true),
            Err(TaskValidationError::TitleTooLong { len: 51, max: 50 })
        ));
    }

    #[test]
    fn test_description_limit() {
        let over = "d".repeat(Task::MAX_DESCRIPTION_LEN + 1);
        assert!(matches!(
            draft("t", &over, "2025-06-01").validate(true),
            Err(TaskValidationError::DescriptionTooLong { .. })
        ));
    }

    #[test]
    fn test_deadline_required_for_new_tasks() {
        assert_eq!(
            draft("t", "", "").validate(true),
            Err(TaskValidationError::MissingDeadline)
        );
        assert_eq!(draft("t", "", "").validate(false).unwrap().deadline, None);
    }

    #[test]
    fn test_invalid_deadline() {
        assert!(matches!(
            draft("t", "", "2025-02-30").validate(false),
            Err(TaskValidationError::InvalidDeadline { .. })
        ));
        assert!(matches!(
            draft("t", "", "tomorrow").validate(false),
            Err(TaskValidationError::InvalidDeadline { .. })
        ));
    }

    #[test]
    fn test_from_task_round_trips_fields() {
        let task = Task::new("1", "Plan", Category::Done, "a@b.c")
            .with_description("sprint")
            .with_deadline(NaiveDate::from_ymd_opt(2024, 12, 31));

        let draft = TaskDraft::from_task(&task);
        assert_eq!(draft.deadline, "2024-12-31");
        assert_eq!(draft.validate(false).unwrap(), task.fields());
    }
}
