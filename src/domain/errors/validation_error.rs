//! Task form validation errors.

use thiserror::Error;

/// Rule violated by a task draft.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum TaskValidationError {
    #[error("title is required")]
    EmptyTitle,

    #[error("title is {len} characters, the limit is {max}")]
    TitleTooLong { len: usize, max: usize },

    #[error("description is {len} characters, the limit is {max}")]
    DescriptionTooLong { len: usize, max: usize },

    #[error("deadline is required")]
    MissingDeadline,

    #[error("deadline '{value}' is not a date (expected YYYY-MM-DD)")]
    InvalidDeadline { value: String },

    #[error("you must be logged in to add a task")]
    NotSignedIn,
}
