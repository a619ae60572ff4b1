//! Task entity and related value objects.

use chrono::{DateTime, NaiveDate, Utc};

/// Server-assigned task identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(String);

impl TaskId {
    /// Creates identifier from its wire representation.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns identifier as string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Task workflow category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Category {
    /// Not started.
    #[default]
    ToDo,
    /// Being worked on.
    InProgress,
    /// Finished.
    Done,
}

impl Category {
    /// Every category in board order.
    pub const ALL: [Self; 3] = [Self::ToDo, Self::InProgress, Self::Done];

    /// Returns the label used on the wire and in the UI.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ToDo => "To-Do",
            Self::InProgress => "In Progress",
            Self::Done => "Done",
        }
    }

    /// Parses the wire label.
    #[must_use]
    pub fn from_wire(value: &str) -> Option<Self> {
        match value.trim() {
            "To-Do" => Some(Self::ToDo),
            "In Progress" => Some(Self::InProgress),
            "Done" => Some(Self::Done),
            _ => None,
        }
    }

    /// Returns the path segment of the per-category list endpoint.
    #[must_use]
    pub const fn path_segment(self) -> &'static str {
        match self {
            Self::ToDo => "todo",
            Self::InProgress => "inprogress",
            Self::Done => "done",
        }
    }

    /// Cycles forward, wrapping around.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::ToDo => Self::InProgress,
            Self::InProgress => Self::Done,
            Self::Done => Self::ToDo,
        }
    }

    /// Cycles backward, wrapping around.
    #[must_use]
    pub const fn previous(self) -> Self {
        match self {
            Self::ToDo => Self::Done,
            Self::InProgress => Self::ToDo,
            Self::Done => Self::InProgress,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated user-editable task fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFields {
    /// Task title.
    pub title: String,
    /// Task description.
    pub description: String,
    /// Task category.
    pub category: Category,
    /// Optional deadline.
    pub deadline: Option<NaiveDate>,
}

/// A user-owned task record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    id: TaskId,
    title: String,
    description: String,
    category: Category,
    deadline: Option<NaiveDate>,
    email: String,
    created_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Maximum title length in characters.
    pub const MAX_TITLE_LEN: usize = 50;
    /// Maximum description length in characters.
    pub const MAX_DESCRIPTION_LEN: usize = 200;

    /// Creates a task with the required fields.
    #[must_use]
    pub fn new(
        id: impl Into<TaskId>,
        title: impl Into<String>,
        category: Category,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            category,
            deadline: None,
            email: email.into(),
            created_at: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub const fn with_deadline(mut self, deadline: Option<NaiveDate>) -> Self {
        self.deadline = deadline;
        self
    }

    #[must_use]
    pub const fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    #[must_use]
    pub const fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    /// Returns a copy carrying the edited fields; identity, owner and timestamp are kept.
    #[must_use]
    pub fn with_fields(&self, fields: TaskFields) -> Self {
        Self {
            id: self.id.clone(),
            title: fields.title,
            description: fields.description,
            category: fields.category,
            deadline: fields.deadline,
            email: self.email.clone(),
            created_at: self.created_at,
        }
    }

    #[must_use]
    pub const fn id(&self) -> &TaskId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub const fn category(&self) -> Category {
        self.category
    }

    #[must_use]
    pub const fn deadline(&self) -> Option<NaiveDate> {
        self.deadline
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub const fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    /// Returns the editable fields of this task.
    #[must_use]
    pub fn fields(&self) -> TaskFields {
        TaskFields {
            title: self.title.clone(),
            description: self.description.clone(),
            category: self.category,
            deadline: self.deadline,
        }
    }

    /// Returns whether the deadline lies before `today`.
    #[must_use]
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.category != Category::Done && self.deadline.is_some_and(|d| d < today)
    }
}
