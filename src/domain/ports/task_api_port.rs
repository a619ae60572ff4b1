//! Task API port definition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::entities::{AuthToken, Category, Task, TaskFields, TaskId};
use crate::domain::errors::TaskApiError;

/// A task about to be created on the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub fields: TaskFields,
    pub email: String,
    pub timestamp: DateTime<Utc>,
}

impl NewTask {
    #[must_use]
    pub fn new(fields: TaskFields, email: impl Into<String>) -> Self {
        Self {
            fields,
            email: email.into(),
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub const fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Builds the record the server will hold once it assigns `id`.
    #[must_use]
    pub fn into_task(self, id: TaskId) -> Task {
        Task::new(id, self.fields.title, self.fields.category, self.email)
            .with_description(self.fields.description)
            .with_deadline(self.fields.deadline)
            .with_created_at(self.timestamp)
    }
}

/// Port for the remote task service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskApiPort: Send + Sync {
    /// Lists the user's tasks, optionally restricted to one category.
    async fn fetch_tasks(
        &self,
        token: &AuthToken,
        email: &str,
        category: Option<Category>,
    ) -> Result<Vec<Task>, TaskApiError>;

    /// Creates a task; returns the assigned id when the server reports it.
    async fn create_task(
        &self,
        token: &AuthToken,
        task: &NewTask,
    ) -> Result<Option<TaskId>, TaskApiError>;

    /// Replaces the editable fields of a task.
    async fn update_task(&self, token: &AuthToken, task: &Task) -> Result<(), TaskApiError>;

    /// Changes only the category of a task.
    async fn update_category(
        &self,
        token: &AuthToken,
        id: &TaskId,
        category: Category,
    ) -> Result<(), TaskApiError>;

    /// Deletes a task.
    async fn delete_task(&self, token: &AuthToken, id: &TaskId) -> Result<(), TaskApiError>;
}
