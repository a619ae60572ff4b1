//! Task creation use case.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::entities::{AuthToken, Task, TaskDraft, User};
use crate::domain::errors::{TaskApiError, TaskValidationError};
use crate::domain::ports::{NewTask, TaskApiPort};

/// Why a task could not be created.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CreateTaskError {
    /// The form was rejected before any request was made.
    #[error(transparent)]
    Invalid(#[from] TaskValidationError),
    /// The server refused or could not be reached.
    #[error(transparent)]
    Api(#[from] TaskApiError),
}

/// Validates the add-task form and submits it.
#[derive(Clone)]
pub struct CreateTaskUseCase {
    api: Arc<dyn TaskApiPort>,
}

impl CreateTaskUseCase {
    #[must_use]
    pub const fn new(api: Arc<dyn TaskApiPort>) -> Self {
        Self { api }
    }

    /// Creates the task described by `draft` for the signed-in user.
    ///
    /// Returns the created task when the server reported its id, `None`
    /// when it did not and the board has to be refetched.
    ///
    /// # Errors
    /// Invalid input is rejected without calling the API.
    pub async fn execute(
        &self,
        token: &AuthToken,
        user: Option<&User>,
        draft: &TaskDraft,
        now: DateTime<Utc>,
    ) -> Result<Option<Task>, CreateTaskError> {
        let user = user.ok_or(TaskValidationError::NotSignedIn)?;
        let fields = draft.validate(true).inspect_err(|e| {
            debug!(error = %e, "Task form rejected");
        })?;

        let new_task = NewTask::new(fields, user.email()).with_timestamp(now);
        let id = self
            .api
            .create_task(token, &new_task)
            .await
            .inspect_err(|e| warn!(error = %e, "Failed to create task"))?;

        match id {
            Some(id) => {
                info!(task_id = %id, category = %new_task.fields.category, "Task created");
                Ok(Some(new_task.into_task(id)))
            }
            None => {
                info!("Task created, server did not report its id");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Category, TaskId, sample_token};
    use crate::domain::ports::mocks::MockTaskApiPort;
    use chrono::TimeZone;

    fn token() -> AuthToken {
        AuthToken::new_unchecked(sample_token())
    }

    fn user() -> User {
        User::new("tester@example.com")
    }

    fn draft() -> TaskDraft {
        TaskDraft {
            title: "  Write report ".to_string(),
            description: "quarterly numbers".to_string(),
            category: Category::InProgress,
            deadline: "2025-04-01".to_string(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap()
    }

    #[tokio::test]
    async fn test_valid_form_calls_create_once() {
        let mut api = MockTaskApiPort::new();
        api.expect_create_task()
            .withf(|_, task| {
                task.fields.title == "Write report"
                    && task.email == "tester@example.com"
                    && task.timestamp == now()
                    && task.fields.category == Category::InProgress
            })
            .times(1)
            .returning(|_, _| Ok(Some(TaskId::from("64f0c2"))));

        let use_case = CreateTaskUseCase::new(Arc::new(api));
        let user = user();
        let created = use_case
            .execute(&token(), Some(&user), &draft(), now())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(created.id().as_str(), "64f0c2");
        assert_eq!(created.email(), "tester@example.com");
        assert_eq!(created.created_at(), Some(now()));
    }

    #[tokio::test]
    async fn test_missing_deadline_never_calls_api() {
        let mut api = MockTaskApiPort::new();
        api.expect_create_task().times(0);

        let use_case = CreateTaskUseCase::new(Arc::new(api));
        let mut draft = draft();
        draft.deadline.clear();
        let user = user();

        let result = use_case.execute(&token(), Some(&user), &draft, now()).await;

        assert_eq!(
            result,
            Err(CreateTaskError::Invalid(TaskValidationError::MissingDeadline))
        );
    }

    #[tokio::test]
    async fn test_signed_out_never_calls_api() {
        let mut api = MockTaskApiPort::new();
        api.expect_create_task().times(0);

        let use_case = CreateTaskUseCase::new(Arc::new(api));
        let result = use_case.execute(&token(), None, &draft(), now()).await;

        assert_eq!(
            result,
            Err(CreateTaskError::Invalid(TaskValidationError::NotSignedIn))
        );
    }

    #[tokio::test]
    async fn test_server_without_id() {
        let mut api = MockTaskApiPort::new();
        api.expect_create_task()
            .times(1)
            .returning(|_, _| Ok(None));

        let use_case = CreateTaskUseCase::new(Arc::new(api));
        let user = user();
        let created = use_case
            .execute(&token(), Some(&user), &draft(), now())
            .await
            .unwrap();

        assert!(created.is_none());
    }

    #[tokio::test]
    async fn test_api_failure_is_reported() {
        let mut api = MockTaskApiPort::new();
        api.expect_create_task()
            .times(1)
            .returning(|_, _| Err(TaskApiError::server(500, "boom")));

        let use_case = CreateTaskUseCase::new(Arc::new(api));
        let user = user();
        let result = use_case
            .execute(&token(), Some(&user), &draft(), now())
            .await;

        assert!(matches!(result, Err(CreateTaskError::Api(_))));
    }
}
