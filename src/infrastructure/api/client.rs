//! Task API HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use tracing::{debug, warn};

use super::dto::{
    CreateTaskBody, CreateTaskResponse, ErrorResponse, TaskPayload, UpdateCategoryBody,
    UpdateTaskBody,
};
use crate::domain::entities::{AuthToken, Category, Task, TaskId};
use crate::domain::errors::TaskApiError;
use crate::domain::ports::{NewTask, TaskApiPort};

const USER_AGENT: &str = concat!("taskflow/", env!("CARGO_PKG_VERSION"));
const MAX_ERROR_BODY: usize = 200;

/// REST adapter for the task service.
#[derive(Debug, Clone)]
pub struct TaskApiClient {
    client: Client,
    base_url: Url,
}

impl TaskApiClient {
    /// Creates a client for the API rooted at `base_url`.
    ///
    /// # Errors
    /// Returns error if HTTP client creation fails.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, TaskApiError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| TaskApiError::network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client, base_url })
    }

    /// Builds `<base>/<segments...>`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, TaskApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| TaskApiError::invalid_request("API URL cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn list_url(&self, email: &str, category: Option<Category>) -> Result<Url, TaskApiError> {
        match category {
            None => self.endpoint(&["tasks", email]),
            Some(category) => self.endpoint(&["tasks", category.path_segment(), email]),
        }
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        token: &AuthToken,
        task_id: Option<&TaskId>,
    ) -> Result<Response, TaskApiError> {
        let response = request
            .bearer_auth(token.as_str())
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        Err(error_from_response(status, response, task_id).await)
    }
}

fn map_transport_error(e: reqwest::Error) -> TaskApiError {
    warn!(error = %e, "Task API request failed");
    if e.is_timeout() {
        TaskApiError::Timeout
    } else if e.is_connect() {
        TaskApiError::network("failed to connect to the task server")
    } else {
        TaskApiError::network(e.to_string())
    }
}

async fn error_from_response(
    status: StatusCode,
    response: Response,
    task_id: Option<&TaskId>,
) -> TaskApiError {
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body).map_or_else(
        |_| body.chars().take(MAX_ERROR_BODY).collect::<String>(),
        |error| error.message,
    );
    warn!(status = %status, message = %message, "Task API returned an error");

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => TaskApiError::Unauthorized {
            message: if message.is_empty() {
                status.to_string()
            } else {
                message
            },
        },
        StatusCode::NOT_FOUND if task_id.is_some() => TaskApiError::NotFound {
            id: task_id.map(ToString::to_string).unwrap_or_default(),
        },
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => TaskApiError::Timeout,
        _ => TaskApiError::server(status.as_u16(), message),
    }
}

#[async_trait]
impl TaskApiPort for TaskApiClient {
    async fn fetch_tasks(
        &self,
        token: &AuthToken,
        email: &str,
        category: Option<Category>,
    ) -> Result<Vec<Task>, TaskApiError> {
        let url = self.list_url(email, category)?;
        debug!(url = %url, "Fetching tasks");

        let response = self.send(self.client.get(url), token, None).await?;
        let payloads: Vec<TaskPayload> = response
            .json()
            .await
            .map_err(|e| TaskApiError::decode(e.to_string()))?;

        let tasks: Vec<Task> = payloads
            .into_iter()
            .filter_map(TaskPayload::into_task)
            .collect();
        debug!(count = tasks.len(), category = ?category, "Tasks fetched");
        Ok(tasks)
    }

    async fn create_task(
        &self,
        token: &AuthToken,
        task: &NewTask,
    ) -> Result<Option<TaskId>, TaskApiError> {
        let url = self.endpoint(&["tasks"])?;
        let request = self.client.post(url).json(&CreateTaskBody::from(task));

        let response = self.send(request, token, None).await?;
        let body = response.text().await.unwrap_or_default();
        let id = serde_json::from_str::<CreateTaskResponse>(&body)
            .unwrap_or_default()
            .into_id();
        Ok(id)
    }

    async fn update_task(&self, token: &AuthToken, task: &Task) -> Result<(), TaskApiError> {
        let url = self.endpoint(&["tasks", "update"])?;
        debug!(task_id = %task.id(), "Updating task");

        let request = self.client.post(url).json(&UpdateTaskBody::from(task));
        self.send(request, token, Some(task.id())).await?;
        Ok(())
    }

    async fn update_category(
        &self,
        token: &AuthToken,
        id: &TaskId,
        category: Category,
    ) -> Result<(), TaskApiError> {
        let url = self.endpoint(&["tasks", "update-category"])?;
        debug!(task_id = %id, category = %category, "Updating task category");

        let body = UpdateCategoryBody {
            id: id.as_str(),
            category: category.as_str(),
        };
        self.send(self.client.post(url).json(&body), token, Some(id))
            .await?;
        Ok(())
    }

    async fn delete_task(&self, token: &AuthToken, id: &TaskId) -> Result<(), TaskApiError> {
        let url = self.endpoint(&["tasks", id.as_str()])?;
        debug!(task_id = %id, "Deleting task");

        self.send(self.client.delete(url), token, Some(id)).await?;
        Ok(())
    }
}
