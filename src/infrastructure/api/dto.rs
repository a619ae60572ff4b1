//! Task API wire types.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::domain::entities::{Category, Task, TaskId};
use crate::domain::ports::NewTask;

/// Task as returned by the list endpoints.
#[derive(Debug, Deserialize)]
pub struct TaskPayload {
    #[serde(rename = "_id", deserialize_with = "object_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl TaskPayload {
    /// Converts into a domain task; records with an unknown category are dropped.
    pub fn into_task(self) -> Option<Task> {
        let Some(category) = Category::from_wire(&self.category) else {
            warn!(
                task_id = %self.id,
                category = %self.category,
                "Skipping task with unknown category"
            );
            return None;
        };

        let mut task = Task::new(self.id, self.title, category, self.email)
            .with_description(self.description)
            .with_deadline(self.deadline.as_deref().and_then(parse_wire_date));
        if let Some(created_at) = self.timestamp.as_deref().and_then(parse_wire_timestamp) {
            task = task.with_created_at(created_at);
        }
        Some(task)
    }
}

/// Body of `POST /tasks`.
#[derive(Debug, Serialize)]
pub struct CreateTaskBody<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub category: &'static str,
    pub deadline: String,
    pub email: &'a str,
    pub timestamp: String,
}

impl<'a> From<&'a NewTask> for CreateTaskBody<'a> {
    fn from(task: &'a NewTask) -> Self {
        Self {
            title: &task.fields.title,
            description: &task.fields.description,
            category: task.fields.category.as_str(),
            deadline: format_wire_date(task.fields.deadline),
            email: &task.email,
            timestamp: task.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Body of `POST /tasks/update`.
#[derive(Debug, Serialize)]
pub struct UpdateTaskBody<'a> {
    #[serde(rename = "_id")]
    pub id: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub category: &'static str,
    pub deadline: String,
}

impl<'a> From<&'a Task> for UpdateTaskBody<'a> {
    fn from(task: &'a Task) -> Self {
        Self {
            id: task.id().as_str(),
            title: task.title(),
            description: task.description(),
            category: task.category().as_str(),
            deadline: format_wire_date(task.deadline()),
        }
    }
}

/// Body of `POST /tasks/update-category`.
#[derive(Debug, Serialize)]
pub struct UpdateCategoryBody<'a> {
    #[serde(rename = "_id")]
    pub id: &'a str,
    pub category: &'static str,
}

/// Insert acknowledgement; servers backed by MongoDB echo `insertedId`.
#[derive(Debug, Default, Deserialize)]
pub struct CreateTaskResponse {
    #[serde(rename = "insertedId", default, deserialize_with = "optional_object_id")]
    pub inserted_id: Option<String>,
}

impl CreateTaskResponse {
    pub fn into_id(self) -> Option<TaskId> {
        self.inserted_id
            .filter(|id| !id.is_empty())
            .map(TaskId::from)
    }
}

/// Error body some endpoints return.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    #[serde(alias = "error")]
    pub message: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ObjectId {
    Plain(String),
    Extended {
        #[serde(rename = "$oid")]
        oid: String,
    },
}

impl From<ObjectId> for String {
    fn from(value: ObjectId) -> Self {
        match value {
            ObjectId::Plain(id) | ObjectId::Extended { oid: id } => id,
        }
    }
}

fn object_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    ObjectId::deserialize(deserializer).map(String::from)
}

fn optional_object_id<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Option::<ObjectId>::deserialize(deserializer).map(|id| id.map(String::from))
}

fn format_wire_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Accepts `YYYY-MM-DD` or a full timestamp; anything else is treated as absent.
fn parse_wire_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_wire_timestamp(value).map(|ts| ts.date_naive()))
}

fn parse_wire_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}
