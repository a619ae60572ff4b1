use serde_json::Value;

use crate::domain::entities::TaskId;

/// Events the push channel reports to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    Connected {
        sid: String,
    },
    Disconnected {
        reason: String,
    },
    Reconnecting {
        attempt: u32,
    },
    TaskDeleted(TaskId),
    Error {
        message: String,
        recoverable: bool,
    },
}

/// Extracts the deleted id from a `taskDeleted` payload.
///
/// The server emits the bare id; an object carrying `_id` or `id` is
/// accepted too.
#[must_use]
pub fn deleted_task_id(args: &[Value]) -> Option<TaskId> {
    let id = match args.first()? {
        Value::String(id) => id.as_str(),
        Value::Object(map) => map
            .get("_id")
            .or_else(|| map.get("id"))
            .and_then(Value::as_str)?,
        _ => return None,
    };
    let id = id.trim();
    (!id.is_empty()).then(|| TaskId::from(id))
}
