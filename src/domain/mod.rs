//! Domain layer with core entities, errors and port definitions.

/// Live-update connection status.
pub mod connection;
/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Keybinding definitions.
pub mod keybinding;
/// User-facing notifications.
pub mod notification;
/// Port definitions.
pub mod ports;

pub use connection::ConnectionStatus;
pub use entities::{AuthToken, Category, Task, TaskDraft, TaskFields, TaskId, User};
pub use errors::{AuthError, TaskApiError, TaskValidationError};
pub use notification::{Notification, NotificationLevel};
pub use ports::{AuthPort, NewTask, TaskApiPort, TokenStoragePort};
