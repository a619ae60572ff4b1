//! Infrastructure layer with external service adapters.

/// REST clients for the task server and Google token verification.
pub mod api;
/// Application configuration.
pub mod config;
/// Live task updates over Socket.IO.
pub mod push;
/// Token storage adapters.
pub mod storage;

pub use api::{GoogleAuthClient, TaskApiClient};
pub use config::{AppConfig, CliArgs, ConfigError, LogLevel, StorageManager};
pub use push::{PushClient, PushClientConfig, PushError, PushEvent};
pub use storage::KeyringTokenStorage;
