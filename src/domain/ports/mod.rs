mod auth_port;
mod task_api_port;
mod token_storage_port;

pub use auth_port::AuthPort;
pub use task_api_port::{NewTask, TaskApiPort};
pub use token_storage_port::{StoredToken, TokenStoragePort};
