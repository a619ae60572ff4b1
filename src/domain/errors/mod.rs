//! Domain error types.

mod auth_error;
mod task_api_error;
mod validation_error;

pub use auth_error::AuthError;
pub use task_api_error::TaskApiError;
pub use validation_error::TaskValidationError;
