//! Use case implementations.

mod create_task_use_case;
mod login_use_case;
mod resolve_token_use_case;

pub use create_task_use_case::{CreateTaskError, CreateTaskUseCase};
pub use login_use_case::LoginUseCase;
pub use resolve_token_use_case::{ResolveTokenUseCase, ResolvedToken};
