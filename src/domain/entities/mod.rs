//! Domain entity definitions.

mod draft;
mod task;
mod token;
mod user;

pub use draft::{TaskDraft, parse_deadline};
pub use task::{Category, Task, TaskFields, TaskId};
pub use token::AuthToken;
#[cfg(test)]
pub(crate) use token::sample_token;
pub use user::User;
