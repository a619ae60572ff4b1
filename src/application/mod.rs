//! Application layer with use cases, board state and DTOs.

/// Data transfer objects.
pub mod dto;
/// Stateful application services.
pub mod services;
/// Use case implementations.
pub mod use_cases;

pub use dto::{LoginRequest, LoginResponse, TokenSource};
pub use services::{BoardView, NotificationManager, TaskBoard};
pub use use_cases::{CreateTaskUseCase, LoginUseCase, ResolveTokenUseCase};
