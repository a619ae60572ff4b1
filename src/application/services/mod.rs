mod notification_manager;
mod task_board;

pub use notification_manager::NotificationManager;
pub use task_board::{
    BoardView, FetchTicket, LoadState, MutationId, MutationKind, RollbackOutcome, TaskBoard,
};
