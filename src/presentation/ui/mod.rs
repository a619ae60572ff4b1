//! UI screens.

mod app;
mod backend;
mod board_screen;
mod login_screen;
mod notification_popup;
mod task_form;

pub use app::{App, AppSettings};
pub use backend::{Backend, BackendCommand, BackendEvent, SessionId};
pub use board_screen::{BoardKeyResult, BoardScreen, BoardScreenState};
pub use login_screen::{LoginAction, LoginScreen, LoginStatus};
pub use notification_popup::NotificationPopup;
pub use task_form::{FormAction, FormField, FormMode, TaskForm};
