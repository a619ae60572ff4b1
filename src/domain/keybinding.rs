use crossterm::event::KeyEvent;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Quit,
    Logout,
    ToggleHelp,
    Refresh,

    // Navigation
    NavigateUp,
    NavigateDown,
    NavigateLeft,
    NavigateRight,
    SelectFirst,
    SelectLast,

    // Task actions
    NewTask,
    EditTask,
    DeleteTask,
    GrabTask,
    DropTask,
    Cancel,
}

impl Action {
    /// Short label shown in the footer and help overlay.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Quit => "Quit",
            Self::Logout => "Logout",
            Self::ToggleHelp => "Help",
            Self::Refresh => "Refresh",
            Self::NavigateUp => "Up",
            Self::NavigateDown => "Down",
            Self::NavigateLeft => "Left",
            Self::NavigateRight => "Right",
            Self::SelectFirst => "First",
            Self::SelectLast => "Last",
            Self::NewTask => "Add task",
            Self::EditTask => "Edit",
            Self::DeleteTask => "Delete",
            Self::GrabTask => "Grab",
            Self::DropTask => "Drop",
            Self::Cancel => "Cancel",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keybind {
    pub key: KeyEvent,
    pub action: Action,
    pub label: Cow<'static, str>,
}

impl Keybind {
    pub fn new(key: KeyEvent, action: Action) -> Self {
        Self {
            key,
            action,
            label: Cow::Borrowed(action.label()),
        }
    }
}
