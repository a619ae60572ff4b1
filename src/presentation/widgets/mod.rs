mod footer_bar;
mod input;
mod status_bar;

pub use footer_bar::{FocusContext, FooterBar, FooterBarStyle};
pub use input::TextInput;
pub use status_bar::{StatusBar, StatusLevel};
