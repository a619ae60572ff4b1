//! Socket.IO push channel delivering remote task changes.

mod client;
mod codec;
mod connection;
mod constants;
mod error;
mod events;

pub use client::{PushClient, PushClientConfig};
pub use connection::{PushConnection, PushSessionHandler, WebSocketConnection, push_url};
pub use error::{PushError, PushResult};
pub use events::PushEvent;
