//! HTTP adapters for the task service and Google sign-in.

mod client;
mod dto;
mod google_auth;

pub use client::TaskApiClient;
pub use google_auth::GoogleAuthClient;
