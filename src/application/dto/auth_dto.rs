//! Authentication DTOs.

use crate::domain::entities::{AuthToken, User};

/// Where the Google ID token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    /// Token passed with `--token` or `TASKFLOW_TOKEN`.
    CommandLine,
    /// Token remembered in the system keyring.
    Keyring,
    /// Token pasted into the login screen.
    UserInput,
}

impl TokenSource {
    /// Returns human-readable description.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::CommandLine => "command line / environment",
            Self::Keyring => "system keyring",
            Self::UserInput => "user input",
        }
    }
}

impl std::fmt::Display for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Sign-in request data.
#[derive(Debug, Clone)]
pub struct LoginRequest {
    /// Raw ID token.
    pub token: String,
    /// Token source.
    pub source: TokenSource,
    /// Whether to remember the token.
    pub persist_token: bool,
}

impl LoginRequest {
    /// Creates new login request.
    #[must_use]
    pub const fn new(token: String, source: TokenSource) -> Self {
        Self {
            token,
            source,
            persist_token: true,
        }
    }

    /// Disables token persistence.
    #[must_use]
    pub const fn without_persistence(mut self) -> Self {
        self.persist_token = false;
        self
    }
}

/// Result of a successful sign-in.
#[derive(Debug, Clone)]
pub struct LoginResponse {
    /// Signed-in account.
    pub user: User,
    /// Verified token, attached to every API request.
    pub token: AuthToken,
    /// Token source used.
    pub token_source: TokenSource,
    /// Whether token was persisted.
    pub token_persisted: bool,
}

impl LoginResponse {
    /// Creates new login response.
    #[must_use]
    pub const fn new(
        user: User,
        token: AuthToken,
        token_source: TokenSource,
        token_persisted: bool,
    ) -> Self {
        Self {
            user,
            token,
            token_source,
            token_persisted,
        }
    }
}
