//! Remembered sign-in port.

use async_trait::async_trait;

use crate::domain::entities::AuthToken;
use crate::domain::errors::AuthError;

/// What the secret store currently holds for taskflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredToken {
    Absent,
    Present(AuthToken),
    /// A secret exists but is not a three-segment ID token.
    Malformed,
}

impl StoredToken {
    /// Classifies a raw secret read back from the store.
    #[must_use]
    pub fn from_secret(secret: &str) -> Self {
        AuthToken::new(secret).map_or(Self::Malformed, Self::Present)
    }

    #[must_use]
    pub const fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }
}

/// Keeps the Google ID token between runs so the next start can skip the login screen.
#[async_trait]
pub trait TokenStoragePort: Send + Sync {
    async fn load(&self) -> Result<StoredToken, AuthError>;

    /// Replaces whatever was remembered with `token`.
    async fn save(&self, token: &AuthToken) -> Result<(), AuthError>;

    /// Forgets the remembered token. Succeeds when nothing is stored.
    async fn forget(&self) -> Result<(), AuthError>;
}
