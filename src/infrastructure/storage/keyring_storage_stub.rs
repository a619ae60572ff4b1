//! Session-only token storage for builds without the `keyring` feature.

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::entities::AuthToken;
use crate::domain::errors::AuthError;
use crate::domain::ports::{StoredToken, TokenStoragePort};

/// Keeps the token in memory only; nothing survives a restart.
#[derive(Debug, Default)]
pub struct KeyringTokenStorage {
    token: Mutex<Option<AuthToken>>,
}

impl KeyringTokenStorage {
    #[must_use]
    pub fn new() -> Self {
        debug!("Keyring support not compiled in, tokens are kept for this session only");
        Self::default()
    }
}

#[async_trait]
impl TokenStoragePort for KeyringTokenStorage {
    async fn load(&self) -> Result<StoredToken, AuthError> {
        Ok(self
            .token
            .lock()
            .await
            .clone()
            .map_or(StoredToken::Absent, StoredToken::Present))
    }

    async fn save(&self, token: &AuthToken) -> Result<(), AuthError> {
        *self.token.lock().await = Some(token.clone());
        Ok(())
    }

    async fn forget(&self) -> Result<(), AuthError> {
        self.token.lock().await.take();
        Ok(())
    }
}
