//! System keyring token storage.

use async_trait::async_trait;
use keyring::Entry;
use tracing::{debug, warn};

use crate::domain::entities::AuthToken;
use crate::domain::errors::AuthError;
use crate::domain::ports::{StoredToken, TokenStoragePort};

const KEYRING_SERVICE: &str = "taskflow";
const KEYRING_ACCOUNT: &str = "google-id-token";

/// Remembers the Google ID token in the platform secret store.
///
/// Keyring calls block on D-Bus or the OS credential API, so they run on
/// the blocking pool.
#[derive(Debug, Clone)]
pub struct KeyringTokenStorage {
    service: String,
    account: String,
}

impl KeyringTokenStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::with_names(KEYRING_SERVICE, KEYRING_ACCOUNT)
    }

    #[must_use]
    pub fn with_names(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: account.into(),
        }
    }

    async fn with_entry<T, F>(&self, op: F) -> Result<T, AuthError>
    where
        T: Send + 'static,
        F: FnOnce(Entry) -> Result<T, AuthError> + Send + 'static,
    {
        let service = self.service.clone();
        let account = self.account.clone();
        tokio::task::spawn_blocking(move || {
            let entry = Entry::new(&service, &account).map_err(|e| {
                AuthError::retrieval_failed(format!("failed to access keyring: {e}"))
            })?;
            op(entry)
        })
        .await
        .map_err(|e| AuthError::unexpected(format!("keyring task failed: {e}")))?
    }
}

impl Default for KeyringTokenStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenStoragePort for KeyringTokenStorage {
    async fn load(&self) -> Result<StoredToken, AuthError> {
        debug!(service = %self.service, "Reading token from keyring");

        let stored = self
            .with_entry(|entry| match entry.get_password() {
                Ok(secret) => Ok(StoredToken::from_secret(&secret)),
                Err(keyring::Error::NoEntry) => Ok(StoredToken::Absent),
                Err(e) => Err(AuthError::retrieval_failed(e.to_string())),
            })
            .await
            .inspect_err(|e| warn!(error = %e, "Failed to read token from keyring"))?;

        if stored == StoredToken::Malformed {
            warn!("Keyring entry is not an ID token");
        }
        Ok(stored)
    }

    async fn save(&self, token: &AuthToken) -> Result<(), AuthError> {
        debug!(service = %self.service, token = %token, "Saving token to keyring");

        let secret = token.as_str().to_string();
        self.with_entry(move |entry| {
            entry
                .set_password(&secret)
                .map_err(|e| AuthError::storage_failed(e.to_string()))
        })
        .await
        .inspect_err(|e| warn!(error = %e, "Failed to save token to keyring"))
    }

    async fn forget(&self) -> Result<(), AuthError> {
        debug!(service = %self.service, "Removing token from keyring");

        self.with_entry(|entry| match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(AuthError::storage_failed(e.to_string())),
        })
        .await
        .inspect_err(|e| warn!(error = %e, "Failed to remove token from keyring"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::sample_token;

    #[tokio::test]
    #[ignore = "requires system keyring"]
    async fn test_save_load_forget() {
        let storage = KeyringTokenStorage::with_names("taskflow-test", "test-token");
        let token = AuthToken::new_unchecked(sample_token());

        storage.save(&token).await.unwrap();
        assert_eq!(storage.load().await.unwrap(), StoredToken::Present(token));

        storage.forget().await.unwrap();
        storage.forget().await.unwrap();
        assert_eq!(storage.load().await.unwrap(), StoredToken::Absent);
    }
}
