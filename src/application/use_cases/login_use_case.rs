//! Sign-in and sign-out use case.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::application::dto::{LoginRequest, LoginResponse};
use crate::domain::entities::AuthToken;
use crate::domain::errors::AuthError;
use crate::domain::ports::{AuthPort, TokenStoragePort};

/// Handles the Google sign-in workflow.
#[derive(Clone)]
pub struct LoginUseCase {
    auth_port: Arc<dyn AuthPort>,
    storage_port: Arc<dyn TokenStoragePort>,
}

impl LoginUseCase {
    /// Creates new login use case.
    #[must_use]
    pub const fn new(
        auth_port: Arc<dyn AuthPort>,
        storage_port: Arc<dyn TokenStoragePort>,
    ) -> Self {
        Self {
            auth_port,
            storage_port,
        }
    }

    /// Verifies the ID token and optionally remembers it.
    ///
    /// # Errors
    /// Returns error if token is malformed or rejected by Google.
    pub async fn execute(&self, request: LoginRequest) -> Result<LoginResponse, AuthError> {
        debug!(source = %request.source, "Attempting sign-in");

        let token = AuthToken::new(&request.token).ok_or_else(|| {
            warn!("Invalid token format provided");
            AuthError::invalid_format("expected a Google ID token (header.payload.signature)")
        })?;

        debug!("Token format validated, verifying with Google");

        let user = self.auth_port.validate_token(&token).await.map_err(|e| {
            warn!(error = %e, "Token validation failed");
            e
        })?;

        info!(email = %user.email(), "Signed in");

        let token_persisted = if request.persist_token {
            match self.storage_port.save(&token).await {
                Ok(()) => {
                    info!("Token persisted to secure storage");
                    true
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to persist token to secure storage");
                    false
                }
            }
        } else {
            debug!("Token persistence disabled, skipping storage");
            false
        };

        Ok(LoginResponse::new(
            user,
            token,
            request.source,
            token_persisted,
        ))
    }

    /// Forgets the stored token.
    ///
    /// # Errors
    /// Returns error if deletion fails.
    pub async fn delete_token(&self) -> Result<(), AuthError> {
        debug!("Deleting token from secure storage");
        match self.storage_port.forget().await {
            Ok(()) => {
                info!("Token deleted from secure storage");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to delete token from secure storage");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dto::TokenSource;
    use crate::domain::entities::sample_token;
    use crate::domain::ports::mocks::{MockAuthPort, MockTokenStorage};

    #[tokio::test]
    async fn test_successful_login() {
        let auth_port = Arc::new(MockAuthPort::new(true));
        let storage_port = Arc::new(MockTokenStorage::new());

        let use_case = LoginUseCase::new(auth_port, storage_port.clone());
        let request = LoginRequest::new(sample_token(), TokenSource::UserInput);

        let response = use_case.execute(request).await.unwrap();

        assert_eq!(response.user.email(), "tester@example.com");
        assert_eq!(response.token.as_str(), sample_token());
        assert!(response.token_persisted);
        assert!(storage_port.load().await.unwrap().is_present());
    }

    #[tokio::test]
    async fn test_invalid_token_format_skips_verification() {
        let auth_port = Arc::new(MockAuthPort::new(true));
        let storage_port = Arc::new(MockTokenStorage::new());

        let use_case = LoginUseCase::new(auth_port.clone(), storage_port);
        let request = LoginRequest::new("invalid".to_string(), TokenSource::UserInput);

        let result = use_case.execute(request).await;

        assert!(matches!(result, Err(AuthError::InvalidTokenFormat { .. })));
        assert_eq!(auth_port.calls(), 0);
    }

    #[tokio::test]
    async fn test_rejected_token_is_not_stored() {
        let auth_port = Arc::new(MockAuthPort::new(false));
        let storage_port = Arc::new(MockTokenStorage::new());

        let use_case = LoginUseCase::new(auth_port, storage_port.clone());
        let request = LoginRequest::new(sample_token(), TokenSource::UserInput);

        let result = use_case.execute(request).await;

        assert!(matches!(result, Err(AuthError::TokenRejected { .. })));
        assert!(storage_port.secret().await.is_none());
    }

    #[tokio::test]
    async fn test_login_without_persistence() {
        let auth_port = Arc::new(MockAuthPort::new(true));
        let storage_port = Arc::new(MockTokenStorage::new());

        let use_case = LoginUseCase::new(auth_port, storage_port.clone());
        let request =
            LoginRequest::new(sample_token(), TokenSource::CommandLine).without_persistence();

        let response = use_case.execute(request).await.unwrap();

        assert!(!response.token_persisted);
        assert!(storage_port.secret().await.is_none());
    }

    #[tokio::test]
    async fn test_delete_token() {
        let storage_port = Arc::new(MockTokenStorage::with_token(AuthToken::new_unchecked(
            sample_token(),
        )));
        let use_case = LoginUseCase::new(Arc::new(MockAuthPort::new(true)), storage_port.clone());

        use_case.delete_token().await.unwrap();

        assert!(storage_port.secret().await.is_none());
    }
}
