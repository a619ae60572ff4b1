//! Authentication port definition.

use async_trait::async_trait;

use crate::domain::entities::{AuthToken, User};
use crate::domain::errors::AuthError;

/// Port for verifying a Google identity.
#[async_trait]
pub trait AuthPort: Send + Sync {
    /// Verifies the ID token and returns the account behind it.
    async fn validate_token(&self, token: &AuthToken) -> Result<User, AuthError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Mock authentication port for testing.
    pub struct MockAuthPort {
        should_succeed: Arc<AtomicBool>,
        calls: AtomicUsize,
        user: User,
    }

    impl MockAuthPort {
        /// Creates new mock.
        pub fn new(should_succeed: bool) -> Self {
            Self {
                should_succeed: Arc::new(AtomicBool::new(should_succeed)),
                calls: AtomicUsize::new(0),
                user: User::new("tester@example.com").with_display_name(Some("Tester".into())),
            }
        }

        /// Number of verification calls made.
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AuthPort for MockAuthPort {
        async fn validate_token(&self, _token: &AuthToken) -> Result<User, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.should_succeed.load(Ordering::SeqCst) {
                Ok(self.user.clone())
            } else {
                Err(AuthError::rejected("mock rejection"))
            }
        }
    }
}
