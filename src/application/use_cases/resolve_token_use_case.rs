//! Picks the token to sign in with at startup.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::application::dto::{LoginRequest, TokenSource};
use crate::domain::entities::AuthToken;
use crate::domain::ports::{StoredToken, TokenStoragePort};

/// A token found before the login screen is shown.
#[derive(Debug, Clone)]
pub struct ResolvedToken {
    pub token: AuthToken,
    pub source: TokenSource,
}

impl ResolvedToken {
    /// Sign-in request for this token.
    ///
    /// A keyring token is already stored, so it is never written back. A
    /// command-line token is remembered only when `remember` is set.
    #[must_use]
    pub fn into_request(self, remember: bool) -> LoginRequest {
        let request = LoginRequest::new(self.token.as_str().to_string(), self.source);
        if self.source == TokenSource::Keyring || !remember {
            request.without_persistence()
        } else {
            request
        }
    }
}

pub struct ResolveTokenUseCase {
    storage_port: Arc<dyn TokenStoragePort>,
}

impl ResolveTokenUseCase {
    #[must_use]
    pub const fn new(storage_port: Arc<dyn TokenStoragePort>) -> Self {
        Self { storage_port }
    }

    /// Returns the remembered token, else the `--token` / `TASKFLOW_TOKEN` value.
    ///
    /// An unreadable keyring is skipped. A keyring entry that is not an ID
    /// token is forgotten so it is not offered again on the next start.
    pub async fn execute(&self, cli_token: Option<String>) -> Option<ResolvedToken> {
        match self.storage_port.load().await {
            Ok(StoredToken::Present(token)) => {
                info!("Signing in with the remembered token");
                return Some(ResolvedToken {
                    token,
                    source: TokenSource::Keyring,
                });
            }
            Ok(StoredToken::Malformed) => {
                warn!("Forgetting malformed remembered token");
                if let Err(e) = self.storage_port.forget().await {
                    warn!(error = %e, "Could not forget malformed token");
                }
            }
            Ok(StoredToken::Absent) => debug!("No remembered token"),
            Err(e) => warn!(error = %e, "Keyring unavailable, skipping remembered token"),
        }

        let raw = cli_token?;
        if raw.trim().is_empty() {
            return None;
        }
        let Some(token) = AuthToken::new(raw) else {
            warn!("Ignoring --token value that is not an ID token");
            return None;
        };
        info!("Signing in with the token from the command line");
        Some(ResolvedToken {
            token,
            source: TokenSource::CommandLine,
        })
    }
}
