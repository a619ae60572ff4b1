//! Google ID token verification.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::entities::{AuthToken, User};
use crate::domain::errors::AuthError;
use crate::domain::ports::AuthPort;

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// `tokeninfo` response; Google encodes booleans and numbers as strings.
#[derive(Debug, Deserialize)]
struct TokenInfo {
    #[serde(default)]
    aud: String,
    email: Option<String>,
    #[serde(default)]
    email_verified: Option<StringOrBool>,
    name: Option<String>,
    picture: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StringOrBool {
    Bool(bool),
    Text(String),
}

impl StringOrBool {
    fn is_true(&self) -> bool {
        match self {
            Self::Bool(value) => *value,
            Self::Text(value) => value.eq_ignore_ascii_case("true"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenInfoError {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Verifies Google ID tokens against the `tokeninfo` endpoint.
pub struct GoogleAuthClient {
    client: Client,
    tokeninfo_url: Url,
    client_id: Option<String>,
}

impl GoogleAuthClient {
    /// Creates a verifier; `client_id`, when set, must match the token audience.
    ///
    /// # Errors
    /// Returns error if HTTP client creation fails.
    pub fn new(
        client_id: Option<String>,
        timeout: std::time::Duration,
    ) -> Result<Self, AuthError> {
        let tokeninfo_url = Url::parse(TOKENINFO_URL)
            .map_err(|e| AuthError::unexpected(format!("invalid tokeninfo URL: {e}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::unexpected(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            tokeninfo_url,
            client_id: client_id.filter(|id| !id.trim().is_empty()),
        })
    }

    fn user_from_info(&self, info: TokenInfo) -> Result<User, AuthError> {
        if self
            .client_id
            .as_ref()
            .is_some_and(|expected| *expected != info.aud)
        {
            warn!(audience = %info.aud, "Token audience does not match client id");
            return Err(AuthError::AudienceMismatch);
        }

        let email = info
            .email
            .filter(|email| !email.is_empty())
            .ok_or_else(|| AuthError::rejected("token carries no email scope"))?;

        if !info.email_verified.as_ref().is_some_and(StringOrBool::is_true) {
            return Err(AuthError::EmailNotVerified);
        }

        Ok(User::new(email)
            .with_display_name(info.name)
            .with_photo_url(info.picture))
    }
}

#[async_trait]
impl AuthPort for GoogleAuthClient {
    async fn validate_token(&self, token: &AuthToken) -> Result<User, AuthError> {
        debug!(token = %token, "Verifying ID token with Google");

        let response = self
            .client
            .get(self.tokeninfo_url.clone())
            .query(&[("id_token", token.as_str())])
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to reach Google");
                if e.is_timeout() {
                    AuthError::network("request timed out")
                } else if e.is_connect() {
                    AuthError::network("failed to connect to Google")
                } else {
                    AuthError::network(e.to_string())
                }
            })?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            let error = response.json::<TokenInfoError>().await.ok();
            let message = error
                .map(|e| e.error_description.unwrap_or(e.error))
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "invalid or expired token".to_string());
            return Err(AuthError::rejected(message));
        }
        if status.is_server_error() {
            return Err(AuthError::network(format!("Google returned {status}")));
        }
        if !status.is_success() {
            return Err(AuthError::unexpected(format!("unexpected response: {status}")));
        }

        let info: TokenInfo = response.json().await.map_err(|e| {
            warn!(error = %e, "Failed to parse tokeninfo response");
            AuthError::unexpected(format!("failed to parse response: {e}"))
        })?;

        let user = self.user_from_info(info)?;
        debug!(email = %user.email(), "ID token verified");
        Ok(user)
    }
}
