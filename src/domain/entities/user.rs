//! Signed-in user entity.

/// The authenticated account that owns the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    email: String,
    display_name: Option<String>,
    photo_url: Option<String>,
}

impl User {
    #[must_use]
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            display_name: None,
            photo_url: None,
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, name: Option<String>) -> Self {
        self.display_name = name.filter(|n| !n.trim().is_empty());
        self
    }

    #[must_use]
    pub fn with_photo_url(mut self, url: Option<String>) -> Self {
        self.photo_url = url;
        self
    }

    /// Returns the email that scopes every task query.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn photo_url(&self) -> Option<&str> {
        self.photo_url.as_deref()
    }

    /// Returns the name to show, falling back to the email.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_falls_back_to_email() {
        let user = User::new("ana@example.com");
        assert_eq!(user.display_name(), "ana@example.com");

        let user = user.with_display_name(Some("  ".to_string()));
        assert_eq!(user.display_name(), "ana@example.com");

        let user = user.with_display_name(Some("Ana".to_string()));
        assert_eq!(user.display_name(), "Ana");
    }
}
