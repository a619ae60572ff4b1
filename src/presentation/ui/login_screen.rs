//! Sign-in screen.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
};

use crate::application::dto::{LoginRequest, TokenSource};
use crate::domain::entities::User;
use crate::presentation::widgets::TextInput;

/// What the sign-in panel reports below the token field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginStatus {
    /// Waiting for a token.
    Idle,
    /// Google is checking a token; keys are ignored until it answers.
    Verifying(TokenSource),
    /// The last token was refused. The next key dismisses the reason.
    Rejected(String),
    /// Informational line, replaced by the next key.
    Notice(String),
}

#[derive(Debug, Clone)]
pub enum LoginAction {
    None,
    Submit(LoginRequest),
    ForgetSavedToken,
}

/// Sign-in screen state.
pub struct LoginScreen {
    token: TextInput,
    remember: bool,
    status: LoginStatus,
    previous_user: Option<String>,
}

impl LoginScreen {
    #[must_use]
    pub fn new() -> Self {
        let mut token = TextInput::new("Google ID token")
            .password()
            .placeholder("Paste the ID token from Google sign-in...");
        token.set_focused(true);

        Self {
            token,
            remember: true,
            status: LoginStatus::Idle,
            previous_user: None,
        }
    }

    /// Screen shown right after `user` logged out.
    #[must_use]
    pub fn signed_out(user: &User) -> Self {
        let mut screen = Self::new();
        screen.previous_user = Some(user.email().to_string());
        screen
    }

    #[must_use]
    pub const fn status(&self) -> &LoginStatus {
        &self.status
    }

    #[must_use]
    pub fn previous_user(&self) -> Option<&str> {
        self.previous_user.as_deref()
    }

    #[must_use]
    pub const fn remembers_token(&self) -> bool {
        self.remember
    }

    pub fn set_verifying(&mut self, source: TokenSource) {
        self.status = LoginStatus::Verifying(source);
    }

    pub fn set_rejected(&mut self, reason: impl Into<String>) {
        self.status = LoginStatus::Rejected(reason.into());
    }

    fn request(&self) -> Option<LoginRequest> {
        let token = self.token.value().trim();
        if token.is_empty() {
            return None;
        }
        let request = LoginRequest::new(token.to_string(), TokenSource::UserInput);
        Some(if self.remember {
            request
        } else {
            request.without_persistence()
        })
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> LoginAction {
        match self.status {
            LoginStatus::Verifying(_) => return LoginAction::None,
            LoginStatus::Rejected(_) => {
                self.status = LoginStatus::Idle;
                return LoginAction::None;
            }
            LoginStatus::Notice(_) => self.status = LoginStatus::Idle,
            LoginStatus::Idle => {}
        }

        match key.code {
            KeyCode::Enter => {
                if let Some(request) = self.request() {
                    return LoginAction::Submit(request);
                }
            }
            KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::ALT) => {
                self.status = LoginStatus::Notice("Saved token forgotten.".to_string());
                return LoginAction::ForgetSavedToken;
            }
            KeyCode::Tab => self.remember = !self.remember,
            code => {
                self.token.edit(code);
            }
        }

        LoginAction::None
    }

    fn heading(&self) -> Line<'_> {
        match &self.previous_user {
            Some(email) => Line::from(vec![
                Span::raw("Signed out of "),
                Span::styled(email.as_str(), Style::default().fg(Color::Cyan)),
                Span::raw(". Sign in again to see your tasks."),
            ]),
            None => Line::from("Sign in with your Google account to see your tasks"),
        }
    }

    fn status_line(&self) -> Line<'_> {
        let hint = Style::default().fg(Color::DarkGray);
        match &self.status {
            LoginStatus::Idle => Line::from(vec![
                Span::styled("Enter: Sign in", hint),
                Span::raw(" | "),
                Span::styled("Esc: Quit", hint),
                Span::raw(" | "),
                Span::styled("Alt+D: Forget saved", hint),
            ]),
            LoginStatus::Verifying(source) => {
                let text = match source {
                    TokenSource::Keyring => "Checking your saved sign-in with Google...",
                    TokenSource::CommandLine => "Checking the supplied token with Google...",
                    TokenSource::UserInput => "Verifying with Google...",
                };
                Line::from(Span::styled(
                    text,
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::ITALIC),
                ))
            }
            LoginStatus::Rejected(reason) => Line::from(Span::styled(
                format!("Error: {reason}"),
                Style::default().fg(Color::Red),
            )),
            LoginStatus::Notice(text) => {
                Line::from(Span::styled(text.as_str(), Style::default().fg(Color::Green)))
            }
        }
    }
}

impl Default for LoginScreen {
    fn default() -> Self {
        Self::new()
    }
}

impl Widget for &LoginScreen {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let [_, center, _] = Layout::vertical([
            Constraint::Fill(1),
            Constraint::Length(12),
            Constraint::Fill(1),
        ])
        .areas(area);
        let [_, panel, _] = Layout::horizontal([
            Constraint::Fill(1),
            Constraint::Min(50),
            Constraint::Fill(1),
        ])
        .areas(center);

        Clear.render(panel, buf);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" taskflow · Sign in ");
        let inner = block.inner(panel);
        block.render(panel, buf);

        let [heading, _, field, _, remember, _, status] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(inner);

        Paragraph::new(self.heading()).render(heading, buf);
        (&self.token).render(field, buf);

        let checkbox = if self.remember { "[x]" } else { "[ ]" };
        Paragraph::new(Line::from(vec![
            Span::styled(checkbox, Style::default().fg(Color::Yellow)),
            Span::raw(" Remember token (Tab to toggle)"),
        ]))
        .render(remember, buf);

        Paragraph::new(self.status_line()).render(status, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_token(screen: &mut LoginScreen, token: &str) {
        for c in token.chars() {
            screen.handle_key(key(KeyCode::Char(c)));
        }
    }

    fn rendered(screen: &LoginScreen) -> String {
        let area = Rect::new(0, 0, 80, 20);
        let mut buf = Buffer::empty(area);
        screen.render(area, &mut buf);
        buf.content().iter().map(ratatui::buffer::Cell::symbol).collect()
    }

    #[test]
    fn test_enter_submits_trimmed_token() {
        let mut screen = LoginScreen::new();
        assert!(matches!(
            screen.handle_key(key(KeyCode::Enter)),
            LoginAction::None
        ));

        type_token(&mut screen, " a.b.c ");
        let LoginAction::Submit(request) = screen.handle_key(key(KeyCode::Enter)) else {
            panic!("expected submit");
        };
        assert_eq!(request.token, "a.b.c");
        assert_eq!(request.source, TokenSource::UserInput);
        assert!(request.persist_token);
    }

    #[test]
    fn test_unchecked_remember_skips_persistence() {
        let mut screen = LoginScreen::new();
        screen.handle_key(key(KeyCode::Tab));
        assert!(!screen.remembers_token());
        type_token(&mut screen, "a.b.c");

        let LoginAction::Submit(request) = screen.handle_key(key(KeyCode::Enter)) else {
            panic!("expected submit");
        };
        assert!(!request.persist_token);
    }

    #[test]
    fn test_verifying_ignores_keys() {
        let mut screen = LoginScreen::new();
        type_token(&mut screen, "a.b.c");
        screen.set_verifying(TokenSource::UserInput);

        assert!(matches!(
            screen.handle_key(key(KeyCode::Enter)),
            LoginAction::None
        ));
        screen.handle_key(key(KeyCode::Backspace));
        assert!(matches!(
            screen.status(),
            LoginStatus::Verifying(TokenSource::UserInput)
        ));
    }

    #[test]
    fn test_rejection_is_dismissed_by_next_key() {
        let mut screen = LoginScreen::new();
        screen.set_rejected("Token rejected. It may be invalid or expired.");

        screen.handle_key(key(KeyCode::Char('x')));
        assert_eq!(screen.status(), &LoginStatus::Idle);

        screen.handle_key(key(KeyCode::Char('x')));
        let LoginAction::Submit(request) = screen.handle_key(key(KeyCode::Enter)) else {
            panic!("expected submit");
        };
        assert_eq!(request.token, "x");
    }

    #[test]
    fn test_forget_saved_token() {
        let mut screen = LoginScreen::new();
        let action = screen.handle_key(KeyEvent::new(KeyCode::Char('d'), KeyModifiers::ALT));

        assert!(matches!(action, LoginAction::ForgetSavedToken));
        assert_eq!(
            screen.status(),
            &LoginStatus::Notice("Saved token forgotten.".to_string())
        );

        screen.handle_key(key(KeyCode::Char('x')));
        assert_eq!(screen.status(), &LoginStatus::Idle);
    }

    #[test]
    fn test_signed_out_screen_names_previous_account() {
        let screen = LoginScreen::signed_out(&User::new("ada@example.com"));
        assert_eq!(screen.previous_user(), Some("ada@example.com"));
        assert!(rendered(&screen).contains("Signed out of ada@example.com"));
        assert!(LoginScreen::new().previous_user().is_none());
    }

    #[test]
    fn test_verifying_text_names_token_source() {
        let mut screen = LoginScreen::new();
        screen.set_verifying(TokenSource::Keyring);
        assert!(rendered(&screen).contains("Checking your saved sign-in with Google"));

        screen.set_verifying(TokenSource::UserInput);
        assert!(rendered(&screen).contains("Verifying with Google"));
    }
}
