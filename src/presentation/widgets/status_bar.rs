//! Status bar widget.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};
use unicode_width::UnicodeWidthStr;

use crate::domain::ConnectionStatus;

/// Status bar severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl StatusLevel {
    #[must_use]
    pub const fn color(self) -> Color {
        match self {
            Self::Info => Color::Cyan,
            Self::Success => Color::Green,
            Self::Warning => Color::Yellow,
            Self::Error => Color::Red,
        }
    }

    /// Level used to colour the live-update indicator.
    #[must_use]
    pub const fn for_connection(status: ConnectionStatus) -> Self {
        match status {
            ConnectionStatus::Connected => Self::Success,
            ConnectionStatus::Connecting | ConnectionStatus::Reconnecting { .. } => Self::Warning,
            ConnectionStatus::Disconnected => Self::Info,
            ConnectionStatus::Failed => Self::Error,
        }
    }
}

/// One-line bar with left, centre and right sections.
#[derive(Debug, Clone)]
pub struct StatusBar {
    left: String,
    center: String,
    right: String,
    level: StatusLevel,
    right_level: Option<StatusLevel>,
}

impl StatusBar {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            left: String::new(),
            center: String::new(),
            right: String::new(),
            level: StatusLevel::Info,
            right_level: None,
        }
    }

    #[must_use]
    pub fn left(mut self, content: impl Into<String>) -> Self {
        self.left = content.into();
        self
    }

    #[must_use]
    pub fn center(mut self, content: impl Into<String>) -> Self {
        self.center = content.into();
        self
    }

    #[must_use]
    pub fn right(mut self, content: impl Into<String>) -> Self {
        self.right = content.into();
        self
    }

    #[must_use]
    pub const fn level(mut self, level: StatusLevel) -> Self {
        self.level = level;
        self
    }

    /// Shows the live-update state in the right section.
    #[must_use]
    pub fn connection(mut self, status: ConnectionStatus) -> Self {
        self.right = format!("● {}", status.label());
        self.right_level = Some(StatusLevel::for_connection(status));
        self
    }
}

impl Default for StatusBar {
    fn default() -> Self {
        Self::new()
    }
}

impl Widget for &StatusBar {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let style = Style::default()
            .fg(self.level.color())
            .add_modifier(Modifier::BOLD);
        let right_style = self
            .right_level
            .map_or(style, |level| style.fg(level.color()));

        let width = area.width as usize;

        let left_len = self.left.width();
        let center_len = self.center.width();
        let right_len = self.right.width();

        let center_start = width.saturating_sub(center_len) / 2;
        let right_start = width.saturating_sub(right_len);

        let mut spans = Vec::new();

        spans.push(Span::styled(&self.left, style));

        let left_padding = center_start.saturating_sub(left_len);
        if left_padding > 0 {
            spans.push(Span::raw(" ".repeat(left_padding)));
        }

        if !self.center.is_empty() {
            spans.push(Span::styled(&self.center, style.remove_modifier(Modifier::BOLD)));
        }

        let current_len = left_len + left_padding + center_len;
        let right_padding = right_start.saturating_sub(current_len);
        if right_padding > 0 {
            spans.push(Span::raw(" ".repeat(right_padding)));
        }

        if !self.right.is_empty() {
            spans.push(Span::styled(&self.right, right_style));
        }

        Paragraph::new(Line::from(spans)).render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(buf: &Buffer, width: u16) -> String {
        (0..width).map(|x| buf[(x, 0)].symbol().to_string()).collect()
    }

    #[test]
    fn test_connection_levels() {
        assert_eq!(
            StatusLevel::for_connection(ConnectionStatus::Connected),
            StatusLevel::Success
        );
        assert_eq!(
            StatusLevel::for_connection(ConnectionStatus::Reconnecting { attempt: 2 }),
            StatusLevel::Warning
        );
        assert_eq!(
            StatusLevel::for_connection(ConnectionStatus::Failed),
            StatusLevel::Error
        );
    }

    #[test]
    fn test_sections_are_placed() {
        let bar = StatusBar::new()
            .left("taskflow")
            .connection(ConnectionStatus::Connected);
        let area = Rect::new(0, 0, 30, 1);
        let mut buf = Buffer::empty(area);
        (&bar).render(area, &mut buf);

        let text = row(&buf, 30);
        assert!(text.starts_with("taskflow"));
        assert!(text.trim_end().ends_with("● live"));
    }
}
