//! Add / edit task form.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
};

use crate::domain::entities::{Category, Task, TaskDraft, TaskId};
use crate::presentation::widgets::TextInput;

const FORM_WIDTH: u16 = 64;
const FORM_HEIGHT: u16 = 19;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(TaskId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    Description,
    Category,
    Deadline,
}

impl FormField {
    const ORDER: [Self; 4] = [
        Self::Title,
        Self::Description,
        Self::Category,
        Self::Deadline,
    ];

    fn position(self) -> usize {
        Self::ORDER.iter().position(|f| *f == self).unwrap_or(0)
    }

    fn next(self) -> Self {
        Self::ORDER[(self.position() + 1) % Self::ORDER.len()]
    }

    fn previous(self) -> Self {
        Self::ORDER[(self.position() + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormAction {
    None,
    Submit,
    Cancel,
}

/// Modal form backing both "Add task" and "Edit task".
#[derive(Debug, Clone)]
pub struct TaskForm {
    mode: FormMode,
    title: TextInput,
    description: TextInput,
    deadline: TextInput,
    category: Category,
    focus: FormField,
    error: Option<String>,
    submitting: bool,
}

impl TaskForm {
    /// Empty form for a new task, preset to `category`.
    #[must_use]
    pub fn create(category: Category) -> Self {
        let mut form = Self {
            mode: FormMode::Create,
            title: TextInput::new("Title")
                .placeholder("Task title")
                .max_chars(Task::MAX_TITLE_LEN),
            description: TextInput::new("Description")
                .placeholder("Optional details")
                .max_chars(Task::MAX_DESCRIPTION_LEN),
            deadline: TextInput::new("Deadline").placeholder("YYYY-MM-DD"),
            category,
            focus: FormField::Title,
            error: None,
            submitting: false,
        };
        form.sync_focus();
        form
    }

    /// Form prefilled from an existing task.
    #[must_use]
    pub fn edit(task: &Task) -> Self {
        let draft = TaskDraft::from_task(task);
        let mut form = Self::create(draft.category);
        form.mode = FormMode::Edit(task.id().clone());
        form.title.set_value(draft.title);
        form.description.set_value(draft.description);
        form.deadline.set_value(draft.deadline);
        form
    }

    #[must_use]
    pub const fn mode(&self) -> &FormMode {
        &self.mode
    }

    #[must_use]
    pub const fn focus(&self) -> FormField {
        self.focus
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub const fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Current contents as an unvalidated draft.
    #[must_use]
    pub fn draft(&self) -> TaskDraft {
        TaskDraft {
            title: self.title.value().to_string(),
            description: self.description.value().to_string(),
            category: self.category,
            deadline: self.deadline.value().trim().to_string(),
        }
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.submitting = false;
    }

    pub fn set_submitting(&mut self) {
        self.error = None;
        self.submitting = true;
    }

    fn sync_focus(&mut self) {
        self.title.set_focused(self.focus == FormField::Title);
        self.description
            .set_focused(self.focus == FormField::Description);
        self.deadline.set_focused(self.focus == FormField::Deadline);
    }

    fn focused_input(&mut self) -> Option<&mut TextInput> {
        match self.focus {
            FormField::Title => Some(&mut self.title),
            FormField::Description => Some(&mut self.description),
            FormField::Deadline => Some(&mut self.deadline),
            FormField::Category => None,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FormAction {
        if key.code == KeyCode::Esc {
            return FormAction::Cancel;
        }

        if self.submitting {
            return FormAction::None;
        }

        match key.code {
            KeyCode::Enter => return FormAction::Submit,
            KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return FormAction::Submit;
            }
            KeyCode::Tab | KeyCode::Down => {
                self.focus = self.focus.next();
                self.sync_focus();
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.focus = self.focus.previous();
                self.sync_focus();
            }
            code if self.focus == FormField::Category => match code {
                KeyCode::Right | KeyCode::Char('l' | ' ') => {
                    self.category = self.category.next();
                }
                KeyCode::Left | KeyCode::Char('h') => {
                    self.category = self.category.previous();
                }
                _ => {}
            },
            code => {
                let Some(input) = self.focused_input() else {
                    return FormAction::None;
                };
                if input.edit(code) {
                    self.error = None;
                }
            }
        }

        FormAction::None
    }

    fn render_category(&self, area: Rect, buf: &mut Buffer) {
        let focused = self.focus == FormField::Category;
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(if focused {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default().fg(Color::Gray)
            })
            .title(" Category ");

        let mut spans = Vec::new();
        for category in Category::ALL {
            let style = if category == self.category {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            spans.push(Span::styled(format!(" {category} "), style));
            spans.push(Span::raw(" "));
        }

        Paragraph::new(Line::from(spans)).block(block).render(area, buf);
    }
}

impl Widget for &TaskForm {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let [_, middle, _] = Layout::vertical([
            Constraint::Fill(1),
            Constraint::Length(FORM_HEIGHT.min(area.height)),
            Constraint::Fill(1),
        ])
        .areas(area);
        let [_, popup, _] = Layout::horizontal([
            Constraint::Fill(1),
            Constraint::Length(FORM_WIDTH.min(area.width)),
            Constraint::Fill(1),
        ])
        .areas(middle);

        Clear.render(popup, buf);

        let heading = match self.mode {
            FormMode::Create => " Add Task ",
            FormMode::Edit(_) => " Edit Task ",
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(heading);
        let inner = block.inner(popup);
        block.render(popup, buf);

        let [title, description, category, deadline, _, status] = Layout::vertical([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(2),
        ])
        .areas(inner);

        (&self.title).render(title, buf);
        (&self.description).render(description, buf);
        self.render_category(category, buf);
        (&self.deadline).render(deadline, buf);

        let status_line = if self.submitting {
            Line::from(Span::styled(
                "Saving...",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::ITALIC),
            ))
        } else if let Some(error) = &self.error {
            Line::from(Span::styled(error.as_str(), Style::default().fg(Color::Red)))
        } else {
            Line::from(Span::styled(
                "Enter: Save | Tab: Next field | Esc: Cancel",
                Style::default().fg(Color::DarkGray),
            ))
        };
        Paragraph::new(status_line).render(status, buf);
    }
}
