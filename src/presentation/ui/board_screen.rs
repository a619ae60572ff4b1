//! Task board with four columns.

use chrono::{Local, NaiveDate};
use crossterm::event::KeyEvent;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, BorderType, Borders, Clear, List, ListItem, ListState, Paragraph, StatefulWidget,
        Widget,
    },
};

use crate::application::services::{BoardView, LoadState, TaskBoard};
use crate::domain::entities::{Category, Task, TaskDraft, TaskId, User};
use crate::domain::keybinding::{Action, Keybind};
use crate::domain::{ConnectionStatus, Notification};
use crate::infrastructure::config::UiConfig;
use crate::presentation::commands::{CommandRegistry, HasCommands};
use crate::presentation::ui::notification_popup::NotificationPopup;
use crate::presentation::ui::task_form::{FormAction, FormMode, TaskForm};
use crate::presentation::widgets::{FocusContext, FooterBar, StatusBar};

/// What the app must do after a key press on the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardKeyResult {
    Consumed,
    Quit,
    Logout,
    Refresh,
    Delete(TaskId),
    Move { id: TaskId, to: Category },
    SubmitCreate(TaskDraft),
    SubmitEdit { id: TaskId, draft: TaskDraft },
}

/// A task picked up for drag-and-drop.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Grab {
    task: TaskId,
    origin: Category,
    target: BoardView,
}

pub struct BoardScreenState {
    user: User,
    focus: BoardView,
    selected: [usize; 4],
    grab: Option<Grab>,
    form: Option<TaskForm>,
    show_help: bool,
    connection: ConnectionStatus,
    date_format: String,
    highlight_overdue: bool,
}

impl BoardScreenState {
    #[must_use]
    pub fn new(user: User, ui: &UiConfig) -> Self {
        Self {
            user,
            focus: BoardView::All,
            selected: [0; 4],
            grab: None,
            form: None,
            show_help: false,
            connection: ConnectionStatus::Disconnected,
            date_format: ui.date_format.clone(),
            highlight_overdue: ui.highlight_overdue,
        }
    }

    #[must_use]
    pub const fn user(&self) -> &User {
        &self.user
    }

    #[must_use]
    pub const fn focus(&self) -> BoardView {
        self.focus
    }

    #[must_use]
    pub fn grabbed(&self) -> Option<&TaskId> {
        self.grab.as_ref().map(|g| &g.task)
    }

    #[must_use]
    pub const fn form(&self) -> Option<&TaskForm> {
        self.form.as_ref()
    }

    pub fn set_connection_status(&mut self, status: ConnectionStatus) {
        self.connection = status;
    }

    #[must_use]
    pub const fn connection_status(&self) -> ConnectionStatus {
        self.connection
    }

    /// Closes the form after a successful save.
    pub fn close_form(&mut self) {
        self.form = None;
    }

    /// Keeps the form open and shows why saving failed.
    pub fn form_error(&mut self, message: impl Into<String>) {
        if let Some(form) = self.form.as_mut() {
            form.set_error(message);
        }
    }

    fn pending_create(&mut self) -> Option<&mut TaskForm> {
        self.form
            .as_mut()
            .filter(|form| form.is_submitting() && *form.mode() == FormMode::Create)
    }

    /// Closes the create form that was waiting on the server.
    ///
    /// A form opened after the request went out is left alone.
    pub fn finish_create(&mut self) {
        if self.pending_create().is_some() {
            self.form = None;
        }
    }

    /// Reports a failed create on the form still waiting for it.
    pub fn reject_create(&mut self, message: impl Into<String>) {
        if let Some(form) = self.pending_create() {
            form.set_error(message);
        }
    }

    fn selected_index(&self, board: &TaskBoard, view: BoardView) -> Option<usize> {
        let len = board.len(view);
        (len > 0).then(|| self.selected[view.index()].min(len - 1))
    }

    /// Task under the cursor in the focused column.
    #[must_use]
    pub fn selected_task<'b>(&self, board: &'b TaskBoard) -> Option<&'b Task> {
        let index = self.selected_index(board, self.focus)?;
        board.view(self.focus).get(index).copied()
    }

    fn step(&mut self, board: &TaskBoard, delta: isize) {
        let len = board.len(self.focus);
        let slot = &mut self.selected[self.focus.index()];
        if len == 0 {
            *slot = 0;
            return;
        }
        let current = (*slot).min(len - 1);
        *slot = current.saturating_add_signed(delta).min(len - 1);
    }

    pub fn handle_key(
        &mut self,
        key: KeyEvent,
        board: &TaskBoard,
        registry: &CommandRegistry,
    ) -> BoardKeyResult {
        if let Some(form) = self.form.as_mut() {
            return match form.handle_key(key) {
                FormAction::None => BoardKeyResult::Consumed,
                FormAction::Cancel => {
                    self.form = None;
                    BoardKeyResult::Consumed
                }
                FormAction::Submit => {
                    let draft = form.draft();
                    form.set_submitting();
                    match form.mode().clone() {
                        FormMode::Create => BoardKeyResult::SubmitCreate(draft),
                        FormMode::Edit(id) => BoardKeyResult::SubmitEdit { id, draft },
                    }
                }
            };
        }

        let Some(action) = registry.find_action(key) else {
            return BoardKeyResult::Consumed;
        };

        if self.show_help {
            if matches!(action, Action::ToggleHelp | Action::Cancel) {
                self.show_help = false;
            }
            return match action {
                Action::Quit => BoardKeyResult::Quit,
                _ => BoardKeyResult::Consumed,
            };
        }

        if self.grab.is_some() {
            return self.handle_grab_action(action, board);
        }

        match action {
            Action::Quit => return BoardKeyResult::Quit,
            Action::Logout => return BoardKeyResult::Logout,
            Action::Refresh => return BoardKeyResult::Refresh,
            Action::ToggleHelp => self.show_help = true,
            Action::NavigateUp => self.step(board, -1),
            Action::NavigateDown => self.step(board, 1),
            Action::NavigateLeft => self.focus = self.focus.previous(),
            Action::NavigateRight => self.focus = self.focus.next(),
            Action::SelectFirst => self.selected[self.focus.index()] = 0,
            Action::SelectLast => {
                self.selected[self.focus.index()] = board.len(self.focus).saturating_sub(1);
            }
            Action::NewTask => {
                let category = self.focus.category().unwrap_or_default();
                self.form = Some(TaskForm::create(category));
            }
            Action::EditTask => {
                if let Some(task) = self.selected_task(board) {
                    self.form = Some(TaskForm::edit(task));
                }
            }
            Action::DeleteTask => {
                if let Some(task) = self.selected_task(board) {
                    return BoardKeyResult::Delete(task.id().clone());
                }
            }
            Action::GrabTask => {
                if let Some(task) = self.selected_task(board) {
                    self.grab = Some(Grab {
                        task: task.id().clone(),
                        origin: task.category(),
                        target: BoardView::Category(task.category()),
                    });
                }
            }
            Action::DropTask | Action::Cancel => {}
        }

        BoardKeyResult::Consumed
    }

    fn handle_grab_action(&mut self, action: Action, board: &TaskBoard) -> BoardKeyResult {
        let Some(grab) = self.grab.as_mut() else {
            return BoardKeyResult::Consumed;
        };

        if board.get(&grab.task).is_none() {
            self.grab = None;
            return BoardKeyResult::Consumed;
        }

        match action {
            Action::Quit => return BoardKeyResult::Quit,
            Action::NavigateLeft => grab.target = grab.target.previous(),
            Action::NavigateRight => grab.target = grab.target.next(),
            Action::Cancel => self.grab = None,
            Action::GrabTask | Action::DropTask | Action::EditTask => {
                let Some(grab) = self.grab.take() else {
                    return BoardKeyResult::Consumed;
                };
                match grab.target.category() {
                    Some(to) if to != grab.origin => {
                        self.focus = grab.target;
                        self.selected[grab.target.index()] = usize::MAX;
                        return BoardKeyResult::Move { id: grab.task, to };
                    }
                    _ => {}
                }
            }
            _ => {}
        }

        BoardKeyResult::Consumed
    }

    fn focus_context(&self) -> FocusContext {
        if self.form.is_some() {
            FocusContext::Form
        } else if self.grab.is_some() {
            FocusContext::Grabbing
        } else {
            FocusContext::Board
        }
    }
}

impl HasCommands for BoardScreenState {
    fn get_commands(&self, registry: &CommandRegistry) -> Vec<Keybind> {
        match self.focus_context() {
            FocusContext::Form => Vec::new(),
            FocusContext::Grabbing => registry.keybinds(&[
                Action::NavigateLeft,
                Action::NavigateRight,
                Action::DropTask,
                Action::Cancel,
            ]),
            FocusContext::Board => registry.keybinds(&[
                Action::NewTask,
                Action::EditTask,
                Action::DeleteTask,
                Action::GrabTask,
                Action::Refresh,
                Action::Logout,
                Action::ToggleHelp,
                Action::Quit,
            ]),
        }
    }
}

/// Renders the board from [`TaskBoard`] data and the screen state.
pub struct BoardScreen<'a> {
    board: &'a TaskBoard,
    registry: &'a CommandRegistry,
    notification: Option<&'a Notification>,
    today: NaiveDate,
}

impl<'a> BoardScreen<'a> {
    #[must_use]
    pub fn new(board: &'a TaskBoard, registry: &'a CommandRegistry) -> Self {
        Self {
            board,
            registry,
            notification: None,
            today: Local::now().date_naive(),
        }
    }

    #[must_use]
    pub const fn notification(mut self, notification: Option<&'a Notification>) -> Self {
        self.notification = notification;
        self
    }

    #[must_use]
    pub const fn today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    fn task_item(&self, task: &Task, view: BoardView, state: &BoardScreenState) -> ListItem<'a> {
        let grabbed = state.grabbed() == Some(task.id());
        let pending = self.board.has_pending(task.id());

        let mut title_style = Style::default().add_modifier(Modifier::BOLD);
        if grabbed {
            title_style = title_style.fg(Color::Yellow);
        } else if pending {
            title_style = title_style.fg(Color::DarkGray);
        }

        let mut title = vec![Span::styled(task.title().to_string(), title_style)];
        if view == BoardView::All {
            title.push(Span::styled(
                format!("  [{}]", task.category()),
                Style::default().fg(category_color(task.category())),
            ));
        }

        let mut lines = vec![Line::from(title)];

        if !task.description().is_empty() {
            lines.push(Line::from(Span::styled(
                task.description().to_string(),
                Style::default().fg(Color::Gray),
            )));
        }

        if let Some(deadline) = task.deadline() {
            let overdue = state.highlight_overdue && task.is_overdue(self.today);
            let style = if overdue {
                Style::default().fg(Color::Red)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            lines.push(Line::from(Span::styled(
                format!("Due {}", format_date(deadline, &state.date_format)),
                style,
            )));
        }

        ListItem::new(lines)
    }

    fn render_column(
        &self,
        view: BoardView,
        area: Rect,
        buf: &mut Buffer,
        state: &BoardScreenState,
    ) {
        let focused = state.focus == view;
        let drop_target = state.grab.as_ref().is_some_and(|g| g.target == view);
        let tasks = self.board.view(view);

        let border_style = if drop_target {
            Style::default().fg(Color::Yellow)
        } else if focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        let title = match self.board.load_state(view) {
            LoadState::Loading => format!(" {} (loading) ", view.title()),
            LoadState::Failed(_) => format!(" {} (failed) ", view.title()),
            LoadState::Idle | LoadState::Loaded => format!(" {} ({}) ", view.title(), tasks.len()),
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(if drop_target {
                BorderType::Double
            } else {
                BorderType::Rounded
            })
            .border_style(border_style)
            .title(title);

        if tasks.is_empty() {
            let message = match self.board.load_state(view) {
                LoadState::Failed(message) => Line::from(Span::styled(
                    format!("Error fetching tasks: {message}"),
                    Style::default().fg(Color::Red),
                )),
                LoadState::Loading | LoadState::Idle => Line::from(Span::styled(
                    "Loading...",
                    Style::default().fg(Color::DarkGray),
                )),
                LoadState::Loaded => Line::from(Span::styled(
                    "No tasks",
                    Style::default().fg(Color::DarkGray),
                )),
            };
            Paragraph::new(message).block(block).render(area, buf);
            return;
        }

        let items: Vec<ListItem> = tasks
            .iter()
            .map(|task| self.task_item(task, view, state))
            .collect();

        let mut list_state = ListState::default();
        if focused {
            list_state.select(state.selected_index(self.board, view));
        }

        let list = List::new(items)
            .block(block)
            .highlight_symbol("▌")
            .highlight_style(Style::default().bg(Color::Rgb(40, 44, 52)));

        StatefulWidget::render(list, area, buf, &mut list_state);
    }

    fn render_help(&self, area: Rect, buf: &mut Buffer) {
        let actions = [
            Action::NavigateUp,
            Action::NavigateDown,
            Action::NavigateLeft,
            Action::NavigateRight,
            Action::SelectFirst,
            Action::SelectLast,
            Action::NewTask,
            Action::EditTask,
            Action::DeleteTask,
            Action::GrabTask,
            Action::DropTask,
            Action::Cancel,
            Action::Refresh,
            Action::Logout,
            Action::ToggleHelp,
            Action::Quit,
        ];
        let binds = self.registry.keybinds(&actions);

        let height = u16::try_from(binds.len()).unwrap_or(u16::MAX).saturating_add(2);
        let [_, middle, _] = Layout::vertical([
            Constraint::Fill(1),
            Constraint::Length(height.min(area.height)),
            Constraint::Fill(1),
        ])
        .areas(area);
        let [_, popup, _] = Layout::horizontal([
            Constraint::Fill(1),
            Constraint::Length(36.min(area.width)),
            Constraint::Fill(1),
        ])
        .areas(middle);

        let lines: Vec<Line> = binds
            .iter()
            .map(|bind| {
                Line::from(vec![
                    Span::styled(
                        format!("{:>8}  ", FooterBar::format_key(&bind.key)),
                        Style::default().fg(Color::Yellow),
                    ),
                    Span::raw(bind.label.to_string()),
                ])
            })
            .collect();

        Clear.render(popup, buf);
        Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan))
                    .title(" Keys "),
            )
            .render(popup, buf);
    }
}

/// Formats with the configured pattern, falling back to ISO for bad patterns.
fn format_date(date: NaiveDate, pattern: &str) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    if write!(out, "{}", date.format(pattern)).is_err() {
        return date.to_string();
    }
    out
}

const fn category_color(category: Category) -> Color {
    match category {
        Category::ToDo => Color::Blue,
        Category::InProgress => Color::Yellow,
        Category::Done => Color::Green,
    }
}

impl StatefulWidget for BoardScreen<'_> {
    type State = BoardScreenState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let [header, body, footer] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(1),
        ])
        .areas(area);

        let pending = self.board.pending_count();
        let center = if pending > 0 {
            format!("saving {pending} change(s)")
        } else {
            String::new()
        };
        let status = StatusBar::new()
            .left(format!(" taskflow · {}", state.user.display_name()))
            .center(center)
            .connection(state.connection);
        (&status).render(header, buf);

        let columns: [Rect; 4] = Layout::horizontal([Constraint::Ratio(1, 4); 4]).areas(body);
        for (view, column) in BoardView::ALL.into_iter().zip(columns) {
            self.render_column(view, column, buf, state);
        }

        let binds = state.get_commands(self.registry);
        let email = state.user.email().to_string();
        FooterBar::new(&binds)
            .focus_context(state.focus_context())
            .right_info(Some(email.as_str()))
            .render(footer, buf);

        if let Some(form) = &state.form {
            form.render(body, buf);
        } else if state.show_help {
            self.render_help(body, buf);
        }

        if let Some(notification) = self.notification {
            NotificationPopup::new(notification).render(area, buf);
        }
    }
}
