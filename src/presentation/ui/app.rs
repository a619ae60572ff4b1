//! Main application orchestrator.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{Event, EventStream, KeyEvent, KeyEventKind};
use futures_util::StreamExt;
use ratatui::{DefaultTerminal, Frame};
use reqwest::Url;
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use crate::application::dto::{LoginRequest, LoginResponse, TokenSource};
use crate::application::services::{
    BoardView, MutationKind, NotificationManager, RollbackOutcome, TaskBoard,
};
use crate::application::use_cases::{CreateTaskError, LoginUseCase, ResolveTokenUseCase};
use crate::domain::entities::{AuthToken, Category, Task, TaskDraft, TaskId, User};
use crate::domain::errors::{AuthError, TaskApiError};
use crate::domain::keybinding::Action;
use crate::domain::ConnectionStatus;
use crate::domain::ports::{AuthPort, TaskApiPort, TokenStoragePort};
use crate::infrastructure::config::{AppConfig, ConfigError, UiConfig};
use crate::infrastructure::push::{PushClient, PushEvent};
use crate::presentation::commands::CommandRegistry;
use crate::presentation::events::{EventHandler, EventResult};
use crate::presentation::ui::backend::{Backend, BackendCommand, BackendEvent, SessionId};
use crate::presentation::ui::board_screen::{BoardKeyResult, BoardScreen, BoardScreenState};
use crate::presentation::ui::login_screen::{LoginAction, LoginScreen};
use crate::presentation::ui::notification_popup::NotificationPopup;

const TICK_RATE: Duration = Duration::from_millis(250);

/// Runtime settings derived from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub api_base: Url,
    pub live_updates: bool,
    pub persist_token: bool,
    pub notification_duration: Duration,
    pub ui: UiConfig,
    pub keybindings: HashMap<String, Action>,
}

impl AppSettings {
    /// # Errors
    /// Returns error if the API URL is invalid.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            api_base: config.api_base_url()?,
            live_updates: config.live_updates,
            persist_token: config.persist_token,
            notification_duration: config.notification_duration(),
            ui: config.ui.clone(),
            keybindings: config.keybindings.clone(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AppState {
    Login,
    Board,
    Exiting,
}

enum CurrentScreen {
    Login(LoginScreen),
    Board(Box<BoardScreenState>),
}

/// Signed-in account and the token sent with every request.
#[derive(Debug, Clone)]
struct Session {
    id: SessionId,
    user: User,
    token: AuthToken,
}

pub struct App {
    state: AppState,
    screen: CurrentScreen,
    settings: AppSettings,
    resolve_token_use_case: ResolveTokenUseCase,
    backend: Option<Backend>,
    command_tx: mpsc::UnboundedSender<BackendCommand>,
    command_rx: Option<mpsc::UnboundedReceiver<BackendCommand>>,
    event_rx: mpsc::UnboundedReceiver<BackendEvent>,
    board: TaskBoard,
    notifications: NotificationManager,
    registry: CommandRegistry,
    session: Option<Session>,
    last_session: SessionId,
    pending_login: Option<TokenSource>,
    push_client: Option<PushClient>,
    push_rx: Option<mpsc::UnboundedReceiver<PushEvent>>,
}

impl App {
    #[must_use]
    pub fn new(
        auth_port: Arc<dyn AuthPort>,
        task_api: Arc<dyn TaskApiPort>,
        storage_port: Arc<dyn TokenStoragePort>,
        settings: AppSettings,
    ) -> Self {
        let login_use_case = Arc::new(LoginUseCase::new(auth_port, storage_port.clone()));
        let resolve_token_use_case = ResolveTokenUseCase::new(storage_port);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let backend = Backend::new(task_api, login_use_case, event_tx);
        let registry = CommandRegistry::with_overrides(&settings.keybindings);
        let notifications = NotificationManager::new(settings.notification_duration);

        Self {
            state: AppState::Login,
            screen: CurrentScreen::Login(LoginScreen::new()),
            settings,
            resolve_token_use_case,
            backend: Some(backend),
            command_tx,
            command_rx: Some(command_rx),
            event_rx,
            board: TaskBoard::new(),
            notifications,
            registry,
            session: None,
            last_session: SessionId(0),
            pending_login: None,
            push_client: None,
            push_rx: None,
        }
    }

    /// # Errors
    /// Returns error if drawing to the terminal fails.
    pub async fn run(
        mut self,
        terminal: &mut DefaultTerminal,
        cli_token: Option<String>,
    ) -> color_eyre::Result<()> {
        if let (Some(backend), Some(command_rx)) = (self.backend.take(), self.command_rx.take()) {
            tokio::spawn(backend.run(command_rx));
        }

        if let Some(resolved) = self.resolve_token_use_case.execute(cli_token).await {
            info!(source = %resolved.source, "Found existing token");
            self.submit_login(resolved.into_request(self.settings.persist_token));
        }

        self.run_event_loop(terminal).await?;

        self.disconnect_push();
        info!("Application exiting normally");
        Ok(())
    }

    async fn run_event_loop(&mut self, terminal: &mut DefaultTerminal) -> color_eyre::Result<()> {
        let mut terminal_events = EventStream::new();
        let mut tick_interval = interval(TICK_RATE);

        terminal.draw(|frame| self.render(frame))?;

        while self.state != AppState::Exiting {
            let push_future = match &mut self.push_rx {
                Some(rx) => futures_util::future::Either::Left(rx.recv()),
                None => futures_util::future::Either::Right(std::future::pending()),
            };
            let terminal_event = terminal_events.next();

            tokio::select! {
                biased;

                event = push_future => {
                    match event {
                        Some(event) => self.handle_push_event(event),
                        None => {
                            debug!("Push channel closed");
                            self.push_rx = None;
                        }
                    }
                }

                Some(event) = self.event_rx.recv() => {
                    self.handle_backend_event(event);
                }

                Some(Ok(event)) = terminal_event => {
                    if self.handle_terminal_event(event) == EventResult::Exit {
                        self.state = AppState::Exiting;
                    }
                }

                _ = tick_interval.tick() => {
                    self.notifications.tick();
                }
            }

            terminal.draw(|frame| self.render(frame))?;
        }

        Ok(())
    }

    fn render(&mut self, frame: &mut Frame) {
        let area = frame.area();
        match &mut self.screen {
            CurrentScreen::Login(screen) => {
                frame.render_widget(&*screen, area);
                if let Some(notification) = self.notifications.current_notification() {
                    frame.render_widget(NotificationPopup::new(notification), area);
                }
            }
            CurrentScreen::Board(state) => {
                let screen = BoardScreen::new(&self.board, &self.registry)
                    .notification(self.notifications.current_notification());
                frame.render_stateful_widget(screen, area, state.as_mut());
            }
        }
    }

    fn send(&self, command: BackendCommand) {
        if self.command_tx.send(command).is_err() {
            error!("Backend worker stopped, dropping command");
        }
    }

    fn submit_login(&mut self, request: LoginRequest) {
        if let CurrentScreen::Login(ref mut screen) = self.screen {
            screen.set_verifying(request.source);
        }
        self.pending_login = Some(request.source);
        self.send(BackendCommand::Login(request));
    }

    fn handle_terminal_event(&mut self, event: Event) -> EventResult {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key),
            _ => EventResult::Continue,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> EventResult {
        if EventHandler::is_force_quit_event(&key) {
            return EventResult::Exit;
        }

        let result = match &mut self.screen {
            CurrentScreen::Login(screen) => {
                if EventHandler::is_quit_event(&key) {
                    return EventResult::Exit;
                }
                match screen.handle_key(key) {
                    LoginAction::Submit(request) => self.submit_login(request),
                    LoginAction::ForgetSavedToken => self.send(BackendCommand::DeleteStoredToken),
                    LoginAction::None => {}
                }
                return EventResult::Consumed;
            }
            CurrentScreen::Board(state) => state.handle_key(key, &self.board, &self.registry),
        };

        match result {
            BoardKeyResult::Quit => return EventResult::Exit,
            BoardKeyResult::Logout => self.sign_out(),
            BoardKeyResult::Refresh => self.load_all_views(),
            BoardKeyResult::Delete(id) => self.delete_task(id),
            BoardKeyResult::Move { id, to } => self.move_task(&id, to),
            BoardKeyResult::SubmitCreate(draft) => self.create_task(draft),
            BoardKeyResult::SubmitEdit { id, draft } => self.edit_task(&id, &draft),
            BoardKeyResult::Consumed => {}
        }

        EventResult::Consumed
    }

    fn board_state(&mut self) -> Option<&mut BoardScreenState> {
        match self.screen {
            CurrentScreen::Board(ref mut state) => Some(state.as_mut()),
            CurrentScreen::Login(_) => None,
        }
    }

    fn start_session(&mut self, response: LoginResponse) {
        info!(
            email = %response.user.email(),
            source = %response.token_source,
            persisted = response.token_persisted,
            "Login successful"
        );
        self.pending_login = None;
        self.board.clear();
        self.notifications.clear();
        self.screen = CurrentScreen::Board(Box::new(BoardScreenState::new(
            response.user.clone(),
            &self.settings.ui,
        )));
        self.state = AppState::Board;
        self.last_session = self.last_session.next();
        self.session = Some(Session {
            id: self.last_session,
            user: response.user,
            token: response.token,
        });
        self.notifications.success("Login Successful");
        self.load_all_views();
        self.connect_push();
    }

    fn handle_login_error(&mut self, error: &AuthError) {
        error!(error = %error, "Login failed");
        if self.pending_login.take() == Some(TokenSource::Keyring) && error.requires_new_token() {
            info!("Stored token no longer valid, forgetting it");
            self.send(BackendCommand::DeleteStoredToken);
        }
        if let CurrentScreen::Login(ref mut screen) = self.screen {
            let message = match error {
                AuthError::InvalidTokenFormat { .. } => {
                    "Invalid token format. Paste the full ID token.".to_string()
                }
                AuthError::TokenRejected { .. } => {
                    "Token rejected. It may be invalid or expired.".to_string()
                }
                AuthError::AudienceMismatch => {
                    "This token was issued for a different application.".to_string()
                }
                AuthError::NetworkError { message } => format!("Network error: {message}"),
                _ => error.to_string(),
            };
            screen.set_rejected(message);
        }
    }

    fn sign_out(&mut self) {
        info!("Signing out");
        self.disconnect_push();
        self.board.clear();
        let previous = self.session.take();
        self.pending_login = None;
        self.notifications.clear();
        self.send(BackendCommand::DeleteStoredToken);
        self.state = AppState::Login;
        let screen = previous.map_or_else(LoginScreen::new, |s| LoginScreen::signed_out(&s.user));
        self.screen = CurrentScreen::Login(screen);
        self.notifications.success("You have logged out successfully.");
    }

    fn load_all_views(&mut self) {
        let Some(session) = self.session.clone() else {
            return;
        };
        for view in BoardView::ALL {
            let ticket = self.board.begin_fetch(view);
            self.send(BackendCommand::FetchView {
                ticket,
                token: session.token.clone(),
                email: session.user.email().to_string(),
            });
        }
    }

    fn delete_task(&mut self, id: TaskId) {
        let Some(token) = self.session.as_ref().map(|s| s.token.clone()) else {
            return;
        };
        if let Some(mutation) = self.board.delete_local(&id) {
            self.send(BackendCommand::DeleteTask {
                mutation,
                token,
                id,
            });
        }
    }

    fn move_task(&mut self, id: &TaskId, to: Category) {
        let Some(token) = self.session.as_ref().map(|s| s.token.clone()) else {
            return;
        };
        let Some(from) = self.board.get(id).map(Task::category) else {
            return;
        };
        if let Some(mutation) = self.board.move_local(id, to) {
            self.send(BackendCommand::UpdateCategory {
                mutation,
                token,
                id: id.clone(),
                from,
                to,
            });
        }
    }

    fn create_task(&mut self, draft: TaskDraft) {
        let Some(session) = self.session.clone() else {
            self.notifications.error("You must be logged in to add a task.");
            if let Some(state) = self.board_state() {
                state.close_form();
            }
            return;
        };
        self.send(BackendCommand::CreateTask {
            session: session.id,
            token: session.token,
            user: session.user,
            draft,
        });
    }

    fn is_current_session(&self, session: SessionId) -> bool {
        self.session.as_ref().is_some_and(|s| s.id == session)
    }

    fn finish_create(&mut self, task: Option<Task>) {
        let refetch = task.is_none();
        if let Some(task) = task {
            self.board.insert_created(task);
        }
        if let Some(state) = self.board_state() {
            state.finish_create();
        }
        self.notifications.success("Task added successfully.");
        if refetch {
            self.load_all_views();
        }
    }

    fn reject_create(&mut self, error: &CreateTaskError) {
        if matches!(error, CreateTaskError::Api(_)) {
            self.notifications
                .error("Something went wrong while adding the task.");
        }
        if let Some(state) = self.board_state() {
            state.reject_create(error.to_string());
        }
    }

    fn edit_task(&mut self, id: &TaskId, draft: &TaskDraft) {
        let Some(token) = self.session.as_ref().map(|s| s.token.clone()) else {
            return;
        };
        let fields = match draft.validate(false) {
            Ok(fields) => fields,
            Err(e) => {
                if let Some(state) = self.board_state() {
                    state.form_error(e.to_string());
                }
                return;
            }
        };
        let Some(task) = self.board.get(id).map(|task| task.with_fields(fields)) else {
            if let Some(state) = self.board_state() {
                state.close_form();
            }
            self.notifications.error("This task no longer exists.");
            return;
        };
        if let Some(mutation) = self.board.edit_local(task.clone()) {
            self.send(BackendCommand::UpdateTask {
                mutation,
                token,
                task,
            });
        }
        if let Some(state) = self.board_state() {
            state.close_form();
        }
    }

    fn handle_backend_event(&mut self, event: BackendEvent) {
        match event {
            BackendEvent::LoginSuccess(response) => {
                if self.state == AppState::Login {
                    self.start_session(response);
                } else {
                    debug!("Ignoring login result outside the login screen");
                }
            }
            BackendEvent::LoginFailure(error) => self.handle_login_error(&error),
            BackendEvent::TokenDeleted(result) => {
                if let Err(e) = result {
                    warn!(error = %e, "Could not forget stored token");
                    self.notifications
                        .error(format!("Could not forget the saved token: {e}"));
                }
            }
            BackendEvent::ViewLoaded { ticket, tasks } => {
                if !self.board.apply_fetch(&ticket, tasks) {
                    debug!(view = %ticket.view(), "Discarded stale fetch");
                }
            }
            BackendEvent::ViewLoadError { ticket, error } => {
                if !self.board.fail_fetch(&ticket, error.to_string()) {
                    debug!(view = %ticket.view(), "Discarded stale fetch error");
                } else if matches!(error, TaskApiError::Unauthorized { .. }) {
                    self.notifications
                        .error("Your session has expired. Log out and sign in again.");
                } else if error.is_transient() && ticket.view() == BoardView::All {
                    self.notifications
                        .error("Could not reach the task server. Press r to retry.");
                }
            }
            BackendEvent::TaskCreated { session, task } => {
                if !self.is_current_session(session) {
                    debug!(session = session.0, "Dropping create result from an ended session");
                } else {
                    self.finish_create(task);
                }
            }
            BackendEvent::TaskCreateError { session, error } => {
                if !self.is_current_session(session) {
                    debug!(session = session.0, "Dropping create error from an ended session");
                } else {
                    self.reject_create(&error);
                }
            }
            BackendEvent::MutationSucceeded { mutation, kind } => {
                self.board.confirm(mutation);
                match kind {
                    MutationKind::Delete => self.notifications.success("Task deleted."),
                    MutationKind::Edit => self.notifications.success("Task updated."),
                    MutationKind::Move { .. } => {}
                }
            }
            BackendEvent::MutationFailed {
                mutation,
                kind,
                error,
            } => {
                let outcome = self.board.rollback(mutation);
                debug!(outcome = ?outcome, "Rolled back failed mutation");
                let message = match kind {
                    MutationKind::Delete => format!("Could not delete the task: {error}"),
                    MutationKind::Edit => format!("Could not save the task: {error}"),
                    MutationKind::Move { to, .. } => {
                        format!("Could not move the task to {to}: {error}")
                    }
                };
                if outcome != RollbackOutcome::Discarded
                    || matches!(error, TaskApiError::NotFound { .. })
                {
                    self.notifications.error(message);
                }
            }
        }

        if self.board.take_resync_request() {
            info!("Board out of sync, refetching");
            self.load_all_views();
        }
    }

    fn connect_push(&mut self) {
        if !self.settings.live_updates {
            debug!("Live updates disabled");
            return;
        }
        let mut client = PushClient::with_default_config();
        let status = match client.connect(&self.settings.api_base) {
            Ok(rx) => {
                info!("Push connection initiated");
                self.push_rx = Some(rx);
                self.push_client = Some(client);
                ConnectionStatus::Connecting
            }
            Err(e) => {
                error!(error = %e, "Failed to initiate push connection");
                ConnectionStatus::Failed
            }
        };
        if let Some(state) = self.board_state() {
            state.set_connection_status(status);
        }
    }

    fn disconnect_push(&mut self) {
        if let Some(mut client) = self.push_client.take() {
            client.disconnect();
        }
        self.push_rx = None;
    }

    fn handle_push_event(&mut self, event: PushEvent) {
        let status = match event {
            PushEvent::Connected { sid } => {
                info!(sid = %sid, "Live updates connected, refetching to catch missed deletions");
                self.load_all_views();
                Some(ConnectionStatus::Connected)
            }
            PushEvent::Disconnected { reason } => {
                warn!(reason = %reason, "Live updates disconnected");
                Some(ConnectionStatus::Disconnected)
            }
            PushEvent::Reconnecting { attempt } => {
                info!(attempt = attempt, "Live updates reconnecting");
                Some(ConnectionStatus::Reconnecting { attempt })
            }
            PushEvent::TaskDeleted(id) => {
                debug!(task_id = %id, "Task deleted remotely");
                self.board.apply_remote_delete(&id);
                None
            }
            PushEvent::Error {
                message,
                recoverable,
            } => {
                if recoverable {
                    warn!(error = %message, "Recoverable push error");
                    None
                } else {
                    error!(error = %message, "Live updates stopped");
                    Some(ConnectionStatus::Failed)
                }
            }
        };
        if let Some(status) = status
            && let Some(state) = self.board_state()
        {
            state.set_connection_status(status);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::FetchTicket;
    use crate::domain::entities::sample_token;
    use crate::domain::ports::mocks::{MockAuthPort, MockTaskApiPort, MockTokenStorage};
    use crate::presentation::ui::task_form::TaskForm;
    use crossterm::event::{KeyCode, KeyModifiers};

    fn settings() -> AppSettings {
        AppSettings {
            api_base: Url::parse("http://localhost:4000").unwrap(),
            live_updates: false,
            persist_token: true,
            notification_duration: Duration::from_secs(3),
            ui: UiConfig::default(),
            keybindings: HashMap::new(),
        }
    }

    fn app() -> App {
        App::new(
            Arc::new(MockAuthPort::new(true)),
            Arc::new(MockTaskApiPort::new()),
            Arc::new(MockTokenStorage::new()),
            settings(),
        )
    }

    fn drain(app: &mut App) -> Vec<BackendCommand> {
        let rx = app.command_rx.as_mut().unwrap();
        let mut commands = Vec::new();
        while let Ok(command) = rx.try_recv() {
            commands.push(command);
        }
        commands
    }

    fn log_in(app: &mut App, email: &str) {
        let response = LoginResponse::new(
            User::new(email),
            AuthToken::new_unchecked(sample_token()),
            TokenSource::UserInput,
            true,
        );
        app.handle_backend_event(BackendEvent::LoginSuccess(response));
    }

    fn signed_in() -> App {
        let mut app = app();
        log_in(&mut app, "ada@example.com");
        app
    }

    fn tickets(commands: &[BackendCommand]) -> Vec<FetchTicket> {
        commands
            .iter()
            .filter_map(|c| match c {
                BackendCommand::FetchView { ticket, .. } => Some(ticket.clone()),
                _ => None,
            })
            .collect()
    }

    fn load(app: &mut App, tasks: &[Task]) {
        for ticket in tickets(&drain(app)) {
            let view_tasks = tasks
                .iter()
                .filter(|t| ticket.view().category().is_none_or(|c| c == t.category()))
                .cloned()
                .collect();
            app.handle_backend_event(BackendEvent::ViewLoaded {
                ticket,
                tasks: view_tasks,
            });
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
    }

    fn submit_create(app: &mut App, title: &str) -> SessionId {
        app.handle_key(key(KeyCode::Char('a')));
        type_text(app, title);
        app.handle_key(key(KeyCode::Enter));
        drain(app)
            .into_iter()
            .find_map(|c| match c {
                BackendCommand::CreateTask { session, .. } => Some(session),
                _ => None,
            })
            .expect("create command")
    }

    fn form(app: &App) -> Option<&TaskForm> {
        let CurrentScreen::Board(state) = &app.screen else {
            panic!("expected board screen");
        };
        state.form()
    }

    fn task(id: &str, category: Category) -> Task {
        Task::new(TaskId::from(id), id, category, "ada@example.com")
    }

    #[test]
    fn test_app_creation() {
        let app = app();
        assert_eq!(app.state, AppState::Login);
        assert!(app.session.is_none());
    }

    #[test]
    fn test_login_success_fetches_every_view() {
        let mut app = signed_in();

        assert_eq!(app.state, AppState::Board);
        assert_eq!(
            app.notifications.current_notification().unwrap().message,
            "Login Successful"
        );
        let commands = drain(&mut app);
        let views: Vec<BoardView> = tickets(&commands).iter().map(FetchTicket::view).collect();
        assert_eq!(views, BoardView::ALL.to_vec());
    }

    #[test]
    fn test_delete_rolls_back_on_failure() {
        let mut app = signed_in();
        load(&mut app, &[task("t1", Category::ToDo)]);
        app.notifications.clear();

        app.delete_task(TaskId::from("t1"));
        assert!(app.board.get(&TaskId::from("t1")).is_none());

        let Some(BackendCommand::DeleteTask { mutation, .. }) = drain(&mut app).pop() else {
            panic!("expected delete command");
        };
        app.handle_backend_event(BackendEvent::MutationFailed {
            mutation,
            kind: MutationKind::Delete,
            error: TaskApiError::Timeout,
        });

        assert!(app.board.get(&TaskId::from("t1")).is_some());
        assert_eq!(
            app.notifications.current_notification().unwrap().level,
            crate::domain::NotificationLevel::Error
        );
    }

    #[test]
    fn test_remote_delete_removes_task() {
        let mut app = signed_in();
        load(&mut app, &[task("t1", Category::Done)]);

        app.handle_push_event(PushEvent::TaskDeleted(TaskId::from("t1")));

        assert_eq!(app.board.len(BoardView::All), 0);
        assert_eq!(app.board.len(BoardView::Category(Category::Done)), 0);
    }

    #[test]
    fn test_every_push_join_triggers_refetch() {
        let mut app = signed_in();
        load(&mut app, &[]);

        app.handle_push_event(PushEvent::Connected { sid: "a".into() });
        assert_eq!(tickets(&drain(&mut app)).len(), 4);

        app.handle_push_event(PushEvent::Reconnecting { attempt: 1 });
        assert!(drain(&mut app).is_empty());
        app.handle_push_event(PushEvent::Connected { sid: "b".into() });
        assert_eq!(tickets(&drain(&mut app)).len(), 4);
    }

    #[test]
    fn test_unreachable_server_suggests_retry() {
        let mut app = signed_in();
        let all = tickets(&drain(&mut app)).remove(0);
        app.notifications.clear();

        app.handle_backend_event(BackendEvent::ViewLoadError {
            ticket: all,
            error: TaskApiError::network("connection refused"),
        });

        assert_eq!(
            app.notifications.current_notification().unwrap().message,
            "Could not reach the task server. Press r to retry."
        );
        app.handle_key(key(KeyCode::Char('r')));
        assert_eq!(tickets(&drain(&mut app)).len(), 4);
    }

    #[test]
    fn test_client_errors_are_not_called_unreachable() {
        let mut app = signed_in();
        let all = tickets(&drain(&mut app)).remove(0);
        app.notifications.clear();

        app.handle_backend_event(BackendEvent::ViewLoadError {
            ticket: all,
            error: TaskApiError::server(404, "no such user"),
        });

        assert!(app.notifications.current_notification().is_none());
    }

    #[test]
    fn test_fetch_error_after_logout_is_silent() {
        let mut app = signed_in();
        let all = tickets(&drain(&mut app)).remove(0);
        app.sign_out();
        app.notifications.clear();

        app.handle_backend_event(BackendEvent::ViewLoadError {
            ticket: all,
            error: TaskApiError::Timeout,
        });

        assert!(app.notifications.current_notification().is_none());
    }

    #[test]
    fn test_logout_returns_to_login() {
        let mut app = signed_in();
        drain(&mut app);

        app.sign_out();

        assert_eq!(app.state, AppState::Login);
        assert!(app.session.is_none());
        assert!(app.board.is_empty());
        let CurrentScreen::Login(screen) = &app.screen else {
            panic!("expected login screen");
        };
        assert_eq!(screen.previous_user(), Some("ada@example.com"));
        assert!(matches!(
            drain(&mut app).as_slice(),
            [BackendCommand::DeleteStoredToken]
        ));
        assert_eq!(
            app.notifications.current_notification().unwrap().message,
            "You have logged out successfully."
        );
    }

    #[test]
    fn test_rejected_keyring_token_is_forgotten() {
        let mut app = app();
        app.pending_login = Some(TokenSource::Keyring);

        app.handle_backend_event(BackendEvent::LoginFailure(AuthError::rejected("expired")));

        assert!(matches!(
            drain(&mut app).as_slice(),
            [BackendCommand::DeleteStoredToken]
        ));
    }

    #[test]
    fn test_q_types_into_login_but_ctrl_c_exits() {
        let mut app = app();
        assert_eq!(app.handle_key(key(KeyCode::Char('q'))), EventResult::Consumed);
        assert_eq!(
            app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            EventResult::Exit
        );
    }

    #[test]
    fn test_create_failure_keeps_form_open() {
        let mut app = signed_in();
        load(&mut app, &[]);
        app.notifications.clear();
        let session = submit_create(&mut app, "Plan");

        app.handle_backend_event(BackendEvent::TaskCreateError {
            session,
            error: CreateTaskError::Api(TaskApiError::server(500, "boom")),
        });

        assert!(form(&app).is_some_and(|f| f.error().is_some() && !f.is_submitting()));
        assert_eq!(
            app.notifications.current_notification().unwrap().message,
            "Something went wrong while adding the task."
        );
    }

    #[test]
    fn test_created_task_closes_form() {
        let mut app = signed_in();
        load(&mut app, &[]);
        app.notifications.clear();
        let session = submit_create(&mut app, "Plan");
        assert!(form(&app).is_some_and(TaskForm::is_submitting));

        app.handle_backend_event(BackendEvent::TaskCreated {
            session,
            task: Some(task("n1", Category::ToDo)),
        });

        assert!(form(&app).is_none());
        assert!(app.board.get(&TaskId::from("n1")).is_some());
        assert_eq!(app.board.len(BoardView::Category(Category::ToDo)), 1);
        assert_eq!(
            app.notifications.current_notification().unwrap().message,
            "Task added successfully."
        );
        assert!(drain(&mut app).is_empty());
    }

    #[test]
    fn test_created_task_without_id_refetches() {
        let mut app = signed_in();
        load(&mut app, &[]);
        let session = submit_create(&mut app, "Plan");

        app.handle_backend_event(BackendEvent::TaskCreated {
            session,
            task: None,
        });

        assert!(form(&app).is_none());
        assert_eq!(tickets(&drain(&mut app)).len(), 4);
    }

    #[test]
    fn test_create_result_from_previous_session_is_dropped() {
        let mut app = signed_in();
        load(&mut app, &[]);
        let ada_session = submit_create(&mut app, "Ada's plan");

        app.sign_out();
        log_in(&mut app, "bob@example.com");
        load(&mut app, &[]);
        let bob_session = submit_create(&mut app, "Bob's plan");
        assert_ne!(ada_session, bob_session);
        app.notifications.clear();

        app.handle_backend_event(BackendEvent::TaskCreated {
            session: ada_session,
            task: Some(task("ada-1", Category::ToDo)),
        });
        app.handle_backend_event(BackendEvent::TaskCreateError {
            session: ada_session,
            error: CreateTaskError::Api(TaskApiError::Timeout),
        });

        assert!(app.board.is_empty());
        assert!(app.notifications.current_notification().is_none());
        assert!(form(&app).is_some_and(|f| f.is_submitting() && f.error().is_none()));
    }

    #[test]
    fn test_late_create_result_leaves_new_form_alone() {
        let mut app = signed_in();
        load(&mut app, &[]);
        let session = submit_create(&mut app, "First");
        app.handle_key(key(KeyCode::Esc));
        app.handle_key(key(KeyCode::Char('a')));
        type_text(&mut app, "Second");

        app.handle_backend_event(BackendEvent::TaskCreateError {
            session,
            error: CreateTaskError::Api(TaskApiError::Timeout),
        });
        assert!(form(&app).is_some_and(|f| f.error().is_none()));

        app.handle_backend_event(BackendEvent::TaskCreated {
            session,
            task: Some(task("n1", Category::ToDo)),
        });
        assert_eq!(form(&app).map(|f| f.draft().title), Some("Second".to_string()));
        assert!(app.board.get(&TaskId::from("n1")).is_some());
    }

    #[test]
    fn test_edit_validation_error_keeps_form_open() {
        let mut app = signed_in();
        load(&mut app, &[task("t1", Category::ToDo)]);
        app.handle_key(key(KeyCode::Char('e')));
        for _ in 0.."t1".len() {
            app.handle_key(key(KeyCode::Backspace));
        }

        app.handle_key(key(KeyCode::Enter));

        assert_eq!(
            form(&app).and_then(TaskForm::error),
            Some("title is required")
        );
        assert!(drain(&mut app).is_empty());
        assert_eq!(app.board.get(&TaskId::from("t1")).unwrap().title(), "t1");
    }

    #[test]
    fn test_edit_of_remotely_deleted_task() {
        let mut app = signed_in();
        load(&mut app, &[task("t1", Category::ToDo)]);
        app.notifications.clear();
        app.handle_key(key(KeyCode::Char('e')));
        app.handle_push_event(PushEvent::TaskDeleted(TaskId::from("t1")));

        app.handle_key(key(KeyCode::Enter));

        assert!(form(&app).is_none());
        assert!(drain(&mut app).is_empty());
        assert_eq!(
            app.notifications.current_notification().unwrap().message,
            "This task no longer exists."
        );
    }

    #[test]
    fn test_edit_sends_update_and_closes_form() {
        let mut app = signed_in();
        load(&mut app, &[task("t1", Category::ToDo)]);
        app.handle_key(key(KeyCode::Char('e')));
        type_text(&mut app, " draft");

        app.handle_key(key(KeyCode::Enter));

        assert!(form(&app).is_none());
        assert_eq!(
            app.board.get(&TaskId::from("t1")).unwrap().title(),
            "t1 draft"
        );
        let commands = drain(&mut app);
        assert!(matches!(
            commands.as_slice(),
            [BackendCommand::UpdateTask { task, .. }] if task.title() == "t1 draft"
        ));
    }
}
