//! Request worker: runs API calls off the UI task and reports back.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::application::dto::{LoginRequest, LoginResponse};
use crate::application::services::{FetchTicket, MutationId, MutationKind};
use crate::application::use_cases::{CreateTaskError, CreateTaskUseCase, LoginUseCase};
use crate::domain::entities::{AuthToken, Category, Task, TaskDraft, TaskId, User};
use crate::domain::errors::{AuthError, TaskApiError};
use crate::domain::ports::TaskApiPort;

/// Sign-in session a request was issued from.
///
/// Results carrying an id other than the current session's are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

impl SessionId {
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Results delivered to the UI task.
#[derive(Debug)]
pub enum BackendEvent {
    LoginSuccess(LoginResponse),
    LoginFailure(AuthError),
    TokenDeleted(Result<(), AuthError>),
    ViewLoaded {
        ticket: FetchTicket,
        tasks: Vec<Task>,
    },
    ViewLoadError {
        ticket: FetchTicket,
        error: TaskApiError,
    },
    TaskCreated {
        session: SessionId,
        task: Option<Task>,
    },
    TaskCreateError {
        session: SessionId,
        error: CreateTaskError,
    },
    MutationSucceeded {
        mutation: MutationId,
        kind: MutationKind,
    },
    MutationFailed {
        mutation: MutationId,
        kind: MutationKind,
        error: TaskApiError,
    },
}

#[derive(Debug)]
pub enum BackendCommand {
    Login(LoginRequest),
    DeleteStoredToken,
    FetchView {
        ticket: FetchTicket,
        token: AuthToken,
        email: String,
    },
    CreateTask {
        session: SessionId,
        token: AuthToken,
        user: User,
        draft: TaskDraft,
    },
    UpdateTask {
        mutation: MutationId,
        token: AuthToken,
        task: Task,
    },
    UpdateCategory {
        mutation: MutationId,
        token: AuthToken,
        id: TaskId,
        from: Category,
        to: Category,
    },
    DeleteTask {
        mutation: MutationId,
        token: AuthToken,
        id: TaskId,
    },
}

/// Executes [`BackendCommand`]s concurrently, one spawned task each.
#[derive(Clone)]
pub struct Backend {
    task_api: Arc<dyn TaskApiPort>,
    login_use_case: Arc<LoginUseCase>,
    create_task_use_case: Arc<CreateTaskUseCase>,
    event_tx: mpsc::UnboundedSender<BackendEvent>,
}

impl Backend {
    pub fn new(
        task_api: Arc<dyn TaskApiPort>,
        login_use_case: Arc<LoginUseCase>,
        event_tx: mpsc::UnboundedSender<BackendEvent>,
    ) -> Self {
        let create_task_use_case = Arc::new(CreateTaskUseCase::new(task_api.clone()));
        Self {
            task_api,
            login_use_case,
            create_task_use_case,
            event_tx,
        }
    }

    pub async fn run(self, mut command_rx: mpsc::UnboundedReceiver<BackendCommand>) {
        info!("Backend worker started");
        while let Some(command) = command_rx.recv().await {
            let worker = self.clone();
            tokio::spawn(async move { worker.handle_command(command).await });
        }
        info!("Backend worker stopped");
    }

    fn emit(&self, event: BackendEvent) {
        if self.event_tx.send(event).is_err() {
            debug!("UI task gone, dropping backend event");
        }
    }

    async fn handle_command(&self, command: BackendCommand) {
        match command {
            BackendCommand::Login(request) => match self.login_use_case.execute(request).await {
                Ok(response) => self.emit(BackendEvent::LoginSuccess(response)),
                Err(e) => self.emit(BackendEvent::LoginFailure(e)),
            },
            BackendCommand::DeleteStoredToken => {
                let result = self.login_use_case.delete_token().await;
                self.emit(BackendEvent::TokenDeleted(result));
            }
            BackendCommand::FetchView {
                ticket,
                token,
                email,
            } => {
                let view = ticket.view();
                match self
                    .task_api
                    .fetch_tasks(&token, &email, view.category())
                    .await
                {
                    Ok(tasks) => {
                        debug!(view = %view, count = tasks.len(), "Fetched tasks");
                        self.emit(BackendEvent::ViewLoaded { ticket, tasks });
                    }
                    Err(error) => {
                        warn!(view = %view, error = %error, "Error fetching tasks");
                        self.emit(BackendEvent::ViewLoadError { ticket, error });
                    }
                }
            }
            BackendCommand::CreateTask {
                session,
                token,
                user,
                draft,
            } => {
                match self
                    .create_task_use_case
                    .execute(&token, Some(&user), &draft, Utc::now())
                    .await
                {
                    Ok(task) => self.emit(BackendEvent::TaskCreated { session, task }),
                    Err(error) => self.emit(BackendEvent::TaskCreateError { session, error }),
                }
            }
            BackendCommand::UpdateTask {
                mutation,
                token,
                task,
            } => {
                let result = self.task_api.update_task(&token, &task).await;
                self.finish_mutation(mutation, MutationKind::Edit, task.id(), result);
            }
            BackendCommand::UpdateCategory {
                mutation,
                token,
                id,
                from,
                to,
            } => {
                let result = self.task_api.update_category(&token, &id, to).await;
                self.finish_mutation(mutation, MutationKind::Move { from, to }, &id, result);
            }
            BackendCommand::DeleteTask {
                mutation,
                token,
                id,
            } => {
                let result = self.task_api.delete_task(&token, &id).await;
                self.finish_mutation(mutation, MutationKind::Delete, &id, result);
            }
        }
    }

    fn finish_mutation(
        &self,
        mutation: MutationId,
        kind: MutationKind,
        id: &TaskId,
        result: Result<(), TaskApiError>,
    ) {
        match result {
            Ok(()) => {
                debug!(task_id = %id, kind = ?kind, "Mutation confirmed");
                self.emit(BackendEvent::MutationSucceeded { mutation, kind });
            }
            Err(error) => {
                warn!(task_id = %id, kind = ?kind, error = %error, "Mutation failed");
                self.emit(BackendEvent::MutationFailed {
                    mutation,
                    kind,
                    error,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::{BoardView, TaskBoard};
    use crate::domain::entities::sample_token;
    use crate::domain::ports::mocks::{MockAuthPort, MockTaskApiPort, MockTokenStorage};
    use mockall::predicate::eq;

    fn token() -> AuthToken {
        AuthToken::new_unchecked(sample_token())
    }

    fn backend(api: MockTaskApiPort) -> (Backend, mpsc::UnboundedReceiver<BackendEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let login = Arc::new(LoginUseCase::new(
            Arc::new(MockAuthPort::new(true)),
            Arc::new(MockTokenStorage::new()),
        ));
        (Backend::new(Arc::new(api), login, event_tx), event_rx)
    }

    #[tokio::test]
    async fn test_fetch_uses_view_category() {
        let mut api = MockTaskApiPort::new();
        api.expect_fetch_tasks()
            .withf(|_, email, category| {
                email.to_string() == "tester@example.com" && *category == Some(Category::Done)
            })
            .times(1)
            .returning(|_, _, _| {
                Ok(vec![Task::new(
                    "t1",
                    "Ship",
                    Category::Done,
                    "tester@example.com",
                )])
            });
        let (backend, mut events) = backend(api);

        let mut board = TaskBoard::new();
        let ticket = board.begin_fetch(BoardView::Category(Category::Done));
        backend
            .handle_command(BackendCommand::FetchView {
                ticket: ticket.clone(),
                token: token(),
                email: "tester@example.com".to_string(),
            })
            .await;

        match events.recv().await {
            Some(BackendEvent::ViewLoaded { ticket: t, tasks }) => {
                assert_eq!(t, ticket);
                assert_eq!(tasks.len(), 1);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failed_move_reports_kind() {
        let mut api = MockTaskApiPort::new();
        api.expect_update_category()
            .with(
                mockall::predicate::always(),
                eq(TaskId::from("t1")),
                eq(Category::Done),
            )
            .times(1)
            .returning(|_, _, _| Err(TaskApiError::network("connection reset")));
        let (backend, mut events) = backend(api);

        let mut board = TaskBoard::new();
        let ticket = board.begin_fetch(BoardView::All);
        board.apply_fetch(
            &ticket,
            vec![Task::new("t1", "Ship", Category::ToDo, "tester@example.com")],
        );
        let mutation = board
            .move_local(&TaskId::from("t1"), Category::Done)
            .unwrap();

        backend
            .handle_command(BackendCommand::UpdateCategory {
                mutation,
                token: token(),
                id: TaskId::from("t1"),
                from: Category::ToDo,
                to: Category::Done,
            })
            .await;

        match events.recv().await {
            Some(BackendEvent::MutationFailed {
                mutation: m, kind, ..
            }) => {
                assert_eq!(m, mutation);
                assert_eq!(
                    kind,
                    MutationKind::Move {
                        from: Category::ToDo,
                        to: Category::Done
                    }
                );
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_goes_through_validation() {
        let mut api = MockTaskApiPort::new();
        api.expect_create_task().times(0);
        let (backend, mut events) = backend(api);

        backend
            .handle_command(BackendCommand::CreateTask {
                session: SessionId(3),
                token: token(),
                user: User::new("tester@example.com"),
                draft: TaskDraft::new(),
            })
            .await;

        assert!(matches!(
            events.recv().await,
            Some(BackendEvent::TaskCreateError {
                session: SessionId(3),
                error: CreateTaskError::Invalid(_),
            })
        ));
    }

    #[tokio::test]
    async fn test_created_task_carries_its_session() {
        let mut api = MockTaskApiPort::new();
        api.expect_create_task()
            .times(1)
            .returning(|_, _| Ok(Some(TaskId::from("new"))));
        let (backend, mut events) = backend(api);

        let draft = TaskDraft {
            title: "Write report".to_string(),
            deadline: "2030-01-31".to_string(),
            ..TaskDraft::new()
        };
        backend
            .handle_command(BackendCommand::CreateTask {
                session: SessionId(7),
                token: token(),
                user: User::new("tester@example.com"),
                draft,
            })
            .await;

        match events.recv().await {
            Some(BackendEvent::TaskCreated {
                session,
                task: Some(task),
            }) => {
                assert_eq!(session, SessionId(7));
                assert_eq!(task.id(), &TaskId::from("new"));
                assert_eq!(task.email(), "tester@example.com");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_run_processes_commands() {
        let mut api = MockTaskApiPort::new();
        api.expect_delete_task().times(1).returning(|_, _| Ok(()));
        let (backend, mut events) = backend(api);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        tokio::spawn(backend.run(command_rx));

        let mut board = TaskBoard::new();
        let ticket = board.begin_fetch(BoardView::All);
        board.apply_fetch(
            &ticket,
            vec![Task::new("t1", "Ship", Category::ToDo, "tester@example.com")],
        );
        let mutation = board.delete_local(&TaskId::from("t1")).unwrap();

        command_tx
            .send(BackendCommand::DeleteTask {
                mutation,
                token: token(),
                id: TaskId::from("t1"),
            })
            .unwrap();

        assert!(matches!(
            events.recv().await,
            Some(BackendEvent::MutationSucceeded {
                kind: MutationKind::Delete,
                ..
            })
        ));
    }
}
