use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::FutureExt;
use reqwest::Url;
use tokio::sync::{Notify, mpsc};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::connection::{PushConnection, PushSessionHandler, WebSocketConnection, push_url};
use super::constants::{
    DEFAULT_NAMESPACE, MAX_RECONNECT_ATTEMPTS, RECONNECT_DELAY_BASE, RECONNECT_DELAY_MAX,
    RECONNECT_JITTER_MAX,
};
use super::error::{PushError, PushResult};
use super::events::PushEvent;

type ConnectionFactory = Arc<dyn Fn() -> Box<dyn PushConnection> + Send + Sync>;

pub struct PushClientConfig {
    pub namespace: String,
    pub auto_reconnect: bool,
    pub max_reconnect_attempts: u32,
}

impl Default for PushClientConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            auto_reconnect: true,
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
        }
    }
}

impl PushClientConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    #[must_use]
    pub const fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    #[must_use]
    pub const fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }
}

/// Handles owned by the caller for one spawned push loop.
struct Session {
    running: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
}

/// Keeps a Socket.IO subscription open in the background and reports
/// [`PushEvent`]s over a channel.
pub struct PushClient {
    config: PushClientConfig,
    factory: ConnectionFactory,
    session: Option<Session>,
}

impl PushClient {
    #[must_use]
    pub fn new(config: PushClientConfig) -> Self {
        Self {
            config,
            factory: Arc::new(|| Box::new(WebSocketConnection::new())),
            session: None,
        }
    }

    #[must_use]
    pub fn with_default_config() -> Self {
        Self::new(PushClientConfig::default())
    }

    #[cfg(test)]
    fn with_connection_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn PushConnection> + Send + Sync + 'static,
    {
        self.factory = Arc::new(factory);
        self
    }

    /// Starts the background loop against the API server at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `PushError::AlreadyConnected` if a loop is still running, or
    /// `PushError::InvalidUrl` if no socket URL can be derived.
    pub fn connect(&mut self, base_url: &Url) -> PushResult<mpsc::UnboundedReceiver<PushEvent>> {
        if self.is_running() {
            return Err(PushError::AlreadyConnected);
        }

        let url = push_url(base_url)?;
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let running = Arc::new(AtomicBool::new(true));
        let shutdown = Arc::new(Notify::new());
        self.session = Some(Session {
            running: running.clone(),
            shutdown: shutdown.clone(),
        });

        let config = PushLoopConfig {
            url,
            namespace: self.config.namespace.clone(),
            auto_reconnect: self.config.auto_reconnect,
            max_attempts: self.config.max_reconnect_attempts,
        };
        let factory = self.factory.clone();

        tokio::spawn(async move {
            let result = std::panic::AssertUnwindSafe(run_push_loop(
                config,
                factory,
                event_tx.clone(),
                running.clone(),
                shutdown,
            ));

            if let Err(panic_info) = result.catch_unwind().await {
                let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    (*s).to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };

                error!(panic = %panic_msg, "Push task panicked");
                running.store(false, Ordering::SeqCst);
                let _ = event_tx.send(PushEvent::Error {
                    message: format!("Push task panicked: {panic_msg}"),
                    recoverable: false,
                });
            }
        });

        Ok(event_rx)
    }

    /// Stops the loop; pending backoff sleeps and open sockets are cut short.
    pub fn disconnect(&mut self) {
        if let Some(session) = self.session.take() {
            session.running.store(false, Ordering::SeqCst);
            session.shutdown.notify_one();
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.running.load(Ordering::SeqCst))
    }
}

impl Drop for PushClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

struct PushLoopConfig {
    url: Url,
    namespace: String,
    auto_reconnect: bool,
    max_attempts: u32,
}

async fn run_push_loop(
    config: PushLoopConfig,
    factory: ConnectionFactory,
    event_tx: mpsc::UnboundedSender<PushEvent>,
    running: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
) {
    let mut reconnect_attempts: u32 = 0;

    while running.load(Ordering::SeqCst) {
        let mut handler = PushSessionHandler::new(factory(), config.url.clone(), event_tx.clone())
            .with_namespace(config.namespace.clone());

        match handler.connect().await {
            Ok(()) => {
                reconnect_attempts = 0;

                match handler.run(&shutdown).await {
                    Ok(()) => break,
                    Err(e) => {
                        warn!(error = %e, "Push connection lost");
                        let _ = event_tx.send(PushEvent::Disconnected {
                            reason: e.to_string(),
                        });

                        if !e.should_reconnect() {
                            break;
                        }
                        reconnect_attempts += 1;
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to open push channel");

                let _ = event_tx.send(PushEvent::Error {
                    message: e.to_string(),
                    recoverable: e.should_reconnect(),
                });

                if !e.should_reconnect() {
                    break;
                }
                reconnect_attempts += 1;
            }
        }

        if !running.load(Ordering::SeqCst) || !config.auto_reconnect {
            break;
        }

        if reconnect_attempts >= config.max_attempts {
            error!(
                attempts = reconnect_attempts,
                "Max reconnection attempts exceeded"
            );
            let _ = event_tx.send(PushEvent::Error {
                message: PushError::ReconnectionLimitExceeded {
                    attempts: reconnect_attempts,
                }
                .to_string(),
                recoverable: false,
            });
            break;
        }

        let delay = calculate_backoff_delay(reconnect_attempts);
        info!(
            attempt = reconnect_attempts,
            delay_ms = delay.as_millis(),
            "Reconnecting push channel"
        );

        let _ = event_tx.send(PushEvent::Reconnecting {
            attempt: reconnect_attempts,
        });

        tokio::select! {
            () = sleep(delay) => {}
            () = shutdown.notified() => break,
        }
    }

    running.store(false, Ordering::SeqCst);
    debug!("Push loop terminated");
}

#[allow(clippy::cast_possible_truncation)]
fn calculate_backoff_delay(attempt: u32) -> Duration {
    let base_delay = RECONNECT_DELAY_BASE.as_millis() as u64;
    let max_delay = RECONNECT_DELAY_MAX.as_millis() as u64;
    let jitter_max = RECONNECT_JITTER_MAX.as_millis() as u64;

    let exponential_delay = base_delay.saturating_mul(2_u64.saturating_pow(attempt.min(6)));
    let capped_delay = exponential_delay.min(max_delay);

    Duration::from_millis(capped_delay.saturating_add(rand_jitter(jitter_max)))
}

fn rand_jitter(max: u64) -> u64 {
    use std::time::SystemTime;

    if max == 0 {
        return 0;
    }

    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| u64::from(d.subsec_nanos()))
        .unwrap_or(0);

    nanos % max
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::TaskId;
    use crate::infrastructure::push::connection::testing::ScriptedConnection;
    use std::sync::Mutex;

    const OPEN: &str = r#"0{"sid":"eio-1","pingInterval":25000,"pingTimeout":20000}"#;

    fn base() -> Url {
        Url::parse("http://localhost:5000").unwrap()
    }

    fn scripted(frames: &'static [&'static str]) -> Box<dyn PushConnection> {
        let (connection, script, _) = ScriptedConnection::new();
        for frame in frames {
            script.send((*frame).to_string()).unwrap();
        }
        Box::new(connection)
    }

    async fn collect(mut rx: mpsc::UnboundedReceiver<PushEvent>) -> Vec<PushEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_config_builder() {
        let config = PushClientConfig::new()
            .with_namespace("/tasks")
            .with_auto_reconnect(false)
            .with_max_reconnect_attempts(5);

        assert_eq!(config.namespace, "/tasks");
        assert!(!config.auto_reconnect);
        assert_eq!(config.max_reconnect_attempts, 5);
    }

    #[test]
    fn test_backoff_delay() {
        let delay0 = calculate_backoff_delay(0);
        let delay1 = calculate_backoff_delay(1);
        let delay2 = calculate_backoff_delay(2);

        assert!(delay0 < delay1);
        assert!(delay1 < delay2);

        let delay_max = calculate_backoff_delay(100);
        assert!(delay_max <= RECONNECT_DELAY_MAX + RECONNECT_JITTER_MAX);
    }

    #[test]
    fn test_client_initial_state() {
        let client = PushClient::with_default_config();
        assert!(!client.is_running());
    }

    #[tokio::test]
    async fn test_rejects_non_http_base() {
        let mut client = PushClient::with_default_config();
        let result = client.connect(&Url::parse("ftp://example.com").unwrap());
        assert!(matches!(result, Err(PushError::InvalidUrl { .. })));
        assert!(!client.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let mut client = PushClient::new(PushClientConfig::new().with_max_reconnect_attempts(2))
            .with_connection_factory(|| Box::new(ScriptedConnection::refusing()));

        let events = collect(client.connect(&base()).unwrap()).await;

        assert_eq!(events.len(), 4);
        assert!(matches!(
            events[0],
            PushEvent::Error {
                recoverable: true,
                ..
            }
        ));
        assert_eq!(events[1], PushEvent::Reconnecting { attempt: 1 });
        assert!(matches!(
            events[3],
            PushEvent::Error {
                recoverable: false,
                ..
            }
        ));
        assert!(!client.is_running());
    }

    #[tokio::test]
    async fn test_rejected_handshake_is_not_retried() {
        let mut client = PushClient::with_default_config()
            .with_connection_factory(|| scripted(&[OPEN, r#"44{"message":"unauthorized"}"#]));

        let events = collect(client.connect(&base()).unwrap()).await;

        assert_eq!(
            events,
            vec![PushEvent::Error {
                message: "server refused namespace connection: unauthorized".to_string(),
                recoverable: false,
            }]
        );
    }

    #[tokio::test]
    async fn test_forwards_deletions_until_server_disconnect() {
        let mut client = PushClient::with_default_config().with_connection_factory(|| {
            scripted(&[OPEN, "40", r#"42["taskDeleted","t1"]"#, "41"])
        });

        let events = collect(client.connect(&base()).unwrap()).await;

        assert_eq!(events.len(), 3);
        assert_eq!(
            events[0],
            PushEvent::Connected {
                sid: "eio-1".to_string()
            }
        );
        assert_eq!(events[1], PushEvent::TaskDeleted(TaskId::from("t1")));
        assert!(matches!(events[2], PushEvent::Disconnected { .. }));
    }

    #[tokio::test]
    async fn test_disconnect_stops_live_session() {
        let scripts = Arc::new(Mutex::new(Vec::new()));
        let keep = scripts.clone();
        let mut client = PushClient::with_default_config().with_connection_factory(move || {
            let (connection, script, _) = ScriptedConnection::new();
            script.send(OPEN.to_string()).unwrap();
            script.send("40".to_string()).unwrap();
            keep.lock().unwrap().push(script);
            Box::new(connection)
        });

        let mut rx = client.connect(&base()).unwrap();
        assert!(matches!(rx.recv().await, Some(PushEvent::Connected { .. })));
        assert!(client.is_running());

        client.disconnect();

        assert_eq!(rx.recv().await, None);
        assert!(!client.is_running());
        assert_eq!(scripts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_double_connect_rejected() {
        let mut client = PushClient::with_default_config()
            .with_connection_factory(|| Box::new(ScriptedConnection::refusing()));

        let _rx = client.connect(&base()).unwrap();
        assert!(matches!(
            client.connect(&base()),
            Err(PushError::AlreadyConnected)
        ));
        client.disconnect();
    }
}
