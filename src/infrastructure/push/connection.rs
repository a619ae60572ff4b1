use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use tokio::net::TcpStream;
use tokio::sync::{Notify, mpsc};
use tokio::time::{Instant, sleep_until, timeout};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace, warn};

use super::codec::{self, EnginePacket, OpenPayload, SocketPacket};
use super::constants::{
    CONNECTION_TIMEOUT, DEFAULT_NAMESPACE, ENGINE_IO_VERSION, HANDSHAKE_TIMEOUT, SOCKET_IO_PATH,
    TASK_DELETED_EVENT,
};
use super::error::{PushError, PushResult};
use super::events::{PushEvent, deleted_task_id};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, WsMessage>;
type WsReader = SplitStream<WsStream>;

/// Builds the Socket.IO WebSocket endpoint for an API base URL.
///
/// # Errors
/// Returns `InvalidUrl` when the base is not an http(s) URL.
pub fn push_url(base: &Url) -> PushResult<Url> {
    let invalid = |message: &str| PushError::InvalidUrl {
        message: format!("{base}: {message}"),
    };

    let mut url = base.clone();
    let scheme = match base.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        _ => return Err(invalid("unsupported scheme")),
    };
    url.set_scheme(scheme)
        .map_err(|()| invalid("cannot switch to websocket scheme"))?;
    url.path_segments_mut()
        .map_err(|()| invalid("cannot carry a path"))?
        .pop_if_empty()
        .push(SOCKET_IO_PATH)
        .push("");
    url.query_pairs_mut()
        .clear()
        .append_pair("EIO", ENGINE_IO_VERSION)
        .append_pair("transport", "websocket");
    url.set_fragment(None);
    Ok(url)
}

/// A text-frame transport for the push session.
#[async_trait]
pub trait PushConnection: Send + Sync {
    async fn connect(&mut self, url: &Url) -> PushResult<()>;
    async fn disconnect(&mut self) -> PushResult<()>;
    async fn send(&mut self, frame: String) -> PushResult<()>;
    /// Waits for the next text frame.
    async fn receive(&mut self) -> PushResult<String>;
    fn is_connected(&self) -> bool;
}

pub struct WebSocketConnection {
    writer: Option<WsWriter>,
    reader: Option<WsReader>,
    connected: bool,
}

impl WebSocketConnection {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            writer: None,
            reader: None,
            connected: false,
        }
    }
}

impl Default for WebSocketConnection {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PushConnection for WebSocketConnection {
    async fn connect(&mut self, url: &Url) -> PushResult<()> {
        let (ws_stream, _) = timeout(CONNECTION_TIMEOUT, connect_async(url.as_str()))
            .await
            .map_err(|_| PushError::timeout("connection"))?
            .map_err(|e| PushError::connection_failed(e.to_string()))?;

        let (writer, reader) = ws_stream.split();
        self.writer = Some(writer);
        self.reader = Some(reader);
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> PushResult<()> {
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.close().await;
        }
        self.reader = None;
        self.connected = false;
        debug!("Push socket closed");
        Ok(())
    }

    async fn send(&mut self, frame: String) -> PushResult<()> {
        let writer = self.writer.as_mut().ok_or(PushError::NotConnected)?;
        trace!(frame = %frame, "Sending push frame");
        writer
            .send(WsMessage::Text(frame.into()))
            .await
            .map_err(|e| PushError::websocket(e.to_string()))
    }

    async fn receive(&mut self) -> PushResult<String> {
        let reader = self.reader.as_mut().ok_or(PushError::NotConnected)?;

        loop {
            match reader.next().await {
                Some(Ok(WsMessage::Text(text))) => return Ok(text.to_string()),
                Some(Ok(WsMessage::Binary(_))) => {
                    return Err(PushError::unsupported("binary engine.io frame"));
                }
                Some(Ok(WsMessage::Close(frame))) => {
                    self.connected = false;
                    let (code, reason) = frame.map_or_else(
                        || (1000, "Normal closure".to_string()),
                        |f| (f.code.into(), f.reason.to_string()),
                    );
                    return Err(PushError::ConnectionClosed { code, reason });
                }
                Some(Ok(WsMessage::Ping(data))) => {
                    if let Some(writer) = self.writer.as_mut() {
                        let _ = writer.send(WsMessage::Pong(data)).await;
                    }
                }
                Some(Ok(WsMessage::Pong(_) | WsMessage::Frame(_))) => {}
                Some(Err(e)) => {
                    self.connected = false;
                    return Err(PushError::websocket(e.to_string()));
                }
                None => {
                    self.connected = false;
                    return Err(PushError::ConnectionClosed {
                        code: 1000,
                        reason: "Stream ended".to_string(),
                    });
                }
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// Drives one push session: handshake, keepalive and event dispatch.
pub struct PushSessionHandler {
    connection: Box<dyn PushConnection>,
    url: Url,
    namespace: String,
    event_tx: mpsc::UnboundedSender<PushEvent>,
    liveness: Duration,
}

impl PushSessionHandler {
    pub fn new(
        connection: Box<dyn PushConnection>,
        url: Url,
        event_tx: mpsc::UnboundedSender<PushEvent>,
    ) -> Self {
        Self {
            connection,
            url,
            namespace: DEFAULT_NAMESPACE.to_string(),
            event_tx,
            liveness: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Opens the socket and joins the namespace.
    ///
    /// # Errors
    /// Fails if the socket cannot be opened or the handshake does not complete.
    pub async fn connect(&mut self) -> PushResult<()> {
        self.connection.connect(&self.url).await?;

        let open = self.await_open().await?;
        self.liveness = open.liveness_window();
        debug!(
            sid = %open.sid,
            ping_interval_ms = open.ping_interval.as_millis(),
            "Engine.IO session opened"
        );

        self.connection
            .send(codec::encode_connect(&self.namespace))
            .await?;
        let sid = self.await_namespace(&open).await?;

        info!(namespace = %self.namespace, sid = %sid, "Push channel connected");
        let _ = self.event_tx.send(PushEvent::Connected { sid });
        Ok(())
    }

    async fn await_open(&mut self) -> PushResult<OpenPayload> {
        let frame = timeout(HANDSHAKE_TIMEOUT, self.connection.receive())
            .await
            .map_err(|_| PushError::timeout("open packet"))??;

        match codec::decode(&frame)? {
            EnginePacket::Open(open) => Ok(open),
            other => Err(PushError::protocol(format!(
                "expected open packet, got {other:?}"
            ))),
        }
    }

    async fn await_namespace(&mut self, open: &OpenPayload) -> PushResult<String> {
        let deadline = Instant::now() + HANDSHAKE_TIMEOUT;

        loop {
            let frame = tokio::time::timeout_at(deadline, self.connection.receive())
                .await
                .map_err(|_| PushError::timeout("namespace connect"))??;

            match codec::decode(&frame)? {
                EnginePacket::Ping(payload) => {
                    self.connection.send(codec::encode_pong(&payload)).await?;
                }
                EnginePacket::Message(SocketPacket::Connect { namespace, data })
                    if namespace == self.namespace =>
                {
                    let sid = data
                        .as_ref()
                        .and_then(|d| d.get("sid"))
                        .and_then(serde_json::Value::as_str)
                        .map_or_else(|| open.sid.clone(), String::from);
                    return Ok(sid);
                }
                EnginePacket::Message(SocketPacket::ConnectError { message, .. }) => {
                    return Err(PushError::ConnectRejected { message });
                }
                EnginePacket::Close => {
                    return Err(PushError::ConnectionClosed {
                        code: 1000,
                        reason: "closed during handshake".to_string(),
                    });
                }
                other => {
                    trace!(packet = ?other, "Ignoring packet during handshake");
                }
            }
        }
    }

    /// Processes frames until the connection ends or `shutdown` fires.
    ///
    /// Returns `Ok(())` only on shutdown.
    ///
    /// # Errors
    /// Returns why the session ended otherwise.
    pub async fn run(&mut self, shutdown: &Notify) -> PushResult<()> {
        let mut deadline = Instant::now() + self.liveness;

        loop {
            tokio::select! {
                () = shutdown.notified() => {
                    debug!("Push session shutting down");
                    let _ = self.connection.disconnect().await;
                    return Ok(());
                }

                () = sleep_until(deadline) => {
                    let _ = self.connection.disconnect().await;
                    return Err(PushError::PingTimeout {
                        timeout_ms: u64::try_from(self.liveness.as_millis()).unwrap_or(u64::MAX),
                    });
                }

                frame = self.connection.receive() => {
                    match frame {
                        Ok(frame) => {
                            deadline = Instant::now() + self.liveness;
                            self.handle_frame(&frame).await?;
                        }
                        Err(e) if e.is_recoverable() => {
                            debug!(error = %e, "Skipping push frame");
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
        }
    }

    async fn handle_frame(&mut self, frame: &str) -> PushResult<()> {
        let packet = match codec::decode(frame) {
            Ok(packet) => packet,
            Err(e) => {
                warn!(error = %e, "Dropping undecodable push frame");
                return Ok(());
            }
        };

        match packet {
            EnginePacket::Ping(payload) => {
                trace!("Ping");
                self.connection.send(codec::encode_pong(&payload)).await?;
            }
            EnginePacket::Close => {
                return Err(PushError::ConnectionClosed {
                    code: 1000,
                    reason: "server closed the transport".to_string(),
                });
            }
            EnginePacket::Message(SocketPacket::Event {
                namespace,
                ack_id,
                name,
                args,
            }) if namespace == self.namespace => {
                self.handle_event(&name, &args);
                if let Some(ack_id) = ack_id {
                    self.connection
                        .send(codec::encode_ack(&self.namespace, ack_id))
                        .await?;
                }
            }
            EnginePacket::Message(SocketPacket::Disconnect { namespace })
                if namespace == self.namespace =>
            {
                return Err(PushError::ServerDisconnect {
                    reason: "io server disconnect".to_string(),
                });
            }
            EnginePacket::Message(SocketPacket::ConnectError { message, .. }) => {
                return Err(PushError::ConnectRejected { message });
            }
            other => {
                trace!(packet = ?other, "Ignoring push packet");
            }
        }

        Ok(())
    }

    fn handle_event(&self, name: &str, args: &[serde_json::Value]) {
        if name != TASK_DELETED_EVENT {
            debug!(event = name, "Ignoring push event");
            return;
        }

        match deleted_task_id(args) {
            Some(id) => {
                debug!(task_id = %id, "Task deleted remotely");
                let _ = self.event_tx.send(PushEvent::TaskDeleted(id));
            }
            None => warn!(payload = ?args, "taskDeleted without a usable id"),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Connection fed from a channel; records every frame sent.
    pub struct ScriptedConnection {
        incoming: mpsc::UnboundedReceiver<String>,
        sent: Arc<Mutex<Vec<String>>>,
        refuse: bool,
        connected: bool,
    }

    impl ScriptedConnection {
        pub fn new() -> (Self, mpsc::UnboundedSender<String>, Arc<Mutex<Vec<String>>>) {
            let (tx, rx) = mpsc::unbounded_channel();
            let sent = Arc::new(Mutex::new(Vec::new()));
            let connection = Self {
                incoming: rx,
                sent: sent.clone(),
                refuse: false,
                connected: false,
            };
            (connection, tx, sent)
        }

        pub fn refusing() -> Self {
            let (mut connection, _, _) = Self::new();
            connection.refuse = true;
            connection
        }
    }

    #[async_trait]
    impl PushConnection for ScriptedConnection {
        async fn connect(&mut self, _url: &Url) -> PushResult<()> {
            if self.refuse {
                return Err(PushError::connection_failed("connection refused"));
            }
            self.connected = true;
            Ok(())
        }

        async fn disconnect(&mut self) -> PushResult<()> {
            self.connected = false;
            Ok(())
        }

        async fn send(&mut self, frame: String) -> PushResult<()> {
            self.sent.lock().unwrap().push(frame);
            Ok(())
        }

        async fn receive(&mut self) -> PushResult<String> {
            self.incoming
                .recv()
                .await
                .ok_or_else(|| PushError::ConnectionClosed {
                    code: 1000,
                    reason: "script ended".to_string(),
                })
        }

        fn is_connected(&self) -> bool {
            self.connected
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedConnection;
    use super::*;
    use crate::domain::entities::TaskId;

    const OPEN: &str = r#"0{"sid":"eio-1","upgrades":[],"pingInterval":300,"pingTimeout":200}"#;

    fn base() -> Url {
        Url::parse("http://localhost:5000").unwrap()
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<PushEvent>) -> Vec<PushEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_push_url() {
        assert_eq!(
            push_url(&base()).unwrap().as_str(),
            "ws://localhost:5000/socket.io/?EIO=4&transport=websocket"
        );
        assert_eq!(
            push_url(&Url::parse("https://api.example.com/v1/").unwrap())
                .unwrap()
                .as_str(),
            "wss://api.example.com/v1/socket.io/?EIO=4&transport=websocket"
        );
        assert!(push_url(&Url::parse("ftp://example.com").unwrap()).is_err());
    }

    #[test]
    fn test_websocket_connection_initial_state() {
        let conn = WebSocketConnection::new();
        assert!(!conn.is_connected());
    }

    #[tokio::test]
    async fn test_handshake_joins_default_namespace() {
        let (connection, script, sent) = ScriptedConnection::new();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let mut handler = PushSessionHandler::new(Box::new(connection), base(), event_tx);

        script.send(OPEN.to_string()).unwrap();
        script.send(r#"40{"sid":"sock-1"}"#.to_string()).unwrap();

        handler.connect().await.unwrap();

        assert_eq!(*sent.lock().unwrap(), vec!["40".to_string()]);
        assert_eq!(
            drain(&mut event_rx),
            vec![PushEvent::Connected {
                sid: "sock-1".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_handshake_rejected() {
        let (connection, script, _) = ScriptedConnection::new();
        let (event_tx, _event_rx) = mpsc::unbounded_channel();
        let mut handler = PushSessionHandler::new(Box::new(connection), base(), event_tx);

        script.send(OPEN.to_string()).unwrap();
        script
            .send(r#"44{"message":"Not authorized"}"#.to_string())
            .unwrap();

        let result = handler.connect().await;
        assert!(matches!(result, Err(PushError::ConnectRejected { .. })));
    }

    #[tokio::test]
    async fn test_handshake_requires_open_packet() {
        let (connection, script, _) = ScriptedConnection::new();
        let (event_tx, _event_rx) = mpsc::unbounded_channel();
        let mut handler = PushSessionHandler::new(Box::new(connection), base(), event_tx);

        script.send("40".to_string()).unwrap();

        let result = handler.connect().await;
        assert!(matches!(result, Err(PushError::ProtocolError { .. })));
    }

    #[tokio::test]
    async fn test_session_answers_pings_and_forwards_deletions() {
        let (connection, script, sent) = ScriptedConnection::new();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let mut handler = PushSessionHandler::new(Box::new(connection), base(), event_tx);

        for frame in [
            OPEN,
            "40",
            "2",
            r#"42["taskDeleted","t1"]"#,
            r#"42["taskUpdated",{"_id":"t9"}]"#,
            "not a packet",
            r#"4217["taskDeleted",{"_id":"t2"}]"#,
        ] {
            script.send(frame.to_string()).unwrap();
        }
        drop(script);

        handler.connect().await.unwrap();
        let shutdown = Notify::new();
        let result = handler.run(&shutdown).await;

        assert!(matches!(result, Err(PushError::ConnectionClosed { .. })));
        assert_eq!(
            *sent.lock().unwrap(),
            vec!["40".to_string(), "3".to_string(), "4317[]".to_string()]
        );
        assert_eq!(
            drain(&mut event_rx),
            vec![
                PushEvent::Connected {
                    sid: "eio-1".to_string()
                },
                PushEvent::TaskDeleted(TaskId::from("t1")),
                PushEvent::TaskDeleted(TaskId::from("t2")),
            ]
        );
    }

    #[tokio::test]
    async fn test_server_namespace_disconnect() {
        let (connection, script, _) = ScriptedConnection::new();
        let (event_tx, _event_rx) = mpsc::unbounded_channel();
        let mut handler = PushSessionHandler::new(Box::new(connection), base(), event_tx);

        for frame in [OPEN, "40", "41"] {
            script.send(frame.to_string()).unwrap();
        }

        handler.connect().await.unwrap();
        let result = handler.run(&Notify::new()).await;

        assert!(matches!(result, Err(PushError::ServerDisconnect { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_pings_end_the_session() {
        let (connection, script, _) = ScriptedConnection::new();
        let (event_tx, _event_rx) = mpsc::unbounded_channel();
        let mut handler = PushSessionHandler::new(Box::new(connection), base(), event_tx);

        script.send(OPEN.to_string()).unwrap();
        script.send("40".to_string()).unwrap();

        handler.connect().await.unwrap();
        let result = handler.run(&Notify::new()).await;

        assert!(matches!(
            result,
            Err(PushError::PingTimeout { timeout_ms: 500 })
        ));
        drop(script);
    }

    #[tokio::test]
    async fn test_shutdown_ends_session_cleanly() {
        let (connection, script, _) = ScriptedConnection::new();
        let (event_tx, _event_rx) = mpsc::unbounded_channel();
        let mut handler = PushSessionHandler::new(Box::new(connection), base(), event_tx);

        script.send(OPEN.to_string()).unwrap();
        script.send("40".to_string()).unwrap();
        handler.connect().await.unwrap();

        let shutdown = Notify::new();
        shutdown.notify_one();

        assert!(handler.run(&shutdown).await.is_ok());
    }
}
