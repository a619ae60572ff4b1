//! Engine.IO v4 / Socket.IO v5 text framing.
//!
//! A WebSocket text frame carries one Engine.IO packet: a single type digit
//! followed by its payload. Message packets (`4`) wrap a Socket.IO packet:
//! `<type>[<attachments>-][<namespace>,][<ack id>][<json>]`.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use super::constants::{
    DEFAULT_NAMESPACE, DEFAULT_PING_INTERVAL, DEFAULT_PING_TIMEOUT, EngineOpcode, SocketOpcode,
};
use super::error::{PushError, PushResult};

/// Handshake parameters from the Engine.IO open packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenPayload {
    pub sid: String,
    pub ping_interval: Duration,
    pub ping_timeout: Duration,
}

impl OpenPayload {
    /// Silence after which the connection is considered dead.
    #[must_use]
    pub fn liveness_window(&self) -> Duration {
        self.ping_interval + self.ping_timeout
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOpen {
    sid: String,
    ping_interval: Option<u64>,
    ping_timeout: Option<u64>,
}

/// Decoded Engine.IO packet.
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(OpenPayload),
    Close,
    Ping(String),
    Pong(String),
    Message(SocketPacket),
    Upgrade,
    Noop,
}

/// Decoded Socket.IO packet.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect {
        namespace: String,
        data: Option<Value>,
    },
    Disconnect {
        namespace: String,
    },
    Event {
        namespace: String,
        ack_id: Option<u64>,
        name: String,
        args: Vec<Value>,
    },
    Ack {
        namespace: String,
        ack_id: u64,
        args: Vec<Value>,
    },
    ConnectError {
        namespace: String,
        message: String,
    },
}

/// Decodes one text frame.
///
/// # Errors
/// Returns `ProtocolError` for malformed frames and `Unsupported` for binary
/// Socket.IO packets, which this client never requests.
pub fn decode(frame: &str) -> PushResult<EnginePacket> {
    let mut chars = frame.chars();
    let opcode = chars
        .next()
        .and_then(EngineOpcode::from_char)
        .ok_or_else(|| PushError::protocol(format!("unknown engine packet {frame:?}")))?;
    let body = chars.as_str();

    Ok(match opcode {
        EngineOpcode::Open => EnginePacket::Open(decode_open(body)?),
        EngineOpcode::Close => EnginePacket::Close,
        EngineOpcode::Ping => EnginePacket::Ping(body.to_string()),
        EngineOpcode::Pong => EnginePacket::Pong(body.to_string()),
        EngineOpcode::Message => EnginePacket::Message(decode_socket(body)?),
        EngineOpcode::Upgrade => EnginePacket::Upgrade,
        EngineOpcode::Noop => EnginePacket::Noop,
    })
}

fn decode_open(body: &str) -> PushResult<OpenPayload> {
    let raw: RawOpen = serde_json::from_str(body)
        .map_err(|e| PushError::protocol(format!("invalid open packet: {e}")))?;
    Ok(OpenPayload {
        sid: raw.sid,
        ping_interval: raw
            .ping_interval
            .map_or(DEFAULT_PING_INTERVAL, Duration::from_millis),
        ping_timeout: raw
            .ping_timeout
            .map_or(DEFAULT_PING_TIMEOUT, Duration::from_millis),
    })
}

fn decode_socket(body: &str) -> PushResult<SocketPacket> {
    let mut chars = body.chars();
    let opcode = chars
        .next()
        .and_then(SocketOpcode::from_char)
        .ok_or_else(|| PushError::protocol(format!("unknown socket packet {body:?}")))?;
    let rest = chars.as_str();

    if matches!(opcode, SocketOpcode::BinaryEvent | SocketOpcode::BinaryAck) {
        return Err(PushError::unsupported("binary socket.io packet"));
    }

    let (namespace, rest) = split_namespace(rest);
    let (ack_id, rest) = split_ack_id(rest)?;
    let data = if rest.is_empty() {
        None
    } else {
        Some(
            serde_json::from_str::<Value>(rest)
                .map_err(|e| PushError::protocol(format!("invalid packet data: {e}")))?,
        )
    };

    Ok(match opcode {
        SocketOpcode::Connect => SocketPacket::Connect { namespace, data },
        SocketOpcode::Disconnect => SocketPacket::Disconnect { namespace },
        SocketOpcode::Event => {
            let mut args = into_array(data)?;
            if args.is_empty() {
                return Err(PushError::protocol("event without a name"));
            }
            let name = match args.remove(0) {
                Value::String(name) => name,
                other => {
                    return Err(PushError::protocol(format!(
                        "event name {other} is not a string"
                    )));
                }
            };
            SocketPacket::Event {
                namespace,
                ack_id,
                name,
                args,
            }
        }
        SocketOpcode::Ack => SocketPacket::Ack {
            namespace,
            ack_id: ack_id.ok_or_else(|| PushError::protocol("ack without id"))?,
            args: into_array(data)?,
        },
        SocketOpcode::ConnectError => SocketPacket::ConnectError {
            namespace,
            message: connect_error_message(data),
        },
        SocketOpcode::BinaryEvent | SocketOpcode::BinaryAck => {
            return Err(PushError::unsupported("binary socket.io packet"));
        }
    })
}

fn split_namespace(rest: &str) -> (String, &str) {
    if !rest.starts_with('/') {
        return (DEFAULT_NAMESPACE.to_string(), rest);
    }
    match rest.find(',') {
        Some(index) => (rest[..index].to_string(), &rest[index + 1..]),
        None => (rest.to_string(), ""),
    }
}

fn split_ack_id(rest: &str) -> PushResult<(Option<u64>, &str)> {
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return Ok((None, rest));
    }
    let id = rest[..digits]
        .parse()
        .map_err(|_| PushError::protocol("ack id out of range"))?;
    Ok((Some(id), &rest[digits..]))
}

fn into_array(data: Option<Value>) -> PushResult<Vec<Value>> {
    match data {
        Some(Value::Array(items)) => Ok(items),
        None => Ok(Vec::new()),
        Some(other) => Err(PushError::protocol(format!("expected array, got {other}"))),
    }
}

fn connect_error_message(data: Option<Value>) -> String {
    match data {
        Some(Value::String(message)) => message,
        Some(Value::Object(map)) => map
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| Value::Object(map.clone()).to_string(), String::from),
        Some(other) => other.to_string(),
        None => "connection refused".to_string(),
    }
}

fn namespace_prefix(namespace: &str) -> String {
    if namespace == DEFAULT_NAMESPACE {
        String::new()
    } else {
        format!("{namespace},")
    }
}

/// Namespace connect request (`40` for the default namespace).
#[must_use]
pub fn encode_connect(namespace: &str) -> String {
    format!(
        "{}{}{}",
        EngineOpcode::Message.as_char(),
        SocketOpcode::Connect.as_char(),
        namespace_prefix(namespace)
    )
}

/// Reply to a server ping, echoing its payload.
#[must_use]
pub fn encode_pong(payload: &str) -> String {
    format!("{}{payload}", EngineOpcode::Pong.as_char())
}

/// Empty acknowledgement for an event that requested one.
#[must_use]
pub fn encode_ack(namespace: &str, ack_id: u64) -> String {
    format!(
        "{}{}{}{ack_id}[]",
        EngineOpcode::Message.as_char(),
        SocketOpcode::Ack.as_char(),
        namespace_prefix(namespace)
    )
}
