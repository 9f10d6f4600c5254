//! Gateway wire types for Rune.
//!
//! The platform gateway speaks JSON text frames of the shape
//! `{"op": int, "d": any, "s": int?, "t": string?}`. This crate holds the
//! frame envelope, the op-codes, the dispatch payloads Rune cares about, and
//! builders for the frames Rune writes (identify, heartbeat, presence).
//!
//! Nothing here does I/O; the client crate owns the socket.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Gateway protocol version requested in the connect URL.
pub const GATEWAY_VERSION: u8 = 10;

/// Gateway op-codes.
pub mod opcode {
    pub const DISPATCH: u8 = 0;
    pub const HEARTBEAT: u8 = 1;
    pub const IDENTIFY: u8 = 2;
    pub const PRESENCE_UPDATE: u8 = 3;
    pub const RESUME: u8 = 6;
    pub const RECONNECT: u8 = 7;
    pub const INVALID_SESSION: u8 = 9;
    pub const HELLO: u8 = 10;
    pub const HEARTBEAT_ACK: u8 = 11;
}

/// Dispatch event names (the `t` field).
pub mod event {
    pub const READY: &str = "READY";
    pub const RESUMED: &str = "RESUMED";
    pub const MESSAGE_CREATE: &str = "MESSAGE_CREATE";
}

/// Close codes that must not be retried.
pub mod close_code {
    pub const AUTHENTICATION_FAILED: u16 = 4004;
}

// ============================================================================
// Frame envelope
// ============================================================================

/// One gateway frame, in either direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayPayload {
    pub op: u8,
    #[serde(default)]
    pub d: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
}

impl GatewayPayload {
    fn new(op: u8, d: Value) -> Self {
        Self {
            op,
            d: Some(d),
            s: None,
            t: None,
        }
    }

    /// Sequence number carried by the frame, with `0` meaning "none".
    pub fn sequence(&self) -> u64 {
        self.s.unwrap_or(0)
    }

    /// Event name of a dispatch frame, or `""`.
    pub fn event_name(&self) -> &str {
        self.t.as_deref().unwrap_or("")
    }

    /// Decode the `d` field into a typed payload.
    pub fn data<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(self.d.clone().unwrap_or(Value::Null))
    }
}

// ============================================================================
// Inbound payloads
// ============================================================================

/// Data of the `Hello` frame (op 10).
#[derive(Debug, Clone, Deserialize)]
pub struct Hello {
    /// Heartbeat period in milliseconds.
    pub heartbeat_interval: u64,
}

/// Data of the `READY` dispatch.
#[derive(Debug, Clone, Deserialize)]
pub struct Ready {
    pub session_id: String,
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub bot: bool,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl User {
    /// Name shown in the client: the global display name when set.
    pub fn display_name(&self) -> &str {
        match self.global_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.username,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mention {
    pub id: String,
    #[serde(default)]
    pub username: String,
}

/// Data of the `MESSAGE_CREATE` dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub channel_id: String,
    pub author: User,
    #[serde(default)]
    pub content: String,
    /// RFC-3339 creation time.
    pub timestamp: String,
    #[serde(default)]
    pub mentions: Vec<Mention>,
}

impl Message {
    /// Parsed creation time, `None` when the peer sent something unparseable.
    pub fn created_at(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.timestamp).ok()
    }

    /// Whether `user_id` is mentioned, either in the mention list or as a
    /// literal `<@id>` / `<@!id>` token in the text.
    pub fn mentions_user(&self, user_id: &str) -> bool {
        if user_id.is_empty() {
            return false;
        }
        self.mentions.iter().any(|m| m.id == user_id)
            || self.content.contains(&format!("<@{user_id}>"))
            || self.content.contains(&format!("<@!{user_id}>"))
    }
}

// ============================================================================
// Presence
// ============================================================================

/// Online status shown to other users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Online,
    Idle,
    Dnd,
    Invisible,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Online => "online",
            Status::Idle => "idle",
            Status::Dnd => "dnd",
            Status::Invisible => "invisible",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognised status name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidStatus(pub String);

impl fmt::Display for InvalidStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid status '{}' (expected online, idle, dnd, or invisible)",
            self.0
        )
    }
}

impl std::error::Error for InvalidStatus {}

impl FromStr for Status {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "online" => Ok(Status::Online),
            "idle" => Ok(Status::Idle),
            "dnd" | "do_not_disturb" => Ok(Status::Dnd),
            "invisible" | "offline" => Ok(Status::Invisible),
            _ => Err(InvalidStatus(s.to_string())),
        }
    }
}

/// Activity type used for a free-text custom status.
const ACTIVITY_CUSTOM: u8 = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Activity {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl Activity {
    pub fn custom(text: impl Into<String>) -> Self {
        Self {
            name: "Custom Status".to_string(),
            kind: ACTIVITY_CUSTOM,
            state: Some(text.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Presence {
    pub since: Option<u64>,
    pub activities: Vec<Activity>,
    pub status: Status,
    pub afk: bool,
}

impl Presence {
    pub fn new(status: Status) -> Self {
        Self {
            since: None,
            activities: Vec::new(),
            status,
            afk: false,
        }
    }

    pub fn with_custom_text(mut self, text: Option<&str>) -> Self {
        if let Some(text) = text.filter(|t| !t.is_empty()) {
            self.activities.push(Activity::custom(text));
        }
        self
    }
}

// ============================================================================
// Outbound builders
// ============================================================================

/// Client properties sent with `Identify`.
#[derive(Debug, Clone, Serialize)]
pub struct ClientProperties {
    pub os: String,
    pub browser: String,
    pub device: String,
}

impl Default for ClientProperties {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            browser: "Chrome".to_string(),
            device: "rune".to_string(),
        }
    }
}

#[derive(Serialize)]
struct IdentifyData<'a> {
    token: &'a str,
    properties: &'a ClientProperties,
    presence: &'a Presence,
    compress: bool,
}

/// Build the `Identify` frame (op 2).
pub fn build_identify(
    token: &str,
    properties: &ClientProperties,
    presence: &Presence,
) -> GatewayPayload {
    let data = IdentifyData {
        token,
        properties,
        presence,
        compress: false,
    };
    GatewayPayload::new(
        opcode::IDENTIFY,
        serde_json::to_value(data).unwrap_or(Value::Null),
    )
}

/// Build a `Heartbeat` frame (op 1) carrying the last-seen sequence.
pub fn build_heartbeat(sequence: u64) -> GatewayPayload {
    GatewayPayload::new(opcode::HEARTBEAT, Value::from(sequence))
}

/// Build a presence update frame (op 3).
pub fn build_presence(presence: &Presence) -> GatewayPayload {
    GatewayPayload::new(
        opcode::PRESENCE_UPDATE,
        serde_json::to_value(presence).unwrap_or(Value::Null),
    )
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(content: &str, mentions: Vec<Mention>) -> Message {
        Message {
            id: "1".to_string(),
            channel_id: "c".to_string(),
            author: User {
                id: "7".to_string(),
                username: "seven".to_string(),
                global_name: None,
                bot: false,
                avatar: None,
            },
            content: content.to_string(),
            timestamp: "2026-01-01T00:00:00.000000+00:00".to_string(),
            mentions,
        }
    }

    #[test]
    fn decodes_dispatch_frame() {
        let raw = r#"{"op":0,"d":{"session_id":"abc","user":{"id":"42","username":"me"}},"s":3,"t":"READY"}"#;
        let payload: GatewayPayload = serde_json::from_str(raw).unwrap();
        assert_eq!(payload.op, opcode::DISPATCH);
        assert_eq!(payload.sequence(), 3);
        assert_eq!(payload.event_name(), event::READY);

        let ready: Ready = payload.data().unwrap();
        assert_eq!(ready.session_id, "abc");
        assert_eq!(ready.user.id, "42");
    }

    #[test]
    fn null_sequence_means_none() {
        let raw = r#"{"op":11,"d":null,"s":null,"t":null}"#;
        let payload: GatewayPayload = serde_json::from_str(raw).unwrap();
        assert_eq!(payload.sequence(), 0);
        assert_eq!(payload.event_name(), "");
    }

    #[test]
    fn hello_decodes_interval() {
        let raw = r#"{"op":10,"d":{"heartbeat_interval":41250}}"#;
        let payload: GatewayPayload = serde_json::from_str(raw).unwrap();
        let hello: Hello = payload.data().unwrap();
        assert_eq!(hello.heartbeat_interval, 41250);
    }

    #[test]
    fn heartbeat_carries_sequence() {
        let value = serde_json::to_value(build_heartbeat(0)).unwrap();
        assert_eq!(value, json!({"op": 1, "d": 0}));

        let value = serde_json::to_value(build_heartbeat(17)).unwrap();
        assert_eq!(value["d"], 17);
    }

    #[test]
    fn identify_shape() {
        let props = ClientProperties {
            os: "linux".to_string(),
            browser: "Chrome".to_string(),
            device: "rune".to_string(),
        };
        let payload = build_identify("tok", &props, &Presence::new(Status::Idle));
        let value = serde_json::to_value(payload).unwrap();

        assert_eq!(value["op"], 2);
        assert_eq!(value["d"]["token"], "tok");
        assert_eq!(value["d"]["compress"], false);
        assert_eq!(value["d"]["properties"]["os"], "linux");
        assert_eq!(value["d"]["presence"]["status"], "idle");
        assert_eq!(value["d"]["presence"]["since"], Value::Null);
    }

    #[test]
    fn presence_with_custom_text() {
        let presence = Presence::new(Status::Dnd).with_custom_text(Some("busy"));
        let value = serde_json::to_value(build_presence(&presence)).unwrap();
        assert_eq!(value["op"], 3);
        assert_eq!(value["d"]["status"], "dnd");
        assert_eq!(value["d"]["activities"][0]["type"], 4);
        assert_eq!(value["d"]["activities"][0]["state"], "busy");

        let presence = Presence::new(Status::Online).with_custom_text(Some(""));
        assert!(presence.activities.is_empty());
    }

    #[test]
    fn status_parse_accepts_aliases() {
        assert_eq!("online".parse::<Status>().unwrap(), Status::Online);
        assert_eq!("IDLE".parse::<Status>().unwrap(), Status::Idle);
        assert_eq!("do_not_disturb".parse::<Status>().unwrap(), Status::Dnd);
        assert_eq!("offline".parse::<Status>().unwrap(), Status::Invisible);
        assert!("away".parse::<Status>().is_err());
    }

    #[test]
    fn mention_detection() {
        let listed = message(
            "hello",
            vec![Mention {
                id: "42".to_string(),
                username: "me".to_string(),
            }],
        );
        assert!(listed.mentions_user("42"));

        assert!(message("hello <@42>", vec![]).mentions_user("42"));
        assert!(message("hello <@!42>", vec![]).mentions_user("42"));
        assert!(!message("hello <@421>", vec![]).mentions_user("42"));
        assert!(!message("hello", vec![]).mentions_user(""));
    }

    #[test]
    fn message_timestamp_parses() {
        let msg = message("x", vec![]);
        assert!(msg.created_at().is_some());

        let mut bad = msg.clone();
        bad.timestamp = "yesterday".to_string();
        assert!(bad.created_at().is_none());
    }

    #[test]
    fn display_name_prefers_global_name() {
        let mut user = message("x", vec![]).author;
        assert_eq!(user.display_name(), "seven");
        user.global_name = Some("Seven".to_string());
        assert_eq!(user.display_name(), "Seven");
    }
}
