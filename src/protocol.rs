use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Events a client may send over the WebSocket.
///
/// Frames are JSON objects tagged with `"t"`, e.g.
/// `{"t":"join-room","room":"abcd"}`. Payload-carrying relay events keep
/// their payload as arbitrary JSON so it can be forwarded verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "kebab-case")]
pub enum ClientMessage {
    JoinRoom {
        room: String,
    },
    SendMessage {
        message: Value,
    },
    LeaveRoom,
    /// Race begins; relayed to the opponent.
    Start,
    /// Race finished; relayed to the opponent.
    End,
    /// Ask the server to fetch a fresh passage and distribute it.
    SetText,
    /// Client-side passage distribution; the payload passes through untouched.
    TextUpdate {
        payload: Value,
    },
    Loading,
    DoneLoading,
}

/// Events the server sends to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Acknowledgement for a request-style event.
    Ack(Ack),
    ReceiveMessage {
        message: Value,
    },
    Start,
    End,
    TextUpdate {
        payload: Value,
    },
    Loading,
    DoneLoading,
}

/// Acknowledgement body: exactly one of `success` or `error` is set.
/// `set-text` additionally carries the fetched passage in `text`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Ack {
    pub fn success(msg: impl Into<String>) -> Self {
        Self {
            success: Some(msg.into()),
            ..Self::default()
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            error: Some(msg.into()),
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.success.is_some()
    }
}
