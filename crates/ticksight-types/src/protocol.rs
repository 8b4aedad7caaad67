//! Wire protocol message shapes for the gateway WebSocket API.
//!
//! Three message kinds travel over a connection:
//!
//! - **request** (client → server): [`RequestEnvelope`], a JSON object
//!   carrying an `action` name, an optional correlation `id`, an
//!   optional `data` payload, and one of two sets of credentials.
//! - **response** (server → client): [`Response`], correlated to a
//!   request by echoing its `id` verbatim.
//! - **push** (server → client): [`Push`], unsolicited and not
//!   correlated to any request.
//!
//! All failure modes surface as `{success: false, message}` responses;
//! a bad request never closes the connection.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An inbound request as received from a client.
///
/// Every field except `action` is optional. The two authentication
/// modes are mutually exclusive in practice: legacy clients send
/// `token`, signing clients send `signature` + `timestamp` + `nonce`.
/// Presence is interpreted by the auth layer, not here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestEnvelope {
    /// The action name, e.g. `ping`, `status`, `admin/command`.
    #[serde(default)]
    pub action: String,

    /// Opaque correlation token, echoed verbatim on the response.
    #[serde(default)]
    pub id: Option<String>,

    /// Action-specific payload.
    #[serde(default)]
    pub data: Option<Value>,

    /// Legacy shared-secret token.
    #[serde(default)]
    pub token: Option<String>,

    /// Base64-encoded HMAC-SHA256 signature over the signed payload.
    #[serde(default)]
    pub signature: Option<String>,

    /// Client clock at signing time, seconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: Option<i64>,

    /// Client-chosen nonce included in the signed payload.
    ///
    /// Carried in the signature input but not tracked server-side;
    /// replay protection rests on the timestamp window alone.
    #[serde(default)]
    pub nonce: Option<String>,
}

/// An outbound response correlated to a request.
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    /// The request's correlation id, echoed verbatim; absent when the
    /// request carried none (or could not be parsed far enough to
    /// recover one).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Always the literal `"response"`.
    #[serde(rename = "type")]
    pub kind: &'static str,

    /// Whether the action was accepted.
    ///
    /// For side-effecting admin actions `true` means *accepted and
    /// scheduled*, not completed.
    pub success: bool,

    /// Human-readable outcome description, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Action-specific result payload, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Response {
    /// Build a success response.
    pub fn ok(id: Option<String>, message: Option<String>, data: Option<Value>) -> Self {
        Self {
            id,
            kind: "response",
            success: true,
            message,
            data,
        }
    }

    /// Build a failure response carrying only a message.
    pub fn fail(id: Option<String>, message: impl Into<String>) -> Self {
        Self {
            id,
            kind: "response",
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }
}

/// An unsolicited server-to-client push message.
///
/// Pushes are fire-and-forget: sent only to authenticated sessions,
/// never acknowledged, never retried.
#[derive(Debug, Clone, Serialize)]
pub struct Push {
    /// Always the literal `"push"`.
    #[serde(rename = "type")]
    pub kind: &'static str,

    /// The push channel name, e.g. `log`.
    pub action: String,

    /// The pushed payload.
    pub data: Value,
}

impl Push {
    /// Build a push message for the given channel.
    pub fn new(action: impl Into<String>, data: Value) -> Self {
        Self {
            kind: "push",
            action: action.into(),
            data,
        }
    }

    /// Build a `log` push carrying one formatted log line.
    pub fn log_line(line: &str) -> Self {
        Self::new("log", Value::String(line.to_owned()))
    }
}
