//! The tagged union of request authentication modes.
//!
//! A privileged request authenticates in exactly one of two ways:
//!
//! - **Legacy token mode** — the request carries `token`, validated by
//!   plain equality against the shared secret.
//! - **Signed-request mode** — the request carries `signature`,
//!   `timestamp` and `nonce`; the HMAC is recomputed over
//!   `action + timestamp + nonce + canonical_json(data)` and the
//!   timestamp must fall inside the skew window.
//!
//! The mode is decided once, when the envelope is classified into an
//! [`AuthAttempt`]; dispatch logic never branches on field presence.

use serde_json::Value;
use ticksight_types::RequestEnvelope;

use crate::credential::CredentialStore;

/// Maximum accepted distance between server time and a signed
/// request's timestamp, in seconds. Exactly this much skew is still
/// accepted; one second more is rejected.
pub const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// One request's classified authentication material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthAttempt {
    /// Legacy plain shared-secret token.
    Token(
        /// The presented token.
        String,
    ),

    /// HMAC-signed request.
    Signed {
        /// Base64-encoded HMAC-SHA256 over the signed payload.
        signature: String,
        /// Client clock at signing time, seconds since the Unix epoch.
        timestamp: i64,
        /// Client-chosen nonce, included in the signed payload.
        nonce: String,
    },

    /// Neither mode's fields were present (or the shape was
    /// malformed); always unauthenticated.
    Missing,
}

impl AuthAttempt {
    /// Classify an envelope's credential fields.
    ///
    /// A present `token` wins over signed-request fields, mirroring
    /// legacy client behavior. Signed mode requires all three of
    /// `signature`, `timestamp`, `nonce`; anything less is
    /// [`AuthAttempt::Missing`].
    pub fn from_envelope(envelope: &RequestEnvelope) -> Self {
        if let Some(token) = &envelope.token {
            return Self::Token(token.clone());
        }
        match (&envelope.signature, envelope.timestamp, &envelope.nonce) {
            (Some(signature), Some(timestamp), Some(nonce)) => Self::Signed {
                signature: signature.clone(),
                timestamp,
                nonce: nonce.clone(),
            },
            _ => Self::Missing,
        }
    }

    /// Authenticate this attempt against the shared secret.
    ///
    /// `now_secs` is the server's Unix clock; for signed requests a
    /// timestamp more than [`MAX_CLOCK_SKEW_SECS`] away is rejected
    /// before the signature is even checked.
    ///
    /// The nonce is part of the signed payload but is not persisted or
    /// checked against previously seen values: within the skew window
    /// an intercepted signed request can be replayed verbatim. Replay
    /// protection rests on the timestamp window alone.
    pub fn authenticate(
        &self,
        store: &CredentialStore,
        action: &str,
        data: Option<&Value>,
        now_secs: i64,
    ) -> bool {
        match self {
            Self::Token(token) => store.validate(token),
            Self::Signed {
                signature,
                timestamp,
                nonce,
            } => {
                let skew = now_secs.saturating_sub(*timestamp).saturating_abs();
                if skew > MAX_CLOCK_SKEW_SECS {
                    tracing::warn!(
                        action,
                        timestamp,
                        now = now_secs,
                        "signed request outside the replay window"
                    );
                    return false;
                }
                let payload = signed_payload(action, *timestamp, nonce, data);
                let valid = store.validate_signature(signature, &payload);
                if !valid {
                    tracing::warn!(action, "signature verification failed");
                }
                valid
            }
            Self::Missing => false,
        }
    }
}

/// The exact byte string a signed request's HMAC covers:
/// `action + timestamp + nonce + canonical_json(data)`.
///
/// Canonical JSON here is `serde_json`'s default object serialization,
/// which orders keys lexicographically; an absent `data` contributes
/// the empty string. Clients must sign the same canonical form.
pub fn signed_payload(action: &str, timestamp: i64, nonce: &str, data: Option<&Value>) -> String {
    let data_json = data
        .map(|value| serde_json::to_string(value).unwrap_or_default())
        .unwrap_or_default();
    format!("{action}{timestamp}{nonce}{data_json}")
}
