//! The long-lived shared secret and both validation primitives.
//!
//! Exactly one secret is live at a time. It is loaded from `token.txt`
//! at startup; when the file is absent or does not carry the
//! recognized prefix, a fresh cryptographically random secret is
//! generated and persisted. Persistence failures are logged and never
//! fatal — the process continues with an in-memory-only secret.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Fixed recognizable prefix of every generated secret.
const TOKEN_PREFIX: &str = "ticksight_";

/// Random bytes behind the encoded part of a generated secret.
const TOKEN_RANDOM_BYTES: usize = 24;

/// Owns the shared secret; immutable for the process lifetime.
#[derive(Debug)]
pub struct CredentialStore {
    secret: String,
    path: PathBuf,
}

impl CredentialStore {
    /// Load the secret from `path`, or generate and persist a new one.
    ///
    /// Never fails: unreadable or unrecognized file content triggers
    /// generation, and a failed write leaves the fresh secret
    /// in-memory only (logged at error level).
    pub fn load_or_generate(path: &Path) -> Self {
        if let Some(existing) = read_existing(path) {
            tracing::info!(path = %path.display(), "loaded shared secret");
            return Self {
                secret: existing,
                path: path.to_path_buf(),
            };
        }

        let secret = generate_secret();
        match persist(path, &secret) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "generated new shared secret");
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "could not persist shared secret; continuing with in-memory secret");
            }
        }
        Self {
            secret,
            path: path.to_path_buf(),
        }
    }

    /// Build a store around a fixed secret, bypassing the file system.
    ///
    /// Intended for embedding hosts that manage their own secret and
    /// for tests.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            path: PathBuf::new(),
        }
    }

    /// The current secret. Handle with care; this is what clients
    /// present as the legacy token and sign requests with.
    pub fn current_secret(&self) -> &str {
        &self.secret
    }

    /// The file the secret was loaded from or written to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Validate a legacy plain token by exact equality.
    ///
    /// Empty tokens are always invalid.
    pub fn validate(&self, token: &str) -> bool {
        !token.is_empty() && token == self.secret
    }

    /// Validate an HMAC-SHA256 signature over `payload`.
    ///
    /// `signature` is the base64 (standard alphabet) encoding of the
    /// raw MAC bytes. The comparison is constant-time via the hmac
    /// crate's `verify_slice`, so signature validation does not leak
    /// timing information.
    pub fn validate_signature(&self, signature: &str, payload: &str) -> bool {
        let Ok(presented) = STANDARD.decode(signature) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(self.secret.as_bytes()) else {
            return false;
        };
        mac.update(payload.as_bytes());
        mac.verify_slice(&presented).is_ok()
    }

    /// Compute the base64 signature a client should present for
    /// `payload`. Exposed for tests and client tooling.
    pub fn sign(&self, payload: &str) -> String {
        HmacSha256::new_from_slice(self.secret.as_bytes()).map_or_else(
            |_| String::new(),
            |mut mac| {
                mac.update(payload.as_bytes());
                STANDARD.encode(mac.finalize().into_bytes())
            },
        )
    }
}

/// Read and accept the stored secret, if present and well-formed.
fn read_existing(path: &Path) -> Option<String> {
    if !path.exists() {
        return None;
    }
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let trimmed = content.trim();
            if trimmed.starts_with(TOKEN_PREFIX) {
                Some(trimmed.to_owned())
            } else {
                tracing::warn!(path = %path.display(), "secret file lacks the expected prefix; regenerating");
                None
            }
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "could not read secret file; regenerating");
            None
        }
    }
}

/// Generate a fresh prefixed secret from 24 CSPRNG bytes.
fn generate_secret() -> String {
    let mut bytes = [0_u8; TOKEN_RANDOM_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("{TOKEN_PREFIX}{}", URL_SAFE_NO_PAD.encode(bytes))
}

/// Write the secret, creating parent directories as needed.
fn persist(path: &Path, secret: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, secret)
}
