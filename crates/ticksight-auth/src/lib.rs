//! Authentication for the Ticksight gateway.
//!
//! Two pieces live here: the [`CredentialStore`], which owns the
//! process-wide shared secret and both validation primitives, and
//! [`AuthAttempt`], the tagged union of the two authentication modes a
//! request can carry (legacy plain token, HMAC-signed request).

pub mod credential;
pub mod strategy;

pub use credential::CredentialStore;
pub use strategy::{signed_payload, AuthAttempt, MAX_CLOCK_SKEW_SECS};
