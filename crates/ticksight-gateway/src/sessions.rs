//! Connected-session bookkeeping and per-address admission control.
//!
//! Every accepted WebSocket connection gets a [`Session`] entry for its
//! lifetime. The registry also owns the rate limiter that gates new
//! connections: a per-address counter that a background sweeper resets
//! wholesale once a minute. The reset is not a sliding window, so a
//! client can briefly exceed the nominal rate across a reset boundary;
//! the limiter exists to blunt floods, not to meter precisely.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use ticksight_types::{Push, Response};

/// Connections admitted per source address per sweep period.
const MAX_CONNECTIONS_PER_PERIOD: u32 = 120;

/// How often the per-address counters are reset.
const SWEEP_PERIOD: Duration = Duration::from_secs(60);

/// One live WebSocket connection.
///
/// Outbound traffic goes through an unbounded FIFO drained by the
/// connection's socket task, so responses and pushes written from any
/// task reach the wire in the order they were queued.
#[derive(Debug)]
pub struct Session {
    id: u64,
    peer: SocketAddr,
    authenticated: AtomicBool,
    outbound: mpsc::UnboundedSender<String>,
}

impl Session {
    /// This session's registry id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The remote address this session connected from.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Whether a privileged request has authenticated on this session.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::Relaxed)
    }

    /// Queue a response for delivery on this session's socket.
    ///
    /// A send failure means the socket task already exited; the
    /// registry entry is removed on that path, so the miss is ignored.
    pub fn send_response(&self, response: &Response) {
        self.send_serialized(response);
    }

    /// Queue a push message for delivery on this session's socket.
    pub fn send_push(&self, push: &Push) {
        self.send_serialized(push);
    }

    fn send_serialized<T: serde::Serialize>(&self, message: &T) {
        match serde_json::to_string(message) {
            Ok(text) => {
                let _ = self.outbound.send(text);
            }
            Err(error) => {
                tracing::error!(%error, session = self.id, "failed to serialize outbound message");
            }
        }
    }
}

/// The set of live sessions plus the connection-rate limiter.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<u64, Arc<Session>>>,
    next_id: AtomicU64,
    rate: Mutex<HashMap<IpAddr, u32>>,
    rate_limit: u32,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    /// Create an empty registry with the default admission limit.
    pub fn new() -> Self {
        Self::with_limit(MAX_CONNECTIONS_PER_PERIOD)
    }

    /// Create an empty registry admitting `limit` connections per
    /// address per sweep period.
    pub fn with_limit(limit: u32) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            rate: Mutex::new(HashMap::new()),
            rate_limit: limit,
        }
    }

    /// Count a connection attempt from `ip` against its bucket and
    /// decide admission. Rejected attempts are counted too.
    pub fn try_admit(&self, ip: IpAddr) -> bool {
        let mut rate = self.rate.lock().unwrap_or_else(PoisonError::into_inner);
        let count = rate.entry(ip).or_insert(0);
        *count = count.saturating_add(1);
        *count <= self.rate_limit
    }

    /// Register a newly upgraded connection and hand back its session.
    pub fn register(&self, peer: SocketAddr, outbound: mpsc::UnboundedSender<String>) -> Arc<Session> {
        let session = Arc::new(Session {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            peer,
            authenticated: AtomicBool::new(false),
            outbound,
        });
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session.id, Arc::clone(&session));
        session
    }

    /// Drop a closed connection's entry.
    pub fn remove(&self, id: u64) {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }

    /// Flag a session as authenticated. Idempotent; the flag never
    /// reverts for the life of the connection.
    pub fn mark_authenticated(&self, session: &Session) {
        session.authenticated.store(true, Ordering::Relaxed);
    }

    /// Snapshot the sessions eligible for push fan-out: authenticated
    /// ones only.
    pub fn broadcast_targets(&self) -> Vec<Arc<Session>> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|session| session.is_authenticated())
            .cloned()
            .collect()
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Reset every per-address connection counter.
    pub fn clear_rate_counters(&self) {
        self.rate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Spawn the background task that resets the rate counters once a
    /// sweep period.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SWEEP_PERIOD);
            // The first tick fires immediately; skip it.
            interval.tick().await;
            loop {
                interval.tick().await;
                registry.clear_rate_counters();
            }
        })
    }
}
