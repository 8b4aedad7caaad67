//! Fan-out of host log lines to subscribed sessions.

use std::sync::Arc;

use ticksight_core::LogSink;
use ticksight_types::Push;

use crate::sessions::SessionRegistry;

/// Bridges the host's log stream onto the gateway's push channel.
///
/// Installed as the host runtime's [`LogSink`]; each captured line
/// becomes one `log` push delivered to every authenticated session.
/// Sessions that never authenticated see nothing.
#[derive(Debug)]
pub struct LogRelay {
    sessions: Arc<SessionRegistry>,
}

impl LogRelay {
    /// Create a relay targeting the given registry's sessions.
    pub fn new(sessions: Arc<SessionRegistry>) -> Self {
        Self { sessions }
    }
}

impl LogSink for LogRelay {
    fn on_log_line(&self, line: &str) {
        let push = Push::log_line(line);
        for session in self.sessions.broadcast_targets() {
            session.send_push(&push);
        }
    }
}
