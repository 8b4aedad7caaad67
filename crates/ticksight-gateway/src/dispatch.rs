//! Request parsing, authentication gating and action dispatch.
//!
//! Every text frame a session sends lands in
//! [`Dispatcher::handle_message`]. The dispatcher parses the envelope,
//! decides whether the action is privileged, authenticates privileged
//! requests, routes to the action handler, and queues exactly one
//! correlated response back on the session. Failures of any shape are
//! failure responses; nothing here ever closes the connection.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{json, Value};

use ticksight_auth::{AuthAttempt, CredentialStore};
use ticksight_core::{logtail, CollectorConfig, HostMetricsAdapter, HostRuntime, TickStatsHandle};
use ticksight_db::MetricStore;
use ticksight_types::{MetricsSnapshot, Push, RequestEnvelope, Response, StatusReport};

use crate::icon::IconCache;
use crate::sessions::{Session, SessionRegistry};

/// Rows returned by `history` when the request names no limit.
const DEFAULT_HISTORY_LIMIT: u32 = 60;

/// The dispatcher's slice of the collector configuration.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Whether `status` responses include the installed plugin list.
    pub show_plugins: bool,
    /// Location of the PNG served as the server icon.
    pub icon_file: std::path::PathBuf,
    /// The log file scanned for subscription replay.
    pub log_file: std::path::PathBuf,
    /// How many buffered lines `admin/logs/subscribe` replays.
    pub log_history_lines: usize,
    /// Console command dispatched by `admin/restart`.
    pub restart_command: String,
}

impl DispatcherConfig {
    /// Extract the dispatcher-relevant settings from the full config.
    pub fn from_collector(config: &CollectorConfig) -> Self {
        Self {
            show_plugins: config.status.show_plugins,
            icon_file: config.status.icon_file.clone(),
            log_file: config.logs.file.clone(),
            log_history_lines: config.logs.history_lines,
            restart_command: config.admin.restart_command.clone(),
        }
    }
}

/// Routes parsed requests to their action handlers.
pub struct Dispatcher {
    host: Arc<dyn HostRuntime>,
    stats: TickStatsHandle,
    host_metrics: Arc<HostMetricsAdapter>,
    credentials: Arc<CredentialStore>,
    store: MetricStore,
    sessions: Arc<SessionRegistry>,
    icon: IconCache,
    config: DispatcherConfig,
}

impl Dispatcher {
    /// Wire up a dispatcher over its collaborators.
    pub fn new(
        host: Arc<dyn HostRuntime>,
        stats: TickStatsHandle,
        host_metrics: Arc<HostMetricsAdapter>,
        credentials: Arc<CredentialStore>,
        store: MetricStore,
        sessions: Arc<SessionRegistry>,
        config: DispatcherConfig,
    ) -> Self {
        let icon = IconCache::new(config.icon_file.clone());
        Self {
            host,
            stats,
            host_metrics,
            credentials,
            store,
            sessions,
            icon,
            config,
        }
    }

    /// The session registry this dispatcher admits connections through.
    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    /// Handle one inbound text frame from `session`, queuing exactly
    /// one response (plus any pushes a handler emits).
    pub async fn handle_message(&self, session: &Arc<Session>, raw: &str) {
        let envelope: RequestEnvelope = match serde_json::from_str(raw) {
            Ok(envelope) => envelope,
            Err(error) => {
                session.send_response(&Response::fail(None, format!("Invalid request: {error}")));
                return;
            }
        };
        let id = envelope.id.clone();

        if envelope.action == "ping" {
            session.send_response(&Response::ok(id, Some(String::from("pong")), None));
            return;
        }

        if is_privileged(&envelope.action) {
            let attempt = AuthAttempt::from_envelope(&envelope);
            let authenticated = attempt.authenticate(
                &self.credentials,
                &envelope.action,
                envelope.data.as_ref(),
                unix_now_secs(),
            );
            if !authenticated {
                tracing::warn!(
                    peer = %session.peer(),
                    action = envelope.action,
                    "privileged request rejected"
                );
                session.send_response(&Response::fail(
                    id,
                    "Unauthorized (signature mismatch or expired)",
                ));
                return;
            }
            self.sessions.mark_authenticated(session);
        }

        let response = self.route(session, &envelope).await;
        session.send_response(&response);
    }

    async fn route(&self, session: &Arc<Session>, envelope: &RequestEnvelope) -> Response {
        let id = envelope.id.clone();
        let data = envelope.data.as_ref();
        match envelope.action.as_str() {
            "status" => self.handle_status(id),
            "metrics" => self.handle_metrics(id),
            "history" => self.handle_history(id, data).await,
            "admin/command" => self.handle_command(session, id, data),
            "admin/restart" => self.handle_restart(id),
            "admin/shutdown" => self.handle_shutdown(id),
            "admin/whitelist" => self.handle_whitelist_view(id),
            "admin/whitelist/toggle" => self.handle_whitelist_toggle(id, data),
            "admin/whitelist/add" => self.handle_whitelist_edit(id, data, true),
            "admin/whitelist/remove" => self.handle_whitelist_edit(id, data, false),
            "admin/logs/subscribe" => self.handle_logs_subscribe(session, id),
            other => Response::fail(id, format!("Unknown action: {other}")),
        }
    }

    fn handle_status(&self, id: Option<String>) -> Response {
        let motd = self.host.motd();
        let report = StatusReport {
            online: true,
            motd_plain: strip_color_codes(&motd),
            motd,
            version: self.host.version(),
            api_version: self.host.api_version(),
            players: self.host.online_players(),
            max_players: self.host.max_players(),
            gamemode: self.host.default_game_mode(),
            icon: self.icon.data_url(),
            plugins: self.config.show_plugins.then(|| self.host.plugins()),
        };
        match serde_json::to_value(&report) {
            Ok(data) => Response::ok(id, None, Some(data)),
            Err(error) => Response::fail(id, format!("Status unavailable: {error}")),
        }
    }

    fn handle_metrics(&self, id: Option<String>) -> Response {
        let snapshot = MetricsSnapshot {
            tps_5s: self.stats.tps_5s(),
            tps_1m: self.stats.tps_1m(),
            mspt: self.stats.mspt(),
            ..self.host_metrics.sample()
        };
        match serde_json::to_value(&snapshot) {
            Ok(data) => Response::ok(id, None, Some(data)),
            Err(error) => Response::fail(id, format!("Metrics unavailable: {error}")),
        }
    }

    async fn handle_history(&self, id: Option<String>, data: Option<&Value>) -> Response {
        let limit = u32_field(data, "limit").unwrap_or(DEFAULT_HISTORY_LIMIT);
        match self.store.recent(limit).await {
            Ok(rows) => match serde_json::to_value(&rows) {
                Ok(data) => Response::ok(id, None, Some(data)),
                Err(error) => Response::fail(id, format!("History unavailable: {error}")),
            },
            Err(error) => Response::fail(id, format!("History unavailable: {error}")),
        }
    }

    fn handle_command(
        &self,
        session: &Arc<Session>,
        id: Option<String>,
        data: Option<&Value>,
    ) -> Response {
        let Some(command) = str_field(data, "command") else {
            return Response::fail(id, "Missing command");
        };
        tracing::info!(
            peer = %session.peer(),
            command,
            "console command dispatched via gateway"
        );
        let host = Arc::clone(&self.host);
        let scheduled = command.clone();
        self.host
            .run_on_primary(Box::new(move || host.dispatch_command(&scheduled)));
        Response::ok(
            id,
            Some(String::from("Command sent")),
            Some(json!({ "command": command })),
        )
    }

    fn handle_restart(&self, id: Option<String>) -> Response {
        let command = self.config.restart_command.clone();
        tracing::info!(command, "restart requested via gateway");
        let host = Arc::clone(&self.host);
        let scheduled = command.clone();
        // One tick of delay lets the acknowledgement reach the wire
        // before the host goes down.
        self.host
            .run_on_primary_after_ticks(Box::new(move || host.dispatch_command(&scheduled)), 1);
        Response::ok(
            id,
            Some(String::from("Server restarting")),
            Some(json!({ "command": command })),
        )
    }

    fn handle_shutdown(&self, id: Option<String>) -> Response {
        tracing::info!("shutdown requested via gateway");
        let host = Arc::clone(&self.host);
        self.host
            .run_on_primary_after_ticks(Box::new(move || host.shutdown()), 1);
        Response::ok(id, Some(String::from("Server shutting down")), None)
    }

    fn handle_whitelist_view(&self, id: Option<String>) -> Response {
        Response::ok(
            id,
            None,
            Some(json!({
                "enabled": self.host.whitelist_enabled(),
                "players": self.host.whitelist_entries(),
            })),
        )
    }

    fn handle_whitelist_toggle(&self, id: Option<String>, data: Option<&Value>) -> Response {
        let enabled = bool_field(data, "enabled").unwrap_or(false);
        let host = Arc::clone(&self.host);
        self.host
            .run_on_primary(Box::new(move || host.set_whitelist_enabled(enabled)));
        Response::ok(
            id,
            Some(String::from("Whitelist status updated")),
            Some(json!({ "enabled": enabled })),
        )
    }

    fn handle_whitelist_edit(
        &self,
        id: Option<String>,
        data: Option<&Value>,
        whitelisted: bool,
    ) -> Response {
        let Some(name) = str_field(data, "name") else {
            return Response::fail(id, "Missing player name");
        };
        let host = Arc::clone(&self.host);
        let player = name.clone();
        self.host
            .run_on_primary(Box::new(move || host.set_whitelisted(&player, whitelisted)));
        let message = if whitelisted {
            "Player added to whitelist"
        } else {
            "Player removed from whitelist"
        };
        Response::ok(
            id,
            Some(String::from(message)),
            Some(json!({ "name": name })),
        )
    }

    fn handle_logs_subscribe(&self, session: &Arc<Session>, id: Option<String>) -> Response {
        // Reaching this point required authentication, which already
        // flagged the session; from here on it receives live pushes.
        let lines = match logtail::read_last_lines(&self.config.log_file, self.config.log_history_lines)
        {
            Ok(lines) => lines,
            Err(error) => {
                tracing::warn!(
                    path = %self.config.log_file.display(),
                    %error,
                    "could not replay log history"
                );
                Vec::new()
            }
        };
        for line in &lines {
            session.send_push(&Push::log_line(line));
        }
        Response::ok(id, Some(String::from("Subscribed to logs")), None)
    }
}

/// Whether an action requires authentication. Everything under
/// `admin/` does, as do the two telemetry reads; `ping` and `status`
/// stay open.
fn is_privileged(action: &str) -> bool {
    action.starts_with("admin/") || action == "metrics" || action == "history"
}

/// Strip `§x` formatting codes from a message-of-the-day string.
///
/// A `§` followed by a code character (`0-9`, `a-f`, `k-o`, `r`, `x`,
/// either case) drops both; a `§` followed by anything else passes
/// through untouched.
fn strip_color_codes(motd: &str) -> String {
    let mut plain = String::with_capacity(motd.len());
    let mut chars = motd.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '§' && chars.peek().copied().is_some_and(is_format_code) {
            let _ = chars.next();
        } else {
            plain.push(c);
        }
    }
    plain
}

fn is_format_code(c: char) -> bool {
    matches!(c.to_ascii_lowercase(), '0'..='9' | 'a'..='f' | 'k'..='o' | 'r' | 'x')
}

fn unix_now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX))
}

fn str_field(data: Option<&Value>, key: &str) -> Option<String> {
    data?.get(key)?.as_str().map(str::to_owned)
}

fn bool_field(data: Option<&Value>, key: &str) -> Option<bool> {
    data?.get(key)?.as_bool()
}

fn u32_field(data: Option<&Value>, key: &str) -> Option<u32> {
    data?.get(key)?.as_u64().and_then(|n| u32::try_from(n).ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn privilege_boundary() {
        assert!(is_privileged("metrics"));
        assert!(is_privileged("history"));
        assert!(is_privileged("admin/command"));
        assert!(is_privileged("admin/logs/subscribe"));
        assert!(!is_privileged("ping"));
        assert!(!is_privileged("status"));
        assert!(!is_privileged("administrate"));
    }

    #[test]
    fn color_codes_are_stripped() {
        assert_eq!(strip_color_codes("A §aMinecraft §lServer"), "A Minecraft Server");
        assert_eq!(strip_color_codes("plain"), "plain");
        assert_eq!(strip_color_codes("trailing§"), "trailing§");
        assert_eq!(strip_color_codes("§zkept"), "§zkept");
        assert_eq!(strip_color_codes(""), "");
    }

    #[test]
    fn data_field_extraction() {
        let data = serde_json::json!({"command": "say hi", "limit": 5, "enabled": true});
        assert_eq!(str_field(Some(&data), "command").as_deref(), Some("say hi"));
        assert_eq!(u32_field(Some(&data), "limit"), Some(5));
        assert_eq!(bool_field(Some(&data), "enabled"), Some(true));
        assert_eq!(str_field(Some(&data), "missing"), None);
        assert_eq!(str_field(None, "command"), None);
        // Wrong types read as absent.
        assert_eq!(str_field(Some(&data), "limit"), None);
    }
}
