//! End-to-end dispatch tests over a mock host runtime and an
//! in-memory metric store. These drive the dispatcher exactly the way
//! the WebSocket task does, then read what was queued on the session.

#![allow(clippy::unwrap_used)]
#![allow(clippy::indexing_slicing)]

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceExt;

use ticksight_auth::{signed_payload, CredentialStore};
use ticksight_core::{HostMetricsAdapter, HostRuntime, PrimaryTask, TickSampler};
use ticksight_db::{MetricSample, MetricStore};
use ticksight_gateway::{build_router, Dispatcher, DispatcherConfig, Session, SessionRegistry};

const SECRET: &str = "ticksight_integration_secret";

/// Host runtime double. Primary-context tasks run inline so their
/// effects are observable immediately after the dispatch call.
#[derive(Default)]
struct MockHost {
    commands: Mutex<Vec<String>>,
    whitelist_enabled: AtomicBool,
    whitelist: Mutex<BTreeSet<String>>,
    shutdown_called: AtomicBool,
}

impl HostRuntime for MockHost {
    fn motd(&self) -> String {
        String::from("A §aTest §rServer")
    }

    fn version(&self) -> String {
        String::from("1.21.4")
    }

    fn api_version(&self) -> String {
        String::from("1.21-R0.1")
    }

    fn online_players(&self) -> u32 {
        3
    }

    fn max_players(&self) -> u32 {
        20
    }

    fn default_game_mode(&self) -> String {
        String::from("SURVIVAL")
    }

    fn plugins(&self) -> Vec<String> {
        vec![String::from("Ticksight v1.0.0")]
    }

    fn whitelist_enabled(&self) -> bool {
        self.whitelist_enabled.load(Ordering::Relaxed)
    }

    fn whitelist_entries(&self) -> Vec<String> {
        self.whitelist.lock().unwrap().iter().cloned().collect()
    }

    fn set_whitelist_enabled(&self, enabled: bool) {
        self.whitelist_enabled.store(enabled, Ordering::Relaxed);
    }

    fn set_whitelisted(&self, name: &str, whitelisted: bool) {
        let mut whitelist = self.whitelist.lock().unwrap();
        if whitelisted {
            whitelist.insert(name.to_owned());
        } else {
            whitelist.remove(name);
        }
    }

    fn dispatch_command(&self, command: &str) {
        self.commands.lock().unwrap().push(command.to_owned());
    }

    fn shutdown(&self) {
        self.shutdown_called.store(true, Ordering::Relaxed);
    }

    fn run_on_primary(&self, task: PrimaryTask) {
        task();
    }

    fn run_on_primary_after_ticks(&self, task: PrimaryTask, _delay_ticks: u32) {
        task();
    }
}

struct Harness {
    host: Arc<MockHost>,
    dispatcher: Dispatcher,
    store: MetricStore,
    session: Arc<Session>,
    outbound: mpsc::UnboundedReceiver<String>,
}

impl Harness {
    async fn new() -> Self {
        Self::with_config(default_config()).await
    }

    async fn with_config(config: DispatcherConfig) -> Self {
        let host = Arc::new(MockHost::default());
        let sampler = TickSampler::new(20);
        let store = MetricStore::in_memory().await.unwrap();
        let sessions = Arc::new(SessionRegistry::new());
        let dispatcher = Dispatcher::new(
            Arc::clone(&host) as Arc<dyn HostRuntime>,
            sampler.handle(),
            Arc::new(HostMetricsAdapter::new()),
            Arc::new(CredentialStore::with_secret(SECRET)),
            store.clone(),
            Arc::clone(&sessions),
            config,
        );
        let (tx, outbound) = mpsc::unbounded_channel();
        let session = sessions.register("127.0.0.1:55000".parse().unwrap(), tx);
        Self {
            host,
            dispatcher,
            store,
            session,
            outbound,
        }
    }

    async fn send(&mut self, raw: &str) -> Value {
        self.dispatcher.handle_message(&self.session, raw).await;
        self.next_queued()
    }

    fn next_queued(&mut self) -> Value {
        serde_json::from_str(&self.outbound.try_recv().unwrap()).unwrap()
    }

    fn queue_is_empty(&mut self) -> bool {
        self.outbound.try_recv().is_err()
    }
}

fn default_config() -> DispatcherConfig {
    DispatcherConfig {
        show_plugins: false,
        icon_file: std::path::PathBuf::from("does-not-exist.png"),
        log_file: std::path::PathBuf::from("does-not-exist.log"),
        log_history_lines: 50,
        restart_command: String::from("restart"),
    }
}

fn now_secs() -> i64 {
    i64::try_from(
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs(),
    )
    .unwrap()
}

fn with_token(mut request: Value) -> String {
    request["token"] = Value::String(String::from(SECRET));
    request.to_string()
}

#[tokio::test]
async fn ping_answers_pong_without_credentials() {
    let mut harness = Harness::new().await;
    let response = harness.send(r#"{"action":"ping","id":"p1"}"#).await;
    assert_eq!(response["type"], "response");
    assert_eq!(response["success"], true);
    assert_eq!(response["message"], "pong");
    assert_eq!(response["id"], "p1");
    assert!(response.get("data").is_none());
    assert!(harness.queue_is_empty());
}

#[tokio::test]
async fn malformed_json_gets_a_failure_response() {
    let mut harness = Harness::new().await;
    let response = harness.send("{not json").await;
    assert_eq!(response["success"], false);
    assert!(response["message"]
        .as_str()
        .unwrap()
        .starts_with("Invalid request"));
    assert!(response.get("id").is_none());
}

#[tokio::test]
async fn unknown_action_is_reported_by_name() {
    let mut harness = Harness::new().await;
    let response = harness.send(r#"{"action":"frobnicate","id":"u1"}"#).await;
    assert_eq!(response["success"], false);
    assert_eq!(response["message"], "Unknown action: frobnicate");
    assert_eq!(response["id"], "u1");
}

#[tokio::test]
async fn status_is_public_and_strips_color_codes() {
    let mut harness = Harness::new().await;
    let response = harness.send(r#"{"action":"status","id":"s1"}"#).await;
    assert_eq!(response["success"], true);
    let data = &response["data"];
    assert_eq!(data["online"], true);
    assert_eq!(data["motd"], "A §aTest §rServer");
    assert_eq!(data["motd_plain"], "A Test Server");
    assert_eq!(data["players"], 3);
    assert_eq!(data["gamemode"], "SURVIVAL");
    // show_plugins is off and no icon file exists.
    assert!(data.get("plugins").is_none());
    assert!(data.get("icon").is_none());
}

#[tokio::test]
async fn status_includes_plugins_when_enabled() {
    let config = DispatcherConfig {
        show_plugins: true,
        ..default_config()
    };
    let mut harness = Harness::with_config(config).await;
    let response = harness.send(r#"{"action":"status"}"#).await;
    assert_eq!(response["data"]["plugins"], json!(["Ticksight v1.0.0"]));
}

#[tokio::test]
async fn metrics_without_credentials_is_rejected_without_data() {
    let mut harness = Harness::new().await;
    let response = harness.send(r#"{"action":"metrics","id":"m1"}"#).await;
    assert_eq!(response["success"], false);
    assert_eq!(
        response["message"],
        "Unauthorized (signature mismatch or expired)"
    );
    assert_eq!(response["id"], "m1");
    assert!(response.get("data").is_none());
    assert!(!harness.session.is_authenticated());
}

#[tokio::test]
async fn metrics_with_valid_token_returns_tick_figures() {
    let mut harness = Harness::new().await;
    let response = harness
        .send(&with_token(json!({"action": "metrics", "id": "m2"})))
        .await;
    assert_eq!(response["success"], true);
    let data = &response["data"];
    // No ticks recorded yet, so both TPS figures sit at the target rate.
    assert_eq!(data["tps_5s"], 20.0);
    assert_eq!(data["tps_1m"], 20.0);
    assert_eq!(data["mspt"], 0.0);
    assert!(data["mem_max"].as_f64().is_some());
    assert!(harness.session.is_authenticated());
}

#[tokio::test]
async fn metrics_with_wrong_token_is_rejected() {
    let mut harness = Harness::new().await;
    let response = harness
        .send(r#"{"action":"metrics","token":"ticksight_wrong"}"#)
        .await;
    assert_eq!(response["success"], false);
    assert!(!harness.session.is_authenticated());
}

#[tokio::test]
async fn signed_request_authenticates() {
    let mut harness = Harness::new().await;
    let store = CredentialStore::with_secret(SECRET);
    let timestamp = now_secs();
    let data = json!({"limit": 2});
    let payload = signed_payload("history", timestamp, "nonce-7", Some(&data));
    let request = json!({
        "action": "history",
        "id": "h1",
        "data": data,
        "signature": store.sign(&payload),
        "timestamp": timestamp,
        "nonce": "nonce-7",
    });
    let response = harness.send(&request.to_string()).await;
    assert_eq!(response["success"], true);
    assert!(harness.session.is_authenticated());
}

#[tokio::test]
async fn stale_signed_request_is_rejected() {
    let mut harness = Harness::new().await;
    let store = CredentialStore::with_secret(SECRET);
    let timestamp = now_secs() - 300;
    let payload = signed_payload("metrics", timestamp, "n", None);
    let request = json!({
        "action": "metrics",
        "signature": store.sign(&payload),
        "timestamp": timestamp,
        "nonce": "n",
    });
    let response = harness.send(&request.to_string()).await;
    assert_eq!(response["success"], false);
}

#[tokio::test]
async fn history_respects_limit_and_is_newest_first() {
    let mut harness = Harness::new().await;
    for tps in [18.0, 19.0, 20.0] {
        harness
            .store
            .append(&MetricSample {
                tps,
                mspt: 25.0,
                cpu_process: 1.0,
                cpu_system: 2.0,
                memory_used: 100.0,
                memory_max: 1000.0,
            })
            .await
            .unwrap();
    }

    let response = harness
        .send(&with_token(json!({
            "action": "history",
            "id": "h2",
            "data": {"limit": 2},
        })))
        .await;
    assert_eq!(response["success"], true);
    let rows = response["data"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["tps"], 20.0);
    assert_eq!(rows[1]["tps"], 19.0);
}

#[tokio::test]
async fn admin_command_requires_a_command_field() {
    let mut harness = Harness::new().await;
    let response = harness
        .send(&with_token(json!({"action": "admin/command", "id": "c1"})))
        .await;
    assert_eq!(response["success"], false);
    assert_eq!(response["message"], "Missing command");
    assert!(harness.host.commands.lock().unwrap().is_empty());
}

#[tokio::test]
async fn admin_command_dispatches_on_the_primary_context() {
    let mut harness = Harness::new().await;
    let response = harness
        .send(&with_token(json!({
            "action": "admin/command",
            "id": "c2",
            "data": {"command": "say hello"},
        })))
        .await;
    assert_eq!(response["success"], true);
    assert_eq!(response["message"], "Command sent");
    assert_eq!(response["data"]["command"], "say hello");
    assert_eq!(
        harness.host.commands.lock().unwrap().as_slice(),
        ["say hello"]
    );
}

#[tokio::test]
async fn admin_restart_dispatches_the_configured_command() {
    let config = DispatcherConfig {
        restart_command: String::from("stop --restart"),
        ..default_config()
    };
    let mut harness = Harness::with_config(config).await;
    let response = harness
        .send(&with_token(json!({"action": "admin/restart"})))
        .await;
    assert_eq!(response["success"], true);
    assert_eq!(response["message"], "Server restarting");
    assert_eq!(
        harness.host.commands.lock().unwrap().as_slice(),
        ["stop --restart"]
    );
}

#[tokio::test]
async fn admin_shutdown_acknowledges_then_stops_the_host() {
    let mut harness = Harness::new().await;
    let response = harness
        .send(&with_token(json!({"action": "admin/shutdown"})))
        .await;
    assert_eq!(response["success"], true);
    assert!(harness.host.shutdown_called.load(Ordering::Relaxed));
}

#[tokio::test]
async fn whitelist_view_edit_and_toggle() {
    let mut harness = Harness::new().await;

    let response = harness
        .send(&with_token(json!({
            "action": "admin/whitelist/add",
            "data": {"name": "alice"},
        })))
        .await;
    assert_eq!(response["message"], "Player added to whitelist");

    let response = harness
        .send(&with_token(json!({
            "action": "admin/whitelist/toggle",
            "data": {"enabled": true},
        })))
        .await;
    assert_eq!(response["data"]["enabled"], true);

    let response = harness
        .send(&with_token(json!({"action": "admin/whitelist"})))
        .await;
    assert_eq!(response["data"]["enabled"], true);
    assert_eq!(response["data"]["players"], json!(["alice"]));

    let response = harness
        .send(&with_token(json!({
            "action": "admin/whitelist/remove",
            "data": {"name": "alice"},
        })))
        .await;
    assert_eq!(response["message"], "Player removed from whitelist");
    assert!(harness.host.whitelist.lock().unwrap().is_empty());
}

#[tokio::test]
async fn whitelist_edit_requires_a_name() {
    let mut harness = Harness::new().await;
    let response = harness
        .send(&with_token(json!({"action": "admin/whitelist/add"})))
        .await;
    assert_eq!(response["success"], false);
    assert_eq!(response["message"], "Missing player name");
}

#[tokio::test]
async fn logs_subscribe_replays_history_then_acknowledges() {
    let dir = std::env::temp_dir().join("ticksight-dispatch-logs");
    std::fs::create_dir_all(&dir).unwrap();
    let log_file = dir.join("latest.log");
    std::fs::write(&log_file, "first line\nsecond line\nthird line\n").unwrap();

    let config = DispatcherConfig {
        log_file: log_file.clone(),
        log_history_lines: 2,
        ..default_config()
    };
    let mut harness = Harness::with_config(config).await;
    harness
        .dispatcher
        .handle_message(
            &harness.session,
            &with_token(json!({"action": "admin/logs/subscribe", "id": "l1"})),
        )
        .await;

    // Replay arrives first, oldest retained line first, then the ack.
    let first = harness.next_queued();
    assert_eq!(first["type"], "push");
    assert_eq!(first["action"], "log");
    assert_eq!(first["data"], "second line");
    let second = harness.next_queued();
    assert_eq!(second["data"], "third line");
    let ack = harness.next_queued();
    assert_eq!(ack["type"], "response");
    assert_eq!(ack["message"], "Subscribed to logs");
    assert_eq!(ack["id"], "l1");
    assert!(harness.session.is_authenticated());

    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn index_probe_identifies_the_service() {
    let harness = Harness::new().await;
    let router = build_router(Arc::new(harness.dispatcher));

    let response = router
        .oneshot(
            axum::http::Request::builder()
                .uri("/")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["name"], "ticksight");
    assert_eq!(body["websocket"], "/ws");
}
