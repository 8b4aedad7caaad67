//! Standalone host runtime driving a fixed-rate tick loop.
//!
//! The daemon has no game server to embed in, so [`LoopHost`] plays
//! the host's part: it owns the primary execution context (a tokio
//! task running a fixed-rate loop), the mutable state admin actions
//! touch, and the task queue [`HostRuntime::run_on_primary`] feeds.
//! Everything an embedding host would do arrives through the same
//! trait the collector is written against.
//!
//! Console commands have no interpreter here; dispatching one records
//! it as a log line, which exercises the full log fan-out path.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use ticksight_core::{HostRuntime, LogSink, PrimaryTask, TickSampler};

struct ScheduledTask {
    due_tick: u64,
    task: PrimaryTask,
}

struct HostState {
    motd: String,
    whitelist_enabled: bool,
    whitelist: BTreeSet<String>,
}

/// The daemon's own host runtime and tick loop.
pub struct LoopHost {
    target_rate: u32,
    current_tick: AtomicU64,
    stopping: AtomicBool,
    state: Mutex<HostState>,
    queue: Mutex<Vec<ScheduledTask>>,
    log_sink: Mutex<Option<Arc<dyn LogSink>>>,
}

impl LoopHost {
    /// Create a host whose loop targets `target_rate` ticks per second.
    pub fn new(target_rate: u32) -> Self {
        Self {
            target_rate: target_rate.max(1),
            current_tick: AtomicU64::new(0),
            stopping: AtomicBool::new(false),
            state: Mutex::new(HostState {
                motd: String::from("Ticksight standalone host"),
                whitelist_enabled: false,
                whitelist: BTreeSet::new(),
            }),
            queue: Mutex::new(Vec::new()),
            log_sink: Mutex::new(None),
        }
    }

    /// Install the sink that receives host log lines.
    pub fn set_log_sink(&self, sink: Arc<dyn LogSink>) {
        *self.log_sink.lock().unwrap_or_else(PoisonError::into_inner) = Some(sink);
    }

    /// Whether a shutdown has been requested.
    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::Relaxed)
    }

    /// Ticks completed since startup.
    pub fn current_tick(&self) -> u64 {
        self.current_tick.load(Ordering::Relaxed)
    }

    /// Run the fixed-rate tick loop until shutdown is requested.
    ///
    /// Drives the sampler once per tick and drains the primary-context
    /// task queue. The interval ticker skips missed deadlines rather
    /// than bursting, so a stall shows up as dropped TPS exactly as it
    /// would on a real host.
    pub async fn run(&self, sampler: &mut TickSampler) {
        let interval = Duration::from_secs(1)
            .checked_div(self.target_rate)
            .unwrap_or(Duration::from_millis(50));
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        while !self.is_stopping() {
            ticker.tick().await;
            sampler.on_tick();
            self.advance_tick();
        }
        tracing::info!(tick = self.current_tick(), "tick loop stopped");
    }

    /// Complete one tick: bump the counter and run every queued task
    /// that has come due, in the order it was scheduled.
    fn advance_tick(&self) {
        let now = self.current_tick.fetch_add(1, Ordering::Relaxed).saturating_add(1);
        let due: Vec<ScheduledTask> = {
            let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
            let (due, pending) = queue.drain(..).partition(|entry| entry.due_tick <= now);
            *queue = pending;
            due
        };
        for entry in due {
            (entry.task)();
        }
    }

    fn emit_log(&self, line: &str) {
        let sink = self
            .log_sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(sink) = sink {
            sink.on_log_line(line);
        }
    }

    fn schedule(&self, task: PrimaryTask, due_tick: u64) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ScheduledTask { due_tick, task });
    }

    fn state(&self) -> std::sync::MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl HostRuntime for LoopHost {
    fn motd(&self) -> String {
        self.state().motd.clone()
    }

    fn version(&self) -> String {
        String::from(env!("CARGO_PKG_VERSION"))
    }

    fn api_version(&self) -> String {
        String::from("standalone")
    }

    fn online_players(&self) -> u32 {
        0
    }

    fn max_players(&self) -> u32 {
        0
    }

    fn default_game_mode(&self) -> String {
        String::from("NONE")
    }

    fn plugins(&self) -> Vec<String> {
        Vec::new()
    }

    fn whitelist_enabled(&self) -> bool {
        self.state().whitelist_enabled
    }

    fn whitelist_entries(&self) -> Vec<String> {
        self.state().whitelist.iter().cloned().collect()
    }

    fn set_whitelist_enabled(&self, enabled: bool) {
        self.state().whitelist_enabled = enabled;
        self.emit_log(&format!("Whitelist enforcement set to {enabled}"));
    }

    fn set_whitelisted(&self, name: &str, whitelisted: bool) {
        {
            let mut state = self.state();
            if whitelisted {
                state.whitelist.insert(name.to_owned());
            } else {
                state.whitelist.remove(name);
            }
        }
        self.emit_log(&format!("Whitelist entry {name} set to {whitelisted}"));
    }

    fn dispatch_command(&self, command: &str) {
        tracing::info!(command, "host command dispatched");
        self.emit_log(&format!("Executing command: {command}"));
    }

    fn shutdown(&self) {
        tracing::info!("host shutdown requested");
        self.emit_log("Stopping the host");
        self.stopping.store(true, Ordering::Relaxed);
    }

    fn run_on_primary(&self, task: PrimaryTask) {
        // Due immediately; runs on the next loop iteration.
        self.schedule(task, self.current_tick());
    }

    fn run_on_primary_after_ticks(&self, task: PrimaryTask, delay_ticks: u32) {
        let due = self
            .current_tick()
            .saturating_add(u64::from(delay_ticks));
        self.schedule(task, due);
    }
}
