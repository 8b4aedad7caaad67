//! The contract the embedding host process provides to the collector.
//!
//! The host runtime owns the single-threaded primary execution context
//! (its tick loop), the player/world state the `status` action reports,
//! and the mutations admin actions apply. The collector never reaches
//! for ambient global state; an `Arc<dyn HostRuntime>` is injected into
//! every component that needs one.
//!
//! # Threading
//!
//! Read accessors may be called from any thread and must be cheap.
//! State mutations that are not otherwise thread-safe (console command
//! dispatch, whitelist edits, shutdown) are never invoked directly from
//! network threads; callers marshal them through
//! [`run_on_primary`](HostRuntime::run_on_primary) so they execute on
//! the tick loop.

/// A closure scheduled for execution on the primary context.
pub type PrimaryTask = Box<dyn FnOnce() + Send + 'static>;

/// Everything the collector needs from its embedding host process.
pub trait HostRuntime: Send + Sync {
    /// The host's message of the day, raw (may contain color codes).
    fn motd(&self) -> String;

    /// Host software version string.
    fn version(&self) -> String;

    /// Host API version string.
    fn api_version(&self) -> String;

    /// Players currently online.
    fn online_players(&self) -> u32;

    /// Configured player capacity.
    fn max_players(&self) -> u32;

    /// Name of the host's default game mode.
    fn default_game_mode(&self) -> String;

    /// Installed plugin descriptions, `name vVERSION` per entry.
    fn plugins(&self) -> Vec<String>;

    /// Whether the allow-list is currently enforced.
    fn whitelist_enabled(&self) -> bool;

    /// Names currently on the allow-list.
    fn whitelist_entries(&self) -> Vec<String>;

    /// Enable or disable allow-list enforcement.
    ///
    /// Must be called on the primary context.
    fn set_whitelist_enabled(&self, enabled: bool);

    /// Add or remove a named player on the allow-list.
    ///
    /// Must be called on the primary context.
    fn set_whitelisted(&self, name: &str, whitelisted: bool);

    /// Execute a console command string.
    ///
    /// Must be called on the primary context.
    fn dispatch_command(&self, command: &str);

    /// Begin an orderly host process shutdown.
    ///
    /// Must be called on the primary context.
    fn shutdown(&self);

    /// Schedule `task` for execution on the primary context at the
    /// next opportunity. Never blocks the caller.
    fn run_on_primary(&self, task: PrimaryTask);

    /// Schedule `task` for execution on the primary context after
    /// `delay_ticks` further ticks have elapsed.
    ///
    /// A scheduled task is not cancellable; it runs to completion even
    /// if the connection that requested it has since closed.
    fn run_on_primary_after_ticks(&self, task: PrimaryTask, delay_ticks: u32);
}
