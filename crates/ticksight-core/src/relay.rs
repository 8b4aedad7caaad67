//! The log-line sink interface capture backends feed into.
//!
//! Different hosts capture their log stream through different hook
//! mechanisms; whichever backend is active at runtime, the collector
//! only ever sees this one interface. Lines arrive already formatted
//! as `"[LEVEL] message"` with parameters substituted.

/// A consumer of formatted log lines.
///
/// Implementations must not block the caller; under overload, dropping
/// lines is acceptable (delivery is best-effort).
pub trait LogSink: Send + Sync {
    /// Accept one formatted log line.
    fn on_log_line(&self, line: &str);
}
