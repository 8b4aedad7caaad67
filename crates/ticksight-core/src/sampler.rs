//! Sliding-window tick sampler deriving TPS and MSPT figures.
//!
//! [`TickSampler::on_tick`] is called once per iteration of the host's
//! fixed-rate execution loop, on the primary context only. It measures
//! the wall time between consecutive tick boundaries, keeps the
//! measurements in a bounded sliding window, and recomputes the
//! derived statistics on every tick.
//!
//! Reads go through [`TickStatsHandle`], a cheap clone that loads the
//! last fully-computed values from atomic cells. Readers on any thread
//! always see a complete snapshot of each figure; no lock is taken on
//! either side.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

const NANOS_PER_MILLI: f64 = 1_000_000.0;
const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// Atomic cells holding the published statistics as f64 bit patterns.
#[derive(Debug)]
struct StatsCells {
    tps_5s: AtomicU64,
    tps_1m: AtomicU64,
    mspt: AtomicU64,
}

impl StatsCells {
    fn new(target_rate: u32) -> Self {
        let rate = f64::from(target_rate);
        Self {
            tps_5s: AtomicU64::new(rate.to_bits()),
            tps_1m: AtomicU64::new(rate.to_bits()),
            mspt: AtomicU64::new(0.0_f64.to_bits()),
        }
    }

    fn store(cell: &AtomicU64, value: f64) {
        cell.store(value.to_bits(), Ordering::Relaxed);
    }

    fn load(cell: &AtomicU64) -> f64 {
        f64::from_bits(cell.load(Ordering::Relaxed))
    }
}

/// Read-only handle onto a sampler's published statistics.
///
/// Safe to clone into any thread; each accessor returns the last value
/// the sampler fully computed. Before the first measurable tick the
/// TPS figures default to the target rate and MSPT to zero.
#[derive(Debug, Clone)]
pub struct TickStatsHandle {
    cells: Arc<StatsCells>,
}

impl TickStatsHandle {
    /// Ticks per second over the most recent 5-second window.
    pub fn tps_5s(&self) -> f64 {
        StatsCells::load(&self.cells.tps_5s)
    }

    /// Ticks per second over the most recent 1-minute window.
    pub fn tps_1m(&self) -> f64 {
        StatsCells::load(&self.cells.tps_1m)
    }

    /// Mean milliseconds per tick over the retained window.
    pub fn mspt(&self) -> f64 {
        StatsCells::load(&self.cells.mspt)
    }
}

/// Consumes tick-boundary events and maintains the sample windows.
///
/// Owned by the primary execution context: [`on_tick`](Self::on_tick)
/// and [`record`](Self::record) must never be called concurrently.
/// Derived figures are published through [`TickStatsHandle`] clones.
#[derive(Debug)]
pub struct TickSampler {
    target_rate: u32,
    /// Sample capacity of the 1-minute window (`60 * rate`); also the
    /// retention bound.
    window_1m: usize,
    /// Sample capacity of the 5-second sub-window (`5 * rate`).
    window_5s: usize,
    origin: Instant,
    last_tick: Option<u64>,
    durations: VecDeque<u64>,
    timestamps: VecDeque<u64>,
    cells: Arc<StatsCells>,
}

impl TickSampler {
    /// Create a sampler for a host loop targeting `target_rate` ticks
    /// per second. A zero rate is coerced to 1.
    pub fn new(target_rate: u32) -> Self {
        let rate = target_rate.max(1);
        let window_1m = rate.saturating_mul(60) as usize;
        let window_5s = rate.saturating_mul(5) as usize;
        Self {
            target_rate: rate,
            window_1m,
            window_5s,
            origin: Instant::now(),
            last_tick: None,
            durations: VecDeque::with_capacity(window_1m),
            timestamps: VecDeque::with_capacity(window_1m),
            cells: Arc::new(StatsCells::new(rate)),
        }
    }

    /// A cloneable read handle onto the published statistics.
    pub fn handle(&self) -> TickStatsHandle {
        TickStatsHandle {
            cells: Arc::clone(&self.cells),
        }
    }

    /// The configured target tick rate.
    pub fn target_rate(&self) -> u32 {
        self.target_rate
    }

    /// Number of samples currently retained.
    pub fn retained_samples(&self) -> usize {
        self.durations.len()
    }

    /// Record a tick boundary at the current monotonic time.
    ///
    /// Call once per host tick, from the primary context only.
    pub fn on_tick(&mut self) {
        let now = u64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(u64::MAX);
        self.record(now);
    }

    /// Record a tick boundary observed at `now_nanos` on a monotonic
    /// clock of the caller's choosing.
    ///
    /// This is the deterministic seam behind [`on_tick`](Self::on_tick):
    /// hosts that track their own clock (and tests) feed timestamps in
    /// directly. The first invocation only anchors the clock; each
    /// subsequent one appends a sample, evicts samples beyond the
    /// 1-minute bound, and republishes the derived figures.
    pub fn record(&mut self, now_nanos: u64) {
        let Some(last) = self.last_tick else {
            self.last_tick = Some(now_nanos);
            return;
        };

        self.durations.push_back(now_nanos.saturating_sub(last));
        self.timestamps.push_back(now_nanos);
        while self.durations.len() > self.window_1m {
            self.durations.pop_front();
            self.timestamps.pop_front();
        }

        self.recompute();
        self.last_tick = Some(now_nanos);
    }

    /// Recompute and publish MSPT and both TPS figures from the
    /// current window contents.
    fn recompute(&self) {
        let retained = self.durations.len();
        if retained == 0 {
            return;
        }

        let total_ms: f64 = self
            .durations
            .iter()
            .map(|d| *d as f64 / NANOS_PER_MILLI)
            .sum();
        StatsCells::store(&self.cells.mspt, total_ms / retained as f64);

        if let Some(tps) = self.window_tps(retained.min(self.window_5s)) {
            StatsCells::store(&self.cells.tps_5s, tps);
        }
        if let Some(tps) = self.window_tps(retained) {
            StatsCells::store(&self.cells.tps_1m, tps);
        }
    }

    /// TPS over the most recent `count` samples, or `None` when the
    /// sub-window cannot produce a figure (fewer than 2 samples, or a
    /// non-positive elapsed span). `count` timestamps bound `count - 1`
    /// intervals, and the result is clamped to the target rate so
    /// sampling noise never reports an impossible super-rate.
    fn window_tps(&self, count: usize) -> Option<f64> {
        if count < 2 {
            return None;
        }
        let newest = *self.timestamps.back()?;
        let oldest = *self.timestamps.get(self.timestamps.len().checked_sub(count)?)?;
        let elapsed_secs = newest.saturating_sub(oldest) as f64 / NANOS_PER_SEC;
        if elapsed_secs <= 0.0 {
            return None;
        }
        let tps = (count as f64 - 1.0) / elapsed_secs;
        Some(tps.min(f64::from(self.target_rate)))
    }
}
