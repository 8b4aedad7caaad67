//! Process and host hardware figures for the `metrics` action.
//!
//! Process memory is cheap and read fresh on every call. Host CPU,
//! memory and disk figures are expensive to gather, so they are
//! refreshed at most once per [`HARDWARE_CACHE`] interval; calls inside
//! the interval see the cached values. A failed refresh (no matching
//! disk, unknown pid) leaves the cache untouched — hardware trouble
//! degrades readings to last-known-or-zero, it never fails a request.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use sysinfo::{Disks, Pid, ProcessesToUpdate, System};
use ticksight_types::MetricsSnapshot;

/// Minimum interval between two hardware refreshes.
const HARDWARE_CACHE: Duration = Duration::from_secs(10);

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;
const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Cached host-level figures, refreshed on the cache cadence.
#[derive(Debug, Clone, Copy, Default)]
struct HardwareFigures {
    cpu_process: f64,
    cpu_system: f64,
    host_mem_used: f64,
    host_mem_total: f64,
    disk_used: f64,
    disk_total: f64,
}

struct AdapterInner {
    sys: System,
    pid: Option<Pid>,
    last_hardware_refresh: Option<Instant>,
    cached: HardwareFigures,
}

/// Stateless reporter of process/host figures, aside from its
/// short-lived hardware cache.
pub struct HostMetricsAdapter {
    inner: Mutex<AdapterInner>,
}

impl HostMetricsAdapter {
    /// Create an adapter. Resolving the current pid can fail on exotic
    /// platforms; in that case process figures stay zero.
    pub fn new() -> Self {
        let pid = sysinfo::get_current_pid().ok();
        if pid.is_none() {
            tracing::warn!("could not resolve current pid; process figures will read zero");
        }
        Self {
            inner: Mutex::new(AdapterInner {
                sys: System::new_all(),
                pid,
                last_hardware_refresh: None,
                cached: HardwareFigures::default(),
            }),
        }
    }

    /// Gather process memory (fresh) and host hardware figures
    /// (cached) into the memory/CPU/disk portion of a snapshot.
    ///
    /// The tick figures of the returned snapshot are left at their
    /// defaults; the caller overlays them from the sampler.
    pub fn sample(&self) -> MetricsSnapshot {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        inner.sys.refresh_memory();
        if let Some(pid) = inner.pid {
            inner.sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        }

        let (mem_used, mem_total) = inner
            .pid
            .and_then(|pid| inner.sys.process(pid))
            .map_or((0.0, 0.0), |proc_| {
                (
                    proc_.memory() as f64 / BYTES_PER_MIB,
                    proc_.virtual_memory() as f64 / BYTES_PER_MIB,
                )
            });
        let mem_max = inner.sys.total_memory() as f64 / BYTES_PER_MIB;

        refresh_hardware_if_stale(&mut inner);

        let cached = inner.cached;
        MetricsSnapshot {
            cpu_process: cached.cpu_process,
            cpu_system: cached.cpu_system,
            mem_used,
            mem_total,
            mem_max,
            host_mem_used: cached.host_mem_used,
            host_mem_total: cached.host_mem_total,
            disk_used: cached.disk_used,
            disk_total: cached.disk_total,
            ..MetricsSnapshot::default()
        }
    }
}

impl Default for HostMetricsAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Refresh the hardware cache if the cadence allows it.
fn refresh_hardware_if_stale(inner: &mut AdapterInner) {
    let now = Instant::now();
    if let Some(last) = inner.last_hardware_refresh {
        if now.duration_since(last) < HARDWARE_CACHE {
            return;
        }
    }

    inner.sys.refresh_cpu_usage();
    inner.cached.cpu_system = f64::from(inner.sys.global_cpu_usage());
    if let Some(proc_) = inner.pid.and_then(|pid| inner.sys.process(pid)) {
        inner.cached.cpu_process = f64::from(proc_.cpu_usage());
    }

    inner.cached.host_mem_total = inner.sys.total_memory() as f64 / BYTES_PER_MIB;
    inner.cached.host_mem_used = inner.sys.used_memory() as f64 / BYTES_PER_MIB;

    if let Some((used, total)) = data_partition_usage() {
        inner.cached.disk_used = used;
        inner.cached.disk_total = total;
    }

    inner.last_hardware_refresh = Some(now);
}

/// Disk usage in GiB for the partition holding the working directory,
/// falling back to the sum of all mounted disks. `None` when no disks
/// are visible at all (cache is then left as-is).
fn data_partition_usage() -> Option<(f64, f64)> {
    let disks = Disks::new_with_refreshed_list();
    if disks.list().is_empty() {
        return None;
    }

    let cwd = std::env::current_dir().ok();
    let best = cwd.as_deref().and_then(|dir| {
        disks
            .list()
            .iter()
            .filter(|d| dir.starts_with(d.mount_point()))
            .max_by_key(|d| d.mount_point().components().count())
    });

    let (total, available) = best.map_or_else(
        || {
            disks
                .list()
                .iter()
                .fold((0_u64, 0_u64), |(t, a), d| {
                    (
                        t.saturating_add(d.total_space()),
                        a.saturating_add(d.available_space()),
                    )
                })
        },
        |d| (d.total_space(), d.available_space()),
    );

    let total_gib = total as f64 / BYTES_PER_GIB;
    let used_gib = total.saturating_sub(available) as f64 / BYTES_PER_GIB;
    Some((used_gib, total_gib))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn process_memory_is_positive() {
        let adapter = HostMetricsAdapter::new();
        let snap = adapter.sample();
        assert!(snap.mem_used > 0.0, "a live process has resident memory");
        assert!(snap.mem_max >= snap.mem_used);
    }

    #[test]
    fn hardware_figures_are_cached_between_calls() {
        let adapter = HostMetricsAdapter::new();
        let first = adapter.sample();
        let second = adapter.sample();
        // Within the cache window the host figures must be identical.
        assert_eq!(first.host_mem_total, second.host_mem_total);
        assert_eq!(first.disk_total, second.disk_total);
        assert_eq!(first.cpu_system, second.cpu_system);
    }

    #[test]
    fn tick_figures_are_left_default() {
        let adapter = HostMetricsAdapter::new();
        let snap = adapter.sample();
        assert_eq!(snap.tps_5s, 0.0);
        assert_eq!(snap.tps_1m, 0.0);
        assert_eq!(snap.mspt, 0.0);
    }
}
