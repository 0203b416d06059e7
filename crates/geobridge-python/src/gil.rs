use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use pyo3::Python;

const MAX_NANOS_U64: u128 = u64::MAX as u128;

/// Process-wide counters for GIL usage by the adapter.
struct GilStats {
    acquisitions: AtomicU64,
    wait_ns: AtomicU64,
    hold_ns: AtomicU64,
}

static GIL_STATS: GilStats = GilStats {
    acquisitions: AtomicU64::new(0),
    wait_ns: AtomicU64::new(0),
    hold_ns: AtomicU64::new(0),
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GilStatsSnapshot {
    pub acquisitions: u64,
    pub wait: Duration,
    pub hold: Duration,
}

pub fn gil_stats() -> GilStatsSnapshot {
    GilStatsSnapshot {
        acquisitions: GIL_STATS.acquisitions.load(Ordering::Relaxed),
        wait: Duration::from_nanos(GIL_STATS.wait_ns.load(Ordering::Relaxed)),
        hold: Duration::from_nanos(GIL_STATS.hold_ns.load(Ordering::Relaxed)),
    }
}

fn nanos(duration: Duration) -> u64 {
    duration.as_nanos().min(MAX_NANOS_U64) as u64
}

thread_local! {
    static SECTION_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Tracks how deeply `with_gil` sections are nested on the current thread.
struct Section {
    outermost: bool,
}

impl Section {
    fn enter() -> Self {
        let depth = SECTION_DEPTH.with(|d| d.replace(d.get() + 1));
        Self {
            outermost: depth == 0,
        }
    }
}

impl Drop for Section {
    fn drop(&mut self) {
        SECTION_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

/// Runs `f` while holding the GIL.
///
/// The GIL is released when `f` returns or unwinds. Calling this from a thread
/// that already holds the GIL does not deadlock; the nested section simply
/// runs under the outer acquisition. Only the outermost section on a thread
/// is counted in [`gil_stats`].
pub fn with_gil<F, R>(f: F) -> R
where
    F: for<'py> FnOnce(Python<'py>) -> R,
{
    let section = Section::enter();
    if !section.outermost {
        return Python::with_gil(f);
    }
    let requested = Instant::now();
    Python::with_gil(|py| {
        let acquired = Instant::now();
        GIL_STATS.acquisitions.fetch_add(1, Ordering::Relaxed);
        GIL_STATS
            .wait_ns
            .fetch_add(nanos(acquired - requested), Ordering::Relaxed);
        let result = f(py);
        let held = acquired.elapsed();
        GIL_STATS.hold_ns.fetch_add(nanos(held), Ordering::Relaxed);
        log::trace!(
            "GIL section: wait={}us, hold={}us",
            (acquired - requested).as_micros(),
            held.as_micros()
        );
        result
    })
}
