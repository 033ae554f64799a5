//! Reflective call profiler.
//!
//! Counts host method invocations made by the interpreter and their total
//! time. Looking up a known name takes only a shared read lock; the write
//! lock is taken once per name, when it gets its slot index. The counters
//! live in a fixed array of atomics and are updated without locking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

/// Slots available when no capacity is given.
pub const DEFAULT_PROFILER_CAPACITY: usize = 4096;

#[derive(Default)]
struct Slots {
    index: FxHashMap<String, usize>,
    names: Vec<String>,
}

/// Call counts and cumulative time per method name.
pub struct CallProfiler {
    slots: RwLock<Slots>,
    calls: Box<[AtomicU64]>,
    nanos: Box<[AtomicU64]>,
}

/// Profile entry for one method.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallStats {
    pub name: String,
    pub calls: u64,
    pub total: Duration,
}

impl Default for CallProfiler {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_PROFILER_CAPACITY)
    }
}

impl CallProfiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// A profiler tracking at most `capacity` distinct names. Calls to
    /// names past the capacity are not recorded.
    pub fn with_capacity(capacity: usize) -> Self {
        CallProfiler {
            slots: RwLock::new(Slots::default()),
            calls: (0..capacity).map(|_| AtomicU64::new(0)).collect(),
            nanos: (0..capacity).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    fn slot(&self, name: &str) -> Option<usize> {
        if let Some(&index) = self.slots.read().index.get(name) {
            return Some(index);
        }
        self.assign_slot(name)
    }

    #[cold]
    fn assign_slot(&self, name: &str) -> Option<usize> {
        let mut slots = self.slots.write();
        // Another thread may have assigned it between the two locks.
        if let Some(&index) = slots.index.get(name) {
            return Some(index);
        }
        let index = slots.names.len();
        if index >= self.calls.len() {
            return None;
        }
        slots.names.push(name.to_string());
        slots.index.insert(name.to_string(), index);
        Some(index)
    }

    /// Record one call of `name` that took `elapsed`.
    pub fn record(&self, name: &str, elapsed: Duration) {
        let Some(index) = self.slot(name) else {
            tracing::trace!(name, "profiler full, call not recorded");
            return;
        };
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.calls[index].fetch_add(1, Ordering::Relaxed);
        self.nanos[index].fetch_add(nanos, Ordering::Relaxed);
    }

    /// Current counters, most called first.
    pub fn snapshot(&self) -> Vec<CallStats> {
        let slots = self.slots.read();
        let mut stats: Vec<CallStats> = slots
            .names
            .iter()
            .enumerate()
            .map(|(i, name)| CallStats {
                name: name.clone(),
                calls: self.calls[i].load(Ordering::Relaxed),
                total: Duration::from_nanos(self.nanos[i].load(Ordering::Relaxed)),
            })
            .collect();
        stats.sort_by(|a, b| b.calls.cmp(&a.calls).then_with(|| a.name.cmp(&b.name)));
        stats
    }

    /// Zero every counter, keeping slot assignments.
    pub fn reset(&self) {
        for counter in self.calls.iter().chain(self.nanos.iter()) {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl std::fmt::Debug for CallProfiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallProfiler")
            .field("names", &self.slots.read().names.len())
            .field("capacity", &self.calls.len())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Tests can panic")]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn records_calls_per_name() {
        let profiler = CallProfiler::new();
        profiler.record("Object.ToString", Duration::from_nanos(10));
        profiler.record("Object.ToString", Duration::from_nanos(5));
        profiler.record("String.get_Length", Duration::from_nanos(1));

        let stats = profiler.snapshot();
        assert_eq!(
            stats,
            vec![
                CallStats {
                    name: "Object.ToString".into(),
                    calls: 2,
                    total: Duration::from_nanos(15),
                },
                CallStats {
                    name: "String.get_Length".into(),
                    calls: 1,
                    total: Duration::from_nanos(1),
                },
            ]
        );
    }

    #[test]
    fn names_past_capacity_are_dropped() {
        let profiler = CallProfiler::with_capacity(1);
        profiler.record("a", Duration::ZERO);
        profiler.record("b", Duration::ZERO);
        assert_eq!(profiler.snapshot().len(), 1);
    }

    #[test]
    fn reset_keeps_slots() {
        let profiler = CallProfiler::new();
        profiler.record("a", Duration::from_nanos(3));
        profiler.reset();
        let stats = profiler.snapshot();
        assert_eq!(stats[0].calls, 0);
        assert_eq!(stats[0].total, Duration::ZERO);
    }

    #[test]
    fn concurrent_recording_is_counted() {
        let profiler = std::sync::Arc::new(CallProfiler::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let profiler = std::sync::Arc::clone(&profiler);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        profiler.record("m", Duration::from_nanos(1));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(profiler.snapshot()[0].calls, 400);
    }

    #[test]
    fn concurrent_first_sightings_share_one_slot_per_name() {
        let profiler = std::sync::Arc::new(CallProfiler::with_capacity(8));
        let handles: Vec<_> = (0..6)
            .map(|t| {
                let profiler = std::sync::Arc::clone(&profiler);
                std::thread::spawn(move || {
                    for i in 0..300 {
                        let name = ["Counter.Get", "Counter.Set", "Shape.Area"][(i + t) % 3];
                        profiler.record(name, Duration::from_nanos(2));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let stats = profiler.snapshot();
        assert_eq!(stats.len(), 3);
        for entry in &stats {
            assert_eq!(entry.calls, 600, "{}", entry.name);
            assert_eq!(entry.total, Duration::from_nanos(1200));
        }
    }
}
