use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crossbeam_utils::CachePadded;

/// Lock-free counters shared by a cache and its loader tasks.
#[derive(Debug)]
pub(crate) struct Metrics {
  // --- Lookups ---
  pub(crate) hits: CachePadded<AtomicU64>,
  pub(crate) misses: CachePadded<AtomicU64>,

  // --- Loads ---
  pub(crate) loads_started: CachePadded<AtomicU64>,
  pub(crate) loads_failed: CachePadded<AtomicU64>,
  pub(crate) aborts: CachePadded<AtomicU64>,
  pub(crate) refreshes: CachePadded<AtomicU64>,

  // --- Removal ---
  pub(crate) invalidations: CachePadded<AtomicU64>,
  pub(crate) evictions: CachePadded<AtomicU64>,

  created_at: Instant,
}

impl Default for Metrics {
  fn default() -> Self {
    Self {
      hits: CachePadded::new(AtomicU64::new(0)),
      misses: CachePadded::new(AtomicU64::new(0)),
      loads_started: CachePadded::new(AtomicU64::new(0)),
      loads_failed: CachePadded::new(AtomicU64::new(0)),
      aborts: CachePadded::new(AtomicU64::new(0)),
      refreshes: CachePadded::new(AtomicU64::new(0)),
      invalidations: CachePadded::new(AtomicU64::new(0)),
      evictions: CachePadded::new(AtomicU64::new(0)),
      created_at: Instant::now(),
    }
  }
}

impl Metrics {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  #[inline]
  pub(crate) fn bump(counter: &CachePadded<AtomicU64>) {
    counter.fetch_add(1, Ordering::Relaxed);
  }

  pub(crate) fn snapshot(&self) -> MetricsSnapshot {
    let hits = self.hits.load(Ordering::Relaxed);
    let misses = self.misses.load(Ordering::Relaxed);
    let total_lookups = hits + misses;

    MetricsSnapshot {
      hits,
      misses,
      hit_ratio: if total_lookups == 0 {
        0.0
      } else {
        hits as f64 / total_lookups as f64
      },
      loads_started: self.loads_started.load(Ordering::Relaxed),
      loads_failed: self.loads_failed.load(Ordering::Relaxed),
      aborts: self.aborts.load(Ordering::Relaxed),
      refreshes: self.refreshes.load(Ordering::Relaxed),
      invalidations: self.invalidations.load(Ordering::Relaxed),
      evictions: self.evictions.load(Ordering::Relaxed),
      uptime_secs: self.created_at.elapsed().as_secs(),
    }
  }
}

/// A point-in-time snapshot of a cache's counters.
#[derive(Clone)]
pub struct MetricsSnapshot {
  /// Lookups answered by an existing record, pending or settled.
  pub hits: u64,
  /// Lookups that had to create a record.
  pub misses: u64,
  /// hits / (hits + misses).
  pub hit_ratio: f64,
  /// Loader invocations, including refreshes.
  pub loads_started: u64,
  /// Loader invocations that returned an error.
  pub loads_failed: u64,
  /// Pending loads cancelled through their abort handle.
  pub aborts: u64,
  /// Explicit refreshes of an existing record.
  pub refreshes: u64,
  /// Records removed by the caller.
  pub invalidations: u64,
  /// Records removed by the store's own policy.
  pub evictions: u64,
  pub uptime_secs: u64,
}

impl fmt::Debug for MetricsSnapshot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MetricsSnapshot")
      .field("hits", &self.hits)
      .field("misses", &self.misses)
      .field("hit_ratio", &format!("{:.2}%", self.hit_ratio * 100.0))
      .field("loads_started", &self.loads_started)
      .field("loads_failed", &self.loads_failed)
      .field("aborts", &self.aborts)
      .field("refreshes", &self.refreshes)
      .field("invalidations", &self.invalidations)
      .field("evictions", &self.evictions)
      .field("uptime_secs", &self.uptime_secs)
      .finish()
  }
}
