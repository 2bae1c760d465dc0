use super::span::{self, Boundaries, Compare, Span};
use crate::abort::AbortController;
use crate::error::CacheError;
use crate::wakeable::Wakeable;

use std::sync::Arc;

/// Extracts the point a value sits at.
pub(crate) type PointFn<T, V> = dyn Fn(&V) -> T + Send + Sync;

/// A loaded span and the values inside it, sorted by point.
pub(crate) struct Covered<T, V> {
  pub(crate) span: Span<T>,
  pub(crate) values: Vec<Arc<V>>,
}

/// A gap whose load has started but not finished.
pub(crate) struct InFlight<T> {
  pub(crate) unit: u64,
  pub(crate) span: Span<T>,
  pub(crate) done: Wakeable<()>,
  pub(crate) abort: AbortController,
}

/// A gap whose load failed. Queries touching it re-raise the error until
/// the key is invalidated.
pub(crate) struct FailedLoad<T> {
  pub(crate) span: Span<T>,
  pub(crate) error: CacheError,
}

/// A query still waiting on gaps, so repeated reads share one future.
pub(crate) struct WaitingQuery<T, V> {
  pub(crate) span: Span<T>,
  pub(crate) wakeable: Wakeable<Arc<[Arc<V>]>>,
}

/// Everything known about one derived key.
///
/// `covered` is sorted by start and no two of its spans connect.
pub(crate) struct Index<T, V> {
  pub(crate) covered: Vec<Covered<T, V>>,
  pub(crate) in_flight: Vec<InFlight<T>>,
  pub(crate) waiting: Vec<WaitingQuery<T, V>>,
  pub(crate) failed: Vec<FailedLoad<T>>,
}

impl<T, V> Default for Index<T, V> {
  fn default() -> Self {
    Self {
      covered: Vec::new(),
      in_flight: Vec::new(),
      waiting: Vec::new(),
      failed: Vec::new(),
    }
  }
}

impl<T: Clone, V> Index<T, V> {
  pub(crate) fn covered_spans(&self) -> Vec<Span<T>> {
    self.covered.iter().map(|c| c.span.clone()).collect()
  }

  /// Stretches of `query` neither loaded nor being loaded.
  pub(crate) fn missing(&self, query: &Span<T>, mode: Boundaries, cmp: &Compare<T>) -> Vec<Span<T>> {
    let blockers = self
      .covered
      .iter()
      .map(|c| c.span.clone())
      .chain(self.in_flight.iter().map(|f| f.span.clone()))
      .collect();
    let blockers = span::coalesce(blockers, cmp);
    span::gaps(query, &blockers, mode, cmp)
  }

  /// Stretches of `query` not loaded yet, ignoring loads in flight.
  pub(crate) fn unloaded(&self, query: &Span<T>, mode: Boundaries, cmp: &Compare<T>) -> Vec<Span<T>> {
    span::gaps(query, &self.covered_spans(), mode, cmp)
  }

  /// The error of a failed gap that an unloaded stretch of `query` runs
  /// into.
  pub(crate) fn failure(&self, query: &Span<T>, mode: Boundaries, cmp: &Compare<T>) -> Option<CacheError> {
    if self.failed.is_empty() {
      return None;
    }
    let unloaded = self.unloaded(query, mode, cmp);
    self
      .failed
      .iter()
      .find(|failed| unloaded.iter().any(|gap| gap.overlaps(&failed.span, cmp)))
      .map(|failed| failed.error.clone())
  }

  pub(crate) fn remember_failure(&mut self, gaps: Vec<Span<T>>, error: &CacheError) {
    self.failed.extend(gaps.into_iter().map(|span| FailedLoad {
      span,
      error: error.clone(),
    }));
  }

  /// Futures of the loads in flight that overlap `query`, one per unit.
  pub(crate) fn overlapping_loads(&self, query: &Span<T>, cmp: &Compare<T>) -> Vec<Wakeable<()>> {
    let mut loads: Vec<Wakeable<()>> = Vec::new();
    for flight in &self.in_flight {
      if flight.span.overlaps(query, cmp) && !loads.iter().any(|w| w.ptr_eq(&flight.done)) {
        loads.push(flight.done.clone());
      }
    }
    loads
  }

  pub(crate) fn waiting_for(&self, query: &Span<T>, cmp: &Compare<T>) -> Option<Wakeable<Arc<[Arc<V>]>>> {
    self
      .waiting
      .iter()
      .find(|w| w.span.same_as(query, cmp))
      .map(|w| w.wakeable.clone())
  }

  /// Every cached value whose point lies in `query`, in point order.
  pub(crate) fn slice(&self, query: &Span<T>, cmp: &Compare<T>, point_of: &PointFn<T, V>) -> Vec<Arc<V>> {
    let first = self
      .covered
      .partition_point(|c| span::ends_before(&c.span.end, &query.start, cmp));
    self.covered[first..]
      .iter()
      .take_while(|c| !span::ends_before(&query.end, &c.span.start, cmp))
      .flat_map(|c| c.values.iter())
      .filter(|value| query.contains(&point_of(value), cmp))
      .cloned()
      .collect()
  }

  /// Records `values` as the full contents of `loaded`, coalescing with
  /// every covered span it connects to.
  ///
  /// Values already cached inside `loaded` are replaced; `values` must be
  /// sorted and lie within `loaded`.
  pub(crate) fn merge(&mut self, loaded: Span<T>, values: Vec<Arc<V>>, cmp: &Compare<T>, point_of: &PointFn<T, V>) {
    let lo = self
      .covered
      .partition_point(|c| !span::connects(&c.span.end, &loaded.start, cmp));
    let hi = self
      .covered
      .partition_point(|c| span::connects(&loaded.end, &c.span.start, cmp));

    if lo >= hi {
      self.covered.insert(lo, Covered { span: loaded, values });
      return;
    }

    let absorbed: Vec<Covered<T, V>> = self.covered.drain(lo..hi).collect();
    let mut merged_span = loaded.clone();
    let mut before = Vec::new();
    let mut after = Vec::new();
    for old in absorbed {
      merged_span = merged_span.hull(&old.span, cmp);
      for value in old.values {
        let point = point_of(&value);
        if span::precedes(&point, &loaded.start, cmp) {
          before.push(value);
        } else if span::follows(&point, &loaded.end, cmp) {
          after.push(value);
        }
      }
    }

    before.extend(values);
    before.extend(after);
    self.covered.insert(
      lo,
      Covered {
        span: merged_span,
        values: before,
      },
    );
  }
}
