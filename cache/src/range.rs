//! Caches over ordered point ranges that fetch only what is missing.
//!
//! Requests carry parameters `P` plus a span of points `T`. Parameters
//! project to a key; per key the cache keeps a sorted list of loaded spans
//! with their values, coalescing spans as they come to touch. A query loads
//! only its gaps: the stretches neither loaded nor already being loaded.
//!
//! Points are ordered solely by the comparator handed to the builder, so
//! big integers, strings or custom points work as well as numbers.

mod index;
pub mod span;

pub use span::Span;

use crate::abort::{AbortController, AbortSignal};
use crate::error::{BuildError, CacheError};
use crate::listener::OnEvict;
use crate::loader::Loader;
use crate::logging::{debug_log, DebugLogging};
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::record::Record;
use crate::runtime::resolve_spawner;
use crate::shared::KeyFn;
use crate::store::{EvictionStore, LruStore, MapStore, StoreFactory};
use crate::wakeable::{Suspend, Wakeable};
use crate::TaskSpawner;

use index::{InFlight, Index, PointFn, WaitingQuery};
use span::{Boundaries, Compare};

use std::cmp::Ordering;
use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// The values of a query, in point order.
pub type RangeValues<V> = Arc<[Arc<V>]>;

type GapLoader<P, T, V> = Loader<(P, Vec<Span<T>>), Vec<V>>;

/// Everything a range cache knows about one key: the spans loaded so far
/// with their values, and the loads still running.
///
/// Range caches keep one of these per key in an [`EvictionStore`], wrapped
/// in a resolved [`Record`]. It is opaque; its only use outside the crate
/// is naming the store type in [`RangeCacheBuilder::store`].
pub struct SpanIndex<T, V> {
  index: Mutex<Index<T, V>>,
}

impl<T, V> Default for SpanIndex<T, V> {
  fn default() -> Self {
    Self {
      index: Mutex::new(Index::default()),
    }
  }
}

impl<T, V> fmt::Debug for SpanIndex<T, V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let index = self.index.lock();
    f.debug_struct("SpanIndex")
      .field("spans", &index.covered.len())
      .field("in_flight", &index.in_flight.len())
      .finish_non_exhaustive()
  }
}

impl<T, V> SpanIndex<T, V> {
  /// Takes the loads in flight out of the index, fails them with
  /// [`CacheError::Aborted`] and returns how many were still running.
  fn abort_all(&self) -> usize {
    let in_flight = std::mem::take(&mut self.index.lock().in_flight);
    abort_loads(in_flight)
  }
}

type SpanStore<K, T, V> = Box<dyn EvictionStore<K, SpanIndex<T, V>>>;

/// A builder for [`RangeCache`] and [`IntervalCache`].
pub struct RangeCacheBuilder<P, K, T, V> {
  loader: GapLoader<P, T, V>,
  compare: Arc<Compare<T>>,
  point_of: Arc<PointFn<T, V>>,
  key_fn: KeyFn<P, K>,
  name: Option<String>,
  split_gaps: bool,
  debug_logging: Option<bool>,
  capacity: Option<usize>,
  store_factory: Option<StoreFactory<K, SpanIndex<T, V>>>,
  spawner: Option<Arc<dyn TaskSpawner>>,
}

impl<P, K, T, V> fmt::Debug for RangeCacheBuilder<P, K, T, V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("RangeCacheBuilder")
      .field("name", &self.name)
      .field("split_gaps", &self.split_gaps)
      .field("debug_logging", &self.debug_logging)
      .field("capacity", &self.capacity)
      .field("has_store_factory", &self.store_factory.is_some())
      .finish_non_exhaustive()
  }
}

impl<P, T, V> RangeCacheBuilder<P, P, T, V>
where
  P: Clone + Send + 'static,
  T: Send + 'static,
  V: Send + 'static,
{
  fn with_loader<C, F>(loader: GapLoader<P, T, V>, compare: C, point_of: F) -> Self
  where
    C: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    F: Fn(&V) -> T + Send + Sync + 'static,
  {
    Self {
      loader,
      compare: Arc::new(compare),
      point_of: Arc::new(point_of),
      key_fn: Arc::new(|params: &P| params.clone()),
      name: None,
      split_gaps: false,
      debug_logging: None,
      capacity: None,
      store_factory: None,
      spawner: None,
    }
  }

  /// Creates a builder around an asynchronous loader.
  ///
  /// The loader receives the parameters and the gaps to fetch, and returns
  /// the values found in them in any order. `compare` orders points;
  /// `point_of` tells where a value sits.
  pub fn new<L, Fut, E, C, F>(loader: L, compare: C, point_of: F) -> Self
  where
    L: Fn(P, Vec<Span<T>>, AbortSignal) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<V>, E>> + Send + 'static,
    E: Into<Box<dyn StdError + Send + Sync>>,
    C: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    F: Fn(&V) -> T + Send + Sync + 'static,
  {
    let loader = Loader::from_async(move |(params, gaps): (P, Vec<Span<T>>), signal| {
      loader(params, gaps, signal)
    });
    Self::with_loader(loader, compare, point_of)
  }

  /// Creates a builder around a blocking loader, run on its own thread.
  pub fn with_sync_loader<L, E, C, F>(loader: L, compare: C, point_of: F) -> Self
  where
    L: Fn(P, Vec<Span<T>>, AbortSignal) -> Result<Vec<V>, E> + Send + Sync + 'static,
    E: Into<Box<dyn StdError + Send + Sync>>,
    C: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    F: Fn(&V) -> T + Send + Sync + 'static,
  {
    let loader = Loader::from_sync(move |(params, gaps): (P, Vec<Span<T>>), signal| {
      loader(params, gaps, signal)
    });
    Self::with_loader(loader, compare, point_of)
  }
}

impl<P, K, T, V> RangeCacheBuilder<P, K, T, V> {
  /// Sets how parameters project to the key that owns a span index. Any
  /// store set through [`store`](Self::store) is discarded.
  pub fn key<K2, F>(self, key_fn: F) -> RangeCacheBuilder<P, K2, T, V>
  where
    F: Fn(&P) -> K2 + Send + Sync + 'static,
  {
    RangeCacheBuilder {
      loader: self.loader,
      compare: self.compare,
      point_of: self.point_of,
      key_fn: Arc::new(key_fn),
      name: self.name,
      split_gaps: self.split_gaps,
      debug_logging: self.debug_logging,
      capacity: self.capacity,
      store_factory: None,
      spawner: self.spawner,
    }
  }

  pub fn name(mut self, name: impl Into<String>) -> Self {
    self.name = Some(name.into());
    self
  }

  /// Calls the loader once per gap instead of once per query. A failed
  /// call then only fails the queries that needed its gap.
  pub fn split_gaps(mut self, split: bool) -> Self {
    self.split_gaps = split;
    self
  }

  pub fn debug_logging(mut self, enabled: bool) -> Self {
    self.debug_logging = Some(enabled);
    self
  }

  /// Keeps span indexes for at most `capacity` keys, dropping the least
  /// recently queried one first. Unbounded by default.
  pub fn capacity(mut self, capacity: usize) -> Self {
    self.capacity = Some(capacity);
    self
  }

  /// Supplies the store holding the per-key span indexes. The factory
  /// receives the cache's eviction callback.
  pub fn store<F>(mut self, factory: F) -> Self
  where
    F: Fn(OnEvict<K>) -> Box<dyn EvictionStore<K, SpanIndex<T, V>>> + Send + Sync + 'static,
  {
    self.store_factory = Some(Arc::new(factory));
    self
  }

  pub fn spawner(mut self, spawner: Arc<dyn TaskSpawner>) -> Self {
    self.spawner = Some(spawner);
    self
  }
}

impl<P, K, T, V> RangeCacheBuilder<P, K, T, V>
where
  P: Clone + Send + 'static,
  K: Eq + Hash + Clone + Send + Sync + 'static,
  T: Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
{
  /// Builds a cache over closed point ranges. Gaps stop just short of
  /// loaded points.
  pub fn build(self) -> Result<RangeCache<P, K, T, V>, BuildError> {
    Ok(RangeCache {
      core: self.build_core(Boundaries::Exclusive)?,
    })
  }

  /// Builds a cache over intervals, which may be open or unbounded. Gaps
  /// share their edge points with loaded intervals.
  pub fn build_interval(self) -> Result<IntervalCache<P, K, T, V>, BuildError> {
    Ok(IntervalCache {
      core: self.build_core(Boundaries::Shared)?,
    })
  }

  fn build_core(self, mode: Boundaries) -> Result<SpanCache<P, K, T, V>, BuildError> {
    if self.capacity == Some(0) {
      return Err(BuildError::ZeroCapacity);
    }
    let spawner = if self.loader.is_async() {
      Some(resolve_spawner(self.spawner).ok_or(BuildError::SpawnerRequired)?)
    } else {
      self.spawner
    };

    let name = self.name.unwrap_or_else(|| "range cache".to_string());
    let debug = DebugLogging::new(self.debug_logging);
    let metrics = Arc::new(Metrics::new());

    let on_evict: OnEvict<K> = {
      let metrics = metrics.clone();
      let name = name.clone();
      Arc::new(move |_: &K| {
        Metrics::bump(&metrics.evictions);
        debug_log!(debug, cache = %name, "store evicted a span index");
      })
    };
    let factory: StoreFactory<K, SpanIndex<T, V>> = match (self.store_factory, self.capacity) {
      (Some(factory), _) => factory,
      (None, Some(capacity)) => Arc::new(move |on_evict: OnEvict<K>| {
        Box::new(LruStore::<K, SpanIndex<T, V>>::new(capacity, on_evict)) as SpanStore<K, T, V>
      }),
      (None, None) => Arc::new(|_: OnEvict<K>| Box::new(MapStore::<K, SpanIndex<T, V>>::new()) as SpanStore<K, T, V>),
    };

    let shared = RangeShared {
      name,
      mode,
      store: Mutex::new(factory(on_evict)),
      loader: self.loader,
      compare: self.compare,
      point_of: self.point_of,
      key_fn: self.key_fn,
      split_gaps: self.split_gaps,
      spawner,
      metrics,
      debug,
      next_unit: AtomicU64::new(0),
    };
    Ok(SpanCache {
      shared: Arc::new(shared),
    })
  }
}

struct RangeShared<P, K, T, V> {
  name: String,
  mode: Boundaries,
  store: Mutex<SpanStore<K, T, V>>,
  loader: GapLoader<P, T, V>,
  compare: Arc<Compare<T>>,
  point_of: Arc<PointFn<T, V>>,
  key_fn: KeyFn<P, K>,
  split_gaps: bool,
  spawner: Option<Arc<dyn TaskSpawner>>,
  metrics: Arc<Metrics>,
  debug: DebugLogging,
  next_unit: AtomicU64,
}

impl<P, K, T, V> Drop for RangeShared<P, K, T, V> {
  fn drop(&mut self) {
    for (_, record) in self.store.get_mut().drain() {
      if let Some(entry) = record.value() {
        entry.abort_all();
      }
    }
  }
}

fn abort_loads<T>(in_flight: Vec<InFlight<T>>) -> usize {
  let mut aborted = 0;
  for flight in in_flight {
    flight.abort.abort();
    if flight.done.reject(CacheError::Aborted).is_ok() {
      aborted += 1;
    }
  }
  aborted
}

impl<P, K, T, V> RangeShared<P, K, T, V>
where
  P: Clone + Send + 'static,
  K: Eq + Hash + Clone + Send + Sync + 'static,
  T: Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
{
  /// The span index held for `key`, if the store still has one.
  fn entry(&self, key: &K) -> Option<Arc<SpanIndex<T, V>>> {
    self.store.lock().get(key)?.value()
  }

  fn lookup(shared: &Arc<Self>, query: Span<T>, params: &P) -> Suspend<RangeValues<V>> {
    let key = (shared.key_fn)(params);
    let cmp = &*shared.compare;

    let mut started = Vec::new();
    let (entry, wakeable, deps) = {
      let mut store = shared.store.lock();
      let entry = match store.get(&key).and_then(|record| record.value()) {
        Some(entry) => entry,
        None => {
          let entry = Arc::new(SpanIndex::default());
          store.set(key.clone(), Record::resolved(Arc::clone(&entry)));
          entry
        }
      };
      let mut index = entry.index.lock();

      if let Some(waiting) = index.waiting_for(&query, cmp) {
        Metrics::bump(&shared.metrics.hits);
        return waiting.read();
      }
      if let Some(error) = index.failure(&query, shared.mode, cmp) {
        Metrics::bump(&shared.metrics.hits);
        return Suspend::Failed(error);
      }

      let missing = index.missing(&query, shared.mode, cmp);
      let mut deps = index.overlapping_loads(&query, cmp);
      if missing.is_empty() && deps.is_empty() {
        Metrics::bump(&shared.metrics.hits);
        return Suspend::Ready(index.slice(&query, cmp, &*shared.point_of).into());
      }
      Metrics::bump(&shared.metrics.misses);

      for gaps in shared.group(missing) {
        let unit = shared.next_unit.fetch_add(1, AtomicOrdering::Relaxed);
        let done = Wakeable::new();
        let abort = AbortController::new();
        for gap in &gaps {
          index.in_flight.push(InFlight {
            unit,
            span: gap.clone(),
            done: done.clone(),
            abort: abort.clone(),
          });
        }
        deps.push(done.clone());
        started.push((unit, gaps, done, abort.signal()));
      }

      let wakeable = Wakeable::new();
      index.waiting.push(WaitingQuery {
        span: query.clone(),
        wakeable: wakeable.clone(),
      });
      drop(index);
      (entry, wakeable, deps)
    };

    for (unit, gaps, done, signal) in started {
      Self::start_unit(shared, &entry, params.clone(), unit, gaps, done, signal);
    }
    Self::await_deps(shared, &entry, query, wakeable.clone(), deps);
    wakeable.read()
  }

  /// Splits the gaps of one query into loader calls.
  fn group(&self, gaps: Vec<Span<T>>) -> Vec<Vec<Span<T>>> {
    if gaps.is_empty() {
      Vec::new()
    } else if self.split_gaps {
      gaps.into_iter().map(|gap| vec![gap]).collect()
    } else {
      vec![gaps]
    }
  }

  fn start_unit(
    shared: &Arc<Self>,
    entry: &Arc<SpanIndex<T, V>>,
    params: P,
    unit: u64,
    gaps: Vec<Span<T>>,
    done: Wakeable<()>,
    signal: AbortSignal,
  ) {
    Metrics::bump(&shared.metrics.loads_started);
    debug_log!(shared.debug, cache = %shared.name, unit, gaps = gaps.len(), "loading gaps");

    let weak = Arc::downgrade(shared);
    let entry = Arc::clone(entry);
    let requested = gaps.clone();
    shared
      .loader
      .spawn((params, requested), signal, shared.spawner.as_ref(), move |outcome| {
        Self::complete_unit(&weak, &entry, unit, gaps, &done, outcome);
      });
  }

  /// Records a finished loader call in the index and releases the queries
  /// waiting on it.
  ///
  /// Results for gaps that were invalidated meanwhile are dropped. An index
  /// the store evicted while the call ran still takes the result, so the
  /// queries waiting on it complete; nothing is kept once they have.
  fn complete_unit(
    weak: &Weak<Self>,
    entry: &SpanIndex<T, V>,
    unit: u64,
    gaps: Vec<Span<T>>,
    done: &Wakeable<()>,
    outcome: Result<Vec<V>, CacheError>,
  ) {
    let Some(shared) = weak.upgrade() else {
      let _ = done.reject(CacheError::Aborted);
      return;
    };
    let cmp = &*shared.compare;
    let point_of = &*shared.point_of;

    let outcome = outcome.map(|values| {
      let mut values: Vec<Arc<V>> = values.into_iter().map(Arc::new).collect();
      values.sort_by(|a, b| cmp(&point_of(a), &point_of(b)));
      values
    });

    let current = {
      let mut index = entry.index.lock();
      let before = index.in_flight.len();
      index.in_flight.retain(|flight| flight.unit != unit);
      let current = index.in_flight.len() != before;
      if current {
        match &outcome {
          Ok(values) => {
            for gap in gaps {
              let inside = values
                .iter()
                .filter(|value| gap.contains(&point_of(value), cmp))
                .cloned()
                .collect();
              index.merge(gap, inside, cmp, point_of);
            }
          }
          Err(error) => index.remember_failure(gaps, error),
        }
      }
      current
    };

    if !current {
      debug_log!(shared.debug, cache = %shared.name, unit, "discarding result for invalidated gaps");
    }
    let _ = match outcome {
      Ok(_) if current => done.resolve(()),
      Ok(_) => done.reject(CacheError::Aborted),
      Err(error) => {
        Metrics::bump(&shared.metrics.loads_failed);
        done.reject(error)
      }
    };
  }

  fn await_deps(
    shared: &Arc<Self>,
    entry: &Arc<SpanIndex<T, V>>,
    query: Span<T>,
    wakeable: Wakeable<RangeValues<V>>,
    deps: Vec<Wakeable<()>>,
  ) {
    let remaining = Arc::new(AtomicUsize::new(deps.len()));
    let weak = Arc::downgrade(shared);
    let entry = Arc::downgrade(entry);
    for dep in deps {
      let remaining = Arc::clone(&remaining);
      let weak = weak.clone();
      let entry = entry.clone();
      let query = query.clone();
      let wakeable = wakeable.clone();
      dep.on_settled(move |outcome| {
        let outcome = match outcome {
          Err(error) => Err(error),
          Ok(()) if remaining.fetch_sub(1, AtomicOrdering::AcqRel) == 1 => Ok(()),
          Ok(()) => return,
        };
        Self::finish_query(&weak, &entry, &query, &wakeable, outcome);
      });
    }
  }

  /// Settles a query once its loads are done: with the values in its span,
  /// or with the first error among its loads.
  fn finish_query(
    weak: &Weak<Self>,
    entry: &Weak<SpanIndex<T, V>>,
    query: &Span<T>,
    wakeable: &Wakeable<RangeValues<V>>,
    outcome: Result<(), CacheError>,
  ) {
    let settled: Result<RangeValues<V>, CacheError> = match (weak.upgrade(), entry.upgrade()) {
      (Some(shared), Some(entry)) => {
        let values = {
          let mut index = entry.index.lock();
          index.waiting.retain(|waiting| !waiting.wakeable.ptr_eq(wakeable));
          index.slice(query, &*shared.compare, &*shared.point_of)
        };
        if let Err(error) = &outcome {
          debug_log!(shared.debug, cache = %shared.name, %error, "range query failed");
        }
        outcome.map(|()| values.into())
      }
      _ => Err(CacheError::Aborted),
    };
    let _ = match settled {
      Ok(values) => wakeable.resolve(values),
      Err(error) => wakeable.reject(error),
    };
  }

  fn peek(&self, query: &Span<T>, params: &P) -> Option<RangeValues<V>> {
    let entry = self.entry(&(self.key_fn)(params))?;
    let cmp = &*self.compare;
    let index = entry.index.lock();
    if !index.unloaded(query, self.mode, cmp).is_empty() {
      return None;
    }
    Some(index.slice(query, cmp, &*self.point_of).into())
  }

  fn loaded_spans(&self, params: &P) -> Vec<Span<T>> {
    self
      .entry(&(self.key_fn)(params))
      .map(|entry| entry.index.lock().covered_spans())
      .unwrap_or_default()
  }

  /// Number of keys whose span index the store currently holds.
  fn len(&self) -> usize {
    self.store.lock().len()
  }

  fn invalidate(&self, params: &P) -> bool {
    let key = (self.key_fn)(params);
    let Some(record) = self.store.lock().delete(&key) else {
      return false;
    };
    let aborted = record.value().map_or(0, |entry| entry.abort_all());
    for _ in 0..aborted {
      Metrics::bump(&self.metrics.aborts);
    }
    Metrics::bump(&self.metrics.invalidations);
    debug_log!(self.debug, cache = %self.name, aborted, "invalidated span index");
    true
  }

  fn evict_all(&self) -> usize {
    let drained = self.store.lock().drain();
    let count = drained.len();
    for (_, record) in drained {
      if let Some(entry) = record.value() {
        for _ in 0..entry.abort_all() {
          Metrics::bump(&self.metrics.aborts);
        }
      }
      Metrics::bump(&self.metrics.invalidations);
    }
    debug_log!(self.debug, cache = %self.name, count, "evicted all span indexes");
    count
  }
}

/// The engine shared by both range flavours.
struct SpanCache<P, K, T, V> {
  shared: Arc<RangeShared<P, K, T, V>>,
}

impl<P, K, T, V> Clone for SpanCache<P, K, T, V> {
  fn clone(&self) -> Self {
    Self {
      shared: Arc::clone(&self.shared),
    }
  }
}

impl<P, K, T, V> fmt::Debug for SpanCache<P, K, T, V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SpanCache")
      .field("name", &self.shared.name)
      .field("mode", &self.shared.mode)
      .field("metrics", &self.shared.metrics.snapshot())
      .finish()
  }
}

/// A cache over closed ranges `[start, end]` of points.
///
/// Loading `[0, 10]` and then asking for `[3, 7]` calls the loader zero
/// times; asking for `[3, 7]` first and `[0, 10]` second calls it once,
/// for the gaps `[0, 3)` and `(7, 10]`.
pub struct RangeCache<P, K, T, V> {
  core: SpanCache<P, K, T, V>,
}

/// A cache over intervals, whose ends may be open or unbounded.
///
/// Gaps are computed by interval subtraction and share their edge points
/// with loaded intervals: with `[3, 7]` loaded, `[0, 10]` is missing
/// `[0, 3]` and `[7, 10]`.
pub struct IntervalCache<P, K, T, V> {
  core: SpanCache<P, K, T, V>,
}

macro_rules! span_cache_handle {
  ($handle:ident) => {
    impl<P, K, T, V> Clone for $handle<P, K, T, V> {
      fn clone(&self) -> Self {
        Self {
          core: self.core.clone(),
        }
      }
    }

    impl<P, K, T, V> fmt::Debug for $handle<P, K, T, V> {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(stringify!($handle)).field("core", &self.core).finish()
      }
    }

    impl<P, K, T, V> $handle<P, K, T, V>
    where
      P: Clone + Send + 'static,
      K: Eq + Hash + Clone + Send + Sync + 'static,
      T: Clone + Send + Sync + 'static,
      V: Send + Sync + 'static,
    {
      /// The spans loaded so far for `params`' key, sorted and coalesced.
      pub fn loaded_spans(&self, params: &P) -> Vec<Span<T>> {
        self.core.shared.loaded_spans(params)
      }

      /// Forgets everything loaded for `params`' key and aborts its loads.
      /// Queries waiting on them reject with [`CacheError::Aborted`].
      pub fn invalidate(&self, params: &P) -> bool {
        self.core.shared.invalidate(params)
      }

      /// Forgets every key. Returns how many were dropped.
      pub fn evict_all(&self) -> usize {
        self.core.shared.evict_all()
      }

      /// Number of keys with a span index in the store.
      pub fn len(&self) -> usize {
        self.core.shared.len()
      }

      pub fn is_empty(&self) -> bool {
        self.len() == 0
      }

      pub fn metrics(&self) -> MetricsSnapshot {
        self.core.shared.metrics.snapshot()
      }
    }
  };
}

span_cache_handle!(RangeCache);
span_cache_handle!(IntervalCache);

impl<P, K, T, V> RangeCache<P, K, T, V>
where
  P: Clone + Send + 'static,
  K: Eq + Hash + Clone + Send + Sync + 'static,
  T: Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
{
  /// Reads the values in `[start, end]`, loading whatever is missing.
  ///
  /// Pending while any gap the range depends on is still loading.
  pub fn get(&self, start: T, end: T, params: &P) -> Suspend<RangeValues<V>> {
    RangeShared::lookup(&self.core.shared, Span::closed(start, end), params)
  }

  pub fn get_async(&self, start: T, end: T, params: &P) -> Wakeable<RangeValues<V>> {
    self.get(start, end, params).into_wakeable()
  }

  pub async fn fetch(&self, start: T, end: T, params: &P) -> Result<RangeValues<V>, CacheError> {
    self.get_async(start, end, params).await
  }

  /// Returns the values in `[start, end]` only if all of it is loaded.
  pub fn peek(&self, start: T, end: T, params: &P) -> Option<RangeValues<V>> {
    self.core.shared.peek(&Span::closed(start, end), params)
  }
}

impl<P, K, T, V> IntervalCache<P, K, T, V>
where
  P: Clone + Send + 'static,
  K: Eq + Hash + Clone + Send + Sync + 'static,
  T: Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
{
  /// Reads the values in `interval`, loading whatever is missing.
  pub fn get(&self, interval: Span<T>, params: &P) -> Suspend<RangeValues<V>> {
    RangeShared::lookup(&self.core.shared, interval, params)
  }

  /// Shorthand for `get` with explicit bounds.
  pub fn get_bounds(&self, start: Bound<T>, end: Bound<T>, params: &P) -> Suspend<RangeValues<V>> {
    self.get(Span::new(start, end), params)
  }

  pub fn get_async(&self, interval: Span<T>, params: &P) -> Wakeable<RangeValues<V>> {
    self.get(interval, params).into_wakeable()
  }

  pub async fn fetch(&self, interval: Span<T>, params: &P) -> Result<RangeValues<V>, CacheError> {
    self.get_async(interval, params).await
  }

  pub fn peek(&self, interval: &Span<T>, params: &P) -> Option<RangeValues<V>> {
    self.core.shared.peek(interval, params)
  }
}
