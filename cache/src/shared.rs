use crate::abort::AbortSignal;
use crate::error::CacheError;
use crate::loader::Loader;
use crate::logging::{debug_log, DebugLogging};
use crate::metrics::Metrics;
use crate::record::{Record, RecordStatus};
use crate::store::EvictionStore;
use crate::subscription::Subscribers;
use crate::wakeable::Wakeable;
use crate::TaskSpawner;

use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

pub(crate) type KeyFn<P, K> = Arc<dyn Fn(&P) -> K + Send + Sync>;

/// The internal, thread-safe core of a cache.
pub(crate) struct CacheShared<P, K, V> {
  pub(crate) name: String,
  pub(crate) store: Mutex<Box<dyn EvictionStore<K, V>>>,
  /// Keys the store evicted while its lock was held; drained and announced
  /// to subscribers once the lock is released.
  pub(crate) evicted: Arc<Mutex<Vec<K>>>,
  pub(crate) key_fn: KeyFn<P, K>,
  pub(crate) loader: Option<Loader<P, V>>,
  pub(crate) spawner: Option<Arc<dyn TaskSpawner>>,
  pub(crate) subscribers: Subscribers<K>,
  pub(crate) metrics: Arc<Metrics>,
  pub(crate) immutable: bool,
  pub(crate) debug: DebugLogging,
}

impl<P, K, V> fmt::Debug for CacheShared<P, K, V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CacheShared")
      .field("name", &self.name)
      .field("immutable", &self.immutable)
      .field("metrics", &self.metrics.snapshot())
      .finish_non_exhaustive()
  }
}

impl<P, K, V> Drop for CacheShared<P, K, V> {
  fn drop(&mut self) {
    let mut aborted = 0;
    for (_, record) in self.store.get_mut().drain() {
      if record.abort() {
        aborted += 1;
      }
    }
    if aborted > 0 {
      debug_log!(self.debug, cache = %self.name, aborted, "cache dropped with loads in flight");
    }
  }
}

impl<P, K, V> CacheShared<P, K, V>
where
  P: Send + 'static,
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
{
  pub(crate) fn key_for(&self, params: &P) -> K {
    (self.key_fn)(params)
  }

  /// Runs `f` with the store locked, then announces any evictions it caused.
  pub(crate) fn with_store<R>(
    &self,
    f: impl FnOnce(&mut Box<dyn EvictionStore<K, V>>) -> R,
  ) -> R {
    let result = {
      let mut store = self.store.lock();
      f(&mut store)
    };
    self.flush_evictions();
    result
  }

  fn flush_evictions(&self) {
    let evicted = std::mem::take(&mut *self.evicted.lock());
    for key in evicted {
      self.subscribers.notify(&key, None);
    }
  }

  pub(crate) fn status_of(&self, key: &K) -> Option<RecordStatus> {
    self.with_store(|store| store.get(key)).map(|record| record.status())
  }

  /// Starts a load for one record generation.
  ///
  /// The task keeps only a weak reference to the cache so that dropping the
  /// last handle can abort it.
  pub(crate) fn spawn_loader_task(
    shared: &Arc<Self>,
    key: K,
    params: P,
    wakeable: Wakeable<Arc<V>>,
    signal: AbortSignal,
  ) {
    let Some(loader) = &shared.loader else {
      return;
    };
    Metrics::bump(&shared.metrics.loads_started);
    debug_log!(shared.debug, cache = %shared.name, "starting load");

    let weak = Arc::downgrade(shared);
    loader.spawn(params, signal, shared.spawner.as_ref(), move |outcome| {
      Self::complete_load(&weak, key, &wakeable, outcome);
    });
  }

  /// Settles the generation a loader ran for and tells subscribers.
  ///
  /// A generation that was already settled (aborted, refreshed or seeded in
  /// the meantime) keeps its outcome and the late result is dropped.
  fn complete_load(
    weak: &Weak<Self>,
    key: K,
    wakeable: &Wakeable<Arc<V>>,
    outcome: Result<V, CacheError>,
  ) {
    let failed = outcome.is_err();
    let settled = match outcome {
      Ok(value) => wakeable.resolve(Arc::new(value)),
      Err(error) => wakeable.reject(error),
    };

    let Some(shared) = weak.upgrade() else {
      return;
    };
    match settled {
      Ok(()) => {
        let status = if failed {
          Metrics::bump(&shared.metrics.loads_failed);
          RecordStatus::Rejected
        } else {
          RecordStatus::Resolved
        };
        debug_log!(shared.debug, cache = %shared.name, %status, "load settled");
        shared.subscribers.notify(&key, Some(status));
      }
      Err(error) => {
        debug_log!(shared.debug, cache = %shared.name, %error, "discarding late load result");
      }
    }
  }

  /// Fetches the record for `key`, creating it and starting its load if
  /// the key is absent. Store lookup and insertion happen under one lock,
  /// so at most one load per key is ever started.
  pub(crate) fn record_for(shared: &Arc<Self>, params: &P) -> Record<V>
  where
    P: Clone,
  {
    let key = shared.key_for(params);
    let (record, started) = shared.with_store(|store| match store.get(&key) {
      Some(record) => {
        Metrics::bump(&shared.metrics.hits);
        (record, None)
      }
      None => {
        Metrics::bump(&shared.metrics.misses);
        let record = Record::pending();
        store.set(key.clone(), record.clone());
        let current = record.current();
        (record, Some(current))
      }
    });

    if let Some((wakeable, signal)) = started {
      shared.subscribers.notify(&key, Some(RecordStatus::Pending));
      Self::spawn_loader_task(shared, key, params.clone(), wakeable, signal);
    }
    record
  }

  /// Removes `key`, aborting its load if one is in flight.
  pub(crate) fn remove(&self, key: &K) -> Option<Record<V>> {
    let record = self.with_store(|store| store.delete(key))?;
    if record.abort() {
      Metrics::bump(&self.metrics.aborts);
      debug_log!(self.debug, cache = %self.name, "aborted in-flight load on removal");
    }
    self.subscribers.notify(key, None);
    Some(record)
  }
}
