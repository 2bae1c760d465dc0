pub mod external;
pub mod single;

use crate::error::CacheError;
use crate::logging::debug_log;
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::record::{Record, RecordStatus};
use crate::shared::CacheShared;
use crate::subscription::Subscription;
use crate::wakeable::{Suspend, Wakeable};

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

/// A keyed cache of asynchronously loaded values.
///
/// Requests are described by a parameter value `P`, projected to a key `K`
/// by the cache's key function. For any key at most one load is in flight
/// at a time; every caller asking for a pending key shares its future.
///
/// Handles are cheap to clone. Dropping the last one aborts every load
/// still in flight.
pub struct Cache<P, K, V> {
  pub(crate) shared: Arc<CacheShared<P, K, V>>,
}

impl<P, K, V> Clone for Cache<P, K, V> {
  fn clone(&self) -> Self {
    Self {
      shared: Arc::clone(&self.shared),
    }
  }
}

impl<P, K, V> fmt::Debug for Cache<P, K, V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Cache").field("shared", &self.shared).finish()
  }
}

impl<P, K, V> Cache<P, K, V>
where
  P: Clone + Send + 'static,
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
{
  /// Reads a value without blocking.
  ///
  /// If the key has no record, one is created and its load started. A
  /// pending record yields `Suspend::Pending` with the shared future, a
  /// resolved one the value, a rejected one its stored error.
  pub fn get(&self, params: &P) -> Suspend<Arc<V>> {
    CacheShared::record_for(&self.shared, params).read()
  }

  /// Like [`get`](Self::get), but always returns the future, settled or not.
  pub fn get_async(&self, params: &P) -> Wakeable<Arc<V>> {
    CacheShared::record_for(&self.shared, params).wakeable()
  }

  /// Loads (or reuses) the value for `params` and waits for it.
  pub async fn fetch(&self, params: &P) -> Result<Arc<V>, CacheError> {
    self.get_async(params).await
  }

  /// Returns the value if it is already resolved. Never starts a load.
  pub fn peek(&self, params: &P) -> Option<Arc<V>> {
    let key = self.shared.key_for(params);
    self.shared.with_store(|store| store.get(&key))?.value()
  }

  pub fn status(&self, params: &P) -> Option<RecordStatus> {
    self.shared.status_of(&self.shared.key_for(params))
  }

  /// Returns the record for `params` if one exists.
  pub fn record(&self, params: &P) -> Option<Record<V>> {
    let key = self.shared.key_for(params);
    self.shared.with_store(|store| store.get(&key))
  }

  /// Stores an already-known value without running the loader.
  ///
  /// A pending record is resolved in place, so callers already waiting on
  /// it receive `value`; its loader is told to stop.
  pub fn cache(&self, value: V, params: &P) {
    self.seed(Ok(Arc::new(value)), params);
  }

  pub(crate) fn seed(&self, outcome: Result<Arc<V>, CacheError>, params: &P) {
    let key = self.shared.key_for(params);
    let status = match outcome {
      Ok(_) => RecordStatus::Resolved,
      Err(_) => RecordStatus::Rejected,
    };

    let in_flight = self.shared.with_store(|store| match store.get(&key) {
      Some(record) if record.is_pending() => {
        let settled = match outcome {
          Ok(value) => record.resolve(value),
          Err(error) => record.reject(error),
        };
        settled.ok().map(|()| record)
      }
      _ => {
        let record = match outcome {
          Ok(value) => Record::resolved(value),
          Err(error) => Record::rejected(error),
        };
        store.set(key.clone(), record);
        None
      }
    });

    if let Some(record) = in_flight {
      // Fires the signal only; the record is already settled.
      record.abort();
    }
    debug_log!(self.shared.debug, cache = %self.shared.name, %status, "seeded entry");
    self.shared.subscribers.notify(&key, Some(status));
  }

  /// Removes the record for `params`, aborting its load if still pending.
  ///
  /// The next `get` starts a fresh load. Returns `false` if there was
  /// nothing to remove. Never reported to the eviction listener.
  pub fn invalidate(&self, params: &P) -> bool {
    let key = self.shared.key_for(params);
    match self.shared.remove(&key) {
      Some(_) => {
        Metrics::bump(&self.shared.metrics.invalidations);
        true
      }
      None => false,
    }
  }

  /// Cancels a pending load: its future rejects with
  /// [`CacheError::Aborted`] and the record is removed, so the next `get`
  /// starts over. Returns `false` if nothing was pending.
  pub fn abort(&self, params: &P) -> bool {
    let key = self.shared.key_for(params);
    let removed = self.shared.with_store(|store| match store.get(&key) {
      Some(record) if record.is_pending() => store.delete(&key),
      _ => None,
    });
    let Some(record) = removed else {
      return false;
    };

    let aborted = record.abort();
    if aborted {
      Metrics::bump(&self.shared.metrics.aborts);
      debug_log!(self.shared.debug, cache = %self.shared.name, "load aborted");
    }
    self.shared.subscribers.notify(&key, None);
    aborted
  }

  /// Recomputes the value for `params` while keeping the key present.
  ///
  /// A settled record moves back to pending with a fresh future and the
  /// loader runs again; subscribers see the pending transition first. If a
  /// load is already in flight its future is returned instead of starting
  /// another. A missing key is loaded as by `get_async`.
  pub fn refresh(&self, params: &P) -> Result<Wakeable<Arc<V>>, CacheError> {
    if self.shared.immutable {
      return Err(CacheError::Immutable);
    }
    let key = self.shared.key_for(params);
    let (wakeable, started) = self.shared.with_store(|store| {
      let record = match store.get(&key) {
        Some(record) if record.is_pending() => return (record.wakeable(), None),
        Some(record) => {
          record.update_to_pending();
          record
        }
        None => Record::pending(),
      };
      store.set(key.clone(), record.clone());
      let (wakeable, signal) = record.current();
      (wakeable.clone(), Some((wakeable, signal)))
    });

    if let Some((wakeable, signal)) = started {
      Metrics::bump(&self.shared.metrics.refreshes);
      self.shared.subscribers.notify(&key, Some(RecordStatus::Pending));
      CacheShared::spawn_loader_task(&self.shared, key, params.clone(), wakeable, signal);
    }
    Ok(wakeable)
  }

  /// Removes every record, aborting loads in flight. Returns how many
  /// records were removed.
  pub fn evict_all(&self) -> usize {
    let drained = self.shared.with_store(|store| store.drain());
    let count = drained.len();
    for (key, record) in drained {
      if record.abort() {
        Metrics::bump(&self.shared.metrics.aborts);
      }
      Metrics::bump(&self.shared.metrics.invalidations);
      self.shared.subscribers.notify(&key, None);
    }
    debug_log!(self.shared.debug, cache = %self.shared.name, count, "evicted all entries");
    count
  }

  /// Asks the store to drop entries it has lost track of (collected weak
  /// values). Returns how many were evicted.
  pub fn sweep(&self) -> usize {
    self.shared.with_store(|store| store.sweep())
  }

  /// Number of records currently held, including ones a weak store has not
  /// yet noticed were collected.
  pub fn len(&self) -> usize {
    self.shared.with_store(|store| store.len())
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Registers `callback` for status changes of `params`' key.
  ///
  /// The callback is invoked right away with the current status, then on
  /// every transition until the returned `Subscription` is dropped.
  pub fn subscribe<F>(&self, params: &P, callback: F) -> Subscription
  where
    F: Fn(Option<RecordStatus>) + Send + Sync + 'static,
  {
    let key = self.shared.key_for(params);
    let callback = Arc::new(callback);
    let id = self.shared.subscribers.add(key.clone(), callback.clone());
    callback(self.shared.status_of(&key));

    let weak = Arc::downgrade(&self.shared);
    Subscription::new(move || {
      if let Some(shared) = weak.upgrade() {
        shared.subscribers.remove(&key, id);
      }
    })
  }

  pub fn is_immutable(&self) -> bool {
    self.shared.immutable
  }

  pub fn metrics(&self) -> MetricsSnapshot {
    self.shared.metrics.snapshot()
  }
}
