use crate::record::RecordStatus;

use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ahash::{HashMap, HashMapExt};
use parking_lot::Mutex;

/// Receives a key's status on every transition; `None` means the key has no
/// record (never loaded, invalidated or evicted).
pub(crate) type StatusCallback = Arc<dyn Fn(Option<RecordStatus>) + Send + Sync>;

/// Per-key status listeners.
pub(crate) struct Subscribers<K> {
  next_id: AtomicU64,
  listeners: Mutex<HashMap<K, Vec<(u64, StatusCallback)>>>,
}

impl<K: Eq + Hash + Clone> Subscribers<K> {
  pub(crate) fn new() -> Self {
    Self {
      next_id: AtomicU64::new(0),
      listeners: Mutex::new(HashMap::new()),
    }
  }

  pub(crate) fn add(&self, key: K, callback: StatusCallback) -> u64 {
    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
    self.listeners.lock().entry(key).or_default().push((id, callback));
    id
  }

  pub(crate) fn remove(&self, key: &K, id: u64) {
    let mut listeners = self.listeners.lock();
    if let Some(list) = listeners.get_mut(key) {
      list.retain(|(existing, _)| *existing != id);
      if list.is_empty() {
        listeners.remove(key);
      }
    }
  }

  /// Invokes every listener for `key`, outside the registry lock.
  pub(crate) fn notify(&self, key: &K, status: Option<RecordStatus>) {
    let callbacks: Vec<StatusCallback> = match self.listeners.lock().get(key) {
      Some(list) => list.iter().map(|(_, cb)| cb.clone()).collect(),
      None => return,
    };
    for callback in callbacks {
      callback(status);
    }
  }
}

/// Keeps a status listener registered. Dropping it unsubscribes.
pub struct Subscription {
  cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
  pub(crate) fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
    Self {
      cancel: Some(Box::new(cancel)),
    }
  }

  pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
  fn drop(&mut self) {
    if let Some(cancel) = self.cancel.take() {
      cancel();
    }
  }
}

impl fmt::Debug for Subscription {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Subscription")
      .field("active", &self.cancel.is_some())
      .finish()
  }
}
