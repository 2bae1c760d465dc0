use crate::builder::CacheBuilder;
use crate::error::CacheError;
use crate::handles::Cache;
use crate::metrics::MetricsSnapshot;
use crate::record::RecordStatus;
use crate::subscription::Subscription;
use crate::wakeable::{Suspend, Wakeable};

use std::error::Error as StdError;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

/// A cache with no loader: every value comes from the caller.
///
/// Reading a key nobody has supplied yet creates a pending record, and the
/// reader waits on it until [`cache_value`](Self::cache_value) or
/// [`cache_error`](Self::cache_error) settles it. This fits data pushed in
/// from elsewhere, like a socket or a parent component.
pub struct ExternallyManagedCache<P, K, V> {
  cache: Cache<P, K, V>,
}

impl<P, K, V> Clone for ExternallyManagedCache<P, K, V> {
  fn clone(&self) -> Self {
    Self {
      cache: self.cache.clone(),
    }
  }
}

impl<P, K, V> fmt::Debug for ExternallyManagedCache<P, K, V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ExternallyManagedCache")
      .field("cache", &self.cache)
      .finish()
  }
}

impl<P, V> ExternallyManagedCache<P, P, V>
where
  P: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
{
  /// Starts a builder whose parameters are the keys.
  pub fn builder() -> CacheBuilder<P, P, V> {
    CacheBuilder::externally_managed()
  }
}

impl<P, K, V> ExternallyManagedCache<P, K, V>
where
  P: Clone + Send + 'static,
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
{
  pub(crate) fn from_cache(cache: Cache<P, K, V>) -> Self {
    Self { cache }
  }

  /// Reads a value, suspending on a pending record until one is supplied.
  pub fn get(&self, params: &P) -> Suspend<Arc<V>> {
    self.cache.get(params)
  }

  pub fn get_async(&self, params: &P) -> Wakeable<Arc<V>> {
    self.cache.get_async(params)
  }

  pub async fn fetch(&self, params: &P) -> Result<Arc<V>, CacheError> {
    self.cache.fetch(params).await
  }

  pub fn peek(&self, params: &P) -> Option<Arc<V>> {
    self.cache.peek(params)
  }

  pub fn status(&self, params: &P) -> Option<RecordStatus> {
    self.cache.status(params)
  }

  /// Supplies the value for `params`, waking anyone waiting on it.
  pub fn cache_value(&self, value: V, params: &P) {
    self.cache.cache(value, params)
  }

  /// Supplies a failure for `params`; waiters receive it as
  /// [`CacheError::Load`].
  pub fn cache_error<E>(&self, error: E, params: &P)
  where
    E: Into<Box<dyn StdError + Send + Sync>>,
  {
    self.cache.seed(Err(CacheError::load(error)), params)
  }

  /// Drops the entry. Waiters on a pending record are rejected with
  /// [`CacheError::Aborted`].
  pub fn invalidate(&self, params: &P) -> bool {
    self.cache.invalidate(params)
  }

  pub fn evict_all(&self) -> usize {
    self.cache.evict_all()
  }

  pub fn len(&self) -> usize {
    self.cache.len()
  }

  pub fn is_empty(&self) -> bool {
    self.cache.is_empty()
  }

  pub fn subscribe<F>(&self, params: &P, callback: F) -> Subscription
  where
    F: Fn(Option<RecordStatus>) + Send + Sync + 'static,
  {
    self.cache.subscribe(params, callback)
  }

  pub fn metrics(&self) -> MetricsSnapshot {
    self.cache.metrics()
  }
}
