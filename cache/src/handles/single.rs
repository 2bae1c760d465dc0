use crate::abort::AbortSignal;
use crate::builder::CacheBuilder;
use crate::error::CacheError;
use crate::handles::Cache;
use crate::metrics::MetricsSnapshot;
use crate::record::RecordStatus;
use crate::subscription::Subscription;
use crate::wakeable::{Suspend, Wakeable};

use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// A cache holding one lazily loaded value, such as a configuration blob
/// or the current user.
///
/// It behaves like a [`Cache`] whose only key is `()`.
pub struct SingleEntryCache<V> {
  cache: Cache<(), (), V>,
}

impl<V> Clone for SingleEntryCache<V> {
  fn clone(&self) -> Self {
    Self {
      cache: self.cache.clone(),
    }
  }
}

impl<V> fmt::Debug for SingleEntryCache<V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SingleEntryCache")
      .field("cache", &self.cache)
      .finish()
  }
}

impl<V> SingleEntryCache<V>
where
  V: Send + Sync + 'static,
{
  /// Starts a builder around an asynchronous loader. Finish it with
  /// [`CacheBuilder::build_single_entry`].
  pub fn builder<F, Fut, E>(loader: F) -> CacheBuilder<(), (), V>
  where
    F: Fn(AbortSignal) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<V, E>> + Send + 'static,
    E: Into<Box<dyn StdError + Send + Sync>>,
  {
    CacheBuilder::new(move |(), signal| loader(signal))
  }

  /// Starts a builder around a blocking loader.
  pub fn sync_builder<F, E>(loader: F) -> CacheBuilder<(), (), V>
  where
    F: Fn(AbortSignal) -> Result<V, E> + Send + Sync + 'static,
    E: Into<Box<dyn StdError + Send + Sync>>,
  {
    CacheBuilder::with_sync_loader(move |(), signal| loader(signal))
  }

  pub(crate) fn from_cache(cache: Cache<(), (), V>) -> Self {
    Self { cache }
  }

  pub fn get(&self) -> Suspend<Arc<V>> {
    self.cache.get(&())
  }

  pub fn get_async(&self) -> Wakeable<Arc<V>> {
    self.cache.get_async(&())
  }

  pub async fn fetch(&self) -> Result<Arc<V>, CacheError> {
    self.cache.fetch(&()).await
  }

  pub fn peek(&self) -> Option<Arc<V>> {
    self.cache.peek(&())
  }

  pub fn status(&self) -> Option<RecordStatus> {
    self.cache.status(&())
  }

  pub fn cache(&self, value: V) {
    self.cache.cache(value, &())
  }

  pub fn invalidate(&self) -> bool {
    self.cache.invalidate(&())
  }

  pub fn abort(&self) -> bool {
    self.cache.abort(&())
  }

  pub fn refresh(&self) -> Result<Wakeable<Arc<V>>, CacheError> {
    self.cache.refresh(&())
  }

  pub fn subscribe<F>(&self, callback: F) -> Subscription
  where
    F: Fn(Option<RecordStatus>) + Send + Sync + 'static,
  {
    self.cache.subscribe(&(), callback)
  }

  pub fn metrics(&self) -> MetricsSnapshot {
    self.cache.metrics()
  }

  /// The underlying keyed cache.
  pub fn as_cache(&self) -> &Cache<(), (), V> {
    &self.cache
  }
}
