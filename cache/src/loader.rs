use crate::abort::AbortSignal;
use crate::error::CacheError;
use crate::TaskSpawner;

use std::error::Error as StdError;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::thread;

use futures_util::future::{self, Either};

pub(crate) type BoxLoadFuture<V> = Pin<Box<dyn Future<Output = Result<V, CacheError>> + Send>>;

/// Holds either a synchronous or an asynchronous loader function.
///
/// Both receive the request parameters by value plus the abort signal of
/// the record generation they are loading. Errors are normalized into
/// [`CacheError::Load`] at this boundary.
pub(crate) enum Loader<P, V> {
  Sync(Arc<dyn Fn(P, AbortSignal) -> Result<V, CacheError> + Send + Sync>),
  Async(Arc<dyn Fn(P, AbortSignal) -> BoxLoadFuture<V> + Send + Sync>),
}

impl<P, V> Clone for Loader<P, V> {
  fn clone(&self) -> Self {
    match self {
      Loader::Sync(f) => Loader::Sync(f.clone()),
      Loader::Async(f) => Loader::Async(f.clone()),
    }
  }
}

impl<P: 'static, V: 'static> Loader<P, V> {
  pub(crate) fn from_async<F, Fut, E>(f: F) -> Self
  where
    F: Fn(P, AbortSignal) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<V, E>> + Send + 'static,
    E: Into<Box<dyn StdError + Send + Sync>>,
  {
    let loader_fn = move |params: P, signal: AbortSignal| {
      let load = f(params, signal);
      Box::pin(async move { load.await.map_err(CacheError::load) }) as BoxLoadFuture<V>
    };
    Loader::Async(Arc::new(loader_fn))
  }

  pub(crate) fn from_sync<F, E>(f: F) -> Self
  where
    F: Fn(P, AbortSignal) -> Result<V, E> + Send + Sync + 'static,
    E: Into<Box<dyn StdError + Send + Sync>>,
  {
    Loader::Sync(Arc::new(move |params: P, signal: AbortSignal| {
      f(params, signal).map_err(CacheError::load)
    }))
  }

  pub(crate) fn is_async(&self) -> bool {
    matches!(self, Loader::Async(_))
  }
}

impl<P: Send + 'static, V: Send + 'static> Loader<P, V> {
  /// Runs one load off the caller's thread and hands the outcome to `done`.
  ///
  /// Blocking loaders get a thread of their own. Async loads go to `spawner`
  /// and race the abort signal; if it fires first the outcome is
  /// [`CacheError::Aborted`] and the loader future is dropped.
  pub(crate) fn spawn<F>(
    &self,
    params: P,
    signal: AbortSignal,
    spawner: Option<&Arc<dyn TaskSpawner>>,
    done: F,
  ) where
    F: FnOnce(Result<V, CacheError>) + Send + 'static,
  {
    match self {
      Loader::Sync(load) => {
        let load = Arc::clone(load);
        thread::spawn(move || {
          let outcome = if signal.is_aborted() {
            Err(CacheError::Aborted)
          } else {
            load(params, signal)
          };
          done(outcome);
        });
      }
      Loader::Async(load) => {
        let Some(spawner) = spawner else {
          // Builders refuse async loaders without a spawner.
          done(Err(CacheError::load("no task spawner configured")));
          return;
        };
        let load = load(params, signal.clone());
        let abort = Box::pin(async move { signal.aborted().await });
        spawner.spawn(Box::pin(async move {
          let outcome = match future::select(load, abort).await {
            Either::Left((outcome, _)) => outcome,
            Either::Right(((), _)) => Err(CacheError::Aborted),
          };
          done(outcome);
        }));
      }
    }
  }
}
