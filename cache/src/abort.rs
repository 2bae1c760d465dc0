use crate::wakeable::Wakeable;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct AbortInner {
  aborted: AtomicBool,
  notify: Wakeable<()>,
}

/// The read side of a cancellation handle, passed to every loader call.
///
/// Cancellation is cooperative: a loader should check [`is_aborted`] or race
/// its work against [`aborted`]. The cache rejects the load with
/// [`CacheError::Aborted`](crate::CacheError::Aborted) regardless of whether
/// the loader notices.
///
/// [`is_aborted`]: AbortSignal::is_aborted
/// [`aborted`]: AbortSignal::aborted
#[derive(Clone)]
pub struct AbortSignal {
  inner: Arc<AbortInner>,
}

impl fmt::Debug for AbortSignal {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("AbortSignal")
      .field("aborted", &self.is_aborted())
      .finish()
  }
}

impl AbortSignal {
  pub fn is_aborted(&self) -> bool {
    self.inner.aborted.load(Ordering::Acquire)
  }

  /// Completes once the signal fires. Never completes otherwise.
  pub async fn aborted(&self) {
    let _ = self.inner.notify.clone().await;
  }

  /// Runs `f` when the signal fires, or immediately if it already has.
  pub fn on_abort<F>(&self, f: F)
  where
    F: FnOnce() + Send + 'static,
  {
    self.inner.notify.then(move |()| f(), |_| {});
  }
}

/// The write side of a cancellation handle.
#[derive(Clone, Debug)]
pub struct AbortController {
  signal: AbortSignal,
}

impl Default for AbortController {
  fn default() -> Self {
    Self {
      signal: AbortSignal {
        inner: Arc::new(AbortInner {
          aborted: AtomicBool::new(false),
          notify: Wakeable::new(),
        }),
      },
    }
  }
}

impl AbortController {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn signal(&self) -> AbortSignal {
    self.signal.clone()
  }

  /// Fires the signal. Returns `false` if it had already fired.
  pub fn abort(&self) -> bool {
    if self.signal.inner.aborted.swap(true, Ordering::AcqRel) {
      return false;
    }
    let _ = self.signal.inner.notify.resolve(());
    true
  }

  pub fn is_aborted(&self) -> bool {
    self.signal.is_aborted()
  }
}
