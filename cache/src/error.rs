use crate::record::RecordStatus;

use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

/// Errors that can occur when building a cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
  /// A bounded store was requested with a capacity of zero. Leave the
  /// capacity unset for an unbounded cache.
  #[error("bounded cache capacity cannot be zero")]
  ZeroCapacity,
  /// A loader was provided, but no `TaskSpawner` was configured and no
  /// Tokio runtime was available to fall back on.
  #[error("a loader requires a task spawner or a running tokio runtime")]
  SpawnerRequired,
}

/// The error carried by a rejected record or future.
///
/// Cloning is cheap: loader errors are kept behind an `Arc` so the same
/// failure can be handed to every waiter and re-raised on every later read.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
  /// The load was cancelled through its abort signal before it settled.
  #[error("load was aborted")]
  Aborted,

  /// The loader itself failed.
  #[error("load failed: {0}")]
  Load(Arc<dyn StdError + Send + Sync>),

  /// `resolve` or `reject` was called on a future that had already settled.
  #[error("future is already {status}")]
  AlreadySettled { status: RecordStatus },

  /// A record assertion observed a different status than it expected.
  #[error("expected a {expected} record but found a {actual} one")]
  StatusMismatch {
    expected: RecordStatus,
    actual: RecordStatus,
  },

  /// A refresh was requested on a cache built as immutable.
  #[error("cache is immutable; entries cannot be refreshed")]
  Immutable,
}

impl CacheError {
  /// Wraps a loader failure.
  pub fn load<E>(error: E) -> Self
  where
    E: Into<Box<dyn StdError + Send + Sync>>,
  {
    CacheError::Load(Arc::from(error.into()))
  }

  pub fn is_aborted(&self) -> bool {
    matches!(self, CacheError::Aborted)
  }

  /// Returns `true` for errors that signal a usage bug rather than a runtime
  /// condition.
  pub fn is_misuse(&self) -> bool {
    matches!(
      self,
      CacheError::AlreadySettled { .. } | CacheError::StatusMismatch { .. } | CacheError::Immutable
    )
  }

  /// The error returned by the loader, if this is a load failure.
  pub fn load_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
    match self {
      CacheError::Load(inner) => Some(inner.as_ref()),
      _ => None,
    }
  }
}
