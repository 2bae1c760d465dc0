use crate::abort::{AbortController, AbortSignal};
use crate::error::CacheError;
use crate::wakeable::{Suspend, Wakeable};

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// The load status of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordStatus {
  Pending,
  Resolved,
  Rejected,
}

impl fmt::Display for RecordStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RecordStatus::Pending => write!(f, "pending"),
      RecordStatus::Resolved => write!(f, "resolved"),
      RecordStatus::Rejected => write!(f, "rejected"),
    }
  }
}

/// One load attempt: the future its waiters share and the handle that
/// cancels it.
struct Generation<V> {
  id: u64,
  wakeable: Wakeable<Arc<V>>,
  abort: AbortController,
}

impl<V> Generation<V> {
  fn new(id: u64, wakeable: Wakeable<Arc<V>>) -> Self {
    Self {
      id,
      wakeable,
      abort: AbortController::new(),
    }
  }
}

/// The unit of truth stored per cache key.
///
/// A record's status is whatever its current future reports. Refreshing a
/// record swaps in a new generation (new future, new abort handle) while the
/// record keeps its place in the store; holders detect the change through
/// [`generation`](Record::generation) or by comparing futures with
/// [`Wakeable::ptr_eq`].
pub struct Record<V> {
  inner: Arc<Mutex<Generation<V>>>,
}

impl<V> Clone for Record<V> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

impl<V> fmt::Debug for Record<V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let generation = self.inner.lock();
    f.debug_struct("Record")
      .field("generation", &generation.id)
      .field("status", &generation.wakeable.status())
      .finish()
  }
}

/// A non-owning handle to a [`Record`].
pub(crate) struct WeakRecord<V> {
  inner: Weak<Mutex<Generation<V>>>,
}

impl<V> WeakRecord<V> {
  /// The record itself, if anyone still holds it.
  pub(crate) fn upgrade(&self) -> Option<Record<V>> {
    self.inner.upgrade().map(|inner| Record { inner })
  }
}

impl<V> Record<V> {
  fn from_wakeable(wakeable: Wakeable<Arc<V>>) -> Self {
    Self::at_generation(0, wakeable)
  }

  fn at_generation(id: u64, wakeable: Wakeable<Arc<V>>) -> Self {
    Self {
      inner: Arc::new(Mutex::new(Generation::new(id, wakeable))),
    }
  }

  /// Rebuilds a resolved record whose wrapper was dropped, keeping the
  /// generation it had reached.
  pub(crate) fn resolved_at(generation: u64, value: Arc<V>) -> Self {
    Self::at_generation(generation, Wakeable::resolved(value))
  }

  pub(crate) fn downgrade(&self) -> WeakRecord<V> {
    WeakRecord {
      inner: Arc::downgrade(&self.inner),
    }
  }

  /// Creates a record whose load has not settled yet.
  pub fn pending() -> Self {
    Self::from_wakeable(Wakeable::new())
  }

  pub fn resolved(value: Arc<V>) -> Self {
    Self::from_wakeable(Wakeable::resolved(value))
  }

  pub fn rejected(error: CacheError) -> Self {
    Self::from_wakeable(Wakeable::rejected(error))
  }

  pub fn status(&self) -> RecordStatus {
    self.inner.lock().wakeable.status()
  }

  /// Starts at zero and increases by one on every refresh.
  pub fn generation(&self) -> u64 {
    self.inner.lock().id
  }

  /// The future of the current generation.
  pub fn wakeable(&self) -> Wakeable<Arc<V>> {
    self.inner.lock().wakeable.clone()
  }

  pub fn abort_signal(&self) -> AbortSignal {
    self.inner.lock().abort.signal()
  }

  /// The future and abort signal of the current generation, read together.
  pub(crate) fn current(&self) -> (Wakeable<Arc<V>>, AbortSignal) {
    let generation = self.inner.lock();
    (generation.wakeable.clone(), generation.abort.signal())
  }

  pub fn ptr_eq(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.inner, &other.inner)
  }

  pub fn read(&self) -> Suspend<Arc<V>> {
    self.wakeable().read()
  }

  pub fn value(&self) -> Option<Arc<V>> {
    self.wakeable().value()
  }

  pub fn resolve(&self, value: Arc<V>) -> Result<(), CacheError> {
    self.wakeable().resolve(value)
  }

  pub fn reject(&self, error: CacheError) -> Result<(), CacheError> {
    self.wakeable().reject(error)
  }

  /// Fires the current generation's abort signal and, if it was still
  /// pending, rejects it with [`CacheError::Aborted`].
  ///
  /// Returns `true` if a pending load was cancelled.
  pub fn abort(&self) -> bool {
    let (wakeable, abort) = {
      let generation = self.inner.lock();
      (generation.wakeable.clone(), generation.abort.clone())
    };
    abort.abort();
    wakeable.reject(CacheError::Aborted).is_ok()
  }

  /// Moves the record back to pending with a fresh future and abort handle.
  ///
  /// A still-pending previous generation is aborted so its waiters are not
  /// left hanging. Returns the new generation's future.
  pub fn update_to_pending(&self) -> Wakeable<Arc<V>> {
    let previous = {
      let mut generation = self.inner.lock();
      let next = Generation::new(generation.id + 1, Wakeable::new());
      std::mem::replace(&mut *generation, next)
    };
    previous.abort.abort();
    let _ = previous.wakeable.reject(CacheError::Aborted);
    self.wakeable()
  }

  pub fn is_pending(&self) -> bool {
    self.status() == RecordStatus::Pending
  }

  pub fn is_resolved(&self) -> bool {
    self.status() == RecordStatus::Resolved
  }

  pub fn is_rejected(&self) -> bool {
    self.status() == RecordStatus::Rejected
  }

  fn expect_status(&self, expected: RecordStatus) -> Result<Wakeable<Arc<V>>, CacheError> {
    let wakeable = self.wakeable();
    let actual = wakeable.status();
    if actual == expected {
      Ok(wakeable)
    } else {
      Err(CacheError::StatusMismatch { expected, actual })
    }
  }

  /// Returns the pending future, or a `StatusMismatch` error.
  pub fn assert_pending(&self) -> Result<Wakeable<Arc<V>>, CacheError> {
    self.expect_status(RecordStatus::Pending)
  }

  /// Returns the resolved value, or a `StatusMismatch` error.
  pub fn assert_resolved(&self) -> Result<Arc<V>, CacheError> {
    let wakeable = self.expect_status(RecordStatus::Resolved)?;
    wakeable.value().ok_or(CacheError::StatusMismatch {
      expected: RecordStatus::Resolved,
      actual: wakeable.status(),
    })
  }

  /// Returns the stored error, or a `StatusMismatch` error.
  pub fn assert_rejected(&self) -> Result<CacheError, CacheError> {
    let wakeable = self.expect_status(RecordStatus::Rejected)?;
    wakeable.error().ok_or(CacheError::StatusMismatch {
      expected: RecordStatus::Rejected,
      actual: wakeable.status(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn pending_record_settles_once() {
    let record = Record::<u32>::pending();
    assert!(record.is_pending());

    record.resolve(Arc::new(5)).unwrap();
    assert!(record.is_resolved());
    assert_eq!(*record.assert_resolved().unwrap(), 5);
    assert!(record.reject(CacheError::Aborted).is_err());
  }

  #[test]
  fn assertions_name_the_actual_status() {
    let record = Record::<u32>::rejected(CacheError::load("nope"));
    match record.assert_resolved() {
      Err(CacheError::StatusMismatch { expected, actual }) => {
        assert_eq!(expected, RecordStatus::Resolved);
        assert_eq!(actual, RecordStatus::Rejected);
      }
      other => panic!("unexpected {other:?}"),
    }
    assert!(record.assert_rejected().is_ok());
    assert!(record.assert_pending().is_err());
  }

  #[test]
  fn refresh_swaps_future_and_keeps_identity() {
    let record = Record::resolved(Arc::new("old"));
    let holder = record.clone();
    let old_future = record.wakeable();

    let fresh = record.update_to_pending();

    assert!(holder.ptr_eq(&record));
    assert!(holder.is_pending());
    assert_eq!(holder.generation(), 1);
    assert!(!old_future.ptr_eq(&fresh));
    assert!(fresh.ptr_eq(&holder.wakeable()));
    assert_eq!(*old_future.value().unwrap(), "old");
  }

  #[test]
  fn refreshing_a_pending_record_aborts_the_old_generation() {
    let record = Record::<u8>::pending();
    let (old_future, old_signal) = record.current();

    record.update_to_pending();

    assert!(old_signal.is_aborted());
    assert!(old_future.error().unwrap().is_aborted());
    assert!(record.is_pending());
    assert!(!record.abort_signal().is_aborted());
  }

  #[test]
  fn weak_handle_returns_the_same_record() {
    let record = Record::resolved(Arc::new(3u8));
    record.update_to_pending();
    let weak = record.downgrade();

    assert!(weak.upgrade().unwrap().ptr_eq(&record));
    drop(record);
    assert!(weak.upgrade().is_none());

    let rebuilt = Record::resolved_at(4, Arc::new(3u8));
    assert_eq!(rebuilt.generation(), 4);
    assert!(rebuilt.is_resolved());
  }

  #[test]
  fn abort_rejects_pending_only() {
    let record = Record::<u8>::pending();
    assert!(record.abort());
    assert!(record.assert_rejected().unwrap().is_aborted());

    let done = Record::resolved(Arc::new(1u8));
    assert!(!done.abort());
    assert!(done.is_resolved());
  }
}
