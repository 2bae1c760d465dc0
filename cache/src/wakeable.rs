//! A settle-once future that can be consumed three ways: by registering
//! callbacks, by `.await`, or by reading its state synchronously through
//! [`Wakeable::read`], which hands back a [`Suspend`] instead of blocking.

use crate::error::CacheError;
use crate::record::RecordStatus;

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::thread::{self, Thread};

use parking_lot::Mutex;

/// Represents a party blocked on a `Wakeable`.
enum Waiter {
  Sync(Thread),
  Async(Waker),
}

impl Waiter {
  fn wake(self) {
    match self {
      Waiter::Sync(thread) => thread.unpark(),
      Waiter::Async(waker) => waker.wake(),
    }
  }
}

type Callback<T> = Box<dyn FnOnce(Result<T, CacheError>) + Send>;

enum State<T> {
  Pending {
    callbacks: Vec<Callback<T>>,
    waiters: VecDeque<Waiter>,
  },
  Resolved(T),
  Rejected(CacheError),
}

impl<T> State<T> {
  fn pending() -> Self {
    State::Pending {
      callbacks: Vec::new(),
      waiters: VecDeque::new(),
    }
  }

  fn status(&self) -> RecordStatus {
    match self {
      State::Pending { .. } => RecordStatus::Pending,
      State::Resolved(_) => RecordStatus::Resolved,
      State::Rejected(_) => RecordStatus::Rejected,
    }
  }
}

/// The synchronous view of a value that may not be ready yet.
///
/// `Pending` carries the future to wait on; every caller that observes the
/// same in-flight load receives a handle to the same `Wakeable`.
#[derive(Debug)]
pub enum Suspend<T> {
  Pending(Wakeable<T>),
  Ready(T),
  Failed(CacheError),
}

impl<T> Suspend<T> {
  pub fn is_pending(&self) -> bool {
    matches!(self, Suspend::Pending(_))
  }

  pub fn is_ready(&self) -> bool {
    matches!(self, Suspend::Ready(_))
  }

  /// Returns the value if ready.
  pub fn ready(self) -> Option<T> {
    match self {
      Suspend::Ready(value) => Some(value),
      _ => None,
    }
  }

  /// Converts into a settled result, or `None` while still pending.
  pub fn into_result(self) -> Option<Result<T, CacheError>> {
    match self {
      Suspend::Pending(_) => None,
      Suspend::Ready(value) => Some(Ok(value)),
      Suspend::Failed(error) => Some(Err(error)),
    }
  }

  /// The pending future, or an already-settled one holding the outcome.
  pub fn into_wakeable(self) -> Wakeable<T> {
    match self {
      Suspend::Pending(wakeable) => wakeable,
      Suspend::Ready(value) => Wakeable::resolved(value),
      Suspend::Failed(error) => Wakeable::rejected(error),
    }
  }
}

impl<T: Clone + Send + 'static> Suspend<T> {
  /// Resolves the suspension, awaiting the pending future if there is one.
  pub async fn resolve(self) -> Result<T, CacheError> {
    match self {
      Suspend::Pending(wakeable) => wakeable.await,
      Suspend::Ready(value) => Ok(value),
      Suspend::Failed(error) => Err(error),
    }
  }
}

/// A resolvable, rejectable future shared by every party interested in one
/// load.
///
/// Handles are cheap to clone; all clones observe the same single
/// settlement. Settling twice is reported as [`CacheError::AlreadySettled`]
/// and leaves the first outcome in place.
pub struct Wakeable<T> {
  inner: Arc<Mutex<State<T>>>,
}

/// Alias for callers that only settle and observe, never suspend.
pub type Deferred<T> = Wakeable<T>;

impl<T> Clone for Wakeable<T> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

impl<T> fmt::Debug for Wakeable<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Wakeable")
      .field("status", &self.inner.lock().status())
      .finish()
  }
}

impl<T> Default for Wakeable<T> {
  fn default() -> Self {
    Self {
      inner: Arc::new(Mutex::new(State::pending())),
    }
  }
}

impl<T> Wakeable<T> {
  /// Creates a new `Wakeable` in the pending state.
  pub fn new() -> Self {
    Self::default()
  }

  pub fn rejected(error: CacheError) -> Self {
    Self {
      inner: Arc::new(Mutex::new(State::Rejected(error))),
    }
  }

  pub fn resolved(value: T) -> Self {
    Self {
      inner: Arc::new(Mutex::new(State::Resolved(value))),
    }
  }

  pub fn status(&self) -> RecordStatus {
    self.inner.lock().status()
  }

  pub fn is_settled(&self) -> bool {
    self.status() != RecordStatus::Pending
  }

  /// Returns `true` if both handles point at the same future.
  pub fn ptr_eq(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.inner, &other.inner)
  }

  /// Rejects the future.
  pub fn reject(&self, error: CacheError) -> Result<(), CacheError>
  where
    T: Clone,
  {
    self.settle(Err(error))
  }

  /// Resolves the future with `value`.
  pub fn resolve(&self, value: T) -> Result<(), CacheError>
  where
    T: Clone,
  {
    self.settle(Ok(value))
  }

  fn settle(&self, outcome: Result<T, CacheError>) -> Result<(), CacheError>
  where
    T: Clone,
  {
    let (callbacks, waiters) = {
      let mut state = self.inner.lock();
      let next = match &outcome {
        Ok(value) => State::Resolved(value.clone()),
        Err(error) => State::Rejected(error.clone()),
      };
      match std::mem::replace(&mut *state, next) {
        State::Pending { callbacks, waiters } => (callbacks, waiters),
        settled => {
          let status = settled.status();
          *state = settled;
          return Err(CacheError::AlreadySettled { status });
        }
      }
    };

    for waiter in waiters {
      waiter.wake();
    }
    for callback in callbacks {
      callback(outcome.clone());
    }
    Ok(())
  }

  /// Registers a pair of completion callbacks.
  ///
  /// Exactly one of them runs, once. Callbacks registered while pending run
  /// in registration order on the settling thread; on an already-settled
  /// future the matching callback runs immediately on the caller's thread.
  pub fn then<F, R>(&self, on_fulfill: F, on_reject: R)
  where
    T: Clone,
    F: FnOnce(T) + Send + 'static,
    R: FnOnce(CacheError) + Send + 'static,
  {
    self.on_settled(move |outcome| match outcome {
      Ok(value) => on_fulfill(value),
      Err(error) => on_reject(error),
    });
  }

  /// Registers a single callback that receives the outcome.
  ///
  /// On a future that has already settled the callback runs synchronously,
  /// before this returns, on the caller's thread. Nothing is deferred to a
  /// scheduler; callers needing that should spawn from inside the callback.
  pub fn on_settled<F>(&self, callback: F)
  where
    T: Clone,
    F: FnOnce(Result<T, CacheError>) + Send + 'static,
  {
    let outcome = {
      let mut state = self.inner.lock();
      match &mut *state {
        State::Pending { callbacks, .. } => {
          callbacks.push(Box::new(callback));
          return;
        }
        State::Resolved(value) => Ok(value.clone()),
        State::Rejected(error) => Err(error.clone()),
      }
    };
    callback(outcome);
  }

  /// The suspend accessor: never blocks, hands back the pending future
  /// itself while the value is not ready.
  pub fn read(&self) -> Suspend<T>
  where
    T: Clone,
  {
    match &*self.inner.lock() {
      State::Pending { .. } => Suspend::Pending(self.clone()),
      State::Resolved(value) => Suspend::Ready(value.clone()),
      State::Rejected(error) => Suspend::Failed(error.clone()),
    }
  }

  pub fn value(&self) -> Option<T>
  where
    T: Clone,
  {
    match &*self.inner.lock() {
      State::Resolved(value) => Some(value.clone()),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<CacheError> {
    match &*self.inner.lock() {
      State::Rejected(error) => Some(error.clone()),
      _ => None,
    }
  }

  /// Blocks the current thread until the future settles.
  pub fn wait(&self) -> Result<T, CacheError>
  where
    T: Clone,
  {
    loop {
      {
        let mut state = self.inner.lock();
        match &mut *state {
          State::Resolved(value) => return Ok(value.clone()),
          State::Rejected(error) => return Err(error.clone()),
          State::Pending { waiters, .. } => waiters.push_back(Waiter::Sync(thread::current())),
        }
      }
      // Spurious unparks just loop back to the state check.
      thread::park();
    }
  }
}

impl<T: Clone> Future for Wakeable<T> {
  type Output = Result<T, CacheError>;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let mut state = self.inner.lock();
    match &mut *state {
      State::Resolved(value) => Poll::Ready(Ok(value.clone())),
      State::Rejected(error) => Poll::Ready(Err(error.clone())),
      State::Pending { waiters, .. } => {
        let registered = waiters
          .iter()
          .any(|w| matches!(w, Waiter::Async(waker) if waker.will_wake(cx.waker())));
        if !registered {
          waiters.push_back(Waiter::Async(cx.waker().clone()));
        }
        Poll::Pending
      }
    }
  }
}
