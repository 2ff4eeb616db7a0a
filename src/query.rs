//! Async query abstraction for data fetching with caching support.
//!
//! Inspired by TanStack Query, this module provides a `Query<T>` type that
//! encapsulates async data fetching, loading states, and error handling, and
//! a `Mutations<K, T>` runner for writes issued from views.
//!
//! # Example
//!
//! ```ignore
//! let client = ctx.client.clone();
//! let mut query = Query::new(move || {
//!     let client = client.clone();
//!     async move { client.assets().await.map_err(|e| e.display_message()) }
//! })
//! .invalidated_by(ctx.client.cache().subscribe());
//!
//! // Start fetching
//! query.fetch();
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//!
//! // In render
//! match query.state() {
//!     QueryState::Loading => render_spinner(),
//!     QueryState::Success(data) => render_data(data),
//!     QueryState::Error(e) => render_error(e),
//!     QueryState::Idle => {}
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// The state of a query
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Query has not been started
  Idle,
  /// Query is currently fetching data
  Loading,
  /// Query completed successfully
  Success(T),
  /// Query failed with an error
  Error(String),
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn is_success(&self) -> bool {
    matches!(self, QueryState::Success(_))
  }

  pub fn is_error(&self) -> bool {
    matches!(self, QueryState::Error(_))
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&str> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

/// A boxed future that returns a Result<T, String>
type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T, String>> + Send>>;

/// A factory function that creates futures for fetching data
type FetcherFn<T> = Box<dyn Fn() -> BoxFuture<T> + Send + Sync>;

/// Async query for data fetching with state management.
///
/// Query<T> encapsulates:
/// - The fetching logic (via a closure)
/// - Loading/success/error states
/// - Async result handling via channels
/// - Refetching when the cache reports an invalidation
///
/// The last successful value stays readable through `data()` while a
/// refetch is in flight, so lists don't blank out after every mutation.
pub struct Query<T> {
  state: QueryState<T>,
  previous: Option<T>,
  fetcher: FetcherFn<T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, String>>>,
  task: Option<JoinHandle<()>>,
  invalidations: Option<watch::Receiver<u64>>,
  fetched_at: Option<Instant>,
  stale_time: Duration,
}

impl<T: Send + 'static> Query<T> {
  /// Create a new query with the given fetcher function.
  ///
  /// The fetcher is a closure that returns a future. It will be called
  /// each time `fetch()` or `refetch()` is invoked.
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    Self {
      state: QueryState::Idle,
      previous: None,
      fetcher: Box::new(move || Box::pin(fetcher())),
      receiver: None,
      task: None,
      invalidations: None,
      fetched_at: None,
      stale_time: Duration::from_secs(60), // Default 1 minute
    }
  }

  /// Set the stale time for this query.
  ///
  /// After this duration, the data is considered stale and `is_stale()` returns true.
  pub fn with_stale_time(mut self, duration: Duration) -> Self {
    self.stale_time = duration;
    self
  }

  /// Refetch whenever the given epoch moves.
  ///
  /// The fetcher is expected to read through the cache, so a refetch of a
  /// key that was not invalidated is answered locally.
  pub fn invalidated_by(mut self, mut epoch: watch::Receiver<u64>) -> Self {
    epoch.mark_unchanged();
    self.invalidations = Some(epoch);
    self
  }

  /// Get the current state of the query.
  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  /// Get the data if the query succeeded, or the previous data while a
  /// refetch is pending.
  pub fn data(&self) -> Option<&T> {
    self.state.data().or(self.previous.as_ref())
  }

  /// Check if the query is currently loading.
  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  /// Check if the query succeeded.
  pub fn is_success(&self) -> bool {
    self.state.is_success()
  }

  /// Check if the query failed.
  pub fn is_error(&self) -> bool {
    self.state.is_error()
  }

  /// Get the error message if the query failed.
  pub fn error(&self) -> Option<&str> {
    self.state.error()
  }

  /// Check if the data is stale (older than stale_time).
  pub fn is_stale(&self) -> bool {
    match &self.state {
      QueryState::Success(_) => self
        .fetched_at
        .map(|t| t.elapsed() > self.stale_time)
        .unwrap_or(true),
      _ => false,
    }
  }

  /// Start fetching data if not already loading.
  ///
  /// This is a no-op if the query is already loading.
  pub fn fetch(&mut self) {
    if self.state.is_loading() {
      return;
    }
    self.start_fetch();
  }

  /// Force a refetch, even if already loading or data exists.
  ///
  /// A pending fetch is aborted; its result is never delivered.
  pub fn refetch(&mut self) {
    self.cancel();
    self.start_fetch();
  }

  /// Poll for results from a pending fetch.
  ///
  /// Returns `true` if the state changed (data arrived, error occurred, or
  /// an invalidation started a refetch). Call this in your event loop tick
  /// handler.
  pub fn poll(&mut self) -> bool {
    let invalidated = match &mut self.invalidations {
      Some(epoch) => match epoch.has_changed() {
        Ok(true) => {
          epoch.mark_unchanged();
          true
        }
        _ => false,
      },
      None => false,
    };
    if invalidated && !matches!(self.state, QueryState::Idle) {
      self.refetch();
      return true;
    }
    // Periodic refresh; goes through the cache, so it is cheap until that expires too
    if self.is_stale() {
      self.refetch();
      return true;
    }

    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    // Try to receive without blocking
    match receiver.try_recv() {
      Ok(Ok(data)) => {
        self.state = QueryState::Success(data);
        self.previous = None;
        self.fetched_at = Some(Instant::now());
        self.finish();
        true
      }
      Ok(Err(error)) => {
        self.state = QueryState::Error(error);
        self.finish();
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        // Sender dropped without sending - treat as error
        self.state = QueryState::Error("Query was cancelled".to_string());
        self.finish();
        true
      }
    }
  }

  /// Internal: start the fetch operation
  fn start_fetch(&mut self) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    if let QueryState::Success(data) = std::mem::replace(&mut self.state, QueryState::Loading) {
      self.previous = Some(data);
    }

    let future = (self.fetcher)();
    self.task = Some(tokio::spawn(async move {
      let result = future.await;
      // Ignore send errors - receiver may have been dropped
      let _ = tx.send(result);
    }));
  }

  fn finish(&mut self) {
    self.receiver = None;
    self.task = None;
  }
}

impl<T> Query<T> {
  fn cancel(&mut self) {
    self.receiver = None;
    if let Some(task) = self.task.take() {
      task.abort();
    }
  }
}

impl<T> Drop for Query<T> {
  fn drop(&mut self) {
    self.cancel();
  }
}

// Query is not Clone because the fetcher is boxed and receiver is owned.

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("state", &self.state)
      .field("fetched_at", &self.fetched_at)
      .field("stale_time", &self.stale_time)
      .finish_non_exhaustive()
  }
}

/// Runner for writes issued from a view.
///
/// Each mutation is tagged with a key `K` (usually the id of the entity it
/// targets) so that results arriving out of order can be matched back to the
/// optimistic change they belong to. Unlike queries, mutations are not
/// aborted when the view goes away: the server call still completes and the
/// cache is still invalidated.
pub struct Mutations<K, T> {
  tx: mpsc::UnboundedSender<(K, Result<T, String>)>,
  rx: mpsc::UnboundedReceiver<(K, Result<T, String>)>,
  in_flight: usize,
}

impl<K: Send + 'static, T: Send + 'static> Mutations<K, T> {
  pub fn new() -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    Self { tx, rx, in_flight: 0 }
  }

  /// Spawn a mutation future.
  pub fn run<Fut>(&mut self, key: K, future: Fut)
  where
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    self.in_flight += 1;
    let tx = self.tx.clone();
    tokio::spawn(async move {
      let result = future.await;
      let _ = tx.send((key, result));
    });
  }

  /// Whether any mutation is still waiting for the server.
  pub fn is_pending(&self) -> bool {
    self.in_flight > 0
  }

  /// Drain finished mutations.
  pub fn poll(&mut self) -> Vec<(K, Result<T, String>)> {
    let mut finished = Vec::new();
    while let Ok(result) = self.rx.try_recv() {
      self.in_flight = self.in_flight.saturating_sub(1);
      finished.push(result);
    }
    finished
  }
}

impl<K: Send + 'static, T: Send + 'static> Default for Mutations<K, T> {
  fn default() -> Self {
    Self::new()
  }
}
