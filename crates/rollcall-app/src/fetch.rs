//! Fresh-first fetch orchestration shared by every entity-class repository.
//!
//! Caches are plain data behind a [`std::sync::Mutex`]. The lock is taken for
//! synchronous reads and write-throughs only and is never held across a remote
//! call, so two overlapping fetches of the same partition both complete and the
//! one finishing last wins.

use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use time::Duration;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::config::ExecutionContext;
use crate::error::RemoteError;
use crate::store::{Entity, EntityStore, Partitioned, PartitionedStore};

/// Process-wide cache handle shared by every call site.
pub type Shared<T> = Arc<Mutex<T>>;

/// Wrap a cache into a shared handle.
pub fn shared<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}

/// Lock a cache, recovering the data if a previous holder panicked.
pub fn lock<T>(cache: &Mutex<T>) -> MutexGuard<'_, T> {
    cache.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Outcome of the fetch policy for one read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchDecision {
    /// Query the remote source and write the result through.
    FetchFresh,
    /// Serve the cached partition.
    UseCache,
}

/// Fresh-first policy for partitioned reads.
#[derive(Debug, Clone, Copy)]
pub struct FetchPolicy {
    context: ExecutionContext,
}

impl FetchPolicy {
    /// Policy for the given execution context.
    #[must_use]
    pub const fn new(context: ExecutionContext) -> Self {
        Self { context }
    }

    /// Execution context the policy was built for.
    #[must_use]
    pub const fn context(self) -> ExecutionContext {
        self.context
    }

    /// Fetch when forced, when the partition is stale, or when running as a client.
    #[must_use]
    pub const fn decide(self, force: bool, valid: bool) -> FetchDecision {
        if force || !valid || matches!(self.context, ExecutionContext::Client) {
            FetchDecision::FetchFresh
        } else {
            FetchDecision::UseCache
        }
    }
}

/// Loading flag and last error message of one entity class.
#[derive(Debug, Clone, Default)]
pub struct StoreStatus {
    in_flight: usize,
    last_error: Option<String>,
}

impl StoreStatus {
    /// Whether any request of this class is in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    /// Message of the last failed operation, cleared when the next one starts.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn begin(&mut self) {
        self.in_flight += 1;
        self.last_error = None;
    }

    fn finish(&mut self, error: Option<String>) {
        self.in_flight = self.in_flight.saturating_sub(1);
        if error.is_some() {
            self.last_error = error;
        }
    }

    /// Record a failure detected without a remote call.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }
}

/// Cache carrying a [`StoreStatus`].
pub trait Tracked {
    /// Mutable access to the status.
    fn status_mut(&mut self) -> &mut StoreStatus;
}

/// Point-cached entity class: present means valid.
pub struct PointCache<V: Entity> {
    /// Cached values.
    pub store: EntityStore<V>,
    /// Loading state.
    pub status: StoreStatus,
}

impl<V: Entity> Default for PointCache<V> {
    fn default() -> Self {
        Self {
            store: EntityStore::default(),
            status: StoreStatus::default(),
        }
    }
}

impl<V: Entity> Tracked for PointCache<V> {
    fn status_mut(&mut self) -> &mut StoreStatus {
        &mut self.status
    }
}

/// Partitioned entity class with TTL validity.
pub struct PartitionCache<V: Partitioned> {
    /// Entities, index and validity.
    pub store: PartitionedStore<V>,
    /// Loading state.
    pub status: StoreStatus,
}

impl<V: Partitioned> PartitionCache<V> {
    /// Empty cache whose partitions expire after `ttl`.
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: PartitionedStore::new(ttl, clock),
            status: StoreStatus::default(),
        }
    }
}

impl<V: Partitioned> Tracked for PartitionCache<V> {
    fn status_mut(&mut self) -> &mut StoreStatus {
        &mut self.status
    }
}

// Ends one in-flight request on drop, so a cancelled call still clears the flag.
struct InFlight<'a, C: Tracked> {
    cache: &'a Mutex<C>,
    error: Option<String>,
}

impl<C: Tracked> Drop for InFlight<'_, C> {
    fn drop(&mut self) {
        lock(self.cache).status_mut().finish(self.error.take());
    }
}

/// Run a remote call while maintaining the cache's loading flag and error slot.
///
/// Dropping the returned future before it completes ends the request without
/// recording an error.
///
/// # Errors
/// Returns the call's error after recording its message.
pub async fn tracked<C, T, E, F>(cache: &Mutex<C>, op: &'static str, call: F) -> Result<T, E>
where
    C: Tracked,
    E: Display,
    F: Future<Output = Result<T, E>>,
{
    lock(cache).status_mut().begin();
    let mut in_flight = InFlight { cache, error: None };
    let result = call.await;
    if let Err(err) = &result {
        warn!(op, error = %err, "Remote call failed");
        in_flight.error = Some(err.to_string());
    }
    drop(in_flight);
    result
}

/// Read one partition under the fresh-first policy.
///
/// On a fresh fetch the result replaces the partition and is returned even
/// when empty. A failed fetch leaves the cached partition untouched and yields
/// an empty list.
pub async fn read_partition<V, F>(
    cache: &Mutex<PartitionCache<V>>,
    policy: FetchPolicy,
    parent: V::Parent,
    force: bool,
    fetch: F,
) -> Vec<V>
where
    V: Partitioned,
    F: Future<Output = Result<Vec<V>, RemoteError>>,
{
    let valid = lock(cache).store.is_valid(&parent);
    match policy.decide(force, valid) {
        FetchDecision::UseCache => {
            debug!(class = %V::CLASS, partition = %parent, "Serving cached partition");
            lock(cache).store.list(&parent)
        }
        FetchDecision::FetchFresh => {
            debug!(class = %V::CLASS, partition = %parent, force, valid, "Fetching partition");
            match tracked(cache, "fetch partition", fetch).await {
                Ok(values) => lock(cache).store.replace_all(parent, values),
                Err(_) => Vec::new(),
            }
        }
    }
}

/// Read one point entity: cached value when present, otherwise fetch and store.
///
/// Failures are logged and recorded, and yield `None`.
pub async fn read_point<V, F>(cache: &Mutex<PointCache<V>>, key: V::Key, fetch: F) -> Option<V>
where
    V: Entity,
    F: Future<Output = Result<V, RemoteError>>,
{
    if let Some(hit) = lock(cache).store.get(&key).cloned() {
        debug!(class = %V::CLASS, %key, "Point cache hit");
        return Some(hit);
    }
    let value = tracked(cache, "fetch point", fetch).await.ok()?;
    lock(cache).store.put(value.clone());
    Some(value)
}
