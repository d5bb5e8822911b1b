//! Aggregate persistence abstraction.
//!
//! One store per aggregate type, keyed by the aggregate's strongly-typed id.
//! Saves are guarded by an [`ExpectedVersion`] so concurrent workflows racing
//! on the same aggregate surface as a concurrency error instead of silently
//! overwriting each other (the serialization point for the allocation
//! checks; a relational store would take row locks instead).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tenderflow_core::{AggregateRoot, ExpectedVersion};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("concurrency check failed: expected version {expected}, found {actual}")]
    Concurrency { expected: u64, actual: u64 },

    #[error("store lock poisoned")]
    Poisoned,
}

/// Snapshot store for a single aggregate type.
pub trait Store<A>: Send + Sync
where
    A: AggregateRoot + Clone,
{
    /// Fetch a copy of the aggregate, if present.
    fn get(&self, id: &A::Id) -> Option<A>;

    /// Copies of all stored aggregates (services use this for uniqueness
    /// scans and utilization sums).
    fn list(&self) -> Vec<A>;

    /// Persist the aggregate's current state.
    ///
    /// `expected` is the version the caller loaded (0 for a new aggregate);
    /// the write is rejected if the stored version has moved since.
    fn save(&self, aggregate: A, expected: ExpectedVersion) -> Result<(), StoreError>;
}

impl<A, S> Store<A> for Arc<S>
where
    A: AggregateRoot + Clone,
    S: Store<A> + ?Sized,
{
    fn get(&self, id: &A::Id) -> Option<A> {
        (**self).get(id)
    }

    fn list(&self) -> Vec<A> {
        (**self).list()
    }

    fn save(&self, aggregate: A, expected: ExpectedVersion) -> Result<(), StoreError> {
        (**self).save(aggregate, expected)
    }
}

/// In-memory [`Store`] backed by a `RwLock<HashMap>`.
#[derive(Debug)]
pub struct InMemoryStore<A>
where
    A: AggregateRoot,
{
    inner: RwLock<HashMap<A::Id, A>>,
}

impl<A> InMemoryStore<A>
where
    A: AggregateRoot + Clone,
{
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<A> Default for InMemoryStore<A>
where
    A: AggregateRoot + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Store<A> for InMemoryStore<A>
where
    A: AggregateRoot + Clone + Send + Sync,
    A::Id: Send + Sync,
{
    fn get(&self, id: &A::Id) -> Option<A> {
        match self.inner.read() {
            Ok(map) => map.get(id).cloned(),
            Err(_) => {
                tracing::warn!(id = ?id, "store lock poisoned, read returns nothing");
                None
            }
        }
    }

    fn list(&self) -> Vec<A> {
        match self.inner.read() {
            Ok(map) => map.values().cloned().collect(),
            Err(_) => {
                tracing::warn!("store lock poisoned, list returns empty");
                Vec::new()
            }
        }
    }

    fn save(&self, aggregate: A, expected: ExpectedVersion) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let actual = map.get(aggregate.id()).map(|a| a.version()).unwrap_or(0);
        if !expected.matches(actual) {
            let expected = match expected {
                ExpectedVersion::Exact(v) => v,
                ExpectedVersion::Any => actual,
            };
            return Err(StoreError::Concurrency { expected, actual });
        }
        map.insert(aggregate.id().clone(), aggregate);
        Ok(())
    }
}
