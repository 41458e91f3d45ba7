// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Mock store implementation for testing.
//!
//! This module provides `MockStore`, an in-memory store that records all
//! operations and supports failure injection for testing error paths.
//! It deliberately has no atomic add, so a [`Repository`](crate::Repository)
//! over it exercises the emulated `add` path.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Duration,
};

use parking_lot::Mutex;
use serde::{Serialize, de::DeserializeOwned};

use crate::{Codec, Error, JsonCodec, Locker, NotAddable, Prefix, Result, Store};

/// Recorded store operation with full context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    /// A `has` operation was performed with the given key.
    Has(String),
    /// A `get` operation was performed with the given key.
    Get(String),
    /// A `put` operation was performed.
    Put {
        /// The key that was written.
        key: String,
        /// The requested time to live.
        ttl: Duration,
    },
    /// An `increment` operation was performed.
    Increment {
        /// The counter key.
        key: String,
        /// The requested delta.
        delta: i64,
    },
    /// A `decrement` operation was performed.
    Decrement {
        /// The counter key.
        key: String,
        /// The requested delta.
        delta: i64,
    },
    /// A `forever` operation was performed with the given key.
    Forever(String),
    /// A `forget` operation was performed with the given key.
    Forget(String),
    /// A `flush` operation was performed.
    Flush,
    /// A lock acquisition was attempted for the given key.
    Lock(String),
}

impl StoreOp {
    fn name(&self) -> &'static str {
        match self {
            Self::Has(_) => "has",
            Self::Get(_) => "get",
            Self::Put { .. } => "put",
            Self::Increment { .. } => "increment",
            Self::Decrement { .. } => "decrement",
            Self::Forever(_) => "forever",
            Self::Forget(_) => "forget",
            Self::Flush => "flush",
            Self::Lock(_) => "lock",
        }
    }

    fn key(&self) -> &str {
        match self {
            Self::Has(key) | Self::Get(key) | Self::Forever(key) | Self::Forget(key) | Self::Lock(key) => key,
            Self::Put { key, .. } | Self::Increment { key, .. } | Self::Decrement { key, .. } => key,
            Self::Flush => "",
        }
    }
}

type FailPredicate = Box<dyn Fn(&StoreOp) -> bool + Send + Sync>;

/// A configurable mock store for testing.
///
/// Values are kept in memory, encoded with [`JsonCodec`]. Expiry is recorded
/// but not enforced. Operations can be made to fail on demand, and every
/// operation is recorded for later verification.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use cachette::{Store, testing::{MockStore, StoreOp}};
///
/// # futures::executor::block_on(async {
/// let store = MockStore::new();
/// store.put("key", &42, Duration::from_secs(60)).await.unwrap();
/// let value: i32 = store.get("key").await.unwrap();
/// assert_eq!(value, 42);
///
/// assert_eq!(store.operations(), vec![
///     StoreOp::Put { key: "key".to_string(), ttl: Duration::from_secs(60) },
///     StoreOp::Get("key".to_string()),
/// ]);
/// # });
/// ```
///
/// # Failure Injection
///
/// ```
/// use cachette::{ErrorKind, Store, testing::{MockStore, StoreOp}};
///
/// # futures::executor::block_on(async {
/// let store = MockStore::new();
/// store.fail_when(|op| matches!(op, StoreOp::Has(key) if key == "forbidden"));
///
/// let error = store.has("forbidden").await.unwrap_err();
/// assert_eq!(error.kind(), ErrorKind::Backend);
/// assert!(store.has("allowed").await.is_ok());
/// # });
/// ```
#[derive(Clone)]
pub struct MockStore {
    prefix: Prefix,
    data: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    locks: Arc<Mutex<HashSet<String>>>,
    operations: Arc<Mutex<Vec<StoreOp>>>,
    fail_when: Arc<Mutex<Option<FailPredicate>>>,
}

impl std::fmt::Debug for MockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockStore")
            .field("prefix", &self.prefix)
            .field("data", &self.data)
            .field("operations", &self.operations)
            .field("fail_when", &self.fail_when.lock().is_some())
            .finish_non_exhaustive()
    }
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStore {
    /// Creates a new empty mock store without a prefix.
    #[must_use]
    pub fn new() -> Self {
        Self::with_prefix("")
    }

    /// Creates a new empty mock store reporting the given prefix.
    #[must_use]
    pub fn with_prefix(prefix: impl AsRef<str>) -> Self {
        Self {
            prefix: Prefix::new(prefix),
            data: Arc::new(Mutex::new(HashMap::new())),
            locks: Arc::new(Mutex::new(HashSet::new())),
            operations: Arc::new(Mutex::new(Vec::new())),
            fail_when: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns the number of stored entries.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.data.lock().len()
    }

    /// Returns `true` if the store holds the given key.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.lock().contains_key(key)
    }

    /// Returns the raw payload stored under `key`.
    #[must_use]
    pub fn payload(&self, key: &str) -> Option<Vec<u8>> {
        self.data.lock().get(key).cloned()
    }

    /// Returns `true` if a lock is currently held for `key`.
    #[must_use]
    pub fn is_locked(&self, key: &str) -> bool {
        self.locks.lock().contains(key)
    }

    /// Sets a predicate that determines when operations should fail.
    ///
    /// Failing operations return an error of kind [`Backend`](crate::ErrorKind::Backend)
    /// and leave the stored data untouched.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&StoreOp) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Clears the failure predicate, allowing all operations to succeed.
    pub fn clear_failures(&self) {
        *self.fail_when.lock() = None;
    }

    /// Returns a clone of all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<StoreOp> {
        self.operations.lock().clone()
    }

    /// Clears all recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().clear();
    }

    fn record(&self, op: StoreOp) -> Result<()> {
        let fail = self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(&op));
        let result = if fail {
            Err(Error::backend(op.name(), op.key(), format!("mock: {} failed", op.name())))
        } else {
            Ok(())
        };
        self.operations.lock().push(op);
        result
    }

    fn apply_delta(&self, key: &str, delta: i64) -> Result<i64> {
        let mut data = self.data.lock();
        let current = match data.get(key) {
            Some(payload) => std::str::from_utf8(payload)
                .ok()
                .and_then(|text| text.parse::<i64>().ok())
                .ok_or_else(|| Error::not_integer(key, "mock: value is not an integer"))?,
            None => 0,
        };
        let next = current
            .checked_add(delta)
            .ok_or_else(|| Error::backend("increment", key, "mock: increment would overflow"))?;
        data.insert(key.to_owned(), next.to_string().into_bytes());
        Ok(next)
    }
}

impl Store for MockStore {
    type Locker = MockLocker;
    type Addable = NotAddable;

    async fn has(&self, key: &str) -> Result<bool> {
        self.record(StoreOp::Has(key.to_owned()))?;
        Ok(self.contains_key(key))
    }

    async fn get<V>(&self, key: &str) -> Result<V>
    where
        V: DeserializeOwned + Send,
    {
        self.record(StoreOp::Get(key.to_owned()))?;
        let payload = self.payload(key).ok_or_else(|| Error::not_found(key))?;
        JsonCodec.decode(&payload)
    }

    async fn put<V>(&self, key: &str, value: &V, ttl: Duration) -> Result<bool>
    where
        V: Serialize + Sync + ?Sized,
    {
        self.record(StoreOp::Put { key: key.to_owned(), ttl })?;
        let payload = JsonCodec.encode(value)?;
        self.data.lock().insert(key.to_owned(), payload);
        Ok(true)
    }

    async fn increment(&self, key: &str, delta: i64) -> Result<i64> {
        self.record(StoreOp::Increment { key: key.to_owned(), delta })?;
        self.apply_delta(key, delta)
    }

    async fn decrement(&self, key: &str, delta: i64) -> Result<i64> {
        self.record(StoreOp::Decrement { key: key.to_owned(), delta })?;
        let negated = delta
            .checked_neg()
            .ok_or_else(|| Error::backend("decrement", key, "mock: decrement would overflow"))?;
        self.apply_delta(key, negated)
    }

    async fn forever<V>(&self, key: &str, value: &V) -> Result<bool>
    where
        V: Serialize + Sync + ?Sized,
    {
        self.record(StoreOp::Forever(key.to_owned()))?;
        let payload = JsonCodec.encode(value)?;
        self.data.lock().insert(key.to_owned(), payload);
        Ok(true)
    }

    async fn forget(&self, key: &str) -> Result<bool> {
        self.record(StoreOp::Forget(key.to_owned()))?;
        self.data.lock().remove(key);
        Ok(true)
    }

    async fn flush(&self) -> Result<bool> {
        self.record(StoreOp::Flush)?;
        self.data.lock().clear();
        Ok(true)
    }

    fn prefix(&self) -> &str {
        self.prefix.as_str()
    }

    fn lock(&self, key: &str, _ttl: Duration) -> Self::Locker {
        MockLocker {
            store: self.clone(),
            key: key.to_owned(),
        }
    }
}

/// Lock handle returned by [`MockStore::lock`].
///
/// Locks are held in the mock's shared state until the critical section ends;
/// the ttl is not enforced.
#[derive(Debug, Clone)]
pub struct MockLocker {
    store: MockStore,
    key: String,
}

struct Held<'a> {
    locks: &'a Mutex<HashSet<String>>,
    key: &'a str,
}

impl Drop for Held<'_> {
    fn drop(&mut self) {
        self.locks.lock().remove(self.key);
    }
}

impl Locker for MockLocker {
    async fn try_run<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = T> + Send,
        T: Send,
    {
        self.store.record(StoreOp::Lock(self.key.clone()))?;
        if !self.store.locks.lock().insert(self.key.clone()) {
            return Err(Error::locked(&self.key));
        }

        let _held = Held {
            locks: &self.store.locks,
            key: &self.key,
        };
        Ok(f().await)
    }
}
