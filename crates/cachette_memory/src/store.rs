// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The in-memory [`Store`] implementation.

use std::time::Duration;

use cachette::{Addable, Codec, Error, JsonCodec, LOCK_NAMESPACE, Locker, MIN_TTL, Prefix, Result, Store};
use serde::{Serialize, de::DeserializeOwned};
use tick::Clock;

use crate::backend::{CounterError, MemoryBackend, deadline};
use crate::builder::MemoryStoreBuilder;

/// A [`Store`] over a [`MemoryBackend`].
///
/// Expiry is measured with the injected [`Clock`], so tests can move time
/// forward with `tick::ClockControl` instead of sleeping. The store has a
/// native atomic add, and its locks are exclusive among all stores that
/// share the backend.
///
/// Keys whose prefixed form starts with `lock:` are refused with
/// [`ErrorKind::InvalidKey`](cachette::ErrorKind::InvalidKey), matching the
/// Redis store, where that namespace holds the locks.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use cachette::Store;
/// use cachette_memory::{MemoryBackend, MemoryStore};
/// use tick::Clock;
///
/// # futures::executor::block_on(async {
/// let store = MemoryStore::new(MemoryBackend::new(), Clock::new_frozen());
///
/// store.put("answer", &42, Duration::from_secs(60)).await.unwrap();
/// let answer: i32 = store.get("answer").await.unwrap();
/// assert_eq!(answer, 42);
/// # });
/// ```
#[derive(Clone, Debug)]
pub struct MemoryStore<C = JsonCodec> {
    backend: MemoryBackend,
    clock: Clock,
    prefix: Prefix,
    codec: C,
}

impl MemoryStore {
    /// Creates a store without a prefix that encodes values as JSON.
    #[must_use]
    pub fn new(backend: MemoryBackend, clock: Clock) -> Self {
        Self::builder(backend, clock).build()
    }

    /// Creates a builder for configuring the prefix and codec.
    #[must_use]
    pub fn builder(backend: MemoryBackend, clock: Clock) -> MemoryStoreBuilder {
        MemoryStoreBuilder::new(backend, clock)
    }
}

impl<C: Codec> MemoryStore<C> {
    pub(crate) fn from_parts(backend: MemoryBackend, clock: Clock, prefix: Prefix, codec: C) -> Self {
        Self {
            backend,
            clock,
            prefix,
            codec,
        }
    }

    /// Returns the engine this store writes to.
    #[must_use]
    pub fn backend(&self) -> &MemoryBackend {
        &self.backend
    }

    fn expiry(&self, ttl: Duration) -> Option<std::time::Instant> {
        deadline(self.clock.instant(), ttl.max(MIN_TTL))
    }

    fn counter(&self, operation: &'static str, key: &str, delta: i64) -> Result<i64> {
        self.backend
            .apply_delta(&self.prefix.data_key(key)?, delta, self.clock.instant())
            .map_err(|error| match error {
                CounterError::NotInteger => Error::not_integer(key, "value is not an integer"),
                CounterError::Overflow => Error::backend(operation, key, "increment or decrement would overflow"),
            })
    }
}

impl<C: Codec> Store for MemoryStore<C> {
    type Locker = MemoryLocker;
    type Addable = Self;

    async fn has(&self, key: &str) -> Result<bool> {
        Ok(self.backend.contains(&self.prefix.data_key(key)?, self.clock.instant()))
    }

    async fn get<V>(&self, key: &str) -> Result<V>
    where
        V: DeserializeOwned + Send,
    {
        let Some(payload) = self.backend.read(&self.prefix.data_key(key)?, self.clock.instant()) else {
            tracing::debug!(key, "cache miss");
            return Err(Error::not_found(key));
        };
        tracing::debug!(key, "cache hit");
        self.codec.decode(&payload)
    }

    async fn put<V>(&self, key: &str, value: &V, ttl: Duration) -> Result<bool>
    where
        V: Serialize + Sync + ?Sized,
    {
        let payload = self.codec.encode(value)?;
        let now = self.clock.instant();
        self.backend.write(&self.prefix.data_key(key)?, payload, self.expiry(ttl), now);
        tracing::debug!(key, ttl_ms = ttl.as_millis(), "stored entry");
        Ok(true)
    }

    async fn increment(&self, key: &str, delta: i64) -> Result<i64> {
        self.counter("increment", key, delta)
    }

    async fn decrement(&self, key: &str, delta: i64) -> Result<i64> {
        let negated = delta
            .checked_neg()
            .ok_or_else(|| Error::backend("decrement", key, "increment or decrement would overflow"))?;
        self.counter("decrement", key, negated)
    }

    async fn forever<V>(&self, key: &str, value: &V) -> Result<bool>
    where
        V: Serialize + Sync + ?Sized,
    {
        let payload = self.codec.encode(value)?;
        self.backend
            .write(&self.prefix.data_key(key)?, payload, None, self.clock.instant());
        tracing::debug!(key, "stored entry without expiry");
        Ok(true)
    }

    async fn forget(&self, key: &str) -> Result<bool> {
        self.backend.remove(&self.prefix.data_key(key)?);
        Ok(true)
    }

    async fn flush(&self) -> Result<bool> {
        let removed = self.backend.remove_owned(&self.prefix);
        tracing::debug!(prefix = %self.prefix, removed, "flushed store");
        Ok(true)
    }

    fn prefix(&self) -> &str {
        self.prefix.as_str()
    }

    fn lock(&self, key: &str, ttl: Duration) -> Self::Locker {
        MemoryLocker {
            backend: self.backend.clone(),
            clock: self.clock.clone(),
            name: format!("{LOCK_NAMESPACE}{}", self.prefix.apply(key)),
            key: key.to_owned(),
            ttl: ttl.max(MIN_TTL),
        }
    }

    fn addable(&self) -> Option<&Self::Addable> {
        Some(self)
    }
}

impl<C: Codec> Addable for MemoryStore<C> {
    async fn add<V>(&self, key: &str, value: &V, ttl: Duration) -> Result<bool>
    where
        V: Serialize + Sync + ?Sized,
    {
        let payload = self.codec.encode(value)?;
        let now = self.clock.instant();
        Ok(self
            .backend
            .write_if_absent(&self.prefix.data_key(key)?, payload, self.expiry(ttl), now))
    }
}

/// Lock handle returned by [`MemoryStore::lock`].
///
/// Exclusion holds among every store sharing the same [`MemoryBackend`],
/// which means within one process.
#[derive(Clone, Debug)]
pub struct MemoryLocker {
    backend: MemoryBackend,
    clock: Clock,
    name: String,
    key: String,
    ttl: Duration,
}

struct Held<'a> {
    locker: &'a MemoryLocker,
    token: u64,
}

impl Drop for Held<'_> {
    fn drop(&mut self) {
        if !self.locker.backend.release(&self.locker.name, self.token) {
            tracing::warn!(key = %self.locker.key, "lock expired before release");
        }
    }
}

impl Locker for MemoryLocker {
    async fn try_run<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = T> + Send,
        T: Send,
    {
        let now = self.clock.instant();
        let Some(token) = self.backend.acquire(&self.name, deadline(now, self.ttl), now) else {
            return Err(Error::locked(&self.key));
        };

        let _held = Held { locker: self, token };
        Ok(f().await)
    }
}
