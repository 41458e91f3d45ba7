// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The Redis [`Store`] implementation.

use std::fmt;
use std::time::Duration;

use cachette::{Addable, Codec, Error, JsonCodec, LOCK_NAMESPACE, Prefix, Result, Store};
use redis::aio::{ConnectionLike, ConnectionManager};
use serde::{Serialize, de::DeserializeOwned};

use crate::builder::RedisStoreBuilder;
use crate::locker::RedisLocker;
use crate::reply::{escape_glob, is_not_integer, px_millis};

/// Number of keys requested per `SCAN` round trip during flush.
const SCAN_BATCH: usize = 100;

/// A [`Store`] backed by a Redis server.
///
/// Every operation is one or a few Redis commands; the store keeps no state
/// besides its configuration. Entries expire server-side, counters use
/// `INCRBY`/`DECRBY`, and `add` is an atomic `SET NX`.
///
/// Keys under `lock:` belong to locks. A key whose prefixed form falls there
/// is refused with [`ErrorKind::InvalidKey`](cachette::ErrorKind::InvalidKey),
/// and `flush` never deletes anything in that namespace.
///
/// Cloning is cheap when the connection is, as with the default
/// [`ConnectionManager`].
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
///
/// use cachette::Store;
/// use cachette_redis::RedisStore;
/// use redis::aio::ConnectionManager;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let client = redis::Client::open("redis://127.0.0.1:6379")?;
/// let store = RedisStore::builder(ConnectionManager::new(client).await?)
///     .prefix("app")
///     .build();
///
/// store.put("greeting", "hello", Duration::from_secs(60)).await?;
/// let greeting: String = store.get("greeting").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RedisStore<C = ConnectionManager, K = JsonCodec> {
    connection: C,
    prefix: Prefix,
    codec: K,
}

impl<C, K: fmt::Debug> fmt::Debug for RedisStore<C, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("prefix", &self.prefix)
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}

impl<C> RedisStore<C>
where
    C: ConnectionLike + Clone + Send + Sync,
{
    /// Creates a store without a prefix that encodes values as JSON.
    #[must_use]
    pub fn new(connection: C) -> Self {
        Self::builder(connection).build()
    }

    /// Creates a builder for configuring the prefix and codec.
    #[must_use]
    pub fn builder(connection: C) -> RedisStoreBuilder<C> {
        RedisStoreBuilder::new(connection)
    }
}

impl<C, K> RedisStore<C, K>
where
    C: ConnectionLike + Clone + Send + Sync,
    K: Codec,
{
    pub(crate) fn from_parts(connection: C, prefix: Prefix, codec: K) -> Self {
        Self {
            connection,
            prefix,
            codec,
        }
    }

    fn connection(&self) -> C {
        self.connection.clone()
    }

    async fn counter(&self, command: &'static str, key: &str, delta: i64) -> Result<i64> {
        redis::cmd(command)
            .arg(self.prefix.data_key(key)?)
            .arg(delta)
            .query_async(&mut self.connection())
            .await
            .map_err(|error| {
                if is_not_integer(&error) {
                    Error::not_integer(key, error)
                } else {
                    Error::backend(command, key, error)
                }
            })
    }

    async fn write(&self, key: &str, payload: Vec<u8>, ttl: Option<Duration>) -> Result<bool> {
        let mut command = redis::cmd("SET");
        command.arg(self.prefix.data_key(key)?).arg(payload);
        if let Some(millis) = ttl.and_then(px_millis) {
            command.arg("PX").arg(millis);
        }

        command
            .query_async::<()>(&mut self.connection())
            .await
            .map_err(|error| Error::backend("SET", key, error))?;
        Ok(true)
    }
}

impl<C, K> Store for RedisStore<C, K>
where
    C: ConnectionLike + Clone + Send + Sync,
    K: Codec,
{
    type Locker = RedisLocker<C>;
    type Addable = Self;

    async fn has(&self, key: &str) -> Result<bool> {
        let count: u64 = redis::cmd("EXISTS")
            .arg(self.prefix.data_key(key)?)
            .query_async(&mut self.connection())
            .await
            .map_err(|error| Error::backend("EXISTS", key, error))?;
        Ok(count > 0)
    }

    async fn get<V>(&self, key: &str) -> Result<V>
    where
        V: DeserializeOwned + Send,
    {
        let payload: Option<Vec<u8>> = redis::cmd("GET")
            .arg(self.prefix.data_key(key)?)
            .query_async(&mut self.connection())
            .await
            .map_err(|error| Error::backend("GET", key, error))?;

        let Some(payload) = payload else {
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
        self.write(key, payload, Some(ttl)).await?;
        tracing::debug!(key, ttl_ms = px_millis(ttl), "stored entry");
        Ok(true)
    }

    async fn increment(&self, key: &str, delta: i64) -> Result<i64> {
        self.counter("INCRBY", key, delta).await
    }

    async fn decrement(&self, key: &str, delta: i64) -> Result<i64> {
        self.counter("DECRBY", key, delta).await
    }

    async fn forever<V>(&self, key: &str, value: &V) -> Result<bool>
    where
        V: Serialize + Sync + ?Sized,
    {
        let payload = self.codec.encode(value)?;
        self.write(key, payload, None).await?;
        tracing::debug!(key, "stored entry without expiry");
        Ok(true)
    }

    async fn forget(&self, key: &str) -> Result<bool> {
        redis::cmd("DEL")
            .arg(self.prefix.data_key(key)?)
            .query_async::<()>(&mut self.connection())
            .await
            .map_err(|error| Error::backend("DEL", key, error))?;
        Ok(true)
    }

    async fn flush(&self) -> Result<bool> {
        let mut connection = self.connection();
        let pattern = format!("{}*", escape_glob(self.prefix.as_str()));
        let mut cursor: u64 = 0;
        let mut removed: u64 = 0;

        loop {
            let (next_cursor, mut keys): (u64, Vec<Vec<u8>>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut connection)
                .await
                .map_err(|error| Error::backend_operation("SCAN", error))?;

            keys.retain(|key| !key.starts_with(LOCK_NAMESPACE.as_bytes()));
            if !keys.is_empty() {
                let count: u64 = redis::cmd("DEL")
                    .arg(&keys)
                    .query_async(&mut connection)
                    .await
                    .map_err(|error| Error::backend_operation("DEL", error))?;
                removed += count;
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        tracing::debug!(prefix = %self.prefix, removed, "flushed store");
        Ok(true)
    }

    fn prefix(&self) -> &str {
        self.prefix.as_str()
    }

    fn lock(&self, key: &str, ttl: Duration) -> Self::Locker {
        RedisLocker::new(
            self.connection(),
            format!("{LOCK_NAMESPACE}{}", self.prefix.apply(key)),
            key,
            ttl,
        )
    }

    fn addable(&self) -> Option<&Self::Addable> {
        Some(self)
    }
}

impl<C, K> Addable for RedisStore<C, K>
where
    C: ConnectionLike + Clone + Send + Sync,
    K: Codec,
{
    async fn add<V>(&self, key: &str, value: &V, ttl: Duration) -> Result<bool>
    where
        V: Serialize + Sync + ?Sized,
    {
        let payload = self.codec.encode(value)?;
        let mut command = redis::cmd("SET");
        command.arg(self.prefix.data_key(key)?).arg(payload).arg("NX");
        if let Some(millis) = px_millis(ttl) {
            command.arg("PX").arg(millis);
        }

        let reply: Option<String> = command
            .query_async(&mut self.connection())
            .await
            .map_err(|error| Error::backend("SET NX", key, error))?;
        Ok(reply.is_some())
    }
}
