// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for configuring Redis stores.

use cachette::{Codec, JsonCodec, Prefix};
use redis::aio::ConnectionLike;

use crate::store::RedisStore;

/// Builder for configuring a [`RedisStore`].
///
/// The connection is created and owned by the caller; the builder only
/// decides how keys are namespaced and how values are encoded.
///
/// # Prefix and flush
///
/// The prefix scopes [`flush`](cachette::Store::flush): only keys that start
/// with it are deleted. A store built without a prefix owns the whole logical
/// database, and its flush deletes every key outside the `lock:` namespace.
///
/// A prefix that itself starts with `lock:` (or is `lock`) leaves no room for
/// data: every operation on such a store fails with
/// [`ErrorKind::InvalidKey`](cachette::ErrorKind::InvalidKey), and its flush
/// deletes nothing.
///
/// # Examples
///
/// ```no_run
/// use cachette::Store;
/// use cachette_redis::RedisStore;
/// use redis::aio::ConnectionManager;
///
/// # async fn connect() -> redis::RedisResult<()> {
/// let client = redis::Client::open("redis://127.0.0.1:6379")?;
/// let connection = ConnectionManager::new(client).await?;
///
/// let store = RedisStore::builder(connection).prefix("sessions").build();
/// assert_eq!(store.prefix(), "sessions:");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RedisStoreBuilder<C, K = JsonCodec> {
    connection: C,
    prefix: Prefix,
    codec: K,
}

impl<C> RedisStoreBuilder<C> {
    pub(crate) fn new(connection: C) -> Self {
        Self {
            connection,
            prefix: Prefix::default(),
            codec: JsonCodec,
        }
    }
}

impl<C, K: Codec> RedisStoreBuilder<C, K> {
    /// Sets the prefix placed in front of every key.
    ///
    /// Trailing separators are normalized so the stored prefix ends in exactly
    /// one `:`. An empty prefix stays empty.
    #[must_use]
    pub fn prefix(mut self, prefix: impl AsRef<str>) -> Self {
        self.prefix = Prefix::new(prefix);
        self
    }

    /// Replaces the codec used for values. Defaults to [`JsonCodec`].
    ///
    /// Counters are stored as decimal text regardless of the codec. A codec
    /// that encodes integers differently makes `get` of a counter fail.
    #[must_use]
    pub fn codec<K2: Codec>(self, codec: K2) -> RedisStoreBuilder<C, K2> {
        RedisStoreBuilder {
            connection: self.connection,
            prefix: self.prefix,
            codec,
        }
    }

    /// Builds the configured [`RedisStore`].
    #[must_use]
    pub fn build(self) -> RedisStore<C, K>
    where
        C: ConnectionLike + Clone + Send + Sync,
    {
        RedisStore::from_parts(self.connection, self.prefix, self.codec)
    }
}
