// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Token-checked Redis locks.

use std::fmt;
use std::time::Duration;

use cachette::{Error, Locker, Result};
use redis::aio::ConnectionLike;
use uuid::Uuid;

use crate::reply::px_millis;

/// Deletes the lock only while it still holds the caller's token.
const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

/// Lock handle returned by [`RedisStore::lock`](crate::RedisStore).
///
/// Acquisition is a single `SET NX PX` with a fresh random token. Release
/// deletes the lock only if it still carries that token, so a holder whose
/// ttl ran out cannot release a lock that someone else has since taken.
///
/// Dropping a `try_run` future while the critical section runs leaves the
/// lock in place until its ttl elapses.
#[derive(Clone)]
pub struct RedisLocker<C> {
    connection: C,
    name: String,
    key: String,
    ttl: Duration,
}

impl<C> fmt::Debug for RedisLocker<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisLocker")
            .field("name", &self.name)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl<C> RedisLocker<C>
where
    C: ConnectionLike + Clone + Send + Sync,
{
    pub(crate) fn new(connection: C, name: String, key: &str, ttl: Duration) -> Self {
        Self {
            connection,
            name,
            key: key.to_owned(),
            ttl,
        }
    }

    async fn acquire(&self, token: &str) -> Result<bool> {
        let mut command = redis::cmd("SET");
        command.arg(&self.name).arg(token).arg("NX");
        if let Some(millis) = px_millis(self.ttl) {
            command.arg("PX").arg(millis);
        }

        let reply: Option<String> = command
            .query_async(&mut self.connection.clone())
            .await
            .map_err(|error| Error::backend("SET NX", &self.key, error))?;
        Ok(reply.is_some())
    }

    async fn release(&self, token: &str) {
        let released: redis::RedisResult<u64> = redis::cmd("EVAL")
            .arg(RELEASE_SCRIPT)
            .arg(1)
            .arg(&self.name)
            .arg(token)
            .query_async(&mut self.connection.clone())
            .await;

        match released {
            Ok(1) => {}
            Ok(_) => tracing::warn!(key = %self.key, "lock expired before release"),
            Err(error) => tracing::warn!(key = %self.key, error = %error, "failed to release lock"),
        }
    }
}

impl<C> Locker for RedisLocker<C>
where
    C: ConnectionLike + Clone + Send + Sync,
{
    async fn try_run<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = T> + Send,
        T: Send,
    {
        let token = Uuid::new_v4().to_string();
        if !self.acquire(&token).await? {
            return Err(Error::locked(&self.key));
        }

        let output = f().await;
        self.release(&token).await;
        Ok(output)
    }
}
