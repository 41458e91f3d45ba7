// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Guard that keeps a keyed job from running concurrently across processes.

use std::time::Duration;

use crate::{Locker, Result, Store};

/// Default time a job may hold its lock.
pub const DEFAULT_JOB_TTL: Duration = Duration::from_secs(60 * 60);

/// Default prefix for job lock keys.
pub const DEFAULT_JOB_KEY_PREFIX: &str = "cron:mutex:";

/// Runs keyed jobs so that at most one instance of each runs at a time.
///
/// Every process that shares the underlying store sees the same locks, so a
/// scheduled job that fires on several replicas runs on one of them and is
/// skipped on the rest. A skipped run is not an error.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
///
/// use cachette::{NoOverlap, Store};
///
/// async fn nightly_report<S: Store>(store: S) -> cachette::Result<()> {
///     let guard = NoOverlap::new(store).ttl(Duration::from_secs(15 * 60));
///
///     match guard.run("nightly-report", || async { 42 }).await? {
///         Some(rows) => println!("report written with {rows} rows"),
///         None => println!("another replica is writing the report"),
///     }
///     Ok(())
/// }
/// ```
#[derive(Clone, Debug)]
pub struct NoOverlap<S> {
    store: S,
    ttl: Duration,
    key_prefix: String,
}

impl<S: Store> NoOverlap<S> {
    /// Creates a guard backed by `store`'s locks.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            ttl: DEFAULT_JOB_TTL,
            key_prefix: DEFAULT_JOB_KEY_PREFIX.to_owned(),
        }
    }

    /// Sets how long a job may hold its lock. Should exceed the job's run time.
    #[must_use]
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the prefix placed in front of job keys.
    #[must_use]
    pub fn key_prefix(mut self, key_prefix: impl Into<String>) -> Self {
        self.key_prefix = key_prefix.into();
        self
    }

    /// Returns the wrapped store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs `job` unless another holder currently runs the job named `job_key`.
    ///
    /// Returns `Some` with the job's output if it ran and `None` if it was
    /// skipped because the lock was held.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock could not be attempted because the backend failed.
    pub async fn run<F, Fut, T>(&self, job_key: &str, job: F) -> Result<Option<T>>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = T> + Send,
        T: Send,
    {
        let key = format!("{}{job_key}", self.key_prefix);
        match self.store.lock(&key, self.ttl).try_run(job).await {
            Ok(output) => Ok(Some(output)),
            Err(error) if error.is_locked() => {
                tracing::info!(key = %key, "skipping job, another run holds its lock");
                Ok(None)
            }
            Err(error) => {
                tracing::error!(key = %key, error = %error, "failed to acquire job lock");
                Err(error)
            }
        }
    }
}
