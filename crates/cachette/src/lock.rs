// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Distributed mutual exclusion.

use crate::Result;

/// Prefix reserved for lock keys, placed in front of the store prefix.
///
/// Keeping locks outside the store namespace means a `flush` never releases a
/// lock that an in-flight critical section still relies on.
pub const LOCK_NAMESPACE: &str = "lock:";

/// A per-key lock with single-shot try-and-run semantics.
///
/// A locker is obtained from [`Store::lock`](crate::Store::lock) and is bound
/// to a key and a ttl. Acquisition either succeeds immediately or fails with
/// an error of kind [`Locked`](crate::ErrorKind::Locked); it never waits.
///
/// The ttl is the only protection against a holder that crashes, and it is
/// not extended while the critical section runs. Choose a ttl comfortably
/// larger than the work it guards.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
///
/// use cachette::{Locker, Store};
///
/// async fn rebuild_index<S: Store>(store: &S) -> cachette::Result<()> {
///     store
///         .lock("index:rebuild", Duration::from_secs(30))
///         .try_run(|| async {
///             // only one caller across all processes gets here at a time
///         })
///         .await
/// }
/// ```
pub trait Locker: Send + Sync {
    /// Tries once to acquire the lock and, on success, runs `f` while holding it.
    ///
    /// The lock is released after `f` completes. Release is best effort: if it
    /// fails, the lock still expires when its ttl elapses.
    ///
    /// # Errors
    ///
    /// Returns an error of kind [`Locked`](crate::ErrorKind::Locked) without running
    /// `f` if the lock is held, or [`Backend`](crate::ErrorKind::Backend) if the
    /// acquisition attempt itself fails.
    fn try_run<F, Fut, T>(&self, f: F) -> impl Future<Output = Result<T>> + Send
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = T> + Send,
        T: Send;
}
