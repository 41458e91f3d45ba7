// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The core contracts for cache backends.
//!
//! [`Store`] is the interface every backend implements. [`Addable`] is an
//! optional capability for backends that can atomically create an entry only
//! when it is absent; a store advertises it through [`Store::addable`].

use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};

use crate::{Locker, Result};

/// Shortest expiry a backend honors. Shorter ttls, including zero, are rounded up to it.
pub const MIN_TTL: Duration = Duration::from_millis(1);

/// The canonical cache operations over a key/value backend.
///
/// Keys are logical: the store prepends its [`prefix`](Store::prefix) before
/// talking to the backend. Values go through the store's [`Codec`](crate::Codec),
/// except for counters, which use the backend's native integers.
///
/// Stores carry no cache state of their own. Every call reaches the backend,
/// and dropping a returned future abandons the call.
///
/// # Implementing a Store
///
/// Backends without an atomic "set if absent" primitive name [`NotAddable`] as
/// their [`Addable`](Store::Addable) type and keep the default
/// [`addable`](Store::addable), which returns `None`.
pub trait Store: Send + Sync {
    /// The lock handle returned by [`lock`](Store::lock).
    type Locker: Locker;

    /// The native atomic add capability, or [`NotAddable`].
    type Addable: Addable;

    /// Returns `true` if `key` is present and unexpired.
    ///
    /// Absence is never reported as an error.
    fn has(&self, key: &str) -> impl Future<Output = Result<bool>> + Send;

    /// Retrieves and decodes the value under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error of kind [`NotFound`](crate::ErrorKind::NotFound) if the key is
    /// absent or expired, [`Codec`](crate::ErrorKind::Codec) if the payload does not
    /// decode as `V`, or [`Backend`](crate::ErrorKind::Backend) if the backend fails.
    fn get<V>(&self, key: &str) -> impl Future<Output = Result<V>> + Send
    where
        V: DeserializeOwned + Send;

    /// Stores `value` under `key`, expiring after `ttl`.
    ///
    /// Overwrites any existing entry. A zero `ttl` does not mean "forever";
    /// use [`forever`](Store::forever) for entries without expiry.
    fn put<V>(&self, key: &str, value: &V, ttl: Duration) -> impl Future<Output = Result<bool>> + Send
    where
        V: Serialize + Sync + ?Sized;

    /// Atomically adds `delta` to the integer under `key` and returns the new value.
    ///
    /// A missing key counts from zero.
    ///
    /// # Errors
    ///
    /// Returns an error of kind [`NotInteger`](crate::ErrorKind::NotInteger) if the
    /// existing value is not an integer; the entry is left unchanged.
    fn increment(&self, key: &str, delta: i64) -> impl Future<Output = Result<i64>> + Send;

    /// Atomically subtracts `delta` from the integer under `key` and returns the new value.
    ///
    /// A missing key counts from zero.
    ///
    /// # Errors
    ///
    /// Returns an error of kind [`NotInteger`](crate::ErrorKind::NotInteger) if the
    /// existing value is not an integer; the entry is left unchanged.
    fn decrement(&self, key: &str, delta: i64) -> impl Future<Output = Result<i64>> + Send;

    /// Stores `value` under `key` without expiry.
    fn forever<V>(&self, key: &str, value: &V) -> impl Future<Output = Result<bool>> + Send
    where
        V: Serialize + Sync + ?Sized;

    /// Deletes `key`. Succeeds whether or not the key existed.
    fn forget(&self, key: &str) -> impl Future<Output = Result<bool>> + Send;

    /// Deletes every entry in this store's namespace.
    fn flush(&self) -> impl Future<Output = Result<bool>> + Send;

    /// Returns the normalized key prefix.
    fn prefix(&self) -> &str;

    /// Returns a lock handle for `key` held for at most `ttl` once acquired.
    ///
    /// No acquisition is attempted until the handle is used.
    fn lock(&self, key: &str, ttl: Duration) -> Self::Locker;

    /// Returns the native atomic add capability, if the backend has one.
    fn addable(&self) -> Option<&Self::Addable> {
        None
    }
}

/// Atomic "store if absent".
pub trait Addable: Send + Sync {
    /// Stores `value` under `key` with `ttl` only if the key is absent or expired.
    ///
    /// Returns `true` if the value was written and `false` if a live entry
    /// already existed.
    fn add<V>(&self, key: &str, value: &V, ttl: Duration) -> impl Future<Output = Result<bool>> + Send
    where
        V: Serialize + Sync + ?Sized;
}

/// The [`Addable`] type of stores that have no native atomic add.
///
/// This type has no values, so its `add` can never be called.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotAddable {}

impl Addable for NotAddable {
    async fn add<V>(&self, _key: &str, _value: &V, _ttl: Duration) -> Result<bool>
    where
        V: Serialize + Sync + ?Sized,
    {
        match *self {}
    }
}
