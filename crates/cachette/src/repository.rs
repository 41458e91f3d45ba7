// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Decorator that adds derived operations on top of any store.

use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};

use crate::{Addable, Result, Store};

/// Adds convenience operations and a universal [`add`](Addable::add) to a [`Store`].
///
/// `Repository` implements [`Store`] by delegating to the wrapped store, so it
/// can be used anywhere a store is expected. On top of that it provides
/// [`missing`](Self::missing), [`delete`](Self::delete), [`set`](Self::set) and
/// an [`Addable`] implementation that works for every backend.
///
/// # Atomicity of `add`
///
/// When the wrapped store exposes a native [`Addable`] capability, `add`
/// delegates to it and is atomic, and the repository reports the same
/// capability through [`addable`](Store::addable). Otherwise `add` is emulated as
/// [`missing`](Self::missing) followed by [`set`](Self::set). The emulation is
/// **not atomic**: two concurrent callers can both observe the key as missing
/// and both write it. Callers that need exactly-once creation on such a
/// backend should guard the call with the store's [`lock`](Store::lock). In
/// that case the repository's own [`addable`](Store::addable) returns `None`.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
///
/// use cachette::{Addable, Repository, Store};
///
/// async fn remember_first_visit<S: Store>(repository: &Repository<S>, user: &str) -> cachette::Result<bool> {
///     repository.add(user, &"first-visit", Duration::from_secs(3600)).await
/// }
/// ```
#[derive(Clone, Debug)]
pub struct Repository<S> {
    store: S,
}

impl<S> Repository<S> {
    /// Wraps `store`.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the wrapped store.
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.store
    }

    /// Consumes the repository and returns the wrapped store.
    #[must_use]
    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S: Store> Repository<S> {
    /// Returns `true` if `key` is absent or expired.
    ///
    /// This is the exact negation of [`has`](Store::has); backend errors are
    /// returned unchanged.
    pub async fn missing(&self, key: &str) -> Result<bool> {
        self.store.has(key).await.map(|present| !present)
    }

    /// Deletes `key`. Same as [`forget`](Store::forget).
    pub async fn delete(&self, key: &str) -> Result<bool> {
        self.store.forget(key).await
    }

    /// Stores `value` under `key` with `ttl`. Same as [`put`](Store::put).
    pub async fn set<V>(&self, key: &str, value: &V, ttl: Duration) -> Result<bool>
    where
        V: Serialize + Sync + ?Sized,
    {
        self.store.put(key, value, ttl).await
    }
}

impl<S: Store> Addable for Repository<S> {
    async fn add<V>(&self, key: &str, value: &V, ttl: Duration) -> Result<bool>
    where
        V: Serialize + Sync + ?Sized,
    {
        if let Some(native) = self.store.addable() {
            return native.add(key, value, ttl).await;
        }

        tracing::debug!(key, "store has no atomic add, falling back to check-then-set");
        if self.missing(key).await? {
            self.set(key, value, ttl).await
        } else {
            Ok(false)
        }
    }
}

impl<S: Store> Store for Repository<S> {
    type Locker = S::Locker;
    type Addable = Self;

    async fn has(&self, key: &str) -> Result<bool> {
        self.store.has(key).await
    }

    async fn get<V>(&self, key: &str) -> Result<V>
    where
        V: DeserializeOwned + Send,
    {
        self.store.get(key).await
    }

    async fn put<V>(&self, key: &str, value: &V, ttl: Duration) -> Result<bool>
    where
        V: Serialize + Sync + ?Sized,
    {
        self.store.put(key, value, ttl).await
    }

    async fn increment(&self, key: &str, delta: i64) -> Result<i64> {
        self.store.increment(key, delta).await
    }

    async fn decrement(&self, key: &str, delta: i64) -> Result<i64> {
        self.store.decrement(key, delta).await
    }

    async fn forever<V>(&self, key: &str, value: &V) -> Result<bool>
    where
        V: Serialize + Sync + ?Sized,
    {
        self.store.forever(key, value).await
    }

    async fn forget(&self, key: &str) -> Result<bool> {
        self.store.forget(key).await
    }

    async fn flush(&self) -> Result<bool> {
        self.store.flush().await
    }

    fn prefix(&self) -> &str {
        self.store.prefix()
    }

    fn lock(&self, key: &str, ttl: Duration) -> Self::Locker {
        self.store.lock(key, ttl)
    }

    fn addable(&self) -> Option<&Self::Addable> {
        self.store.addable().map(|_| self)
    }
}

impl<S> From<S> for Repository<S> {
    fn from(store: S) -> Self {
        Self::new(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::testing::{MockStore, StoreOp};

    const TTL: Duration = Duration::from_secs(60);

    fn block_on<F: std::future::Future>(f: F) -> F::Output {
        futures::executor::block_on(f)
    }

    #[test]
    fn add_without_native_capability_checks_then_sets() {
        block_on(async {
            let repository = Repository::new(MockStore::new());

            assert!(repository.add("key", &1, TTL).await.unwrap());
            assert_eq!(
                repository.inner().operations(),
                vec![
                    StoreOp::Has("key".to_string()),
                    StoreOp::Put {
                        key: "key".to_string(),
                        ttl: TTL
                    },
                ]
            );
        });
    }

    #[test]
    fn add_on_present_key_does_not_write() {
        block_on(async {
            let repository = Repository::new(MockStore::new());
            repository.set("key", &1, TTL).await.unwrap();
            repository.inner().clear_operations();

            assert!(!repository.add("key", &2, TTL).await.unwrap());
            assert_eq!(repository.inner().operations(), vec![StoreOp::Has("key".to_string())]);

            let value: i32 = repository.get("key").await.unwrap();
            assert_eq!(value, 1);
        });
    }

    #[test]
    fn add_propagates_has_failure_without_writing() {
        block_on(async {
            let repository = Repository::new(MockStore::new());
            repository.inner().fail_when(|op| matches!(op, StoreOp::Has(_)));

            let error = repository.add("key", &1, TTL).await.unwrap_err();
            assert_eq!(error.kind(), ErrorKind::Backend);
            assert!(!repository.inner().contains_key("key"));
        });
    }

    #[test]
    fn missing_negates_has() {
        block_on(async {
            let repository = Repository::new(MockStore::new());
            assert!(repository.missing("key").await.unwrap());

            repository.set("key", "value", TTL).await.unwrap();
            assert!(!repository.missing("key").await.unwrap());
        });
    }

    #[test]
    fn missing_and_has_fail_with_the_same_kind() {
        block_on(async {
            let repository = Repository::new(MockStore::new());
            repository.inner().fail_when(|op| matches!(op, StoreOp::Has(_)));

            let from_has = repository.has("key").await.unwrap_err();
            let from_missing = repository.missing("key").await.unwrap_err();
            assert_eq!(from_has.kind(), from_missing.kind());
            assert_eq!(from_has.key(), from_missing.key());
        });
    }

    #[test]
    fn delete_and_set_are_aliases() {
        block_on(async {
            let repository = Repository::new(MockStore::new());
            repository.set("key", "value", TTL).await.unwrap();
            assert!(repository.delete("key").await.unwrap());
            assert!(repository.delete("key").await.unwrap());

            assert_eq!(
                repository.inner().operations(),
                vec![
                    StoreOp::Put {
                        key: "key".to_string(),
                        ttl: TTL
                    },
                    StoreOp::Forget("key".to_string()),
                    StoreOp::Forget("key".to_string()),
                ]
            );
        });
    }

    #[test]
    fn repository_over_emulated_add_reports_no_native_capability() {
        let repository = Repository::new(MockStore::new());
        assert!(repository.inner().addable().is_none());
        assert!(repository.addable().is_none());
    }

    #[test]
    fn nested_repository_uses_inner_add() {
        block_on(async {
            let repository = Repository::new(Repository::new(MockStore::with_prefix("app")));
            assert_eq!(repository.prefix(), "app:");

            assert!(repository.addable().is_none());
            assert!(repository.add("key", &1, TTL).await.unwrap());
            assert!(!repository.add("key", &1, TTL).await.unwrap());
        });
    }
}
