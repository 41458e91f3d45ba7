// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for `Repository` over minimal third-party stores.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use cachette::{Addable, Codec, Error, ErrorKind, JsonCodec, Locker, NotAddable, Prefix, Repository, Result, Store};
use serde::{Serialize, de::DeserializeOwned};

const TTL: Duration = Duration::from_secs(30);

/// Lock that always acquires.
struct FreeLock;

impl Locker for FreeLock {
    async fn try_run<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = T> + Send,
        T: Send,
    {
        Ok(f().await)
    }
}

/// Minimal store that only provides required methods.
struct MinimalStore {
    prefix: Prefix,
    data: Mutex<HashMap<String, Vec<u8>>>,
    native_adds: AtomicUsize,
}

impl MinimalStore {
    fn new(prefix: &str) -> Self {
        Self {
            prefix: Prefix::new(prefix),
            data: Mutex::new(HashMap::new()),
            native_adds: AtomicUsize::new(0),
        }
    }

    fn write<V: Serialize + ?Sized>(&self, key: &str, value: &V) -> Result<bool> {
        let payload = JsonCodec.encode(value)?;
        self.data
            .lock()
            .expect("lock poisoned")
            .insert(self.prefix.apply(key), payload);
        Ok(true)
    }

    fn delta(&self, key: &str, delta: i64) -> Result<i64> {
        let mut data = self.data.lock().expect("lock poisoned");
        let full = self.prefix.apply(key);
        let current = match data.get(&full) {
            Some(payload) => JsonCodec
                .decode::<i64>(payload)
                .map_err(|e| Error::not_integer(key, e))?,
            None => 0,
        };
        let next = current + delta;
        data.insert(full, next.to_string().into_bytes());
        Ok(next)
    }
}

impl Store for MinimalStore {
    type Locker = FreeLock;
    type Addable = NotAddable;

    async fn has(&self, key: &str) -> Result<bool> {
        Ok(self.data.lock().expect("lock poisoned").contains_key(&self.prefix.apply(key)))
    }

    async fn get<V: DeserializeOwned + Send>(&self, key: &str) -> Result<V> {
        let payload = self.data.lock().expect("lock poisoned").get(&self.prefix.apply(key)).cloned();
        JsonCodec.decode(&payload.ok_or_else(|| Error::not_found(key))?)
    }

    async fn put<V: Serialize + Sync + ?Sized>(&self, key: &str, value: &V, _ttl: Duration) -> Result<bool> {
        self.write(key, value)
    }

    async fn increment(&self, key: &str, delta: i64) -> Result<i64> {
        self.delta(key, delta)
    }

    async fn decrement(&self, key: &str, delta: i64) -> Result<i64> {
        self.delta(key, -delta)
    }

    async fn forever<V: Serialize + Sync + ?Sized>(&self, key: &str, value: &V) -> Result<bool> {
        self.write(key, value)
    }

    async fn forget(&self, key: &str) -> Result<bool> {
        self.data.lock().expect("lock poisoned").remove(&self.prefix.apply(key));
        Ok(true)
    }

    async fn flush(&self) -> Result<bool> {
        let prefix = &self.prefix;
        self.data.lock().expect("lock poisoned").retain(|key, _| !prefix.owns(key));
        Ok(true)
    }

    fn prefix(&self) -> &str {
        self.prefix.as_str()
    }

    fn lock(&self, _key: &str, _ttl: Duration) -> Self::Locker {
        FreeLock
    }
}

/// Store with a native atomic add that counts how often it is used.
struct AtomicStore(MinimalStore);

impl Addable for AtomicStore {
    async fn add<V: Serialize + Sync + ?Sized>(&self, key: &str, value: &V, _ttl: Duration) -> Result<bool> {
        self.0.native_adds.fetch_add(1, Ordering::SeqCst);
        let payload = JsonCodec.encode(value)?;
        let mut data = self.0.data.lock().expect("lock poisoned");
        let full = self.0.prefix.apply(key);
        if data.contains_key(&full) {
            return Ok(false);
        }
        data.insert(full, payload);
        Ok(true)
    }
}

impl Store for AtomicStore {
    type Locker = FreeLock;
    type Addable = Self;

    async fn has(&self, key: &str) -> Result<bool> {
        self.0.has(key).await
    }

    async fn get<V: DeserializeOwned + Send>(&self, key: &str) -> Result<V> {
        self.0.get(key).await
    }

    async fn put<V: Serialize + Sync + ?Sized>(&self, key: &str, value: &V, ttl: Duration) -> Result<bool> {
        self.0.put(key, value, ttl).await
    }

    async fn increment(&self, key: &str, delta: i64) -> Result<i64> {
        self.0.increment(key, delta).await
    }

    async fn decrement(&self, key: &str, delta: i64) -> Result<i64> {
        self.0.decrement(key, delta).await
    }

    async fn forever<V: Serialize + Sync + ?Sized>(&self, key: &str, value: &V) -> Result<bool> {
        self.0.forever(key, value).await
    }

    async fn forget(&self, key: &str) -> Result<bool> {
        self.0.forget(key).await
    }

    async fn flush(&self) -> Result<bool> {
        self.0.flush().await
    }

    fn prefix(&self) -> &str {
        self.0.prefix()
    }

    fn lock(&self, key: &str, ttl: Duration) -> Self::Locker {
        self.0.lock(key, ttl)
    }

    fn addable(&self) -> Option<&Self::Addable> {
        Some(self)
    }
}

#[tokio::test]
async fn emulated_add_creates_only_when_missing() {
    let repository = Repository::new(MinimalStore::new("app"));

    assert!(repository.add("greeting", "hello", TTL).await.expect("first add"));
    assert!(!repository.add("greeting", "bye", TTL).await.expect("second add"));

    let value: String = repository.get("greeting").await.expect("get");
    assert_eq!(value, "hello");
}

#[tokio::test]
async fn native_add_is_preferred() {
    let repository = Repository::new(AtomicStore(MinimalStore::new("app")));

    assert!(repository.add("greeting", "hello", TTL).await.expect("first add"));
    assert!(!repository.add("greeting", "bye", TTL).await.expect("second add"));
    assert_eq!(repository.inner().0.native_adds.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn reported_add_capability_matches_wrapped_store() {
    let emulated = Repository::new(MinimalStore::new("app"));
    assert!(emulated.addable().is_none());

    let native = Repository::new(AtomicStore(MinimalStore::new("app")));
    let capability = native.addable().expect("native add is reported");
    assert!(capability.add("k", &1, TTL).await.expect("add through capability"));
    assert_eq!(native.inner().0.native_adds.load(Ordering::SeqCst), 1);

    let nested = Repository::new(Repository::new(MinimalStore::new("app")));
    assert!(nested.addable().is_none());
    assert!(nested.add("k", &1, TTL).await.expect("emulated add"));
    assert!(!nested.add("k", &1, TTL).await.expect("emulated add"));
}

#[tokio::test]
async fn native_and_emulated_add_agree() {
    let emulated = Repository::new(MinimalStore::new(""));
    let native = Repository::new(AtomicStore(MinimalStore::new("")));

    for key in ["a", "b", "a", "c", "b"] {
        let from_emulated = emulated.add(key, &1, TTL).await.expect("emulated add");
        let from_native = native.add(key, &1, TTL).await.expect("native add");
        assert_eq!(from_emulated, from_native, "add disagreed on {key}");
    }
}

#[tokio::test]
async fn missing_is_negation_of_has() {
    let repository = Repository::new(MinimalStore::new("app"));

    assert!(repository.missing("k").await.expect("missing"));
    repository.set("k", &7, TTL).await.expect("set");
    assert!(!repository.missing("k").await.expect("missing"));
    assert!(repository.has("k").await.expect("has"));

    repository.delete("k").await.expect("delete");
    assert!(repository.missing("k").await.expect("missing"));
}

#[tokio::test]
async fn get_on_absent_key_is_not_found() {
    let repository = Repository::new(MinimalStore::new("app"));

    let error = repository.get::<String>("absent").await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::NotFound);
    assert_eq!(error.key(), Some("absent"));
}

#[tokio::test]
async fn counters_pass_through() {
    let repository = Repository::new(MinimalStore::new("app"));

    assert_eq!(repository.increment("hits", 5).await.expect("increment"), 5);
    assert_eq!(repository.decrement("hits", 2).await.expect("decrement"), 3);

    repository.set("name", "text", TTL).await.expect("set");
    let error = repository.increment("name", 1).await.unwrap_err();
    assert!(error.is_not_integer());
}

#[tokio::test]
async fn flush_only_touches_own_prefix() {
    let repository = Repository::new(MinimalStore::new("app"));
    repository.set("k", &1, TTL).await.expect("set");
    repository
        .inner()
        .data
        .lock()
        .expect("lock poisoned")
        .insert("other:k".to_owned(), b"1".to_vec());

    assert!(repository.flush().await.expect("flush"));
    assert!(repository.missing("k").await.expect("missing"));
    assert!(repository.inner().data.lock().expect("lock poisoned").contains_key("other:k"));
}

#[tokio::test]
async fn prefix_and_lock_delegate() {
    let repository = Repository::from(MinimalStore::new("app::"));
    assert_eq!(repository.prefix(), "app:");

    let ran = repository.lock("job", TTL).try_run(|| async { true }).await.expect("lock");
    assert!(ran);
}
