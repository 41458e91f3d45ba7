// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Backend-agnostic cache contracts.
//!
//! This crate defines the [`Store`] trait that every cache backend implements,
//! the optional [`Addable`] capability for atomic "create if absent", and the
//! [`Locker`] trait for distributed mutual exclusion. [`Repository`] decorates
//! any store with derived operations, and [`NoOverlap`] uses a store's locks to
//! keep keyed jobs from running concurrently.
//!
//! Values are serialized by a pluggable [`Codec`]; [`JsonCodec`] is provided.
//! Failures are reported as [`Error`], whose [`ErrorKind`] tells expected
//! conditions apart from backend failures.
//!
//! # Implementing a Store
//!
//! Implement all required methods of [`Store`]. Backends without a native
//! atomic add use [`NotAddable`]; the [`Repository`] then emulates `add`.
//!
//! ```
//! use std::collections::HashMap;
//! use std::sync::Mutex;
//! use std::time::Duration;
//!
//! use cachette::{Codec, Error, JsonCodec, Locker, NotAddable, Result, Store};
//! # use serde::{Serialize, de::DeserializeOwned};
//!
//! struct SimpleStore(Mutex<HashMap<String, Vec<u8>>>);
//! # struct NoLock;
//! # impl Locker for NoLock {
//! #     async fn try_run<F, Fut, T>(&self, f: F) -> Result<T>
//! #     where F: FnOnce() -> Fut + Send, Fut: Future<Output = T> + Send, T: Send { Ok(f().await) }
//! # }
//!
//! impl Store for SimpleStore {
//!     type Locker = NoLock;
//!     type Addable = NotAddable;
//!
//!     async fn has(&self, key: &str) -> Result<bool> {
//!         Ok(self.0.lock().unwrap().contains_key(key))
//!     }
//!
//!     async fn get<V: DeserializeOwned + Send>(&self, key: &str) -> Result<V> {
//!         let payload = self.0.lock().unwrap().get(key).cloned();
//!         JsonCodec.decode(&payload.ok_or_else(|| Error::not_found(key))?)
//!     }
//!     # async fn put<V: Serialize + Sync + ?Sized>(&self, key: &str, value: &V, _ttl: Duration) -> Result<bool> {
//!     #     self.0.lock().unwrap().insert(key.to_owned(), JsonCodec.encode(value)?);
//!     #     Ok(true)
//!     # }
//!     # async fn increment(&self, _key: &str, delta: i64) -> Result<i64> { Ok(delta) }
//!     # async fn decrement(&self, _key: &str, delta: i64) -> Result<i64> { Ok(-delta) }
//!     # async fn forever<V: Serialize + Sync + ?Sized>(&self, key: &str, value: &V) -> Result<bool> {
//!     #     self.put(key, value, Duration::ZERO).await
//!     # }
//!     # async fn forget(&self, key: &str) -> Result<bool> { self.0.lock().unwrap().remove(key); Ok(true) }
//!     # async fn flush(&self) -> Result<bool> { self.0.lock().unwrap().clear(); Ok(true) }
//!     # fn prefix(&self) -> &str { "" }
//!     # fn lock(&self, _key: &str, _ttl: Duration) -> NoLock { NoLock }
//!
//!     // ... the remaining operations
//! }
//! ```
//!
//! # Testing
//!
//! Enable the `test-util` feature for [`testing::MockStore`], a recording store
//! with failure injection.

mod codec;
pub mod error;
mod lock;
mod overlap;
mod prefix;
mod repository;
mod store;
#[cfg(any(feature = "test-util", test))]
pub mod testing;

#[doc(inline)]
pub use codec::{Codec, JsonCodec};
#[doc(inline)]
pub use error::{Error, ErrorKind, Result};
#[doc(inline)]
pub use lock::{LOCK_NAMESPACE, Locker};
#[doc(inline)]
pub use overlap::{DEFAULT_JOB_KEY_PREFIX, DEFAULT_JOB_TTL, NoOverlap};
#[doc(inline)]
pub use prefix::{Prefix, SEPARATOR};
#[doc(inline)]
pub use repository::Repository;
#[doc(inline)]
pub use store::{Addable, MIN_TTL, NotAddable, Store};
