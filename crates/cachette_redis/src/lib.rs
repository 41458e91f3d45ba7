// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Redis backend for the [`cachette`] store contract.
//!
//! [`RedisStore`] maps every [`cachette::Store`] operation onto Redis
//! commands over a caller-provided async connection:
//!
//! | Operation | Command |
//! |-----------|---------|
//! | `has` | `EXISTS` |
//! | `get` | `GET` |
//! | `put` | `SET key value PX ms` |
//! | `forever` | `SET key value` |
//! | `add` | `SET key value NX PX ms` |
//! | `increment` / `decrement` | `INCRBY` / `DECRBY` |
//! | `forget` | `DEL` |
//! | `flush` | `SCAN MATCH prefix*` and batched `DEL` |
//! | `lock` | `SET lock:key token NX PX ms`, released with a compare-and-delete script |
//!
//! Expiry has millisecond resolution; shorter ttls are rounded up to 1 ms.
//! Ttls too large for the server's expiry clock (beyond 2^62 ms) are stored
//! without expiry. Keys in the `lock:` namespace are reserved for locks and
//! are refused by every data operation.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use cachette::{Locker, NoOverlap, Store};
//! use cachette_redis::RedisStore;
//! use redis::aio::ConnectionManager;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = redis::Client::open("redis://127.0.0.1:6379")?;
//! let store = RedisStore::builder(ConnectionManager::new(client).await?)
//!     .prefix("billing")
//!     .build();
//!
//! store.increment("invoices", 1).await?;
//!
//! let guard = NoOverlap::new(store);
//! guard.run("close-month", || async { /* ... */ }).await?;
//! # Ok(())
//! # }
//! ```

mod builder;
mod locker;
mod reply;
mod store;

#[doc(inline)]
pub use builder::RedisStoreBuilder;
#[doc(inline)]
pub use locker::RedisLocker;
#[doc(inline)]
pub use store::RedisStore;
