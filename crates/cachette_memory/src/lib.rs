// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! In-process backend for the [`cachette`] store contract.
//!
//! [`MemoryStore`] implements [`cachette::Store`] over a [`MemoryBackend`],
//! a shared engine that several stores can use at once with different
//! prefixes. It honors the same contract as the network backends: per-entry
//! expiry, integer counters, prefix-scoped flush, a native atomic add and
//! locks kept apart from regular entries.
//!
//! Time comes from a [`tick::Clock`], so expiry can be tested without sleeping.
//!
//! # Quick Start
//!
//! ```
//! use std::time::Duration;
//!
//! use cachette::{Addable, Repository, Store};
//! use cachette_memory::{MemoryBackend, MemoryStore};
//! use tick::ClockControl;
//!
//! # futures::executor::block_on(async {
//! let control = ClockControl::new();
//! let store = MemoryStore::builder(MemoryBackend::new(), control.to_clock())
//!     .prefix("app")
//!     .build();
//! let repository = Repository::new(store);
//!
//! assert!(repository.add("token", "abc", Duration::from_secs(10)).await.unwrap());
//! assert!(!repository.add("token", "xyz", Duration::from_secs(10)).await.unwrap());
//!
//! control.advance(Duration::from_secs(10));
//! assert!(repository.missing("token").await.unwrap());
//! # });
//! ```

mod backend;
mod builder;
mod store;

#[doc(inline)]
pub use backend::MemoryBackend;
#[doc(inline)]
pub use builder::MemoryStoreBuilder;
#[doc(inline)]
pub use store::{MemoryLocker, MemoryStore};
