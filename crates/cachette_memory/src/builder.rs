// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for configuring in-memory stores.

use cachette::{Codec, JsonCodec, Prefix};
use tick::Clock;

use crate::backend::MemoryBackend;
use crate::store::MemoryStore;

/// Builder for configuring a [`MemoryStore`].
///
/// # Examples
///
/// ```
/// use cachette::Store;
/// use cachette_memory::{MemoryBackend, MemoryStore};
/// use tick::Clock;
///
/// let store = MemoryStore::builder(MemoryBackend::new(), Clock::new_frozen())
///     .prefix("sessions")
///     .build();
/// assert_eq!(store.prefix(), "sessions:");
/// ```
#[derive(Debug)]
pub struct MemoryStoreBuilder<C = JsonCodec> {
    backend: MemoryBackend,
    clock: Clock,
    prefix: Prefix,
    codec: C,
}

impl MemoryStoreBuilder {
    pub(crate) fn new(backend: MemoryBackend, clock: Clock) -> Self {
        Self {
            backend,
            clock,
            prefix: Prefix::default(),
            codec: JsonCodec,
        }
    }
}

impl<C: Codec> MemoryStoreBuilder<C> {
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
    #[must_use]
    pub fn codec<C2: Codec>(self, codec: C2) -> MemoryStoreBuilder<C2> {
        MemoryStoreBuilder {
            backend: self.backend,
            clock: self.clock,
            prefix: self.prefix,
            codec,
        }
    }

    /// Builds the configured [`MemoryStore`].
    #[must_use]
    pub fn build(self) -> MemoryStore<C> {
        MemoryStore::from_parts(self.backend, self.clock, self.prefix, self.codec)
    }
}
