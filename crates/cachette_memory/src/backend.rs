// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The shared in-process engine behind [`MemoryStore`](crate::MemoryStore).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cachette::Prefix;
use parking_lot::Mutex;

/// A shared in-process key/value engine.
///
/// Cloning a `MemoryBackend` yields another handle to the same engine, so
/// several [`MemoryStore`](crate::MemoryStore)s with different prefixes can
/// share one keyspace, the way several clients share one Redis server.
///
/// Expired entries are removed lazily, when an operation touches them. Every
/// 1024 writes the engine also sweeps out all expired entries and
/// leases, so keys that are written once and never read again do not pile up.
///
/// # Examples
///
/// ```
/// use cachette_memory::MemoryBackend;
///
/// let backend = MemoryBackend::new();
/// let shared = backend.clone();
/// assert!(backend.is_empty());
/// assert!(shared.is_empty());
/// ```
#[derive(Clone, Debug, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<State>>,
}

/// Number of writes between two sweeps of expired entries and leases.
pub(crate) const SWEEP_EVERY: u32 = 1024;

#[derive(Debug, Default)]
struct State {
    entries: HashMap<String, Slot>,
    leases: HashMap<String, Lease>,
    next_token: u64,
    writes: u32,
}

#[derive(Debug)]
struct Slot {
    payload: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Slot {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|deadline| now < deadline)
    }
}

#[derive(Debug)]
struct Lease {
    token: u64,
    expires_at: Option<Instant>,
}

impl Lease {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|deadline| now < deadline)
    }
}

/// Why a counter update was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CounterError {
    NotInteger,
    Overflow,
}

/// Deadline for an entry written at `now` with `ttl`, or `None` when it is too far out to represent.
pub(crate) fn deadline(now: Instant, ttl: Duration) -> Option<Instant> {
    now.checked_add(ttl)
}

impl State {
    fn live_entry(&mut self, key: &str, now: Instant) -> Option<&mut Slot> {
        if self.entries.get(key).is_some_and(|slot| !slot.is_live(now)) {
            self.entries.remove(key);
        }
        self.entries.get_mut(key)
    }

    fn insert(&mut self, key: &str, slot: Slot, now: Instant) {
        self.entries.insert(key.to_owned(), slot);
        self.note_write(now);
    }

    fn note_write(&mut self, now: Instant) {
        self.writes += 1;
        if self.writes >= SWEEP_EVERY {
            self.writes = 0;
            self.sweep(now);
        }
    }

    fn sweep(&mut self, now: Instant) {
        self.entries.retain(|_, slot| slot.is_live(now));
        self.leases.retain(|_, lease| lease.is_live(now));
    }
}

impl MemoryBackend {
    /// Creates an empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored entries, including expired ones not yet removed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Returns `true` if the engine holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    pub(crate) fn contains(&self, key: &str, now: Instant) -> bool {
        self.state.lock().live_entry(key, now).is_some()
    }

    pub(crate) fn read(&self, key: &str, now: Instant) -> Option<Vec<u8>> {
        self.state.lock().live_entry(key, now).map(|slot| slot.payload.clone())
    }

    pub(crate) fn write(&self, key: &str, payload: Vec<u8>, expires_at: Option<Instant>, now: Instant) {
        self.state.lock().insert(key, Slot { payload, expires_at }, now);
    }

    pub(crate) fn write_if_absent(&self, key: &str, payload: Vec<u8>, expires_at: Option<Instant>, now: Instant) -> bool {
        let mut state = self.state.lock();
        if state.live_entry(key, now).is_some() {
            return false;
        }
        state.insert(key, Slot { payload, expires_at }, now);
        true
    }

    /// Adds `delta` to the decimal integer under `key`, keeping the entry's expiry.
    pub(crate) fn apply_delta(&self, key: &str, delta: i64, now: Instant) -> Result<i64, CounterError> {
        let mut state = self.state.lock();
        let Some(slot) = state.live_entry(key, now) else {
            let payload = delta.to_string().into_bytes();
            state.insert(key, Slot { payload, expires_at: None }, now);
            return Ok(delta);
        };

        let current = std::str::from_utf8(&slot.payload)
            .ok()
            .and_then(|text| text.parse::<i64>().ok())
            .ok_or(CounterError::NotInteger)?;
        let next = current.checked_add(delta).ok_or(CounterError::Overflow)?;
        slot.payload = next.to_string().into_bytes();
        Ok(next)
    }

    pub(crate) fn remove(&self, key: &str) {
        self.state.lock().entries.remove(key);
    }

    /// Removes every entry owned by `prefix` and returns how many were removed.
    ///
    /// Leases live apart from entries and are never touched.
    pub(crate) fn remove_owned(&self, prefix: &Prefix) -> usize {
        let mut state = self.state.lock();
        let before = state.entries.len();
        state.entries.retain(|key, _| !prefix.owns(key));
        before - state.entries.len()
    }

    /// Takes the lease on `key` unless a live one exists. Returns the lease token.
    pub(crate) fn acquire(&self, key: &str, expires_at: Option<Instant>, now: Instant) -> Option<u64> {
        let mut state = self.state.lock();
        if state.leases.get(key).is_some_and(|lease| lease.is_live(now)) {
            return None;
        }

        state.next_token = state.next_token.wrapping_add(1);
        let token = state.next_token;
        state.leases.insert(key.to_owned(), Lease { token, expires_at });
        state.note_write(now);
        Some(token)
    }

    /// Releases the lease on `key` if it is still the one identified by `token`.
    pub(crate) fn release(&self, key: &str, token: u64) -> bool {
        let mut state = self.state.lock();
        if state.leases.get(key).is_some_and(|lease| lease.token == token) {
            state.leases.remove(key);
            true
        } else {
            false
        }
    }
}
