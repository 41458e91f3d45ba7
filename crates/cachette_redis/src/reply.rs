// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Helpers for building commands and reading server replies.

use std::time::Duration;

use cachette::MIN_TTL;
use redis::RedisError;

/// Characters with a special meaning in `SCAN MATCH` patterns.
const GLOB_SPECIAL: [char; 5] = ['*', '?', '[', ']', '\\'];

/// Escapes `literal` so that it matches itself in a `SCAN MATCH` pattern.
pub(crate) fn escape_glob(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for c in literal.chars() {
        if GLOB_SPECIAL.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Largest `PX` argument sent to the server.
///
/// Redis refuses an expiry whose absolute deadline overflows a signed 64-bit
/// millisecond clock, so ttls beyond this are stored without expiry instead.
pub(crate) const MAX_PX_MILLIS: u64 = 1 << 62;

/// Converts `ttl` to the millisecond argument of `PX`, never below [`MIN_TTL`].
///
/// Returns `None` when the ttl is beyond [`MAX_PX_MILLIS`]; the entry is then
/// written without an expiry.
pub(crate) fn px_millis(ttl: Duration) -> Option<u64> {
    u64::try_from(ttl.max(MIN_TTL).as_millis())
        .ok()
        .filter(|millis| *millis <= MAX_PX_MILLIS)
}

/// Returns `true` if the server refused a counter update because the stored value is not an integer.
pub(crate) fn is_not_integer(error: &RedisError) -> bool {
    error.code() == Some("WRONGTYPE") || error.to_string().contains("not an integer")
}
