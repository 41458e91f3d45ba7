// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;

use crate::{Error, LOCK_NAMESPACE, Result};

/// Separator placed between a prefix and the logical key.
pub const SEPARATOR: char = ':';

/// A normalized key namespace.
///
/// An empty prefix stays empty. Otherwise trailing separators are collapsed so
/// the prefix ends with exactly one `:`, which makes `"cache:users"` and
/// `"cache:users:"` equivalent.
///
/// # Examples
///
/// ```
/// use cachette::Prefix;
///
/// let prefix = Prefix::new("cache:users");
/// assert_eq!(prefix.as_str(), "cache:users:");
/// assert_eq!(prefix.apply("42"), "cache:users:42");
/// assert_eq!(Prefix::new("cache:users:::").as_str(), "cache:users:");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Prefix(String);

impl Prefix {
    /// Normalizes `raw` into a prefix.
    #[must_use]
    pub fn new(raw: impl AsRef<str>) -> Self {
        let trimmed = raw.as_ref().trim_end_matches(SEPARATOR);
        if trimmed.is_empty() {
            return Self(String::new());
        }

        let mut prefix = String::with_capacity(trimmed.len() + 1);
        prefix.push_str(trimmed);
        prefix.push(SEPARATOR);
        Self(prefix)
    }

    /// Returns the normalized prefix.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the prefix is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Prepends the prefix to a logical key.
    #[must_use]
    pub fn apply(&self, key: &str) -> String {
        let mut full = String::with_capacity(self.0.len() + key.len());
        full.push_str(&self.0);
        full.push_str(key);
        full
    }

    /// Prepends the prefix to a logical key that addresses a data entry.
    ///
    /// Lock keys are `lock:<prefix><key>`, so a data key whose full form starts
    /// with [`LOCK_NAMESPACE`] could overwrite or be flushed together with a
    /// held lock. Such keys are refused.
    ///
    /// # Errors
    ///
    /// Returns an error of kind [`InvalidKey`](crate::ErrorKind::InvalidKey)
    /// when the full key starts with [`LOCK_NAMESPACE`].
    pub fn data_key(&self, key: &str) -> Result<String> {
        let full = self.apply(key);
        if full.starts_with(LOCK_NAMESPACE) {
            return Err(Error::invalid_key(key));
        }
        Ok(full)
    }

    /// Returns `true` if a backend key belongs to this namespace.
    #[must_use]
    pub fn owns(&self, full_key: &str) -> bool {
        full_key.starts_with(&self.0)
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Prefix {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for Prefix {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_single_separator() {
        assert_eq!(Prefix::new("cache:test").as_str(), "cache:test:");
        assert_eq!(Prefix::new("cache:test:").as_str(), "cache:test:");
        assert_eq!(Prefix::new("cache:test::").as_str(), "cache:test:");
    }

    #[test]
    fn empty_and_separator_only_prefixes_are_empty() {
        assert!(Prefix::new("").is_empty());
        assert!(Prefix::new(":").is_empty());
        assert_eq!(Prefix::default().apply("key"), "key");
    }

    #[test]
    fn inner_separators_are_kept() {
        assert_eq!(Prefix::new("a::b").as_str(), "a::b:");
    }

    #[test]
    fn data_keys_never_enter_lock_namespace() {
        assert_eq!(Prefix::new("app").data_key("job").unwrap(), "app:job");
        assert_eq!(Prefix::default().data_key("locks").unwrap(), "locks");

        assert!(Prefix::new("lock").data_key("job").unwrap_err().is_invalid_key());
        assert!(Prefix::new("lock:app").data_key("job").unwrap_err().is_invalid_key());
        assert!(Prefix::default().data_key("lock:job").unwrap_err().is_invalid_key());
    }

    #[test]
    fn owns_matches_only_namespace() {
        let prefix = Prefix::new("app");
        assert!(prefix.owns("app:key"));
        assert!(!prefix.owns("apple:key"));
        assert!(Prefix::default().owns("anything"));
    }
}
