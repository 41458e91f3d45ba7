// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for cache operations.

use std::fmt;

/// The category of a cache [`Error`].
///
/// The set of kinds is closed so callers can branch on expected conditions
/// (a missing key, a non-numeric counter, a held lock) without inspecting
/// error messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The key is absent or expired.
    NotFound,
    /// A counter operation hit a value that is not an integer.
    NotInteger,
    /// The lock is held by someone else.
    Locked,
    /// A value could not be encoded or decoded.
    Codec,
    /// The backend or its transport failed.
    Backend,
    /// The full key falls inside the namespace reserved for locks.
    InvalidKey,
}

impl ErrorKind {
    /// Returns a short, stable description of the kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "the key is not found",
            Self::NotInteger => "the key is not an integer",
            Self::Locked => "the lock is already held",
            Self::Codec => "value encoding failed",
            Self::Backend => "backend operation failed",
            Self::InvalidKey => "the key is in the reserved lock namespace",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The operation and key an [`Error`] happened on, when known.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Context {
    operation: Option<&'static str>,
    key: Option<String>,
}

impl Context {
    fn key(key: impl Into<String>) -> Self {
        Self {
            operation: None,
            key: Some(key.into()),
        }
    }

    fn bare(operation: &'static str) -> Self {
        Self {
            operation: Some(operation),
            key: None,
        }
    }

    fn operation(operation: &'static str, key: impl Into<String>) -> Self {
        Self {
            operation: Some(operation),
            key: Some(key.into()),
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.operation, self.key.as_deref()) {
            (Some(operation), Some(key)) => write!(f, " ({operation} on key \"{key}\")"),
            (Some(operation), None) => write!(f, " ({operation})"),
            (None, Some(key)) => write!(f, " (key \"{key}\")"),
            (None, None) => Ok(()),
        }
    }
}

/// An error from a cache operation.
///
/// Every error carries an [`ErrorKind`]; match on [`Error::kind`] to tell
/// expected conditions apart from backend failures. The underlying cause, if
/// any, is available through [`std::error::Error::source`].
///
/// # Examples
///
/// ```
/// use cachette::{Error, ErrorKind};
///
/// let error = Error::not_found("user:42");
/// assert_eq!(error.kind(), ErrorKind::NotFound);
/// assert!(error.is_not_found());
/// ```
#[ohno::error]
#[display("cache: {kind}{context}")]
pub struct Error {
    kind: ErrorKind,
    context: Context,
}

impl Error {
    /// Creates an error signaling that `key` is absent or expired.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, Context::key(key))
    }

    /// Creates an error signaling that the value under `key` is not an integer.
    pub fn not_integer(key: impl Into<String>, cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(ErrorKind::NotInteger, Context::key(key), cause)
    }

    /// Creates an error signaling that the lock for `key` is held elsewhere.
    #[must_use]
    pub fn locked(key: impl Into<String>) -> Self {
        Self::new(ErrorKind::Locked, Context::key(key))
    }

    /// Creates an error signaling that `key` resolves into the reserved lock namespace.
    #[must_use]
    pub fn invalid_key(key: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidKey, Context::key(key))
    }

    /// Creates an error from a codec failure.
    pub fn codec(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(ErrorKind::Codec, Context::default(), cause)
    }

    /// Creates an error from a backend failure during `operation` on `key`.
    pub fn backend(
        operation: &'static str,
        key: impl Into<String>,
        cause: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::caused_by(ErrorKind::Backend, Context::operation(operation, key), cause)
    }

    /// Creates an error from a backend failure during an `operation` that is not tied to one key.
    pub fn backend_operation(operation: &'static str, cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(ErrorKind::Backend, Context::bare(operation), cause)
    }

    /// Returns the kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the key this error happened on, if known.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.context.key.as_deref()
    }

    /// Returns the backend operation this error happened during, if known.
    #[must_use]
    pub fn operation(&self) -> Option<&'static str> {
        self.context.operation
    }

    /// Returns `true` if the key was absent or expired.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    /// Returns `true` if a counter operation hit a non-integer value.
    #[must_use]
    pub fn is_not_integer(&self) -> bool {
        self.kind == ErrorKind::NotInteger
    }

    /// Returns `true` if a lock could not be acquired because it is held.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.kind == ErrorKind::Locked
    }

    /// Returns `true` if the key was rejected because it resolves into the lock namespace.
    #[must_use]
    pub fn is_invalid_key(&self) -> bool {
        self.kind == ErrorKind::InvalidKey
    }
}

/// A specialized [`Result`] type for cache operations.
pub type Result<T> = std::result::Result<T, Error>;
