// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Value serialization for cache payloads.

use serde::{Serialize, de::DeserializeOwned};

use crate::{Error, Result};

/// Converts values to and from the byte payloads a store persists.
///
/// Stores hold a codec by value and use it for every `put`, `get`, `forever`
/// and `add`. Counter operations bypass the codec and use the backend's native
/// integer representation, so a codec that writes integers as ASCII decimals
/// (like [`JsonCodec`]) lets values written with `put` be incremented later.
///
/// # Examples
///
/// ```
/// use cachette::{Codec, JsonCodec};
///
/// let codec = JsonCodec;
/// let bytes = codec.encode(&42_i64)?;
/// assert_eq!(bytes, b"42");
///
/// let value: i64 = codec.decode(&bytes)?;
/// assert_eq!(value, 42);
/// # Ok::<(), cachette::Error>(())
/// ```
pub trait Codec: Send + Sync {
    /// Encodes `value` into a byte payload.
    ///
    /// # Errors
    ///
    /// Returns an error of kind [`Codec`](crate::ErrorKind::Codec) if the value cannot be encoded.
    fn encode<V>(&self, value: &V) -> Result<Vec<u8>>
    where
        V: Serialize + ?Sized;

    /// Decodes a byte payload into a value.
    ///
    /// # Errors
    ///
    /// Returns an error of kind [`Codec`](crate::ErrorKind::Codec) if the payload is not a valid
    /// encoding of `V`.
    fn decode<V>(&self, bytes: &[u8]) -> Result<V>
    where
        V: DeserializeOwned;
}

/// A [`Codec`] that stores values as JSON.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<V>(&self, value: &V) -> Result<Vec<u8>>
    where
        V: Serialize + ?Sized,
    {
        serde_json::to_vec(value).map_err(Error::codec)
    }

    fn decode<V>(&self, bytes: &[u8]) -> Result<V>
    where
        V: DeserializeOwned,
    {
        serde_json::from_slice(bytes).map_err(Error::codec)
    }
}
