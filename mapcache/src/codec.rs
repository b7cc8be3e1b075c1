//! Serializer and deserializer contracts for cache keys and values
//!
//! The cache only ever sees bytes. Callers choose, per operation, how their
//! typed keys and values become bytes and back. Implementations are stateless
//! and must round-trip: `deserialize(serialize(v)) == v`.

use crate::error::{CacheError, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;

/// Converts a typed value into bytes
pub trait Serializer<T: ?Sized>: Send + Sync {
    /// Append the serialized form of `value` to `out`
    fn serialize(&self, value: &T, out: &mut Vec<u8>) -> Result<()>;
}

/// Converts bytes back into a typed value
pub trait Deserializer<T>: Send + Sync {
    /// Decode `bytes`; bytes that do not match the contract are a data error
    fn deserialize(&self, bytes: &[u8]) -> Result<T>;
}

/// Serialize a value into a fresh buffer
pub fn to_bytes<T, S>(value: &T, serializer: &S) -> Result<Vec<u8>>
where
    T: ?Sized,
    S: Serializer<T> + ?Sized,
{
    let mut out = Vec::new();
    serializer.serialize(value, &mut out)?;
    Ok(out)
}

/// UTF-8 text: the textual form of the key is its serialized form
#[derive(Debug, Clone, Copy, Default)]
pub struct StringSerializer;

impl Serializer<str> for StringSerializer {
    fn serialize(&self, value: &str, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(value.as_bytes());
        Ok(())
    }
}

impl Serializer<String> for StringSerializer {
    fn serialize(&self, value: &String, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(value.as_bytes());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StringDeserializer;

impl Deserializer<String> for StringDeserializer {
    fn deserialize(&self, bytes: &[u8]) -> Result<String> {
        String::from_utf8(bytes.to_vec())
            .map_err(|e| CacheError::DeserializationError(format!("invalid UTF-8: {}", e)))
    }
}

/// Pass-through for callers that handle raw bytes themselves
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesSerializer;

impl Serializer<[u8]> for BytesSerializer {
    fn serialize(&self, value: &[u8], out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(value);
        Ok(())
    }
}

impl Serializer<Vec<u8>> for BytesSerializer {
    fn serialize(&self, value: &Vec<u8>, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(value);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BytesDeserializer;

impl Deserializer<Vec<u8>> for BytesDeserializer {
    fn deserialize(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(bytes.to_vec())
    }
}

/// JSON encoding of any serde type
pub struct JsonSerializer<T>(PhantomData<fn(&T)>);

impl<T> JsonSerializer<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for JsonSerializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Serialize> Serializer<T> for JsonSerializer<T> {
    fn serialize(&self, value: &T, out: &mut Vec<u8>) -> Result<()> {
        serde_json::to_writer(out, value).map_err(|e| CacheError::SerializationError(e.to_string()))
    }
}

/// JSON decoding into any owned serde type
pub struct JsonDeserializer<T>(PhantomData<fn() -> T>);

impl<T> JsonDeserializer<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for JsonDeserializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeserializeOwned> Deserializer<T> for JsonDeserializer<T> {
    fn deserialize(&self, bytes: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
