//! CBOR codec for the MCio protocol.
//!
//! Every message on the wire is a single CBOR map. Registered protocol types
//! carry a reserved discriminator entry, [`MCIO_TYPE_KEY`], whose value is the
//! type name with a leading dot. The dot mirrors the Jackson "minimal class"
//! convention used by the JVM side of the connection and must be preserved
//! byte-exact. The set of registered types is fixed at compile time through
//! the [`McioType`] trait; there is no runtime registry to mutate.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Reserved map key annotating protocol types.
pub const MCIO_TYPE_KEY: &str = "__mcio_type__";

/// A type that is tagged with its name on the wire.
pub trait McioType {
    /// The wire name, including the leading dot.
    const TAG: &'static str;
}

/// Zero-sized marker serialized as the [`MCIO_TYPE_KEY`] entry of `T`.
///
/// Embedded as a renamed field in each registered struct so the discriminator
/// is written on encode and checked on decode. Decoding fails when the tag
/// names a different type, which surfaces as a normal decode error.
pub struct Tag<T>(PhantomData<fn() -> T>);

impl<T> Default for Tag<T> {
    fn default() -> Self {
        Tag(PhantomData)
    }
}

impl<T> Clone for Tag<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Tag<T> {}

impl<T> PartialEq for Tag<T> {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl<T> Eq for Tag<T> {}

impl<T: McioType> fmt::Debug for Tag<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(T::TAG)
    }
}

impl<T: McioType> Serialize for Tag<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(T::TAG)
    }
}

impl<'de, T: McioType> Deserialize<'de> for Tag<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        let stripped = name.strip_prefix('.').unwrap_or(&name);
        let expected = T::TAG.strip_prefix('.').unwrap_or(T::TAG);
        if stripped == expected {
            Ok(Tag(PhantomData))
        } else {
            Err(de::Error::custom(format_args!(
                "unknown MCio type: {name}"
            )))
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    #[error("encode failed: {0}")]
    Encode(serde_cbor::Error),
    #[error("decode failed: {0}")]
    Decode(serde_cbor::Error),
    #[error("MCio protocol version mismatch: packet = {actual}, expected = {expected}")]
    VersionMismatch { actual: u32, expected: u32 },
}

pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, CodecError> {
    serde_cbor::to_vec(msg).map_err(CodecError::Encode)
}

pub fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T, CodecError> {
    serde_cbor::from_slice(data).map_err(CodecError::Decode)
}
