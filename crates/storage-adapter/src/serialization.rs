//! Serialization providers
//!
//! A [`SerializationProvider`] turns typed values into opaque byte payloads
//! and back. Storage providers never look inside a payload; the format is
//! owned entirely by the serializer.

use std::any::{Any, TypeId};
use std::fmt;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use savekit_common::{Error, Result};
use savekit_config::SerializationFormat;

/// Converts values to and from byte payloads
///
/// The async forms default to the blocking ones; implementations backed by
/// genuinely asynchronous encoders override them.
#[async_trait]
pub trait SerializationProvider: Send + Sync {
    /// Encodes a value
    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>>;

    /// Decodes a payload into a statically known type
    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;

    /// Decodes a payload into a self-describing tree, the intermediate used
    /// for shapes chosen at runtime
    fn to_tree(&self, bytes: &[u8]) -> Result<Value>;

    /// Decodes a payload into the type described by `shape`
    fn deserialize_shape(&self, bytes: &[u8], shape: &Shape) -> Result<Box<dyn Any + Send>> {
        shape.decode(self.to_tree(bytes)?)
    }

    /// Encodes a value without blocking the calling task
    async fn serialize_async<T: Serialize + Sync>(&self, value: &T) -> Result<Vec<u8>> {
        self.serialize(value)
    }

    /// Decodes a payload without blocking the calling task
    async fn deserialize_async<T: DeserializeOwned + Send>(&self, bytes: Vec<u8>) -> Result<T> {
        self.deserialize(&bytes)
    }

    /// Decodes a payload into the type described by `shape` without
    /// blocking the calling task
    async fn deserialize_shape_async(
        &self,
        bytes: Vec<u8>,
        shape: &Shape,
    ) -> Result<Box<dyn Any + Send>> {
        self.deserialize_shape(&bytes, shape)
    }
}

/// JSON serialization backed by `serde_json`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonSerializationProvider {
    /// Emit indented output
    pretty: bool,
}

impl JsonSerializationProvider {
    /// Creates a compact JSON serializer
    pub fn new() -> Self {
        Self { pretty: false }
    }

    /// Creates an indented JSON serializer
    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    /// Creates the serializer selected by configuration
    pub fn from_format(format: SerializationFormat) -> Self {
        match format {
            SerializationFormat::Json => Self::new(),
            SerializationFormat::JsonPretty => Self::pretty(),
        }
    }

    /// Returns true if output is indented
    pub fn is_pretty(&self) -> bool {
        self.pretty
    }
}

#[async_trait]
impl SerializationProvider for JsonSerializationProvider {
    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        let encoded = if self.pretty {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        };
        encoded.map_err(|e| Error::Serialization(e.to_string()))
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(|e| Error::Deserialization(e.to_string()))
    }

    fn to_tree(&self, bytes: &[u8]) -> Result<Value> {
        self.deserialize(bytes)
    }
}

/// Runtime type descriptor for loads whose target type is only known at
/// runtime
///
/// Decoding yields a `Box<dyn Any + Send>` holding a value of the described
/// type, which callers downcast.
#[derive(Clone, Copy)]
pub struct Shape {
    name: &'static str,
    type_id: TypeId,
    decode: fn(Value) -> serde_json::Result<Box<dyn Any + Send>>,
}

impl Shape {
    /// Describes `T`
    pub fn of<T: DeserializeOwned + Send + 'static>() -> Self {
        Self {
            name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
            decode: decode_as::<T>,
        }
    }

    /// Describes `T` under a caller-chosen name
    pub fn named<T: DeserializeOwned + Send + 'static>(name: &'static str) -> Self {
        Self {
            name,
            ..Self::of::<T>()
        }
    }

    /// Gets the shape's name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Gets the described type's id
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns true if this shape describes `T`
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Decodes a tree into the described type
    pub fn decode(&self, tree: Value) -> Result<Box<dyn Any + Send>> {
        (self.decode)(tree).map_err(|e| {
            Error::Deserialization(format!("payload does not match shape {}: {}", self.name, e))
        })
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shape").field("name", &self.name).finish()
    }
}

impl PartialEq for Shape {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for Shape {}

fn decode_as<T: DeserializeOwned + Send + 'static>(
    tree: Value,
) -> serde_json::Result<Box<dyn Any + Send>> {
    let value: T = serde_json::from_value(tree)?;
    Ok(Box::new(value))
}
