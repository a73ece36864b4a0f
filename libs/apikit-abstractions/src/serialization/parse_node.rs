use std::fmt::Display;
use std::str::FromStr;

use time::OffsetDateTime;
use uuid::Uuid;

use super::{Parsable, PrimitiveKind, PrimitiveValue, UntypedNode};
use crate::error::SerializationError;

/// Read side of the serialization port: one node of a parsed payload.
///
/// Scalar getters return `Ok(None)` for a null node and an error when the
/// node holds a value of another shape.
pub trait ParseNode {
    /// Navigate to the field `name` of an object node.
    fn child_node(&self, name: &str) -> Option<Box<dyn ParseNode + '_>>;

    fn is_null(&self) -> bool;

    /// # Errors
    /// Returns an error when the node is not a string.
    fn string_value(&self) -> Result<Option<String>, SerializationError>;

    /// # Errors
    /// Returns an error when the node is not a boolean.
    fn bool_value(&self) -> Result<Option<bool>, SerializationError>;

    /// # Errors
    /// Returns an error when the node is not an integer in `i32` range.
    fn i32_value(&self) -> Result<Option<i32>, SerializationError>;

    /// # Errors
    /// Returns an error when the node is not an integer in `i64` range.
    fn i64_value(&self) -> Result<Option<i64>, SerializationError>;

    /// # Errors
    /// Returns an error when the node is not a number.
    fn f32_value(&self) -> Result<Option<f32>, SerializationError>;

    /// # Errors
    /// Returns an error when the node is not a number.
    fn f64_value(&self) -> Result<Option<f64>, SerializationError>;

    /// # Errors
    /// Returns an error when the node is not a timestamp.
    fn time_value(&self) -> Result<Option<OffsetDateTime>, SerializationError>;

    /// # Errors
    /// Returns an error when the node is not a UUID.
    fn uuid_value(&self) -> Result<Option<Uuid>, SerializationError>;

    /// # Errors
    /// Returns an error when the node is not an encoded byte array.
    fn byte_array_value(&self) -> Result<Option<Vec<u8>>, SerializationError>;

    /// Elements of a collection node, empty for a null node.
    ///
    /// # Errors
    /// Returns an error when the node is not a collection.
    fn collection_nodes(&self) -> Result<Vec<Box<dyn ParseNode + '_>>, SerializationError>;

    /// Feed every field of an object node to `target`.
    ///
    /// # Errors
    /// Returns an error when the node is not an object or a field fails.
    fn populate_object(&self, target: &mut dyn Parsable) -> Result<(), SerializationError>;

    /// # Errors
    /// Returns an error when the node cannot be represented untyped.
    fn untyped_value(&self) -> Result<UntypedNode, SerializationError>;

    /// Read the node as the primitive `kind`.
    ///
    /// # Errors
    /// Returns an error when the node does not hold a `kind` value.
    fn primitive_value(
        &self,
        kind: PrimitiveKind,
    ) -> Result<Option<PrimitiveValue>, SerializationError> {
        Ok(match kind {
            PrimitiveKind::String => self.string_value()?.map(PrimitiveValue::String),
            PrimitiveKind::Int32 => self.i32_value()?.map(PrimitiveValue::Int32),
            PrimitiveKind::Int64 => self.i64_value()?.map(PrimitiveValue::Int64),
            PrimitiveKind::Float32 => self.f32_value()?.map(PrimitiveValue::Float32),
            PrimitiveKind::Float64 => self.f64_value()?.map(PrimitiveValue::Float64),
            PrimitiveKind::Bool => self.bool_value()?.map(PrimitiveValue::Bool),
            PrimitiveKind::Time => self.time_value()?.map(PrimitiveValue::Time),
            PrimitiveKind::Uuid => self.uuid_value()?.map(PrimitiveValue::Uuid),
            PrimitiveKind::Bytes => self.byte_array_value()?.map(PrimitiveValue::Bytes),
        })
    }

    /// Read a collection node as primitives of `kind`, skipping null elements.
    ///
    /// # Errors
    /// Returns an error when the node is not a collection or an element has
    /// the wrong type.
    fn collection_of_primitive_values(
        &self,
        kind: PrimitiveKind,
    ) -> Result<Vec<PrimitiveValue>, SerializationError> {
        let mut values = Vec::new();
        for node in self.collection_nodes()? {
            if let Some(value) = node.primitive_value(kind)? {
                values.push(value);
            }
        }
        Ok(values)
    }
}

/// Build a `T` from an object node, `None` for a null node.
///
/// # Errors
/// Propagates [`ParseNode::populate_object`] failures.
pub fn parse_object<T: Parsable + Default>(
    node: &dyn ParseNode,
) -> Result<Option<T>, SerializationError> {
    if node.is_null() {
        return Ok(None);
    }
    let mut value = T::default();
    node.populate_object(&mut value)?;
    Ok(Some(value))
}

/// Build a `Vec<T>` from a collection node, `None` for a null node.
///
/// # Errors
/// Returns an error when the node is not a collection or an element fails.
pub fn parse_collection_of_objects<T: Parsable + Default>(
    node: &dyn ParseNode,
) -> Result<Option<Vec<T>>, SerializationError> {
    if node.is_null() {
        return Ok(None);
    }
    let mut items = Vec::new();
    for element in node.collection_nodes()? {
        if let Some(item) = parse_object::<T>(element.as_ref())? {
            items.push(item);
        }
    }
    Ok(Some(items))
}

/// Resolve an enum from its string form through its `FromStr` parser.
///
/// # Errors
/// Returns [`SerializationError::InvalidValue`] when the parser rejects the
/// string.
pub fn enum_value<E>(node: &dyn ParseNode) -> Result<Option<E>, SerializationError>
where
    E: FromStr,
    E::Err: Display,
{
    node.string_value()?
        .map(|raw| {
            raw.parse::<E>()
                .map_err(|err| SerializationError::invalid_value("enum", raw.as_str(), err))
        })
        .transpose()
}

/// Resolve every element of a collection node as an enum.
///
/// # Errors
/// Returns an error when an element is not a valid enum value.
pub fn collection_of_enum_values<E>(node: &dyn ParseNode) -> Result<Vec<E>, SerializationError>
where
    E: FromStr,
    E::Err: Display,
{
    let mut values = Vec::new();
    for element in node.collection_nodes()? {
        if let Some(value) = enum_value::<E>(element.as_ref())? {
            values.push(value);
        }
    }
    Ok(values)
}
