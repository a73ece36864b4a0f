use std::fmt::Display;

use bytes::Bytes;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{AdditionalData, Parsable, PrimitiveValue, UntypedNode};
use crate::error::SerializationError;

/// Write side of the serialization port.
///
/// `key` is `None` for values written at the root or inside a collection.
/// Writing `None` as a value skips the field.
#[allow(clippy::missing_errors_doc)]
pub trait SerializationWriter {
    fn write_string_value(
        &mut self,
        key: Option<&str>,
        value: Option<&str>,
    ) -> Result<(), SerializationError>;

    fn write_bool_value(
        &mut self,
        key: Option<&str>,
        value: Option<bool>,
    ) -> Result<(), SerializationError>;

    fn write_i32_value(
        &mut self,
        key: Option<&str>,
        value: Option<i32>,
    ) -> Result<(), SerializationError>;

    fn write_i64_value(
        &mut self,
        key: Option<&str>,
        value: Option<i64>,
    ) -> Result<(), SerializationError>;

    fn write_f32_value(
        &mut self,
        key: Option<&str>,
        value: Option<f32>,
    ) -> Result<(), SerializationError>;

    fn write_f64_value(
        &mut self,
        key: Option<&str>,
        value: Option<f64>,
    ) -> Result<(), SerializationError>;

    fn write_time_value(
        &mut self,
        key: Option<&str>,
        value: Option<OffsetDateTime>,
    ) -> Result<(), SerializationError>;

    fn write_uuid_value(
        &mut self,
        key: Option<&str>,
        value: Option<Uuid>,
    ) -> Result<(), SerializationError>;

    fn write_byte_array_value(
        &mut self,
        key: Option<&str>,
        value: Option<&[u8]>,
    ) -> Result<(), SerializationError>;

    /// Write an explicit null.
    fn write_null_value(&mut self, key: Option<&str>) -> Result<(), SerializationError>;

    /// Write a nested object through its [`Parsable::serialize`].
    fn write_object_value(
        &mut self,
        key: Option<&str>,
        value: Option<&dyn Parsable>,
    ) -> Result<(), SerializationError>;

    fn write_collection_of_object_values(
        &mut self,
        key: Option<&str>,
        values: &[&dyn Parsable],
    ) -> Result<(), SerializationError>;

    fn write_collection_of_primitive_values(
        &mut self,
        key: Option<&str>,
        values: &[PrimitiveValue],
    ) -> Result<(), SerializationError>;

    fn write_untyped_value(
        &mut self,
        key: Option<&str>,
        value: &UntypedNode,
    ) -> Result<(), SerializationError>;

    /// Write unmodeled fields next to the declared ones.
    fn write_additional_data(&mut self, data: &AdditionalData) -> Result<(), SerializationError> {
        for (key, value) in data {
            self.write_untyped_value(Some(key), value)?;
        }
        Ok(())
    }

    /// Take the bytes written so far, leaving the writer empty.
    fn serialized_content(&mut self) -> Result<Bytes, SerializationError>;

    fn write_primitive_value(
        &mut self,
        key: Option<&str>,
        value: &PrimitiveValue,
    ) -> Result<(), SerializationError> {
        match value {
            PrimitiveValue::String(v) => self.write_string_value(key, Some(v)),
            PrimitiveValue::Int32(v) => self.write_i32_value(key, Some(*v)),
            PrimitiveValue::Int64(v) => self.write_i64_value(key, Some(*v)),
            PrimitiveValue::Float32(v) => self.write_f32_value(key, Some(*v)),
            PrimitiveValue::Float64(v) => self.write_f64_value(key, Some(*v)),
            PrimitiveValue::Bool(v) => self.write_bool_value(key, Some(*v)),
            PrimitiveValue::Time(v) => self.write_time_value(key, Some(*v)),
            PrimitiveValue::Uuid(v) => self.write_uuid_value(key, Some(*v)),
            PrimitiveValue::Bytes(v) => self.write_byte_array_value(key, Some(v)),
        }
    }

    /// Write an enum through its string form.
    fn write_enum_value(
        &mut self,
        key: Option<&str>,
        value: Option<&dyn Display>,
    ) -> Result<(), SerializationError> {
        let value = value.map(ToString::to_string);
        self.write_string_value(key, value.as_deref())
    }
}
