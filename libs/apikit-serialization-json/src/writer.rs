use apikit_abstractions::{
    Parsable, PrimitiveValue, SerializationError, SerializationWriter, UntypedNode,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use serde_json::{Map, Number, Value};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

#[derive(Debug)]
enum Frame {
    Object(Map<String, Value>),
    Array(Vec<Value>),
}

/// [`SerializationWriter`] that builds a `serde_json` value tree.
///
/// Keyed values written at the root collect into a root object; an unkeyed
/// root value replaces whatever was written before.
#[derive(Debug, Default)]
pub struct JsonSerializationWriter {
    stack: Vec<Frame>,
    root: Option<Value>,
}

impl JsonSerializationWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn put(&mut self, key: Option<&str>, value: Value) -> Result<(), SerializationError> {
        match (self.stack.last_mut(), key) {
            (Some(Frame::Object(map)), Some(key)) => {
                map.insert(key.to_owned(), value);
            }
            (Some(Frame::Object(_)), None) => {
                return Err(SerializationError::UnexpectedNode {
                    expected: "keyed value",
                    found: "unkeyed value",
                });
            }
            (Some(Frame::Array(items)), _) => items.push(value),
            (None, Some(key)) => match &mut self.root {
                Some(Value::Object(map)) => {
                    map.insert(key.to_owned(), value);
                }
                root => {
                    let mut map = Map::new();
                    map.insert(key.to_owned(), value);
                    *root = Some(Value::Object(map));
                }
            },
            (None, None) => self.root = Some(value),
        }
        Ok(())
    }

    fn put_some<T>(
        &mut self,
        key: Option<&str>,
        value: Option<T>,
        into: impl FnOnce(T) -> Result<Value, SerializationError>,
    ) -> Result<(), SerializationError> {
        match value {
            Some(value) => {
                let value = into(value)?;
                self.put(key, value)
            }
            None => Ok(()),
        }
    }

    fn object_value(&mut self, value: &dyn Parsable) -> Result<Value, SerializationError> {
        self.stack.push(Frame::Object(Map::new()));
        let written = value.serialize(self);
        match (self.stack.pop(), written) {
            (Some(Frame::Object(map)), Ok(())) => Ok(Value::Object(map)),
            (_, Err(err)) => Err(err),
            (_, Ok(())) => Err(unbalanced()),
        }
    }
}

fn unbalanced() -> SerializationError {
    SerializationError::UnexpectedNode {
        expected: "object frame",
        found: "array frame",
    }
}

fn float_value(kind: &'static str, value: f64) -> Result<Value, SerializationError> {
    Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| {
            SerializationError::invalid_value(kind, value.to_string(), "not a finite number")
        })
}

fn time_value(value: OffsetDateTime) -> Result<Value, SerializationError> {
    value
        .format(&Rfc3339)
        .map(Value::String)
        .map_err(|err| SerializationError::invalid_value("time", value.to_string(), err))
}

fn primitive_to_value(value: &PrimitiveValue) -> Result<Value, SerializationError> {
    Ok(match value {
        PrimitiveValue::String(v) => Value::String(v.clone()),
        PrimitiveValue::Int32(v) => Value::from(*v),
        PrimitiveValue::Int64(v) => Value::from(*v),
        PrimitiveValue::Float32(v) => float_value("float32", f64::from(*v))?,
        PrimitiveValue::Float64(v) => float_value("float64", *v)?,
        PrimitiveValue::Bool(v) => Value::Bool(*v),
        PrimitiveValue::Time(v) => time_value(*v)?,
        PrimitiveValue::Uuid(v) => Value::String(v.to_string()),
        PrimitiveValue::Bytes(v) => Value::String(STANDARD.encode(v)),
    })
}

fn untyped_to_value(value: &UntypedNode) -> Result<Value, SerializationError> {
    Ok(match value {
        UntypedNode::Null => Value::Null,
        UntypedNode::Bool(v) => Value::Bool(*v),
        UntypedNode::Integer(v) => Value::from(*v),
        UntypedNode::Float(v) => float_value("float64", *v)?,
        UntypedNode::String(v) => Value::String(v.clone()),
        UntypedNode::Array(items) => Value::Array(
            items
                .iter()
                .map(untyped_to_value)
                .collect::<Result<_, _>>()?,
        ),
        UntypedNode::Object(map) => {
            let mut out = Map::new();
            for (key, value) in map {
                out.insert(key.clone(), untyped_to_value(value)?);
            }
            Value::Object(out)
        }
    })
}

impl SerializationWriter for JsonSerializationWriter {
    fn write_string_value(
        &mut self,
        key: Option<&str>,
        value: Option<&str>,
    ) -> Result<(), SerializationError> {
        self.put_some(key, value, |v| Ok(Value::String(v.to_owned())))
    }

    fn write_bool_value(
        &mut self,
        key: Option<&str>,
        value: Option<bool>,
    ) -> Result<(), SerializationError> {
        self.put_some(key, value, |v| Ok(Value::Bool(v)))
    }

    fn write_i32_value(
        &mut self,
        key: Option<&str>,
        value: Option<i32>,
    ) -> Result<(), SerializationError> {
        self.put_some(key, value, |v| Ok(Value::from(v)))
    }

    fn write_i64_value(
        &mut self,
        key: Option<&str>,
        value: Option<i64>,
    ) -> Result<(), SerializationError> {
        self.put_some(key, value, |v| Ok(Value::from(v)))
    }

    fn write_f32_value(
        &mut self,
        key: Option<&str>,
        value: Option<f32>,
    ) -> Result<(), SerializationError> {
        self.put_some(key, value, |v| float_value("float32", f64::from(v)))
    }

    fn write_f64_value(
        &mut self,
        key: Option<&str>,
        value: Option<f64>,
    ) -> Result<(), SerializationError> {
        self.put_some(key, value, |v| float_value("float64", v))
    }

    fn write_time_value(
        &mut self,
        key: Option<&str>,
        value: Option<OffsetDateTime>,
    ) -> Result<(), SerializationError> {
        self.put_some(key, value, time_value)
    }

    fn write_uuid_value(
        &mut self,
        key: Option<&str>,
        value: Option<Uuid>,
    ) -> Result<(), SerializationError> {
        self.put_some(key, value, |v| Ok(Value::String(v.to_string())))
    }

    fn write_byte_array_value(
        &mut self,
        key: Option<&str>,
        value: Option<&[u8]>,
    ) -> Result<(), SerializationError> {
        self.put_some(key, value, |v| Ok(Value::String(STANDARD.encode(v))))
    }

    fn write_null_value(&mut self, key: Option<&str>) -> Result<(), SerializationError> {
        self.put(key, Value::Null)
    }

    fn write_object_value(
        &mut self,
        key: Option<&str>,
        value: Option<&dyn Parsable>,
    ) -> Result<(), SerializationError> {
        let Some(value) = value else {
            return Ok(());
        };
        let object = self.object_value(value)?;
        self.put(key, object)
    }

    fn write_collection_of_object_values(
        &mut self,
        key: Option<&str>,
        values: &[&dyn Parsable],
    ) -> Result<(), SerializationError> {
        let mut items = Vec::with_capacity(values.len());
        for value in values {
            items.push(self.object_value(*value)?);
        }
        self.put(key, Value::Array(items))
    }

    fn write_collection_of_primitive_values(
        &mut self,
        key: Option<&str>,
        values: &[PrimitiveValue],
    ) -> Result<(), SerializationError> {
        let items = values
            .iter()
            .map(primitive_to_value)
            .collect::<Result<Vec<_>, _>>()?;
        self.put(key, Value::Array(items))
    }

    fn write_untyped_value(
        &mut self,
        key: Option<&str>,
        value: &UntypedNode,
    ) -> Result<(), SerializationError> {
        let value = untyped_to_value(value)?;
        self.put(key, value)
    }

    fn serialized_content(&mut self) -> Result<Bytes, SerializationError> {
        if !self.stack.is_empty() {
            return Err(unbalanced());
        }
        let Some(root) = self.root.take() else {
            return Ok(Bytes::new());
        };
        serde_json::to_vec(&root)
            .map(Bytes::from)
            .map_err(|err| SerializationError::Backend(Box::new(err)))
    }
}
