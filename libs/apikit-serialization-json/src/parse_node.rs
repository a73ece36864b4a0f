use std::borrow::Cow;

use apikit_abstractions::{Parsable, ParseNode, SerializationError, UntypedNode};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

/// [`ParseNode`] over a `serde_json` value tree.
///
/// The root node owns the parsed document; child nodes borrow from it.
#[derive(Debug, Clone)]
pub struct JsonParseNode<'a> {
    value: Cow<'a, Value>,
}

impl JsonParseNode<'static> {
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self {
            value: Cow::Owned(value),
        }
    }

    /// Parse a JSON document.
    ///
    /// # Errors
    /// Returns [`SerializationError::Backend`] when `content` is not valid JSON.
    pub fn from_slice(content: &[u8]) -> Result<Self, SerializationError> {
        let value: Value = serde_json::from_slice(content)
            .map_err(|err| SerializationError::Backend(Box::new(err)))?;
        Ok(Self::new(value))
    }
}

impl<'a> JsonParseNode<'a> {
    fn borrowed(value: &'a Value) -> Self {
        Self {
            value: Cow::Borrowed(value),
        }
    }

    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    fn unexpected(&self, expected: &'static str) -> SerializationError {
        SerializationError::UnexpectedNode {
            expected,
            found: kind_name(&self.value),
        }
    }

    fn string_ref(&self, expected: &'static str) -> Result<Option<&str>, SerializationError> {
        match &*self.value {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            _ => Err(self.unexpected(expected)),
        }
    }

    fn number(
        &self,
        expected: &'static str,
    ) -> Result<Option<&serde_json::Number>, SerializationError> {
        match &*self.value {
            Value::Null => Ok(None),
            Value::Number(n) => Ok(Some(n)),
            _ => Err(self.unexpected(expected)),
        }
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn to_untyped(value: &Value) -> UntypedNode {
    match value {
        Value::Null => UntypedNode::Null,
        Value::Bool(b) => UntypedNode::Bool(*b),
        Value::Number(n) => n
            .as_i64()
            .map(UntypedNode::Integer)
            .or_else(|| n.as_f64().map(UntypedNode::Float))
            .unwrap_or_default(),
        Value::String(s) => UntypedNode::String(s.clone()),
        Value::Array(items) => UntypedNode::Array(items.iter().map(to_untyped).collect()),
        Value::Object(map) => UntypedNode::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), to_untyped(value)))
                .collect(),
        ),
    }
}

impl ParseNode for JsonParseNode<'_> {
    fn child_node(&self, name: &str) -> Option<Box<dyn ParseNode + '_>> {
        self.value
            .as_object()?
            .get(name)
            .map(|child| Box::new(JsonParseNode::borrowed(child)) as Box<dyn ParseNode + '_>)
    }

    fn is_null(&self) -> bool {
        self.value.is_null()
    }

    fn string_value(&self) -> Result<Option<String>, SerializationError> {
        Ok(self.string_ref("string")?.map(str::to_owned))
    }

    fn bool_value(&self) -> Result<Option<bool>, SerializationError> {
        match &*self.value {
            Value::Null => Ok(None),
            Value::Bool(b) => Ok(Some(*b)),
            _ => Err(self.unexpected("bool")),
        }
    }

    fn i32_value(&self) -> Result<Option<i32>, SerializationError> {
        self.i64_value()?
            .map(|v| {
                i32::try_from(v)
                    .map_err(|err| SerializationError::invalid_value("int32", v.to_string(), err))
            })
            .transpose()
    }

    fn i64_value(&self) -> Result<Option<i64>, SerializationError> {
        self.number("int64")?
            .map(|n| {
                n.as_i64().ok_or_else(|| {
                    SerializationError::invalid_value(
                        "int64",
                        n.to_string(),
                        "not an integer in range",
                    )
                })
            })
            .transpose()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn f32_value(&self) -> Result<Option<f32>, SerializationError> {
        Ok(self.f64_value()?.map(|v| v as f32))
    }

    fn f64_value(&self) -> Result<Option<f64>, SerializationError> {
        self.number("float64")?
            .map(|n| {
                n.as_f64().ok_or_else(|| {
                    SerializationError::invalid_value("float64", n.to_string(), "not representable")
                })
            })
            .transpose()
    }

    fn time_value(&self) -> Result<Option<OffsetDateTime>, SerializationError> {
        self.string_ref("time")?
            .map(|s| {
                OffsetDateTime::parse(s, &Rfc3339)
                    .map_err(|err| SerializationError::invalid_value("time", s, err))
            })
            .transpose()
    }

    fn uuid_value(&self) -> Result<Option<Uuid>, SerializationError> {
        self.string_ref("uuid")?
            .map(|s| {
                Uuid::parse_str(s).map_err(|err| SerializationError::invalid_value("uuid", s, err))
            })
            .transpose()
    }

    fn byte_array_value(&self) -> Result<Option<Vec<u8>>, SerializationError> {
        self.string_ref("base64 string")?
            .map(|s| {
                STANDARD
                    .decode(s)
                    .map_err(|err| SerializationError::invalid_value("bytes", s, err))
            })
            .transpose()
    }

    fn collection_nodes(&self) -> Result<Vec<Box<dyn ParseNode + '_>>, SerializationError> {
        match &*self.value {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => Ok(items
                .iter()
                .map(|item| Box::new(JsonParseNode::borrowed(item)) as Box<dyn ParseNode + '_>)
                .collect()),
            _ => Err(self.unexpected("array")),
        }
    }

    fn populate_object(&self, target: &mut dyn Parsable) -> Result<(), SerializationError> {
        let map = match &*self.value {
            Value::Null => return Ok(()),
            Value::Object(map) => map,
            _ => return Err(self.unexpected("object")),
        };

        for (name, value) in map {
            let child = JsonParseNode::borrowed(value);
            if target.deserialize_field(name, &child)? {
                continue;
            }
            if let Some(extra) = target.additional_data_mut() {
                extra.insert(name.clone(), to_untyped(value));
            }
        }
        Ok(())
    }

    fn untyped_value(&self) -> Result<UntypedNode, SerializationError> {
        Ok(to_untyped(&self.value))
    }
}
