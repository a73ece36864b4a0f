use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::SerializationError;
use crate::serialization::{Parsable, ParseNode, UntypedNode};

/// A parse node for a JSON-like `null`.
pub(crate) struct NullNode;

impl ParseNode for NullNode {
    fn child_node(&self, _name: &str) -> Option<Box<dyn ParseNode + '_>> {
        None
    }
    fn is_null(&self) -> bool {
        true
    }
    fn string_value(&self) -> Result<Option<String>, SerializationError> {
        Ok(None)
    }
    fn bool_value(&self) -> Result<Option<bool>, SerializationError> {
        Ok(None)
    }
    fn i32_value(&self) -> Result<Option<i32>, SerializationError> {
        Ok(None)
    }
    fn i64_value(&self) -> Result<Option<i64>, SerializationError> {
        Ok(None)
    }
    fn f32_value(&self) -> Result<Option<f32>, SerializationError> {
        Ok(None)
    }
    fn f64_value(&self) -> Result<Option<f64>, SerializationError> {
        Ok(None)
    }
    fn time_value(&self) -> Result<Option<OffsetDateTime>, SerializationError> {
        Ok(None)
    }
    fn uuid_value(&self) -> Result<Option<Uuid>, SerializationError> {
        Ok(None)
    }
    fn byte_array_value(&self) -> Result<Option<Vec<u8>>, SerializationError> {
        Ok(None)
    }
    fn collection_nodes(&self) -> Result<Vec<Box<dyn ParseNode + '_>>, SerializationError> {
        Ok(Vec::new())
    }
    fn populate_object(&self, _target: &mut dyn Parsable) -> Result<(), SerializationError> {
        Ok(())
    }
    fn untyped_value(&self) -> Result<UntypedNode, SerializationError> {
        Ok(UntypedNode::Null)
    }
}
