use apikit_abstractions::serialization::primary_content_type;
use apikit_abstractions::{
    ParseNode, ParseNodeFactory, SerializationError, SerializationWriter,
    SerializationWriterFactory,
};

use crate::{JsonParseNode, JsonSerializationWriter};

pub const JSON_CONTENT_TYPE: &str = "application/json";

fn check_content_type(content_type: &str) -> Result<(), SerializationError> {
    if content_type.trim().is_empty() {
        return Err(SerializationError::EmptyContentType);
    }
    let primary = primary_content_type(content_type);
    if primary != JSON_CONTENT_TYPE {
        return Err(SerializationError::ContentTypeMismatch {
            expected: JSON_CONTENT_TYPE,
            actual: primary,
        });
    }
    Ok(())
}

/// Parses `application/json` payloads into [`JsonParseNode`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonParseNodeFactory;

impl ParseNodeFactory for JsonParseNodeFactory {
    fn valid_content_type(&self) -> Result<&str, SerializationError> {
        Ok(JSON_CONTENT_TYPE)
    }

    fn root_parse_node(
        &self,
        content_type: &str,
        content: &[u8],
    ) -> Result<Box<dyn ParseNode>, SerializationError> {
        check_content_type(content_type)?;
        if content.is_empty() {
            return Err(SerializationError::EmptyContent);
        }
        Ok(Box::new(JsonParseNode::from_slice(content)?))
    }
}

/// Creates [`JsonSerializationWriter`]s for `application/json` bodies.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializationWriterFactory;

impl SerializationWriterFactory for JsonSerializationWriterFactory {
    fn valid_content_type(&self) -> Result<&str, SerializationError> {
        Ok(JSON_CONTENT_TYPE)
    }

    fn serialization_writer(
        &self,
        content_type: &str,
    ) -> Result<Box<dyn SerializationWriter>, SerializationError> {
        check_content_type(content_type)?;
        Ok(Box::new(JsonSerializationWriter::new()))
    }
}
