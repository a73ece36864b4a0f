use super::{ParseNode, SerializationWriter};
use crate::error::SerializationError;

/// Creates root parse nodes for one content type.
pub trait ParseNodeFactory: Send + Sync {
    /// The content type this factory parses.
    ///
    /// # Errors
    /// Registries return [`SerializationError::RegistryContentType`].
    fn valid_content_type(&self) -> Result<&str, SerializationError>;

    /// Parse `content` into a root node.
    ///
    /// # Errors
    /// Returns an error for an empty or unsupported content type, empty
    /// content, or a payload the backend cannot parse.
    fn root_parse_node(
        &self,
        content_type: &str,
        content: &[u8],
    ) -> Result<Box<dyn ParseNode>, SerializationError>;
}

/// Creates serialization writers for one content type.
pub trait SerializationWriterFactory: Send + Sync {
    /// The content type this factory writes.
    ///
    /// # Errors
    /// Registries return [`SerializationError::RegistryContentType`].
    fn valid_content_type(&self) -> Result<&str, SerializationError>;

    /// # Errors
    /// Returns an error for an empty or unsupported content type.
    fn serialization_writer(
        &self,
        content_type: &str,
    ) -> Result<Box<dyn SerializationWriter>, SerializationError>;
}
