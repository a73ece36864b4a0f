use super::{AdditionalData, ParseNode, SerializationWriter};
use crate::error::SerializationError;

/// A model that can be written by a [`SerializationWriter`] and populated
/// from a [`ParseNode`].
///
/// Generated models implement this by writing and reading their declared
/// fields. Fields the model does not know land in
/// [`additional_data_mut`](Parsable::additional_data_mut) when the model keeps
/// an additional-data bag.
pub trait Parsable {
    /// Write every field of `self` into `writer`.
    ///
    /// # Errors
    /// Propagates writer failures.
    fn serialize(&self, writer: &mut dyn SerializationWriter) -> Result<(), SerializationError>;

    /// Read the field `name` from `node`.
    ///
    /// Returns `Ok(false)` when the field is not part of the model.
    ///
    /// # Errors
    /// Returns an error when the node has the wrong shape for the field.
    fn deserialize_field(
        &mut self,
        name: &str,
        node: &dyn ParseNode,
    ) -> Result<bool, SerializationError>;

    fn additional_data(&self) -> Option<&AdditionalData> {
        None
    }

    fn additional_data_mut(&mut self) -> Option<&mut AdditionalData> {
        None
    }
}
