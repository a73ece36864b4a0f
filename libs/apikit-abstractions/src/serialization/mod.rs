//! Serialization port: the contracts a payload backend implements so the
//! adapter can write request bodies and read responses without knowing the
//! wire format.

mod factory;
mod parsable;
mod parse_node;
mod primitive;
mod registry;
mod untyped;
mod writer;

pub use factory::{ParseNodeFactory, SerializationWriterFactory};
pub use parsable::Parsable;
pub use parse_node::{
    ParseNode, collection_of_enum_values, enum_value, parse_collection_of_objects, parse_object,
};
pub use primitive::{PrimitiveKind, PrimitiveValue};
pub use registry::{
    ParseNodeFactoryRegistry, SerializationWriterFactoryRegistry, primary_content_type,
};
pub use untyped::{AdditionalData, UntypedNode};
pub use writer::SerializationWriter;
