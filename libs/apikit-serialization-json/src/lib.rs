#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! JSON backend for the `apikit` serialization port
//!
//! Register the factories with the adapter's registries:
//!
//! ```ignore
//! use apikit_abstractions::{ParseNodeFactoryRegistry, SerializationWriterFactoryRegistry};
//! use apikit_serialization_json::{JsonParseNodeFactory, JsonSerializationWriterFactory};
//!
//! let parse_nodes = ParseNodeFactoryRegistry::new();
//! parse_nodes.register_default(JsonParseNodeFactory)?;
//! let writers = SerializationWriterFactoryRegistry::new();
//! writers.register_default(JsonSerializationWriterFactory)?;
//! ```
//!
//! Timestamps are RFC 3339 strings, byte arrays are standard base64 and UUIDs
//! are hyphenated strings.

mod factory;
mod parse_node;
mod writer;

pub use factory::{JSON_CONTENT_TYPE, JsonParseNodeFactory, JsonSerializationWriterFactory};
pub use parse_node::JsonParseNode;
pub use writer::JsonSerializationWriter;
