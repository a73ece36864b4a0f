#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Contracts for generated API clients
//!
//! This crate describes requests and responses without committing to a
//! transport or a payload format:
//! - [`RequestInformation`]: method, URI template with path and query
//!   parameters, headers, body and typed per-request options
//! - [`AuthenticationProvider`]: anonymous and bearer token authentication
//! - The serialization port ([`ParseNode`], [`SerializationWriter`] and their
//!   content-type keyed factory registries)
//! - [`ErrorMappings`]: status code to domain error conversion
//! - [`RequestAdapter`]: the entry point an HTTP backend implements
//!
//! # Example
//!
//! ```ignore
//! use apikit_abstractions::{HttpMethod, RequestAdapter, RequestInformation};
//! use std::collections::HashMap;
//!
//! let mut request = RequestInformation::new(
//!     HttpMethod::Get,
//!     "{+baseurl}/users/{user%2Did}",
//!     HashMap::from([("user%2Did".to_owned(), "42".to_owned())]),
//! );
//! request.headers.insert("Accept", "application/json");
//!
//! let user: Option<User> = adapter.send(request, None)?;
//! ```

mod adapter;
pub mod auth;
mod error;
mod error_mapping;
mod method;
mod options;
mod request_information;
mod response_handler;
pub mod serialization;
pub mod uri_template;

#[cfg(test)]
mod test_support;

pub use adapter::RequestAdapter;
pub use auth::{
    AccessTokenProvider, AllowedHostsValidator, AnonymousAuthenticationProvider,
    AuthenticationProvider, BaseBearerTokenAuthenticationProvider,
};
pub use error::{
    ApiError, AuthenticationError, BoxError, RequestError, SerializationError, UriTemplateError,
};
pub use error_mapping::{ErrorFactory, ErrorMappings};
pub use method::HttpMethod;
pub use options::{RequestOption, RequestOptions};
pub use request_information::{
    BASE_URL_KEY, CONTENT_TYPE_HEADER, RAW_URL_KEY, RequestHeaders, RequestInformation,
};
pub use response_handler::ResponseHandler;
pub use serialization::{
    AdditionalData, Parsable, ParseNode, ParseNodeFactory, ParseNodeFactoryRegistry,
    PrimitiveKind, PrimitiveValue, SerializationWriter, SerializationWriterFactory,
    SerializationWriterFactoryRegistry, UntypedNode,
};
