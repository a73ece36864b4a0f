#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Blocking HTTP backend for `apikit` generated clients
//!
//! Requests travel through an ordered [`Pipeline`] of [`Middleware`]s that
//! ends in a [`Transport`]:
//! - `User-Agent` injection
//! - Gzip request compression with a fallback on `415`
//! - Redirect following with credential stripping across origins
//! - Retries on `429`, `503` and `504` honouring `Retry-After`
//! - A `ureq` transport (HTTPS only by default)
//!
//! Every stage reads its per-request option from the request's
//! [`RequestOptions`](apikit_abstractions::RequestOptions), so one pipeline
//! serves concurrent calls with different settings.
//!
//! [`HttpRequestAdapter`] puts authentication, URI templates and
//! (de)serialization around the pipeline.
//!
//! # Example
//!
//! ```ignore
//! use apikit_abstractions::AnonymousAuthenticationProvider;
//! use apikit_http::{HttpClientConfig, HttpRequestAdapter};
//! use std::sync::Arc;
//!
//! let adapter = HttpRequestAdapter::builder(Arc::new(AnonymousAuthenticationProvider))
//!     .parse_node_factory(Arc::new(parse_nodes))
//!     .serialization_writer_factory(Arc::new(writers))
//!     .config(HttpClientConfig::default())
//!     .base_url("https://api.example.com/v1")
//!     .build()?;
//!
//! let pet: Option<Pet> = adapter.send(request, Some(&error_mappings))?;
//! ```

mod adapter;
mod config;
mod error;
pub mod middleware;
mod pipeline;
mod transport;

pub use adapter::{HttpRequestAdapter, HttpRequestAdapterBuilder};
pub use config::{HttpClientConfig, TransportSecurity};
pub use error::{HttpError, InvalidUriKind};
pub use middleware::{
    CompressionHandler, CompressionOption, DEFAULT_USER_AGENT, RETRY_ATTEMPT_HEADER,
    RedirectHandler, RedirectHandlerOption, RetryHandler, RetryHandlerOption, UserAgentHandler,
    UserAgentHandlerOption,
};
pub use pipeline::{Middleware, Pipeline, Transport, clone_request};
pub use transport::UreqTransport;
