//! Ordered middleware chain around a terminal transport call.
//!
//! The chain position travels with each call instead of living in the
//! pipeline, so one [`Pipeline`] serves any number of concurrent requests and
//! a middleware can replay everything after it by calling
//! [`Pipeline::next`] again with its own position.

use std::fmt;
use std::sync::Arc;

use apikit_abstractions::RequestOptions;
use bytes::Bytes;
use http::{Request, Response};

use crate::error::HttpError;

/// One stage of the pipeline.
///
/// `position` is the index of the next stage. On the happy path an
/// implementation calls `pipeline.next(request, options, position)` exactly
/// once; policies that replay a request call it again with the same
/// position. A middleware that never calls `next` stops the request from
/// reaching the network.
pub trait Middleware: Send + Sync {
    /// # Errors
    /// Propagates errors from later stages and the transport.
    fn intercept(
        &self,
        pipeline: &Pipeline,
        position: usize,
        request: Request<Bytes>,
        options: &RequestOptions,
    ) -> Result<Response<Bytes>, HttpError>;
}

impl<F> Middleware for F
where
    F: Fn(&Pipeline, usize, Request<Bytes>, &RequestOptions) -> Result<Response<Bytes>, HttpError>
        + Send
        + Sync,
{
    fn intercept(
        &self,
        pipeline: &Pipeline,
        position: usize,
        request: Request<Bytes>,
        options: &RequestOptions,
    ) -> Result<Response<Bytes>, HttpError> {
        self(pipeline, position, request, options)
    }
}

/// Performs the network round trip at the end of the pipeline.
pub trait Transport: Send + Sync {
    /// Send `request` and read the whole response.
    ///
    /// Error statuses are responses, not errors.
    ///
    /// # Errors
    /// Returns an error when no response could be obtained.
    fn round_trip(&self, request: Request<Bytes>) -> Result<Response<Bytes>, HttpError>;
}

impl<F> Transport for F
where
    F: Fn(Request<Bytes>) -> Result<Response<Bytes>, HttpError> + Send + Sync,
{
    fn round_trip(&self, request: Request<Bytes>) -> Result<Response<Bytes>, HttpError> {
        self(request)
    }
}

/// Immutable middleware chain terminated by a [`Transport`].
///
/// Cloning is cheap; clones share the same stages.
#[derive(Clone)]
pub struct Pipeline {
    middlewares: Arc<[Arc<dyn Middleware>]>,
    transport: Arc<dyn Transport>,
}

impl Pipeline {
    /// Build a pipeline that runs `middlewares` in order, then `transport`.
    #[must_use]
    pub fn new(middlewares: Vec<Arc<dyn Middleware>>, transport: Arc<dyn Transport>) -> Self {
        Self {
            middlewares: middlewares.into(),
            transport,
        }
    }

    /// Run `request` through the whole chain.
    ///
    /// # Errors
    /// Propagates middleware and transport errors unchanged.
    pub fn send(
        &self,
        request: Request<Bytes>,
        options: &RequestOptions,
    ) -> Result<Response<Bytes>, HttpError> {
        self.next(request, options, 0)
    }

    /// Run `request` from stage `position` onwards.
    ///
    /// # Errors
    /// Propagates middleware and transport errors unchanged.
    pub fn next(
        &self,
        request: Request<Bytes>,
        options: &RequestOptions,
        position: usize,
    ) -> Result<Response<Bytes>, HttpError> {
        match self.middlewares.get(position) {
            Some(middleware) => middleware.intercept(self, position + 1, request, options),
            None => self.transport.round_trip(request),
        }
    }

    /// Number of middlewares before the transport.
    #[must_use]
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("middlewares", &self.middlewares.len())
            .finish_non_exhaustive()
    }
}

/// Copy a request so it can be sent again. The body is shared, not copied.
#[must_use]
pub fn clone_request(request: &Request<Bytes>) -> Request<Bytes> {
    let mut copy = Request::new(request.body().clone());
    *copy.method_mut() = request.method().clone();
    *copy.uri_mut() = request.uri().clone();
    *copy.version_mut() = request.version();
    *copy.headers_mut() = request.headers().clone();
    *copy.extensions_mut() = request.extensions().clone();
    copy
}
