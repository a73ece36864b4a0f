//! Redirect following with credential stripping across origins.

use std::fmt;
use std::sync::Arc;

use apikit_abstractions::{RequestOption, RequestOptions};
use bytes::Bytes;
use http::{Method, Request, Response, StatusCode, Uri, header};
use url::Url;

use crate::error::{HttpError, InvalidUriKind};
use crate::pipeline::{Middleware, Pipeline, clone_request};

/// Redirects followed when nothing else is configured.
pub const DEFAULT_MAX_REDIRECTS: usize = 5;

/// Larger bounds are clamped to this value.
pub const MAX_REDIRECTS_CEILING: usize = 20;

/// Headers removed when a redirect leaves the original origin.
const SENSITIVE_HEADERS: &[header::HeaderName] = &[
    header::AUTHORIZATION,
    header::COOKIE,
    header::PROXY_AUTHORIZATION,
];

/// Headers describing a request body, dropped when a `303` turns the
/// follow-up into a bodyless `GET`.
const BODY_HEADERS: &[header::HeaderName] = &[
    header::CONTENT_TYPE,
    header::CONTENT_LENGTH,
    header::CONTENT_ENCODING,
    header::CONTENT_LANGUAGE,
    header::CONTENT_LOCATION,
    header::CONTENT_RANGE,
    header::TRANSFER_ENCODING,
];

/// Decides whether a redirect response is followed.
pub type RedirectPredicate = Arc<dyn Fn(&Request<Bytes>, &Response<Bytes>) -> bool + Send + Sync>;

/// Redirect policy settings, usable as handler default or per request.
#[derive(Clone)]
pub struct RedirectHandlerOption {
    max_redirects: usize,
    should_redirect: RedirectPredicate,
}

impl Default for RedirectHandlerOption {
    fn default() -> Self {
        Self {
            max_redirects: DEFAULT_MAX_REDIRECTS,
            should_redirect: Arc::new(|_, _| true),
        }
    }
}

impl RedirectHandlerOption {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the number of followed redirects. Values above
    /// [`MAX_REDIRECTS_CEILING`] are clamped; `0` disables following.
    #[must_use]
    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects.min(MAX_REDIRECTS_CEILING);
        self
    }

    #[must_use]
    pub fn with_should_redirect<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Request<Bytes>, &Response<Bytes>) -> bool + Send + Sync + 'static,
    {
        self.should_redirect = Arc::new(predicate);
        self
    }

    #[must_use]
    pub fn max_redirects(&self) -> usize {
        self.max_redirects
    }

    #[must_use]
    pub fn should_redirect(&self, request: &Request<Bytes>, response: &Response<Bytes>) -> bool {
        (self.should_redirect)(request, response)
    }
}

impl fmt::Debug for RedirectHandlerOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedirectHandlerOption")
            .field("max_redirects", &self.max_redirects)
            .finish_non_exhaustive()
    }
}

impl RequestOption for RedirectHandlerOption {}

/// Follows `301`, `302`, `303`, `307` and `308` responses that carry a
/// `Location`.
///
/// Follow-up requests re-enter the pipeline at this handler's position, so
/// only the stages after it run again. When the bound is reached or the
/// predicate declines, the last redirect response is returned.
#[derive(Debug, Clone, Default)]
pub struct RedirectHandler {
    options: RedirectHandlerOption,
}

impl RedirectHandler {
    #[must_use]
    pub fn new(options: RedirectHandlerOption) -> Self {
        Self { options }
    }
}

fn is_redirect_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

fn redirect_location(response: &Response<Bytes>) -> Option<&str> {
    if !is_redirect_status(response.status()) {
        return None;
    }
    response
        .headers()
        .get(header::LOCATION)?
        .to_str()
        .ok()
        .map(str::trim)
        .filter(|location| !location.is_empty())
}

fn is_same_origin(original: &Url, target: &Url) -> bool {
    original.scheme() == target.scheme()
        && original.host_str() == target.host_str()
        && original.port_or_known_default() == target.port_or_known_default()
}

/// Build the request that follows `response` to `location`.
fn follow_up(
    previous: &Request<Bytes>,
    status: StatusCode,
    location: &str,
) -> Result<Request<Bytes>, HttpError> {
    let current = previous.uri().to_string();
    let base = Url::parse(&current).map_err(|err| HttpError::InvalidUri {
        url: current.clone(),
        kind: InvalidUriKind::ParseError,
        reason: err.to_string(),
    })?;
    let target = base.join(location).map_err(|err| HttpError::InvalidUri {
        url: location.to_owned(),
        kind: InvalidUriKind::InvalidLocation,
        reason: err.to_string(),
    })?;
    let uri: Uri = target.as_str().parse().map_err(|err: http::uri::InvalidUri| {
        HttpError::InvalidUri {
            url: target.to_string(),
            kind: InvalidUriKind::InvalidLocation,
            reason: err.to_string(),
        }
    })?;

    let mut next = clone_request(previous);
    *next.uri_mut() = uri;

    if !is_same_origin(&base, &target) {
        let headers = next.headers_mut();
        for name in SENSITIVE_HEADERS {
            if headers.remove(name).is_some() {
                tracing::warn!(
                    header = %name,
                    original = %base,
                    target = %target,
                    "Stripped sensitive header on cross-origin redirect"
                );
            }
        }
    }

    if status == StatusCode::SEE_OTHER {
        *next.method_mut() = Method::GET;
        *next.body_mut() = Bytes::new();
        let headers = next.headers_mut();
        for name in BODY_HEADERS {
            headers.remove(name);
        }
    }

    Ok(next)
}

impl Middleware for RedirectHandler {
    fn intercept(
        &self,
        pipeline: &Pipeline,
        position: usize,
        request: Request<Bytes>,
        options: &RequestOptions,
    ) -> Result<Response<Bytes>, HttpError> {
        let effective = options.get::<RedirectHandlerOption>().unwrap_or(&self.options);

        let mut current = request;
        let mut response = pipeline.next(clone_request(&current), options, position)?;
        let mut redirects = 0;

        loop {
            let Some(location) = redirect_location(&response) else {
                return Ok(response);
            };
            if redirects >= effective.max_redirects() {
                tracing::debug!(
                    count = redirects,
                    max = effective.max_redirects(),
                    "Redirect limit reached"
                );
                return Ok(response);
            }
            if !effective.should_redirect(&current, &response) {
                tracing::debug!(status = %response.status(), "Redirect declined by predicate");
                return Ok(response);
            }

            current = follow_up(&current, response.status(), location)?;
            redirects += 1;
            tracing::debug!(
                status = %response.status(),
                target = %current.uri(),
                count = redirects,
                "Following redirect"
            );
            response = pipeline.next(clone_request(&current), options, position)?;
        }
    }
}
