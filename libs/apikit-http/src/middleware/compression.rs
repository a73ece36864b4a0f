//! Gzip request body compression with an uncompressed fallback.

use std::io::Write;

use apikit_abstractions::{RequestOption, RequestOptions};
use bytes::Bytes;
use flate2::Compression;
use flate2::write::GzEncoder;
use http::{HeaderValue, Request, Response, StatusCode, header};

use crate::error::HttpError;
use crate::pipeline::{Middleware, Pipeline, clone_request};

const GZIP: &str = "gzip";

/// Per-request switch for [`CompressionHandler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionOption {
    pub enabled: bool,
}

impl Default for CompressionOption {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl CompressionOption {
    #[must_use]
    pub fn disabled() -> Self {
        Self { enabled: false }
    }
}

impl RequestOption for CompressionOption {}

/// Gzips outbound bodies.
///
/// When the server answers `415 Unsupported Media Type` the request is sent
/// once more with the original body and without `Content-Encoding`. A second
/// 415 is returned as is.
///
/// Requests with an empty body, or that already carry `Content-Encoding` or
/// `Content-Range`, pass through untouched.
#[derive(Debug, Clone, Default)]
pub struct CompressionHandler {
    options: CompressionOption,
}

impl CompressionHandler {
    #[must_use]
    pub fn new(options: CompressionOption) -> Self {
        Self { options }
    }

    fn should_compress(request: &Request<Bytes>) -> bool {
        !request.body().is_empty()
            && !request.headers().contains_key(header::CONTENT_ENCODING)
            && !request.headers().contains_key(header::CONTENT_RANGE)
    }
}

fn gzip(content: &[u8]) -> Result<Vec<u8>, HttpError> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(content.len() / 2), Compression::default());
    encoder.write_all(content).map_err(HttpError::Compression)?;
    encoder.finish().map_err(HttpError::Compression)
}

impl Middleware for CompressionHandler {
    fn intercept(
        &self,
        pipeline: &Pipeline,
        position: usize,
        mut request: Request<Bytes>,
        options: &RequestOptions,
    ) -> Result<Response<Bytes>, HttpError> {
        let effective = options.get::<CompressionOption>().unwrap_or(&self.options);
        if !effective.enabled || !Self::should_compress(&request) {
            return pipeline.next(request, options, position);
        }

        let original = clone_request(&request);
        let compressed = Bytes::from(gzip(request.body())?);

        let headers = request.headers_mut();
        headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static(GZIP));
        headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static(GZIP));
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(compressed.len()));
        *request.body_mut() = compressed;

        let response = pipeline.next(request, options, position)?;
        if response.status() != StatusCode::UNSUPPORTED_MEDIA_TYPE {
            return Ok(response);
        }

        tracing::debug!(
            url = %original.uri(),
            "Server rejected gzip body, resending uncompressed"
        );
        pipeline.next(original, options, position)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::pipeline::Transport;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use std::sync::{Arc, Mutex};

    type Seen = Arc<Mutex<Vec<Request<Bytes>>>>;

    fn recording_transport(statuses: Vec<StatusCode>) -> (Arc<dyn Transport>, Seen) {
        let seen: Seen = Arc::default();
        let log = Arc::clone(&seen);
        let statuses = Mutex::new(statuses.into_iter());
        let transport: Arc<dyn Transport> =
            Arc::new(move |request: Request<Bytes>| -> Result<Response<Bytes>, HttpError> {
                log.lock().unwrap().push(request);
                let status = statuses.lock().unwrap().next().unwrap_or(StatusCode::OK);
                let mut response = Response::new(Bytes::new());
                *response.status_mut() = status;
                Ok(response)
            });
        (transport, seen)
    }

    fn pipeline(handler: CompressionHandler, transport: Arc<dyn Transport>) -> Pipeline {
        Pipeline::new(vec![Arc::new(handler) as Arc<dyn Middleware>], transport)
    }

    fn post(body: &'static str) -> Request<Bytes> {
        Request::post("https://example.com/items")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::CONTENT_LENGTH, body.len())
            .body(Bytes::from_static(body.as_bytes()))
            .unwrap()
    }

    fn gunzip(body: &[u8]) -> String {
        let mut out = String::new();
        GzDecoder::new(body).read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn test_body_is_gzipped() {
        let (transport, seen) = recording_transport(vec![]);
        let pipeline = pipeline(CompressionHandler::default(), transport);

        pipeline
            .send(post(r#"{"name":"widget"}"#), &RequestOptions::new())
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let sent = &seen[0];
        assert_eq!(sent.headers()[header::CONTENT_ENCODING], "gzip");
        assert_eq!(sent.headers()[header::ACCEPT_ENCODING], "gzip");
        assert_eq!(
            sent.headers()[header::CONTENT_LENGTH],
            sent.body().len().to_string().as_str()
        );
        assert_eq!(gunzip(sent.body()), r#"{"name":"widget"}"#);
    }

    #[test]
    fn test_415_resends_original_body_once() {
        let (transport, seen) = recording_transport(vec![
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            StatusCode::CREATED,
        ]);
        let pipeline = pipeline(CompressionHandler::default(), transport);

        let response = pipeline.send(post("plain"), &RequestOptions::new()).unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        let fallback = &seen[1];
        assert!(!fallback.headers().contains_key(header::CONTENT_ENCODING));
        assert_eq!(fallback.headers()[header::CONTENT_LENGTH], "5");
        assert_eq!(fallback.body().as_ref(), b"plain");
    }

    #[test]
    fn test_second_415_is_returned() {
        let (transport, seen) = recording_transport(vec![
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            StatusCode::OK,
        ]);
        let pipeline = pipeline(CompressionHandler::default(), transport);

        let response = pipeline.send(post("plain"), &RequestOptions::new()).unwrap();

        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_pass_through_cases() {
        let cases = [
            Request::get("https://example.com/").body(Bytes::new()).unwrap(),
            Request::post("https://example.com/")
                .header(header::CONTENT_ENCODING, "br")
                .body(Bytes::from_static(b"already"))
                .unwrap(),
            Request::put("https://example.com/")
                .header(header::CONTENT_RANGE, "bytes 0-4/10")
                .body(Bytes::from_static(b"chunk"))
                .unwrap(),
        ];

        for request in cases {
            let expected = request.body().clone();
            let (transport, seen) = recording_transport(vec![]);
            let pipeline = pipeline(CompressionHandler::default(), transport);
            pipeline.send(request, &RequestOptions::new()).unwrap();

            let seen = seen.lock().unwrap();
            assert_eq!(seen[0].body(), &expected);
            assert_ne!(
                seen[0]
                    .headers()
                    .get(header::CONTENT_ENCODING)
                    .map(HeaderValue::as_bytes),
                Some(GZIP.as_bytes())
            );
        }
    }

    #[test]
    fn test_request_option_overrides_handler_default() {
        let (transport, seen) = recording_transport(vec![]);
        let pipeline = pipeline(CompressionHandler::default(), transport);
        let mut options = RequestOptions::new();
        options.add(CompressionOption::disabled());

        pipeline.send(post("raw"), &options).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].body().as_ref(), b"raw");
        assert!(!seen[0].headers().contains_key(header::CONTENT_ENCODING));
    }

    #[test]
    fn test_disabled_handler_enabled_per_request() {
        let (transport, seen) = recording_transport(vec![]);
        let pipeline = pipeline(CompressionHandler::new(CompressionOption::disabled()), transport);
        let mut options = RequestOptions::new();
        options.add(CompressionOption::default());

        pipeline.send(post("zip me"), &options).unwrap();

        assert_eq!(gunzip(seen.lock().unwrap()[0].body()), "zip me");
    }
}
