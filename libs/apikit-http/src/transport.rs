//! Blocking network transport backed by `ureq`.

use std::error::Error as _;
use std::io::{self, Read};
use std::time::Duration;

use bytes::Bytes;
use http::{Request, Response, StatusCode, header};

use crate::config::{HttpClientConfig, TransportSecurity};
use crate::error::{HttpError, InvalidUriKind};
use crate::pipeline::Transport;

/// Headers `ureq` derives from the request itself.
const FRAMING_HEADERS: &[header::HeaderName] = &[
    header::CONTENT_LENGTH,
    header::TRANSFER_ENCODING,
    header::HOST,
    header::CONNECTION,
];

/// Terminal pipeline stage that performs the HTTP exchange with `ureq`.
///
/// Redirects are never followed here; the pipeline's redirect handler owns
/// that policy. Error statuses are returned as responses.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    security: TransportSecurity,
    timeout: Duration,
    max_body_size: usize,
}

impl UreqTransport {
    #[must_use]
    pub fn new(config: &HttpClientConfig) -> Self {
        if config.transport == TransportSecurity::AllowInsecureHttp {
            tracing::warn!(
                target: "apikit_http::security",
                "insecure HTTP enabled (TransportSecurity::AllowInsecureHttp); \
                 use only for testing with mock servers"
            );
        }
        let agent = ureq::AgentBuilder::new()
            .redirects(0)
            .timeout(config.request_timeout)
            .build();
        Self {
            agent,
            security: config.transport,
            timeout: config.request_timeout,
            max_body_size: config.max_body_size,
        }
    }

    fn check_scheme(&self, request: &Request<Bytes>) -> Result<(), HttpError> {
        let uri = request.uri();
        if uri.host().is_none() {
            return Err(HttpError::InvalidUri {
                url: uri.to_string(),
                kind: InvalidUriKind::MissingAuthority,
                reason: "URL has no host".to_owned(),
            });
        }
        match (uri.scheme_str(), self.security) {
            (Some("https"), _) | (Some("http"), TransportSecurity::AllowInsecureHttp) => Ok(()),
            (Some("http"), TransportSecurity::TlsOnly) => Err(HttpError::InvalidScheme {
                scheme: "http".to_owned(),
                reason: "plain HTTP requires TransportSecurity::AllowInsecureHttp".to_owned(),
            }),
            (scheme, _) => Err(HttpError::InvalidScheme {
                scheme: scheme.unwrap_or_default().to_owned(),
                reason: "only http and https are supported".to_owned(),
            }),
        }
    }

    fn classify(&self, err: ureq::Transport) -> HttpError {
        let timed_out = err
            .source()
            .and_then(|source| source.downcast_ref::<io::Error>())
            .is_some_and(|io| {
                matches!(io.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
            });
        if timed_out {
            HttpError::Timeout(self.timeout)
        } else {
            HttpError::from(err)
        }
    }

    fn read_response(&self, response: ureq::Response) -> Result<Response<Bytes>, HttpError> {
        let status = StatusCode::from_u16(response.status())
            .map_err(|err| HttpError::Transport(Box::new(err)))?;
        let mut builder = Response::builder().status(status);
        for name in response.headers_names() {
            for value in response.all(&name) {
                builder = builder.header(name.as_str(), value);
            }
        }

        let limit = self.max_body_size;
        let mut body = Vec::new();
        response
            .into_reader()
            .take(u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1))
            .read_to_end(&mut body)
            .map_err(HttpError::BodyRead)?;
        if body.len() > limit {
            return Err(HttpError::BodyTooLarge {
                limit,
                actual: body.len(),
            });
        }

        Ok(builder.body(Bytes::from(body))?)
    }
}

impl Transport for UreqTransport {
    fn round_trip(&self, request: Request<Bytes>) -> Result<Response<Bytes>, HttpError> {
        self.check_scheme(&request)?;

        let url = request.uri().to_string();
        let mut call = self.agent.request(request.method().as_str(), &url);
        for (name, value) in request.headers() {
            if FRAMING_HEADERS.contains(name) {
                continue;
            }
            let value = value
                .to_str()
                .map_err(|err| HttpError::Transport(Box::new(err)))?;
            call = call.set(name.as_str(), value);
        }

        tracing::trace!(method = %request.method(), url = %url, "Sending request");
        let result = if request.body().is_empty() {
            call.call()
        } else {
            call.send_bytes(request.body())
        };

        match result {
            Ok(response) | Err(ureq::Error::Status(_, response)) => self.read_response(response),
            Err(ureq::Error::Transport(err)) => Err(self.classify(err)),
        }
    }
}
