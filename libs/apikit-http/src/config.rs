use std::sync::Arc;
use std::time::Duration;

use crate::error::HttpError;
use crate::middleware::{
    CompressionHandler, CompressionOption, DEFAULT_USER_AGENT, RedirectHandler,
    RedirectHandlerOption, RetryHandler, RetryHandlerOption, UserAgentHandler,
};
use crate::pipeline::{Middleware, Pipeline};
use crate::transport::UreqTransport;

/// Transport security configuration
///
/// Controls whether the client enforces TLS or allows insecure HTTP.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportSecurity {
    /// Require TLS for all connections (HTTPS only) - default and recommended
    #[default]
    TlsOnly,
    /// Allow insecure HTTP connections (for testing with mock servers only)
    ///
    /// **WARNING**: This should only be used for local testing with mock servers.
    /// Never use in production as it exposes traffic to interception.
    AllowInsecureHttp,
}

/// Overall HTTP client configuration
///
/// A `None` policy leaves its handler out of the default chain.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Timeout of a single attempt (default: 30 seconds)
    ///
    /// Retries and redirects each get their own timeout.
    pub request_timeout: Duration,

    /// Maximum response body size in bytes (default: 10 MB)
    pub max_body_size: usize,

    /// User-Agent header value (default: "apikit-http/<version>")
    pub user_agent: String,

    /// Transport security mode (default: `TlsOnly`)
    pub transport: TransportSecurity,

    /// Retry policy (default: 3 retries, 3 second backoff base)
    pub retry: Option<RetryHandlerOption>,

    /// Redirect policy (default: up to 5 redirects)
    pub redirect: Option<RedirectHandlerOption>,

    /// Request body compression (default: enabled)
    pub compression: Option<CompressionOption>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_body_size: 10 * 1024 * 1024, // 10 MB
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            transport: TransportSecurity::TlsOnly,
            retry: Some(RetryHandlerOption::default()),
            redirect: Some(RedirectHandlerOption::default()),
            compression: Some(CompressionOption::default()),
        }
    }
}

impl HttpClientConfig {
    /// Bare transport: no retry, redirect or compression handling
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            max_body_size: 1024 * 1024, // 1 MB
            retry: None,
            redirect: None,
            compression: None,
            ..Self::default()
        }
    }

    /// Configuration for tests against local mock servers
    ///
    /// Allows plain HTTP and retries without waiting.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
            transport: TransportSecurity::AllowInsecureHttp,
            retry: Some(RetryHandlerOption::default().with_delay_seconds(0)),
            ..Self::default()
        }
    }

    /// Default chain: user agent, compression, redirect, retry.
    ///
    /// # Errors
    /// Returns `HttpError::InvalidHeaderValue` if `user_agent` is not a valid header value
    pub fn default_middlewares(&self) -> Result<Vec<Arc<dyn Middleware>>, HttpError> {
        let mut middlewares: Vec<Arc<dyn Middleware>> =
            vec![Arc::new(UserAgentHandler::try_new(&self.user_agent)?)];
        if let Some(compression) = self.compression {
            middlewares.push(Arc::new(CompressionHandler::new(compression)));
        }
        if let Some(redirect) = &self.redirect {
            middlewares.push(Arc::new(RedirectHandler::new(redirect.clone())));
        }
        if let Some(retry) = &self.retry {
            middlewares.push(Arc::new(RetryHandler::new(retry.clone())));
        }
        Ok(middlewares)
    }

    /// Default chain in front of a ureq transport built from this config.
    ///
    /// # Errors
    /// Returns `HttpError::InvalidHeaderValue` if `user_agent` is not a valid header value
    pub fn build_pipeline(&self) -> Result<Pipeline, HttpError> {
        let transport = Arc::new(UreqTransport::new(self));
        Ok(Pipeline::new(self.default_middlewares()?, transport))
    }
}
