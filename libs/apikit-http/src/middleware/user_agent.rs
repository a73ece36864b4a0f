use apikit_abstractions::{RequestOption, RequestOptions};
use bytes::Bytes;
use http::{HeaderValue, Request, Response, header};

use crate::error::HttpError;
use crate::pipeline::{Middleware, Pipeline};

/// Default product token sent as `User-Agent`
pub const DEFAULT_USER_AGENT: &str = concat!("apikit-http/", env!("CARGO_PKG_VERSION"));

/// Per-request override for [`UserAgentHandler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAgentHandlerOption {
    pub enabled: bool,
    pub product_name: String,
    pub product_version: String,
}

impl Default for UserAgentHandlerOption {
    fn default() -> Self {
        Self {
            enabled: true,
            product_name: "apikit-http".to_owned(),
            product_version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }
}

impl UserAgentHandlerOption {
    #[must_use]
    pub fn new(product_name: impl Into<String>, product_version: impl Into<String>) -> Self {
        Self {
            enabled: true,
            product_name: product_name.into(),
            product_version: product_version.into(),
        }
    }

    /// `name/version` product token.
    #[must_use]
    pub fn product(&self) -> String {
        format!("{}/{}", self.product_name, self.product_version)
    }
}

impl RequestOption for UserAgentHandlerOption {}

/// Sets `User-Agent` on requests that do not carry one.
#[derive(Debug, Clone)]
pub struct UserAgentHandler {
    user_agent: HeaderValue,
}

impl Default for UserAgentHandler {
    fn default() -> Self {
        Self {
            user_agent: HeaderValue::from_static(DEFAULT_USER_AGENT),
        }
    }
}

impl UserAgentHandler {
    /// Create a handler sending `user_agent`.
    ///
    /// # Errors
    /// Returns `HttpError::InvalidHeaderValue` if the string is not a valid header value
    pub fn try_new(user_agent: impl AsRef<str>) -> Result<Self, HttpError> {
        let user_agent = HeaderValue::from_str(user_agent.as_ref())?;
        Ok(Self { user_agent })
    }
}

impl Middleware for UserAgentHandler {
    fn intercept(
        &self,
        pipeline: &Pipeline,
        position: usize,
        mut request: Request<Bytes>,
        options: &RequestOptions,
    ) -> Result<Response<Bytes>, HttpError> {
        if !request.headers().contains_key(header::USER_AGENT) {
            match options.get::<UserAgentHandlerOption>() {
                Some(option) if !option.enabled => {}
                Some(option) => {
                    let value = HeaderValue::from_str(&option.product())?;
                    request.headers_mut().insert(header::USER_AGENT, value);
                }
                None => {
                    request
                        .headers_mut()
                        .insert(header::USER_AGENT, self.user_agent.clone());
                }
            }
        }
        pipeline.next(request, options, position)
    }
}
