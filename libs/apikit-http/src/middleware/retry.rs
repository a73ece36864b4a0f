//! Replays requests rejected with `429`, `503` or `504`.

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};

use apikit_abstractions::{RequestOption, RequestOptions};
use bytes::Bytes;
use http::{HeaderMap, HeaderValue, Method, Request, Response, StatusCode, header};

use crate::error::HttpError;
use crate::pipeline::{Middleware, Pipeline, clone_request};

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const MAX_RETRIES_CEILING: u32 = 10;
pub const DEFAULT_DELAY_SECONDS: u64 = 3;

/// Upper bound for the sum of all delays of one call. Computed backoffs are
/// capped at it too; a server's `Retry-After` is never shortened.
pub const MAX_DELAY: Duration = Duration::from_secs(180);

/// Header carrying the attempt number on every replayed request.
pub const RETRY_ATTEMPT_HEADER: &str = "retry-attempt";

/// Decides whether a retriable response is retried, given the cumulative
/// delay so far and the number of retries already made.
pub type RetryPredicate =
    Arc<dyn Fn(Duration, u32, &Request<Bytes>, &Response<Bytes>) -> bool + Send + Sync>;

/// Retry policy settings, usable as handler default or per request.
#[derive(Clone)]
pub struct RetryHandlerOption {
    max_retries: u32,
    delay_seconds: u64,
    should_retry: RetryPredicate,
}

impl Default for RetryHandlerOption {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            delay_seconds: DEFAULT_DELAY_SECONDS,
            should_retry: Arc::new(|_, _, _, _| true),
        }
    }
}

impl RetryHandlerOption {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Values above [`MAX_RETRIES_CEILING`] are clamped; `0` disables retries.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.min(MAX_RETRIES_CEILING);
        self
    }

    /// Base of the backoff used when the server sends no `Retry-After`.
    /// The n-th retry waits `delay_seconds ^ n` seconds.
    #[must_use]
    pub fn with_delay_seconds(mut self, delay_seconds: u64) -> Self {
        self.delay_seconds = delay_seconds.min(MAX_DELAY.as_secs());
        self
    }

    #[must_use]
    pub fn with_should_retry<F>(mut self, predicate: F) -> Self
    where
        F: Fn(Duration, u32, &Request<Bytes>, &Response<Bytes>) -> bool + Send + Sync + 'static,
    {
        self.should_retry = Arc::new(predicate);
        self
    }

    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    #[must_use]
    pub fn delay_seconds(&self) -> u64 {
        self.delay_seconds
    }

    #[must_use]
    pub fn should_retry(
        &self,
        cumulative_delay: Duration,
        retries: u32,
        request: &Request<Bytes>,
        response: &Response<Bytes>,
    ) -> bool {
        (self.should_retry)(cumulative_delay, retries, request, response)
    }

    /// Backoff before retry number `attempt` when no `Retry-After` is given.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_secs(self.delay_seconds.saturating_pow(attempt)).min(MAX_DELAY)
    }
}

impl fmt::Debug for RetryHandlerOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryHandlerOption")
            .field("max_retries", &self.max_retries)
            .field("delay_seconds", &self.delay_seconds)
            .finish_non_exhaustive()
    }
}

impl RequestOption for RetryHandlerOption {}

/// Retries throttled and unavailable responses with a blocking backoff.
///
/// Each replay re-enters the pipeline at this handler's position and carries
/// `Retry-Attempt: <n>`. When retries are exhausted the last response is
/// returned, not an error.
#[derive(Debug, Clone, Default)]
pub struct RetryHandler {
    options: RetryHandlerOption,
}

impl RetryHandler {
    #[must_use]
    pub fn new(options: RetryHandlerOption) -> Self {
        Self { options }
    }
}

fn is_retriable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

/// A streamed body on a body-bearing method cannot be sent twice.
fn is_replayable(request: &Request<Bytes>) -> bool {
    let has_body_method = matches!(
        *request.method(),
        Method::POST | Method::PUT | Method::PATCH
    );
    let streamed = request
        .headers()
        .get(header::TRANSFER_ENCODING)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_ascii_lowercase().contains("chunked"))
        && !request.headers().contains_key(header::CONTENT_LENGTH);
    !(has_body_method && streamed)
}

/// Wait before retry number `attempt`: the server's `Retry-After` as given,
/// else the computed backoff.
fn retry_delay(
    options: &RetryHandlerOption,
    attempt: u32,
    response: &Response<Bytes>,
) -> Duration {
    parse_retry_after(response.headers()).unwrap_or_else(|| options.backoff(attempt))
}

/// Parse `Retry-After` as delta-seconds (integer or decimal) or HTTP-date.
///
/// Negative values, unparseable values and dates in the past yield `None`.
#[must_use]
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(header::RETRY_AFTER)?.to_str().ok()?.trim();

    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    if let Ok(seconds) = value.parse::<f64>() {
        return Duration::try_from_secs_f64(seconds).ok();
    }

    let at = httpdate::parse_http_date(value).ok()?;
    at.duration_since(SystemTime::now()).ok()
}

impl Middleware for RetryHandler {
    fn intercept(
        &self,
        pipeline: &Pipeline,
        position: usize,
        mut request: Request<Bytes>,
        options: &RequestOptions,
    ) -> Result<Response<Bytes>, HttpError> {
        let effective = options.get::<RetryHandlerOption>().unwrap_or(&self.options);

        let mut response = pipeline.next(clone_request(&request), options, position)?;
        if !is_replayable(&request) {
            return Ok(response);
        }

        let mut retries = 0;
        let mut cumulative_delay = Duration::ZERO;
        while is_retriable_status(response.status())
            && retries < effective.max_retries()
            && cumulative_delay < MAX_DELAY
            && effective.should_retry(cumulative_delay, retries, &request, &response)
        {
            let delay = retry_delay(effective, retries + 1, &response);
            if cumulative_delay.saturating_add(delay) > MAX_DELAY {
                tracing::debug!(
                    status = %response.status(),
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "Requested delay exceeds the retry budget, giving up"
                );
                break;
            }
            retries += 1;
            cumulative_delay += delay;

            request
                .headers_mut()
                .insert(RETRY_ATTEMPT_HEADER, HeaderValue::from(retries));
            tracing::debug!(
                status = %response.status(),
                attempt = retries,
                max = effective.max_retries(),
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "Retrying request"
            );
            if !delay.is_zero() {
                thread::sleep(delay);
            }

            response = pipeline.next(clone_request(&request), options, position)?;
        }

        Ok(response)
    }
}
