//! Standard pipeline policies.
//!
//! Each handler carries default settings and reads a same-typed option from
//! the request's [`RequestOptions`](apikit_abstractions::RequestOptions),
//! which wins when present.

pub mod compression;
pub mod redirect;
pub mod retry;
pub mod user_agent;

pub use compression::{CompressionHandler, CompressionOption};
pub use redirect::{RedirectHandler, RedirectHandlerOption, RedirectPredicate};
pub use retry::{
    RETRY_ATTEMPT_HEADER, RetryHandler, RetryHandlerOption, RetryPredicate, parse_retry_after,
};
pub use user_agent::{DEFAULT_USER_AGENT, UserAgentHandler, UserAgentHandlerOption};
