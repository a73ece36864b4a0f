//! Authentication contracts applied by the adapter before each request.

mod bearer;

pub use bearer::{AccessTokenProvider, AllowedHostsValidator, BaseBearerTokenAuthenticationProvider};

use crate::error::AuthenticationError;
use crate::request_information::RequestInformation;

/// Authenticates a request before it is sent.
///
/// Implementations usually add an `Authorization` header. They must be
/// idempotent: calling them twice on the same request has the effect of
/// calling them once.
pub trait AuthenticationProvider: Send + Sync {
    /// # Errors
    /// Returns an error when credentials cannot be obtained; the call fails
    /// without reaching the network.
    fn authenticate_request(
        &self,
        request: &mut RequestInformation,
    ) -> Result<(), AuthenticationError>;
}

/// Leaves requests untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousAuthenticationProvider;

impl AuthenticationProvider for AnonymousAuthenticationProvider {
    fn authenticate_request(
        &self,
        _request: &mut RequestInformation,
    ) -> Result<(), AuthenticationError> {
        Ok(())
    }
}
