use std::collections::HashSet;

use secrecy::{ExposeSecret, SecretString};
use url::{Host, Url};

use super::AuthenticationProvider;
use crate::error::AuthenticationError;
use crate::request_information::RequestInformation;

const AUTHORIZATION_HEADER: &str = "authorization";

/// Host allow-list for token-bearing requests.
///
/// Hosts are compared without regard to case. An empty list allows every host.
#[derive(Debug, Clone, Default)]
pub struct AllowedHostsValidator {
    hosts: HashSet<String>,
}

impl AllowedHostsValidator {
    #[must_use]
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            hosts: hosts
                .into_iter()
                .map(|h| h.as_ref().trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    #[must_use]
    pub fn is_url_host_valid(&self, url: &Url) -> bool {
        if self.hosts.is_empty() {
            return true;
        }
        url.host_str()
            .is_some_and(|host| self.hosts.contains(&host.to_ascii_lowercase()))
    }
}

/// Supplies access tokens for [`BaseBearerTokenAuthenticationProvider`].
pub trait AccessTokenProvider: Send + Sync {
    /// Token for a request to `url`, or `None` to send the request without one.
    ///
    /// # Errors
    /// Returns [`AuthenticationError::TokenAcquisition`] when the token source
    /// fails.
    fn get_authorization_token(&self, url: &Url)
    -> Result<Option<SecretString>, AuthenticationError>;

    fn allowed_hosts_validator(&self) -> &AllowedHostsValidator;
}

/// Adds `Authorization: Bearer <token>` to requests for allowed hosts.
///
/// Requests that already carry an `Authorization` header are left alone, so
/// replaying a request does not fetch a second token.
#[derive(Debug, Clone)]
pub struct BaseBearerTokenAuthenticationProvider<P> {
    token_provider: P,
}

impl<P: AccessTokenProvider> BaseBearerTokenAuthenticationProvider<P> {
    #[must_use]
    pub fn new(token_provider: P) -> Self {
        Self { token_provider }
    }

    #[must_use]
    pub fn token_provider(&self) -> &P {
        &self.token_provider
    }
}

impl<P: AccessTokenProvider> AuthenticationProvider for BaseBearerTokenAuthenticationProvider<P> {
    fn authenticate_request(
        &self,
        request: &mut RequestInformation,
    ) -> Result<(), AuthenticationError> {
        if request.headers.contains(AUTHORIZATION_HEADER) {
            return Ok(());
        }

        let url = request.uri()?;
        if !self.token_provider.allowed_hosts_validator().is_url_host_valid(&url) {
            tracing::debug!(
                host = ?url.host_str(),
                "Host not in allow-list, skipping bearer token"
            );
            return Ok(());
        }
        if url.scheme() != "https" && !is_loopback(&url) {
            return Err(AuthenticationError::InsecureScheme {
                scheme: url.scheme().to_owned(),
            });
        }

        let Some(token) = self.token_provider.get_authorization_token(&url)? else {
            return Ok(());
        };
        if token.expose_secret().is_empty() {
            return Ok(());
        }

        // The header map holds the token in the clear from here on.
        request.headers.insert(AUTHORIZATION_HEADER, format!("Bearer {}", token.expose_secret()));
        Ok(())
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::method::HttpMethod;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticTokenProvider {
        token: &'static str,
        calls: AtomicUsize,
        validator: AllowedHostsValidator,
    }

    impl StaticTokenProvider {
        fn new(token: &'static str, hosts: &[&str]) -> Self {
            Self {
                token,
                calls: AtomicUsize::new(0),
                validator: AllowedHostsValidator::new(hosts),
            }
        }
    }

    impl AccessTokenProvider for StaticTokenProvider {
        fn get_authorization_token(
            &self,
            _url: &Url,
        ) -> Result<Option<SecretString>, AuthenticationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(SecretString::from(self.token.to_owned())))
        }

        fn allowed_hosts_validator(&self) -> &AllowedHostsValidator {
            &self.validator
        }
    }

    fn request_to(url: &str) -> RequestInformation {
        let mut request = RequestInformation::new(HttpMethod::Get, "", HashMap::new());
        request.set_uri(&Url::parse(url).unwrap());
        request
    }

    #[test]
    fn test_adds_bearer_token_for_allowed_host() {
        let provider = BaseBearerTokenAuthenticationProvider::new(StaticTokenProvider::new(
            "tok-1",
            &["API.example.com"],
        ));
        let mut request = request_to("https://api.example.com/users");

        provider.authenticate_request(&mut request).unwrap();

        assert_eq!(request.headers.get("Authorization"), Some("Bearer tok-1"));
    }

    #[test]
    fn test_skips_hosts_outside_allow_list() {
        let provider = BaseBearerTokenAuthenticationProvider::new(StaticTokenProvider::new(
            "tok-1",
            &["api.example.com"],
        ));
        let mut request = request_to("https://evil.example.org/users");

        provider.authenticate_request(&mut request).unwrap();

        assert!(!request.headers.contains("authorization"));
        assert_eq!(provider.token_provider().calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_is_idempotent() {
        let provider =
            BaseBearerTokenAuthenticationProvider::new(StaticTokenProvider::new("tok-1", &[]));
        let mut request = request_to("https://api.example.com/users");

        provider.authenticate_request(&mut request).unwrap();
        provider.authenticate_request(&mut request).unwrap();

        assert_eq!(request.headers.get("authorization"), Some("Bearer tok-1"));
        assert_eq!(provider.token_provider().calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_rejects_plain_http_except_loopback() {
        let provider =
            BaseBearerTokenAuthenticationProvider::new(StaticTokenProvider::new("tok-1", &[]));

        let mut remote = request_to("http://api.example.com/users");
        assert!(matches!(
            provider.authenticate_request(&mut remote),
            Err(AuthenticationError::InsecureScheme { scheme }) if scheme == "http"
        ));

        let mut local = request_to("http://127.0.0.1:8080/users");
        provider.authenticate_request(&mut local).unwrap();
        assert_eq!(local.headers.get("authorization"), Some("Bearer tok-1"));
    }

    #[test]
    fn test_anonymous_provider_leaves_request_untouched() {
        let mut request = request_to("https://api.example.com/users");
        crate::auth::AnonymousAuthenticationProvider
            .authenticate_request(&mut request)
            .unwrap();
        assert!(request.headers.is_empty());
    }
}
