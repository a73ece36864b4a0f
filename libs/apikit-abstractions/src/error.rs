use http::{HeaderMap, StatusCode};
use thiserror::Error;

/// Boxed error used wherever a collaborator supplies its own error type.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failures raised by the serialization port and its backends.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SerializationError {
    /// A content type was required but an empty string was given
    #[error("Content type must not be empty")]
    EmptyContentType,

    /// A root parse node was requested for an empty payload
    #[error("Content must not be empty")]
    EmptyContent,

    /// No factory is registered for the content type
    #[error("No factory registered for content type '{0}'")]
    UnregisteredContentType(String),

    /// A factory was asked for a content type it does not handle
    #[error("Content type '{actual}' is not supported, expected '{expected}'")]
    ContentTypeMismatch {
        expected: &'static str,
        actual: String,
    },

    /// Registries are keyed by content type and have none of their own
    #[error("The registry supports multiple content types; look up a factory by content type")]
    RegistryContentType,

    /// The node shape does not match what the caller asked for
    #[error("Expected {expected} node, found {found}")]
    UnexpectedNode {
        expected: &'static str,
        found: &'static str,
    },

    /// A scalar could not be converted to the requested type
    #[error("Invalid {kind} value '{value}': {reason}")]
    InvalidValue {
        kind: &'static str,
        value: String,
        reason: String,
    },

    /// The primitive type tag is not one of the supported kinds
    #[error("Unsupported primitive type '{0}'")]
    UnsupportedPrimitive(String),

    /// The backend failed to encode or decode the payload
    #[error("Serialization backend failed: {0}")]
    Backend(#[source] BoxError),
}

impl SerializationError {
    /// Build an [`SerializationError::InvalidValue`] from any displayable reason.
    pub fn invalid_value(
        kind: &'static str,
        value: impl Into<String>,
        reason: impl std::fmt::Display,
    ) -> Self {
        Self::InvalidValue {
            kind,
            value: value.into(),
            reason: reason.to_string(),
        }
    }
}

/// URI template expansion and URL resolution failures.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum UriTemplateError {
    /// Neither a template nor a raw URL was set on the request
    #[error("URL template is empty and no raw URL was set")]
    MissingTemplate,

    /// The template has a syntax error
    #[error("Malformed URL template '{template}': {reason}")]
    Malformed { template: String, reason: String },

    /// Expansion produced something that is not an absolute URL
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Failures raised by an authentication provider.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AuthenticationError {
    /// The token provider failed to produce a token
    #[error("Failed to acquire access token: {0}")]
    TokenAcquisition(#[source] BoxError),

    /// The request URL could not be resolved for host validation
    #[error("Cannot resolve request URL: {0}")]
    InvalidUrl(#[from] UriTemplateError),

    /// Tokens are only sent over HTTPS, except to loopback hosts
    #[error("Refusing to send a bearer token over '{scheme}'")]
    InsecureScheme { scheme: String },
}

/// Generic error for a failed status code with no registered mapping.
#[derive(Error, Debug, Clone)]
#[error("API request failed with status {status}")]
pub struct ApiError {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

impl ApiError {
    #[must_use]
    pub fn new(status: StatusCode, headers: HeaderMap) -> Self {
        Self { status, headers }
    }
}

/// The single error type returned by every request adapter call.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RequestError {
    /// The authentication provider rejected or failed the request
    #[error("Authentication failed: {0}")]
    Authentication(#[from] AuthenticationError),

    /// The request URL could not be resolved
    #[error(transparent)]
    InvalidUri(#[from] UriTemplateError),

    /// The native request could not be built from the description
    #[error("Failed to build request: {0}")]
    Build(#[source] BoxError),

    /// The pipeline or transport failed before a response was available
    #[error("Transport error: {0}")]
    Transport(#[source] BoxError),

    /// Failed status code with no matching error mapping
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Failed status code converted through an error mapping
    #[error("API request failed with status {status}: {source}")]
    Mapped {
        status: StatusCode,
        #[source]
        source: BoxError,
    },

    /// The body could not be serialized or parsed
    #[error("Serialization failed: {0}")]
    Serialization(#[from] SerializationError),
}

impl RequestError {
    /// Status code of the failed response, for `Api` and `Mapped` errors.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api(err) => Some(err.status),
            Self::Mapped { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Downcast a mapped domain error to its concrete type.
    #[must_use]
    pub fn mapped<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Mapped { source, .. } => source.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// Downcast a transport error to the pipeline's concrete error type.
    #[must_use]
    pub fn transport<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Transport(source) => source.downcast_ref::<E>(),
            _ => None,
        }
    }
}
