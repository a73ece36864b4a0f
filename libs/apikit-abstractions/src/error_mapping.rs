use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::StatusCode;

use crate::error::{BoxError, SerializationError};
use crate::serialization::{Parsable, ParseNode, parse_object};

/// Builds a domain error from the parsed body of a failed response.
pub type ErrorFactory =
    Arc<dyn Fn(&dyn ParseNode) -> Result<BoxError, SerializationError> + Send + Sync>;

/// Status code to error factory table.
///
/// Keys are exact codes (`"404"`) or class buckets (`"4XX"`, `"5XX"`). An
/// exact code takes priority over its bucket.
#[derive(Clone, Default)]
pub struct ErrorMappings {
    entries: HashMap<String, ErrorFactory>,
}

impl ErrorMappings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `code` to `factory`, replacing an earlier entry for the same code.
    pub fn insert(&mut self, code: &str, factory: ErrorFactory) {
        self.entries.insert(code.trim().to_ascii_uppercase(), factory);
    }

    /// Map `code` to the parsable error type `E`.
    #[must_use]
    pub fn with<E>(mut self, code: &str) -> Self
    where
        E: Parsable + Default + std::error::Error + Send + Sync + 'static,
    {
        self.insert(
            code,
            Arc::new(|node: &dyn ParseNode| {
                let error = parse_object::<E>(node)?.unwrap_or_default();
                Ok(Box::new(error) as BoxError)
            }),
        );
        self
    }

    /// Factory for `status`: exact code first, then its class bucket.
    #[must_use]
    pub fn resolve(&self, status: StatusCode) -> Option<&ErrorFactory> {
        if let Some(factory) = self.entries.get(status.as_str()) {
            return Some(factory);
        }
        let bucket = if status.is_client_error() {
            "4XX"
        } else if status.is_server_error() {
            "5XX"
        } else {
            return None;
        };
        self.entries.get(bucket)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for ErrorMappings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut codes: Vec<_> = self.entries.keys().collect();
        codes.sort();
        f.debug_struct("ErrorMappings")
            .field("codes", &codes)
            .finish()
    }
}
