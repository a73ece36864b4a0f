//! Content-type keyed factory registries.
//!
//! Registries are plain values owned by whoever builds the adapter. They are
//! written during setup, possibly from several threads, and only read after.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use regex::Regex;

use super::{ParseNode, ParseNodeFactory, SerializationWriter, SerializationWriterFactory};
use crate::error::SerializationError;

#[allow(clippy::expect_used)] // good regex, it doesn't panic
static VENDOR_SPECIFIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^/]+\+").expect("static regex should not panic"));

/// Primary content type: the media type before any parameters, lowercased.
#[must_use]
pub fn primary_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

struct ContentTypeMap<F: ?Sized> {
    factories: RwLock<HashMap<String, Arc<F>>>,
}

impl<F: ?Sized> Default for ContentTypeMap<F> {
    fn default() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
        }
    }
}

impl<F: ?Sized> ContentTypeMap<F> {
    fn register(&self, content_type: &str, factory: Arc<F>) {
        let key = primary_content_type(content_type);
        tracing::debug!(content_type = %key, "Registered serialization factory");
        self.factories.write().insert(key, factory);
    }

    fn contains(&self, content_type: &str) -> bool {
        self.factories
            .read()
            .contains_key(&primary_content_type(content_type))
    }

    /// Resolve by exact type, then by vendor-cleaned type
    /// (`application/vnd.api+json` to `application/json`).
    fn resolve(&self, content_type: &str) -> Result<(String, Arc<F>), SerializationError> {
        if content_type.trim().is_empty() {
            return Err(SerializationError::EmptyContentType);
        }
        let primary = primary_content_type(content_type);
        let factories = self.factories.read();
        if let Some(factory) = factories.get(&primary) {
            return Ok((primary, Arc::clone(factory)));
        }
        let cleaned = VENDOR_SPECIFIC.replace(&primary, "").into_owned();
        factories
            .get(&cleaned)
            .map(|factory| (cleaned, Arc::clone(factory)))
            .ok_or(SerializationError::UnregisteredContentType(primary))
    }
}

/// Dispatches root parse node creation to the factory registered for the
/// response content type.
#[derive(Default)]
pub struct ParseNodeFactoryRegistry {
    inner: ContentTypeMap<dyn ParseNodeFactory>,
}

impl ParseNodeFactoryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` for `content_type`, replacing any earlier one.
    pub fn register(&self, content_type: &str, factory: Arc<dyn ParseNodeFactory>) {
        self.inner.register(content_type, factory);
    }

    /// Register `factory` under its own content type.
    ///
    /// # Errors
    /// Propagates the factory's [`ParseNodeFactory::valid_content_type`] error.
    pub fn register_default<F: ParseNodeFactory + 'static>(
        &self,
        factory: F,
    ) -> Result<(), SerializationError> {
        let content_type = factory.valid_content_type()?.to_owned();
        self.register(&content_type, Arc::new(factory));
        Ok(())
    }

    #[must_use]
    pub fn is_registered(&self, content_type: &str) -> bool {
        self.inner.contains(content_type)
    }
}

impl ParseNodeFactory for ParseNodeFactoryRegistry {
    fn valid_content_type(&self) -> Result<&str, SerializationError> {
        Err(SerializationError::RegistryContentType)
    }

    fn root_parse_node(
        &self,
        content_type: &str,
        content: &[u8],
    ) -> Result<Box<dyn ParseNode>, SerializationError> {
        let (resolved, factory) = self.inner.resolve(content_type)?;
        factory.root_parse_node(&resolved, content)
    }
}

/// Dispatches serialization writer creation to the factory registered for
/// the request content type.
#[derive(Default)]
pub struct SerializationWriterFactoryRegistry {
    inner: ContentTypeMap<dyn SerializationWriterFactory>,
}

impl SerializationWriterFactoryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` for `content_type`, replacing any earlier one.
    pub fn register(&self, content_type: &str, factory: Arc<dyn SerializationWriterFactory>) {
        self.inner.register(content_type, factory);
    }

    /// Register `factory` under its own content type.
    ///
    /// # Errors
    /// Propagates the factory's
    /// [`SerializationWriterFactory::valid_content_type`] error.
    pub fn register_default<F: SerializationWriterFactory + 'static>(
        &self,
        factory: F,
    ) -> Result<(), SerializationError> {
        let content_type = factory.valid_content_type()?.to_owned();
        self.register(&content_type, Arc::new(factory));
        Ok(())
    }

    #[must_use]
    pub fn is_registered(&self, content_type: &str) -> bool {
        self.inner.contains(content_type)
    }
}

impl SerializationWriterFactory for SerializationWriterFactoryRegistry {
    fn valid_content_type(&self) -> Result<&str, SerializationError> {
        Err(SerializationError::RegistryContentType)
    }

    fn serialization_writer(
        &self,
        content_type: &str,
    ) -> Result<Box<dyn SerializationWriter>, SerializationError> {
        let (resolved, factory) = self.inner.resolve(content_type)?;
        factory.serialization_writer(&resolved)
    }
}
