use std::collections::{BTreeMap, HashMap};

use bytes::Bytes;
use url::Url;

use crate::error::{SerializationError, UriTemplateError};
use crate::method::HttpMethod;
use crate::options::{RequestOption, RequestOptions};
use crate::serialization::{
    Parsable, PrimitiveValue, SerializationWriter, SerializationWriterFactory,
};
use crate::uri_template;

/// Path parameter that, when set, is used as the request URL verbatim.
pub const RAW_URL_KEY: &str = "request-raw-url";
/// Path parameter the adapter fills with its base URL.
pub const BASE_URL_KEY: &str = "baseurl";
pub const CONTENT_TYPE_HEADER: &str = "content-type";
const BINARY_CONTENT_TYPE: &str = "application/octet-stream";

/// Request headers with case-insensitive names; the last write wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestHeaders {
    entries: BTreeMap<String, String>,
}

impl RequestHeaders {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` to `value`, returning the replaced value.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) -> Option<String> {
        self.entries.insert(name.to_ascii_lowercase(), value.into())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries.remove(&name.to_ascii_lowercase())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    /// Headers as `(lowercase name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Transport-agnostic description of one API call.
///
/// The URL is a URI template resolved against the path and query parameter
/// maps, or a raw URL stored under [`RAW_URL_KEY`].
#[derive(Debug, Clone, Default)]
pub struct RequestInformation {
    pub method: HttpMethod,
    pub url_template: String,
    pub path_parameters: HashMap<String, String>,
    pub query_parameters: HashMap<String, String>,
    pub headers: RequestHeaders,
    pub content: Option<Bytes>,
    options: RequestOptions,
}

impl RequestInformation {
    #[must_use]
    pub fn new(
        method: HttpMethod,
        url_template: impl Into<String>,
        path_parameters: HashMap<String, String>,
    ) -> Self {
        Self {
            method,
            url_template: url_template.into(),
            path_parameters,
            ..Self::default()
        }
    }

    /// Resolve the request URL.
    ///
    /// A raw URL short-circuits template expansion. Otherwise the template is
    /// expanded against path then query parameters, names compared without
    /// regard to case.
    ///
    /// # Errors
    /// Returns an error when the template is missing or malformed or the
    /// result is not an absolute URL.
    pub fn uri(&self) -> Result<Url, UriTemplateError> {
        if let Some(raw) = self.raw_url() {
            return parse_url(raw);
        }
        if self.url_template.is_empty() {
            return Err(UriTemplateError::MissingTemplate);
        }

        let mut variables =
            HashMap::with_capacity(self.path_parameters.len() + self.query_parameters.len());
        for (name, value) in self.path_parameters.iter().chain(&self.query_parameters) {
            variables.insert(name.to_ascii_lowercase(), value.clone());
        }
        let expanded = uri_template::expand(&self.url_template, &variables)?;
        parse_url(&expanded)
    }

    /// Use `url` verbatim, discarding every path and query parameter.
    pub fn set_uri(&mut self, url: &Url) {
        self.path_parameters.clear();
        self.query_parameters.clear();
        self.path_parameters
            .insert(RAW_URL_KEY.to_owned(), url.as_str().to_owned());
    }

    fn raw_url(&self) -> Option<&str> {
        self.path_parameters
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(RAW_URL_KEY))
            .map(|(_, value)| value.as_str())
    }

    /// Attach `option`, replacing an earlier option of the same type.
    pub fn add_request_option<T: RequestOption>(&mut self, option: T) {
        self.options.add(option);
    }

    pub fn remove_request_option<T: RequestOption>(&mut self) -> bool {
        self.options.remove::<T>()
    }

    #[must_use]
    pub fn request_option<T: RequestOption>(&self) -> Option<&T> {
        self.options.get::<T>()
    }

    #[must_use]
    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    pub fn set_stream_content(&mut self, content: impl Into<Bytes>) {
        self.content = Some(content.into());
        self.headers.insert(CONTENT_TYPE_HEADER, BINARY_CONTENT_TYPE);
    }

    /// Serialize `item` as the body using the writer for `content_type`.
    ///
    /// # Errors
    /// Returns an error for an empty or unregistered content type, or when
    /// serialization fails.
    pub fn set_content_from_parsable(
        &mut self,
        factory: &dyn SerializationWriterFactory,
        content_type: &str,
        item: &dyn Parsable,
    ) -> Result<(), SerializationError> {
        self.write_content(factory, content_type, |writer| {
            writer.write_object_value(None, Some(item))
        })
    }

    /// Serialize `items` as a collection body.
    ///
    /// # Errors
    /// Same as [`set_content_from_parsable`](Self::set_content_from_parsable).
    pub fn set_content_from_parsable_collection(
        &mut self,
        factory: &dyn SerializationWriterFactory,
        content_type: &str,
        items: &[&dyn Parsable],
    ) -> Result<(), SerializationError> {
        self.write_content(factory, content_type, |writer| {
            writer.write_collection_of_object_values(None, items)
        })
    }

    /// Serialize a single primitive as the body.
    ///
    /// # Errors
    /// Same as [`set_content_from_parsable`](Self::set_content_from_parsable).
    pub fn set_content_from_scalar(
        &mut self,
        factory: &dyn SerializationWriterFactory,
        content_type: &str,
        value: &PrimitiveValue,
    ) -> Result<(), SerializationError> {
        self.write_content(factory, content_type, |writer| {
            writer.write_primitive_value(None, value)
        })
    }

    fn write_content(
        &mut self,
        factory: &dyn SerializationWriterFactory,
        content_type: &str,
        write: impl FnOnce(&mut dyn SerializationWriter) -> Result<(), SerializationError>,
    ) -> Result<(), SerializationError> {
        if content_type.trim().is_empty() {
            return Err(SerializationError::EmptyContentType);
        }
        let mut writer = factory.serialization_writer(content_type)?;
        write(writer.as_mut())?;
        self.content = Some(writer.serialized_content()?);
        self.headers.insert(CONTENT_TYPE_HEADER, content_type);
        Ok(())
    }
}

fn parse_url(raw: &str) -> Result<Url, UriTemplateError> {
    Url::parse(raw).map_err(|source| UriTemplateError::InvalidUrl {
        url: raw.to_owned(),
        source,
    })
}
