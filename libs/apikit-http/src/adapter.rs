use std::fmt;
use std::sync::Arc;

use apikit_abstractions::serialization::{parse_collection_of_objects, parse_object};
use apikit_abstractions::{
    ApiError, AuthenticationProvider, BASE_URL_KEY, ErrorMappings, Parsable, ParseNode,
    ParseNodeFactory, ParseNodeFactoryRegistry, PrimitiveKind, PrimitiveValue, RequestAdapter,
    RequestError, RequestInformation, ResponseHandler, SerializationError,
    SerializationWriterFactory, SerializationWriterFactoryRegistry,
};
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{Request, Response, StatusCode, header};
use url::Url;

use crate::config::HttpClientConfig;
use crate::error::HttpError;
use crate::pipeline::Pipeline;

/// [`RequestAdapter`] that executes requests through a [`Pipeline`].
///
/// Cheap to clone; clones share the pipeline and the factories. Safe to use
/// from many threads at once.
#[derive(Clone)]
pub struct HttpRequestAdapter {
    auth: Arc<dyn AuthenticationProvider>,
    parse_node_factory: Arc<dyn ParseNodeFactory>,
    serialization_writer_factory: Arc<dyn SerializationWriterFactory>,
    pipeline: Pipeline,
    base_url: String,
}

impl fmt::Debug for HttpRequestAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRequestAdapter")
            .field("base_url", &self.base_url)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

/// Builder for [`HttpRequestAdapter`].
///
/// An authentication provider is required. Factories default to empty
/// registries, and the pipeline defaults to the chain described by the
/// configuration.
pub struct HttpRequestAdapterBuilder {
    auth: Arc<dyn AuthenticationProvider>,
    parse_node_factory: Option<Arc<dyn ParseNodeFactory>>,
    serialization_writer_factory: Option<Arc<dyn SerializationWriterFactory>>,
    pipeline: Option<Pipeline>,
    config: HttpClientConfig,
    base_url: String,
}

impl HttpRequestAdapterBuilder {
    /// Factory used to parse response bodies.
    #[must_use]
    pub fn parse_node_factory(mut self, factory: Arc<dyn ParseNodeFactory>) -> Self {
        self.parse_node_factory = Some(factory);
        self
    }

    /// Factory used to serialize request bodies.
    #[must_use]
    pub fn serialization_writer_factory(
        mut self,
        factory: Arc<dyn SerializationWriterFactory>,
    ) -> Self {
        self.serialization_writer_factory = Some(factory);
        self
    }

    /// Use a prebuilt pipeline instead of one built from the configuration.
    #[must_use]
    pub fn pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    #[must_use]
    pub fn config(mut self, config: HttpClientConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Build the adapter.
    ///
    /// # Errors
    /// Returns `HttpError::InvalidHeaderValue` if the configured user agent
    /// is not a valid header value
    pub fn build(self) -> Result<HttpRequestAdapter, HttpError> {
        let pipeline = match self.pipeline {
            Some(pipeline) => pipeline,
            None => self.config.build_pipeline()?,
        };
        Ok(HttpRequestAdapter {
            auth: self.auth,
            parse_node_factory: self
                .parse_node_factory
                .unwrap_or_else(|| Arc::new(ParseNodeFactoryRegistry::new())),
            serialization_writer_factory: self
                .serialization_writer_factory
                .unwrap_or_else(|| Arc::new(SerializationWriterFactoryRegistry::new())),
            pipeline,
            base_url: normalize_base_url(self.base_url),
        })
    }
}

fn normalize_base_url(mut base_url: String) -> String {
    while base_url.ends_with('/') {
        base_url.pop();
    }
    base_url
}

impl HttpRequestAdapter {
    #[must_use]
    pub fn builder(auth: Arc<dyn AuthenticationProvider>) -> HttpRequestAdapterBuilder {
        HttpRequestAdapterBuilder {
            auth,
            parse_node_factory: None,
            serialization_writer_factory: None,
            pipeline: None,
            config: HttpClientConfig::default(),
            base_url: String::new(),
        }
    }

    /// Replace the base URL substituted for `{+baseurl}`. Trailing slashes
    /// are dropped.
    pub fn set_base_url(&mut self, base_url: impl Into<String>) {
        self.base_url = normalize_base_url(base_url.into());
    }

    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Authenticate, resolve and send `request`, then hand the response to
    /// `interpret`. Runs inside a span carrying method and URL.
    fn dispatch<R>(
        &self,
        mut request: RequestInformation,
        interpret: impl FnOnce(&Self, Response<Bytes>) -> Result<R, RequestError>,
    ) -> Result<R, RequestError> {
        let span = tracing::debug_span!(
            "apikit.request",
            method = %request.method,
            url = tracing::field::Empty,
            status = tracing::field::Empty,
        );
        let _guard = span.enter();

        request
            .path_parameters
            .insert(BASE_URL_KEY.to_owned(), self.base_url.clone());
        self.auth.authenticate_request(&mut request)?;

        let url = request.uri()?;
        span.record("url", url.as_str());

        let native =
            native_request(&request, &url).map_err(|err| RequestError::Build(Box::new(err)))?;
        let response = self
            .pipeline
            .send(native, request.options())
            .map_err(|err| {
                tracing::debug!(error = %err, "Request failed before a response was received");
                RequestError::Transport(Box::new(err))
            })?;
        span.record("status", response.status().as_u16());

        interpret(self, response)
    }

    /// Turn a failed status into an error, through `error_mappings` when one
    /// matches.
    fn throw_if_failed(
        &self,
        response: &Response<Bytes>,
        error_mappings: Option<&ErrorMappings>,
    ) -> Result<(), RequestError> {
        let status = response.status();
        if status.as_u16() < 400 {
            return Ok(());
        }

        let factory = error_mappings.and_then(|mappings| mappings.resolve(status));
        let Some(factory) = factory else {
            tracing::debug!(status = %status, "No error mapping for failed response");
            return Err(ApiError::new(status, response.headers().clone()).into());
        };
        if response.body().is_empty() {
            return Err(ApiError::new(status, response.headers().clone()).into());
        }

        let node = self.root_node(response)?;
        let source = factory(node.as_ref())?;
        Err(RequestError::Mapped { status, source })
    }

    fn root_node(&self, response: &Response<Bytes>) -> Result<Box<dyn ParseNode>, RequestError> {
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        if content_type.trim().is_empty() {
            return Err(SerializationError::EmptyContentType.into());
        }
        Ok(self
            .parse_node_factory
            .root_parse_node(content_type, response.body())?)
    }
}

fn has_content(response: &Response<Bytes>) -> bool {
    response.status() != StatusCode::NO_CONTENT && !response.body().is_empty()
}

fn native_request(request: &RequestInformation, url: &Url) -> Result<Request<Bytes>, HttpError> {
    let mut builder = Request::builder()
        .method(http::Method::from(request.method))
        .uri(url.as_str());
    for (name, value) in request.headers.iter() {
        builder = builder.header(
            HeaderName::from_bytes(name.as_bytes())?,
            HeaderValue::from_str(value)?,
        );
    }
    Ok(builder.body(request.content.clone().unwrap_or_default())?)
}

impl RequestAdapter for HttpRequestAdapter {
    fn send<T: Parsable + Default>(
        &self,
        request: RequestInformation,
        error_mappings: Option<&ErrorMappings>,
    ) -> Result<Option<T>, RequestError> {
        self.dispatch(request, |adapter, response| {
            adapter.throw_if_failed(&response, error_mappings)?;
            if !has_content(&response) {
                return Ok(None);
            }
            let node = adapter.root_node(&response)?;
            Ok(parse_object::<T>(node.as_ref())?)
        })
    }

    fn send_collection<T: Parsable + Default>(
        &self,
        request: RequestInformation,
        error_mappings: Option<&ErrorMappings>,
    ) -> Result<Option<Vec<T>>, RequestError> {
        self.dispatch(request, |adapter, response| {
            adapter.throw_if_failed(&response, error_mappings)?;
            if !has_content(&response) {
                return Ok(None);
            }
            let node = adapter.root_node(&response)?;
            Ok(parse_collection_of_objects::<T>(node.as_ref())?)
        })
    }

    fn send_primitive(
        &self,
        request: RequestInformation,
        kind: PrimitiveKind,
        error_mappings: Option<&ErrorMappings>,
    ) -> Result<Option<PrimitiveValue>, RequestError> {
        self.dispatch(request, |adapter, response| {
            adapter.throw_if_failed(&response, error_mappings)?;
            if !has_content(&response) {
                return Ok(None);
            }
            if kind == PrimitiveKind::Bytes {
                return Ok(Some(PrimitiveValue::Bytes(response.into_body().to_vec())));
            }
            let node = adapter.root_node(&response)?;
            Ok(node.primitive_value(kind)?)
        })
    }

    fn send_primitive_collection(
        &self,
        request: RequestInformation,
        kind: PrimitiveKind,
        error_mappings: Option<&ErrorMappings>,
    ) -> Result<Option<Vec<PrimitiveValue>>, RequestError> {
        self.dispatch(request, |adapter, response| {
            adapter.throw_if_failed(&response, error_mappings)?;
            if !has_content(&response) {
                return Ok(None);
            }
            let node = adapter.root_node(&response)?;
            if node.is_null() {
                return Ok(None);
            }
            Ok(Some(node.collection_of_primitive_values(kind)?))
        })
    }

    fn send_no_content(
        &self,
        request: RequestInformation,
        error_mappings: Option<&ErrorMappings>,
    ) -> Result<(), RequestError> {
        self.dispatch(request, |adapter, response| {
            adapter.throw_if_failed(&response, error_mappings)
        })
    }

    fn send_with_handler<R>(
        &self,
        request: RequestInformation,
        handler: &dyn ResponseHandler<R>,
        error_mappings: Option<&ErrorMappings>,
    ) -> Result<R, RequestError> {
        self.dispatch(request, |_, response| {
            handler.handle_response(response, error_mappings)
        })
    }

    fn serialization_writer_factory(&self) -> &dyn SerializationWriterFactory {
        self.serialization_writer_factory.as_ref()
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::pipeline::Transport;
    use apikit_abstractions::{
        AnonymousAuthenticationProvider, AuthenticationError, HttpMethod, SerializationWriter,
    };
    use apikit_serialization_json::{JsonParseNodeFactory, JsonSerializationWriterFactory};
    use std::collections::HashMap;
    use std::sync::Mutex;

    type Seen = Arc<Mutex<Vec<Request<Bytes>>>>;

    #[derive(Debug, Default, PartialEq)]
    struct Pet {
        name: Option<String>,
    }

    impl Parsable for Pet {
        fn serialize(
            &self,
            writer: &mut dyn SerializationWriter,
        ) -> Result<(), SerializationError> {
            writer.write_string_value(Some("name"), self.name.as_deref())
        }

        fn deserialize_field(
            &mut self,
            name: &str,
            node: &dyn ParseNode,
        ) -> Result<bool, SerializationError> {
            if name == "name" {
                self.name = node.string_value()?;
                return Ok(true);
            }
            Ok(false)
        }
    }

    #[derive(Debug, Default, thiserror::Error)]
    #[error("pet service error: {message}")]
    struct PetError {
        message: String,
    }

    impl Parsable for PetError {
        fn serialize(
            &self,
            writer: &mut dyn SerializationWriter,
        ) -> Result<(), SerializationError> {
            writer.write_string_value(Some("message"), Some(&self.message))
        }

        fn deserialize_field(
            &mut self,
            name: &str,
            node: &dyn ParseNode,
        ) -> Result<bool, SerializationError> {
            if name == "message" {
                self.message = node.string_value()?.unwrap_or_default();
                return Ok(true);
            }
            Ok(false)
        }
    }

    /// Replies with a fixed status, content type and body.
    fn fixed(
        status: u16,
        content_type: &'static str,
        body: &'static str,
    ) -> (Arc<dyn Transport>, Seen) {
        let seen: Seen = Arc::default();
        let log = Arc::clone(&seen);
        let transport: Arc<dyn Transport> =
            Arc::new(move |request: Request<Bytes>| -> Result<Response<Bytes>, HttpError> {
                log.lock().unwrap().push(request);
                let mut builder = Response::builder().status(status);
                if !content_type.is_empty() {
                    builder = builder.header(header::CONTENT_TYPE, content_type);
                }
                Ok(builder.body(Bytes::from_static(body.as_bytes()))?)
            });
        (transport, seen)
    }

    fn adapter(transport: Arc<dyn Transport>) -> HttpRequestAdapter {
        let parse_nodes = ParseNodeFactoryRegistry::new();
        parse_nodes.register_default(JsonParseNodeFactory).unwrap();
        let writers = SerializationWriterFactoryRegistry::new();
        writers.register_default(JsonSerializationWriterFactory).unwrap();

        HttpRequestAdapter::builder(Arc::new(AnonymousAuthenticationProvider))
            .parse_node_factory(Arc::new(parse_nodes))
            .serialization_writer_factory(Arc::new(writers))
            .pipeline(Pipeline::new(Vec::new(), transport))
            .base_url("https://api.example.com/v1/")
            .build()
            .unwrap()
    }

    fn get_pet() -> RequestInformation {
        RequestInformation::new(
            HttpMethod::Get,
            "{+baseurl}/pets/{petId}",
            HashMap::from([("petId".to_owned(), "7".to_owned())]),
        )
    }

    #[test]
    fn test_base_url_and_template_resolved() {
        let (transport, seen) = fixed(200, "application/json", r#"{"name":"rex"}"#);
        let adapter = adapter(transport);
        assert_eq!(adapter.base_url(), "https://api.example.com/v1");

        let pet: Option<Pet> = adapter.send(get_pet(), None).unwrap();

        assert_eq!(pet, Some(Pet { name: Some("rex".into()) }));
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].uri(), "https://api.example.com/v1/pets/7");
        assert_eq!(seen[0].method(), http::Method::GET);
    }

    #[test]
    fn test_headers_and_body_are_forwarded() {
        let (transport, seen) = fixed(204, "", "");
        let adapter = adapter(transport);
        let mut request =
            RequestInformation::new(HttpMethod::Post, "{+baseurl}/pets", HashMap::new());
        request.headers.insert("X-Trace", "abc");
        request
            .set_content_from_parsable(
                adapter.serialization_writer_factory(),
                "application/json",
                &Pet { name: Some("tom".into()) },
            )
            .unwrap();

        adapter.send_no_content(request, None).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].method(), http::Method::POST);
        assert_eq!(seen[0].headers()["x-trace"], "abc");
        assert_eq!(seen[0].headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(seen[0].body().as_ref(), br#"{"name":"tom"}"#);
    }

    #[test]
    fn test_no_content_yields_none() {
        for (status, body) in [(204, ""), (200, "")] {
            let (transport, _seen) = fixed(status, "application/json", body);
            let adapter = adapter(transport);
            let pet: Option<Pet> = adapter.send(get_pet(), None).unwrap();
            assert!(pet.is_none());
            let value = adapter
                .send_primitive(get_pet(), PrimitiveKind::String, None)
                .unwrap();
            assert!(value.is_none());
        }
    }

    #[test]
    fn test_unmapped_failure_is_generic_api_error() {
        let (transport, _seen) = fixed(500, "application/json", r#"{"message":"boom"}"#);
        let adapter = adapter(transport);

        let err = adapter.send::<Pet>(get_pet(), None).unwrap_err();

        assert!(matches!(
            err,
            RequestError::Api(ref api) if api.status == StatusCode::INTERNAL_SERVER_ERROR
        ));
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn test_mapped_failure_is_typed() {
        let (transport, _seen) = fixed(404, "application/json", r#"{"message":"no such pet"}"#);
        let adapter = adapter(transport);
        let mappings = ErrorMappings::new().with::<PetError>("4XX");

        let err = adapter.send::<Pet>(get_pet(), Some(&mappings)).unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(err.mapped::<PetError>().unwrap().message, "no such pet");
    }

    #[test]
    fn test_mapped_failure_with_empty_body_is_generic() {
        let (transport, _seen) = fixed(404, "", "");
        let adapter = adapter(transport);
        let mappings = ErrorMappings::new().with::<PetError>("404");

        let err = adapter.send_no_content(get_pet(), Some(&mappings)).unwrap_err();

        assert!(matches!(err, RequestError::Api(_)));
    }

    #[test]
    fn test_primitive_variants() {
        let (transport, _seen) = fixed(200, "application/json", "42");
        let value = adapter(transport)
            .send_primitive(get_pet(), PrimitiveKind::Int64, None)
            .unwrap();
        assert_eq!(value.and_then(|v| v.as_i64()), Some(42));

        let (transport, _seen) = fixed(200, "application/octet-stream", "raw\x00bytes");
        let value = adapter(transport)
            .send_primitive(get_pet(), PrimitiveKind::Bytes, None)
            .unwrap();
        assert_eq!(value, Some(PrimitiveValue::Bytes(b"raw\x00bytes".to_vec())));

        let (transport, _seen) = fixed(200, "application/json", r#"["a","b"]"#);
        let values = adapter(transport)
            .send_primitive_collection(get_pet(), PrimitiveKind::String, None)
            .unwrap()
            .unwrap();
        assert_eq!(values, vec![PrimitiveValue::from("a"), PrimitiveValue::from("b")]);
    }

    #[test]
    fn test_collection_of_objects() {
        let (transport, _seen) = fixed(200, "application/json", r#"[{"name":"a"},{"name":"b"}]"#);
        let pets: Vec<Pet> = adapter(transport)
            .send_collection(get_pet(), None)
            .unwrap()
            .unwrap();
        assert_eq!(pets.len(), 2);
        assert_eq!(pets[1].name.as_deref(), Some("b"));
    }

    #[test]
    fn test_missing_response_content_type_is_serialization_error() {
        let (transport, _seen) = fixed(200, "", r#"{"name":"rex"}"#);
        let err = adapter(transport).send::<Pet>(get_pet(), None).unwrap_err();
        assert!(matches!(
            err,
            RequestError::Serialization(SerializationError::EmptyContentType)
        ));
    }

    #[test]
    fn test_handler_takes_over_interpretation() {
        let (transport, _seen) = fixed(503, "text/plain", "down");
        let adapter = adapter(transport);

        let handler = |response: Response<Bytes>,
                       _: Option<&ErrorMappings>|
         -> Result<(StatusCode, Bytes), RequestError> {
            Ok((response.status(), response.into_body()))
        };
        let (status, body) = adapter
            .send_with_handler::<(StatusCode, Bytes)>(get_pet(), &handler, None)
            .unwrap();

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.as_ref(), b"down");
    }

    #[test]
    fn test_authentication_failure_stops_the_call() {
        struct Failing;
        impl AuthenticationProvider for Failing {
            fn authenticate_request(
                &self,
                _request: &mut RequestInformation,
            ) -> Result<(), AuthenticationError> {
                Err(AuthenticationError::TokenAcquisition("no token".into()))
            }
        }

        let (transport, seen) = fixed(200, "", "");
        let adapter = HttpRequestAdapter::builder(Arc::new(Failing))
            .pipeline(Pipeline::new(Vec::new(), transport))
            .base_url("https://api.example.com")
            .build()
            .unwrap();

        let err = adapter.send_no_content(get_pet(), None).unwrap_err();
        assert!(matches!(err, RequestError::Authentication(_)));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_transport_error_is_downcastable() {
        let transport: Arc<dyn Transport> =
            Arc::new(|_request: Request<Bytes>| -> Result<Response<Bytes>, HttpError> {
                Err(HttpError::Timeout(std::time::Duration::from_secs(2)))
            });
        let err = adapter(transport).send_no_content(get_pet(), None).unwrap_err();
        assert!(matches!(
            err.transport::<HttpError>(),
            Some(HttpError::Timeout(_))
        ));
    }

    #[test]
    fn test_raw_url_bypasses_template() {
        let (transport, seen) = fixed(204, "", "");
        let adapter = adapter(transport);
        let mut request = get_pet();
        request.set_uri(&Url::parse("https://other.example.com/raw?x=1").unwrap());

        adapter.send_no_content(request, None).unwrap();

        assert_eq!(seen.lock().unwrap()[0].uri(), "https://other.example.com/raw?x=1");
    }

    #[test]
    fn test_invalid_header_is_build_error() {
        let (transport, seen) = fixed(204, "", "");
        let adapter = adapter(transport);
        let mut request = get_pet();
        request.headers.insert("x-bad", "line\nbreak");

        let err = adapter.send_no_content(request, None).unwrap_err();
        assert!(matches!(err, RequestError::Build(_)));
        assert!(seen.lock().unwrap().is_empty());
    }
}
