use crate::error::RequestError;
use crate::error_mapping::ErrorMappings;
use crate::request_information::RequestInformation;
use crate::response_handler::ResponseHandler;
use crate::serialization::{Parsable, PrimitiveKind, PrimitiveValue, SerializationWriterFactory};

/// Executes [`RequestInformation`]s and interprets their responses.
///
/// Every call authenticates the request, resolves its URL, runs it through
/// the HTTP pipeline and then either returns a deserialized result or an
/// error. Failed status codes are converted through `error_mappings` when a
/// mapping matches, and into [`ApiError`](crate::ApiError) otherwise.
///
/// Object and primitive calls return `Ok(None)` for a `204 No Content` or an
/// empty body.
#[allow(clippy::missing_errors_doc)]
pub trait RequestAdapter: Send + Sync {
    fn send<T: Parsable + Default>(
        &self,
        request: RequestInformation,
        error_mappings: Option<&ErrorMappings>,
    ) -> Result<Option<T>, RequestError>;

    fn send_collection<T: Parsable + Default>(
        &self,
        request: RequestInformation,
        error_mappings: Option<&ErrorMappings>,
    ) -> Result<Option<Vec<T>>, RequestError>;

    /// Read the body as one primitive of `kind`. [`PrimitiveKind::Bytes`]
    /// returns the raw body without parsing it.
    fn send_primitive(
        &self,
        request: RequestInformation,
        kind: PrimitiveKind,
        error_mappings: Option<&ErrorMappings>,
    ) -> Result<Option<PrimitiveValue>, RequestError>;

    fn send_primitive_collection(
        &self,
        request: RequestInformation,
        kind: PrimitiveKind,
        error_mappings: Option<&ErrorMappings>,
    ) -> Result<Option<Vec<PrimitiveValue>>, RequestError>;

    fn send_no_content(
        &self,
        request: RequestInformation,
        error_mappings: Option<&ErrorMappings>,
    ) -> Result<(), RequestError>;

    /// Send `request` and hand the raw response to `handler`.
    fn send_with_handler<R>(
        &self,
        request: RequestInformation,
        handler: &dyn ResponseHandler<R>,
        error_mappings: Option<&ErrorMappings>,
    ) -> Result<R, RequestError>;

    /// Factory used to serialize request bodies.
    fn serialization_writer_factory(&self) -> &dyn SerializationWriterFactory;

    fn base_url(&self) -> &str;
}
