use bytes::Bytes;
use http::Response;

use crate::error::RequestError;
use crate::error_mapping::ErrorMappings;

/// Takes over interpretation of a raw response.
///
/// When a handler is given to the adapter, the adapter skips status
/// classification and deserialization and returns whatever the handler does.
pub trait ResponseHandler<R> {
    /// # Errors
    /// Whatever the handler decides is a failure.
    fn handle_response(
        &self,
        response: Response<Bytes>,
        error_mappings: Option<&ErrorMappings>,
    ) -> Result<R, RequestError>;
}

impl<R, F> ResponseHandler<R> for F
where
    F: Fn(Response<Bytes>, Option<&ErrorMappings>) -> Result<R, RequestError>,
{
    fn handle_response(
        &self,
        response: Response<Bytes>,
        error_mappings: Option<&ErrorMappings>,
    ) -> Result<R, RequestError> {
        self(response, error_mappings)
    }
}
