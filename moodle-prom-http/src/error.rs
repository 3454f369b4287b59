use axum::response::{IntoResponse, Response};
use http::StatusCode;
use moodle_prom_core::ExporterError;

/// Maps exporter errors onto HTTP responses.
///
/// A rejected token is an empty 403. Everything else is a generic 500; the
/// detail goes to the log only.
#[derive(Debug)]
pub struct ApiError(pub ExporterError);

impl From<ExporterError> for ApiError {
    fn from(err: ExporterError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.0.is_client_error() {
            let status =
                StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::FORBIDDEN);
            return status.into_response();
        }

        tracing::error!(error = %self.0, "Scrape failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    }
}
