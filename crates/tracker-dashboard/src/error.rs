//! JSON error envelope for the dashboard API (spec §7: "The dashboard
//! returns JSON `{error: string}` with HTTP 4xx/5xx as appropriate.").

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracker_core::Error as CoreError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

/// Maps the core error kinds (spec §7) onto HTTP status the way spec.md
/// §7 describes CLI exit-code severity: caller errors are 4xx, anything
/// from a subprocess or the filesystem is a 5xx.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match &err {
            CoreError::NotFound(_) => ApiError::not_found(err.to_string()),
            CoreError::Input(_) => ApiError::bad_request(err.to_string()),
            CoreError::State(_) => ApiError::conflict(err.to_string()),
            CoreError::Dependency(_) => ApiError::conflict(err.to_string()),
            CoreError::Vcs(_) | CoreError::Agent(_) | CoreError::Io(_) | CoreError::Store(_) => {
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let api_err: ApiError = CoreError::NotFound(5).into();
        assert_eq!(api_err.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn dependency_error_maps_to_409() {
        let api_err: ApiError = CoreError::cycle().into();
        assert_eq!(api_err.status, StatusCode::CONFLICT);
    }

    #[test]
    fn vcs_error_maps_to_500() {
        let api_err: ApiError = CoreError::vcs("git exploded").into();
        assert_eq!(api_err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
