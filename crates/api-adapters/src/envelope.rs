//! # Response Envelope
//!
//! Every endpoint answers with either `{"data": …}` or
//! `{"errors": [{field, message}, ...]}`: a tagged result, not nullable
//! fields. Expected business failures keep their field tags; internal
//! failures surface opaquely.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use domains::{AppError, FieldError};
use serde::Serialize;
use serde_json::json;
use tracing::error;

/// Success half of the envelope.
pub struct Data<T>(pub T);

impl<T: Serialize> IntoResponse for Data<T> {
    fn into_response(self) -> Response {
        Json(json!({ "data": self.0 })).into_response()
    }
}

/// Failure half: an `AppError` mapped onto a status code and a field error
/// list.
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, errors) = match self.0 {
            AppError::Validation(errors) => (StatusCode::UNPROCESSABLE_ENTITY, errors),
            AppError::NotFound { entity, id } => (
                StatusCode::NOT_FOUND,
                vec![FieldError::new(entity, format!("{entity} {id} does not exist."))],
            ),
            AppError::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                vec![FieldError::new("auth", message)],
            ),
            AppError::Conflict { field, message } => {
                (StatusCode::CONFLICT, vec![FieldError::new(field, message)])
            }
            AppError::Transaction(detail) | AppError::Internal(detail) => {
                // Never leak internals to the caller.
                error!(%detail, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    vec![FieldError::new("server", "Internal server error.")],
                )
            }
        };
        (status, Json(json!({ "errors": errors }))).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<Data<T>, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_422() {
        let response = ApiError(AppError::validation("title", "too long")).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn internal_errors_are_opaque() {
        let response =
            ApiError(AppError::Internal("connection refused at 10.0.0.3".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
