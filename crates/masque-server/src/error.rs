use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use masque_shared::RelayError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown pseudonym")]
    NotFound,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RelayError> for ServerError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::NotFound => ServerError::NotFound,
            RelayError::Reserved => {
                ServerError::BadRequest("moderator accounts cannot be banned".into())
            }
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()),
            ServerError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}
