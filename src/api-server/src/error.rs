use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cretoai_managed_groups::{ErrorKind, ManagedGroupError};
use serde_json::json;
use tracing::error;

pub type Result<T> = std::result::Result<T, ApiError>;

/// Status used when the client went away before the request finished
const CLIENT_CLOSED_REQUEST: u16 = 499;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ManagedGroupError),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Service(e) => match e.kind() {
                ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
                ErrorKind::Canceled => StatusCode::from_u16(CLIENT_CLOSED_REQUEST)
                    .unwrap_or(StatusCode::REQUEST_TIMEOUT),
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            ApiError::Service(e) => {
                let message = match e {
                    ManagedGroupError::Internal(detail) => {
                        error!(error = %detail, "managed group request failed");
                        "Internal error.".to_string()
                    }
                    other => other.to_string(),
                };
                let mut body = json!({
                    "error": e.kind().as_str(),
                    "message": message,
                });
                if let Some(fields) = e.fields().filter(|f| !f.is_empty()) {
                    body["details"] = json!(fields);
                }
                body
            }
            ApiError::BadRequest(msg) => json!({
                "error": ErrorKind::InvalidArgument.as_str(),
                "message": msg,
            }),
        };

        (status, Json(body)).into_response()
    }
}
