//! Mapping of registry errors onto HTTP responses.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chime_core::error::{ChimeError, ValidationKind};

/// Error half of every handler. Renders as
/// `{"ok": false, "code": <n>, "error": "<message>"}`.
#[derive(Debug)]
pub struct ApiError(pub ChimeError);

impl From<ChimeError> for ApiError {
    fn from(e: ChimeError) -> Self {
        Self(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self(ChimeError::Decode(e.body_text()))
    }
}

impl ApiError {
    pub fn status_and_code(&self) -> (StatusCode, u32) {
        match &self.0 {
            ChimeError::NotFound(_) => (StatusCode::NOT_FOUND, 1000),
            ChimeError::Decode(_) => (StatusCode::BAD_REQUEST, 2000),
            ChimeError::Validation(kind, _) => {
                let code = match kind {
                    ValidationKind::RegexArity => 2001,
                    ValidationKind::RegexSyntax => 2002,
                    ValidationKind::CronSpec => 2010,
                    ValidationKind::Template => 2041,
                    ValidationKind::TriggerArity => 2042,
                    _ => 2003,
                };
                (StatusCode::UNPROCESSABLE_ENTITY, code)
            }
            ChimeError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, 3000),
            ChimeError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, 3001),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, 3002),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!("❌ API error {code}: {}", self.0);
        }
        let body = serde_json::json!({"ok": false, "code": code, "error": self.0.to_string()});
        (status, Json(body)).into_response()
    }
}
