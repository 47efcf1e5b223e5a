use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, warn};

use crate::{AppError, GatewayPhase};

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidFields(_) | Self::InsufficientStock(_) => StatusCode::BAD_REQUEST,
            Self::SessionNotFound | Self::Payment { .. } => StatusCode::BAD_REQUEST,
            Self::Gateway { phase: GatewayPhase::Verify, .. } => StatusCode::BAD_REQUEST,
            Self::Gateway { phase: GatewayPhase::Initiate, .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Processing(_) | Self::Internal(_) | Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self { Self::Validation(rejection.body_text()) }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else {
            warn!(error = %self, status = status.as_u16(), "request rejected");
        }

        let message = match &self {
            Self::Internal(_) | Self::Store(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        let mut body = json!({ "message": message });
        match &self {
            Self::InsufficientStock(shortages) => body["details"] = json!(shortages),
            Self::Payment { code: Some(code), .. } => body["code"] = json!(code),
            Self::InvalidFields(errors) => body["errors"] = json!(errors),
            _ => {}
        }
        (status, Json(body)).into_response()
    }
}
