use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::broker::GatewayResult;

/// Uniform admin response: `{"error": string|null, "response": value|null}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub error: Option<String>,
    pub response: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(value: T) -> Self {
        Self { error: None, response: Some(value) }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { error: Some(message.into()), response: None }
    }

    pub fn from_result(result: GatewayResult<T>) -> Self {
        match result {
            Ok(value) => Self::ok(value),
            Err(e) => Self::error(e.to_string()),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
