use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use orderdesk_core::{DomainError, Message, OrderId};
use orderdesk_infra::StoreError;

pub fn store_error_to_response(err: StoreError) -> Response {
    match err {
        StoreError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        StoreError::Storage(msg) => {
            tracing::error!(error = %msg, "storage failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", "storage failure")
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> Response {
    let message = err.to_string();
    match err {
        DomainError::InvalidId(_) => json_error(StatusCode::BAD_REQUEST, "invalid_id", message),
        DomainError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", message),
        DomainError::Conflict(_) => json_error(StatusCode::CONFLICT, "conflict", message),
        DomainError::Unauthorized(_) => json_error(StatusCode::UNAUTHORIZED, "unauthorized", message),
    }
}

/// Unexpected failure outside the store (hashing, signing, a panicked
/// blocking task). Details go to the log only.
pub fn internal_error(context: &'static str, err: impl std::fmt::Display) -> Response {
    tracing::error!(error = %err, "{context}");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
}

/// Error envelope: a [`Message`] plus a stable machine-readable code.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    #[serde(flatten)]
    pub message: Message,
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(ErrorBody {
            error: code,
            message: Message::new(message),
        }),
    )
        .into_response()
}

pub fn parse_order_id(s: &str) -> Result<OrderId, Response> {
    s.parse::<OrderId>().map_err(domain_error_to_response)
}
