use std::sync::Arc;

use axum::{Json, Router, extract::Extension, response::Response, routing::post};
use chrono::Utc;

use orderdesk_auth::verify_password;
use orderdesk_core::{DomainError, User};

use crate::app::dto::{self, TokenResponse};
use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/", post(login))
}

#[tracing::instrument(skip_all, fields(email = %body.email))]
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<User>,
) -> Result<Json<TokenResponse>, Response> {
    let stored = services
        .store
        .find_user(&body.email)
        .await
        .map_err(errors::store_error_to_response)?;

    let Some(stored) = stored else {
        tracing::info!("login rejected: unknown email");
        return Err(unauthorized(dto::INCORRECT_EMAIL));
    };

    let User { password, .. } = body;
    let hash = stored.password;
    let matches = tokio::task::spawn_blocking(move || verify_password(&hash, &password))
        .await
        .map_err(|e| errors::internal_error("password verification task failed", e))?
        .map_err(|e| errors::internal_error("stored password hash is unreadable", e))?;

    if !matches {
        tracing::info!("login rejected: wrong password");
        return Err(unauthorized(dto::INCORRECT_PASSWORD));
    }

    let session = services
        .jwt
        .issue(&stored.email, Utc::now())
        .map_err(|e| errors::internal_error("token signing failed", e))?;

    tracing::info!(expires_at = %session.expires_at, "login succeeded");
    Ok(Json(TokenResponse { token: session.token }))
}

fn unauthorized(message: &'static str) -> Response {
    errors::domain_error_to_response(DomainError::unauthorized(message))
}
