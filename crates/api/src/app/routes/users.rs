use std::sync::Arc;

use axum::{Json, Router, extract::Extension, response::Response, routing::post};

use orderdesk_auth::hash_password;
use orderdesk_core::{DomainError, User};
use orderdesk_infra::StoreError;

use crate::app::dto::{self, CreateUserResponse};
use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/", post(create_user))
}

/// Register a user. The stored record carries the password hash, never the
/// plaintext.
#[tracing::instrument(skip_all, fields(email = %body.email))]
pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<User>,
) -> Result<Json<CreateUserResponse>, Response> {
    let existing = services
        .store
        .find_user(&body.email)
        .await
        .map_err(errors::store_error_to_response)?;
    if existing.is_some() {
        tracing::info!("user rejected: email taken");
        return Err(email_taken());
    }

    let User { email, password } = body;
    let hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| errors::internal_error("password hashing task failed", e))?
        .map_err(|e| errors::internal_error("password hashing failed", e))?;

    let user = User { email, password: hash };
    match services.store.insert_user(&user).await {
        Ok(()) => {}
        // Lost a race with a concurrent registration for the same email.
        Err(StoreError::Conflict(_)) => {
            tracing::info!("user rejected: email taken");
            return Err(email_taken());
        }
        Err(e) => return Err(errors::store_error_to_response(e)),
    }

    tracing::info!("user created");
    Ok(Json(CreateUserResponse {
        user,
        message: dto::USER_CREATED,
    }))
}

fn email_taken() -> Response {
    errors::domain_error_to_response(DomainError::conflict(dto::EMAIL_TAKEN))
}
