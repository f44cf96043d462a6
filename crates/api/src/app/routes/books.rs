use std::sync::Arc;

use axum::{Json, Router, extract::Extension, response::Response, routing::post};

use orderdesk_core::Book;

use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/", post(create_book))
}

/// Store the book and echo it back.
pub async fn create_book(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<Book>,
) -> Result<Json<Book>, Response> {
    services
        .store
        .create_book(body)
        .await
        .map(Json)
        .map_err(errors::store_error_to_response)
}
