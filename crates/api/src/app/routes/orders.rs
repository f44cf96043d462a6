use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{get, post},
};
use chrono::Utc;

use orderdesk_core::{DomainError, Order};

use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_order).get(list_orders))
        .route("/:id", get(get_order).put(update_order).delete(delete_order))
}

#[tracing::instrument(skip_all)]
pub async fn create_order(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<Order>,
) -> Result<Json<Order>, Response> {
    let order = body.without_ids().stamped(Utc::now());
    let created = services
        .store
        .create_order(order)
        .await
        .map_err(errors::store_error_to_response)?;

    tracing::info!(order_id = %created.order_id, items = created.items.len(), "order created");
    Ok(Json(created))
}

pub async fn list_orders(Extension(services): Extension<Arc<AppServices>>) -> Result<Json<Vec<Order>>, Response> {
    services
        .store
        .list_orders()
        .await
        .map(Json)
        .map_err(errors::store_error_to_response)
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, Response> {
    let order_id = errors::parse_order_id(&id)?;
    match services.store.get_order(order_id).await {
        Ok(Some(order)) => Ok(Json(order)),
        Ok(None) => Err(errors::domain_error_to_response(DomainError::not_found("order"))),
        Err(e) => Err(errors::store_error_to_response(e)),
    }
}

/// Full replace keyed by the path id; a body `orderId` is ignored.
#[tracing::instrument(skip(services, body))]
pub async fn update_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<Order>,
) -> Result<Json<Order>, Response> {
    let order_id = errors::parse_order_id(&id)?;

    let mut order = body.without_ids().stamped(Utc::now());
    order.order_id = order_id;

    let saved = services
        .store
        .save_order(order)
        .await
        .map_err(errors::store_error_to_response)?;

    tracing::info!(%order_id, items = saved.items.len(), "order saved");
    Ok(Json(saved))
}

#[tracing::instrument(skip(services))]
pub async fn delete_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<StatusCode, Response> {
    let order_id = errors::parse_order_id(&id)?;
    let removed = services
        .store
        .delete_order(order_id)
        .await
        .map_err(errors::store_error_to_response)?;

    if removed {
        tracing::info!(%order_id, "order deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(errors::domain_error_to_response(DomainError::not_found("order")))
    }
}
