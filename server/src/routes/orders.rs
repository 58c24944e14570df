//! Order document routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use repairdesk_engine::OrderRecord;

use crate::auth::AuthUser;
use crate::error::Result;
use crate::handlers;
use crate::AppState;

/// Create order routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_handler).post(create_handler))
        .route(
            "/orders/{id}",
            get(get_handler).put(replace_handler).delete(delete_handler),
        )
}

/// GET /orders
async fn list_handler(State(state): State<AppState>, _auth: AuthUser) -> Result<Json<Vec<OrderRecord>>> {
    Ok(Json(handlers::list_orders(state.repo.as_ref()).await?))
}

/// POST /orders
async fn create_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(order): Json<OrderRecord>,
) -> Result<(StatusCode, Json<OrderRecord>)> {
    let created = handlers::create_order(state.repo.as_ref(), order).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /orders/{id}
async fn get_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<OrderRecord>> {
    Ok(Json(handlers::get_order(state.repo.as_ref(), &id).await?))
}

/// PUT /orders/{id}
async fn replace_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<String>,
    Json(order): Json<OrderRecord>,
) -> Result<Json<OrderRecord>> {
    Ok(Json(handlers::replace_order(state.repo.as_ref(), &id, order).await?))
}

/// DELETE /orders/{id}
async fn delete_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    handlers::delete_order(state.repo.as_ref(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
