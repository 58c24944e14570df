//! Service center and service provider routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use repairdesk_engine::{ReferenceDetails, ReferenceKind, RemoteReference};

use crate::auth::AuthUser;
use crate::error::Result;
use crate::handlers::{self, CreatedResponse};
use crate::AppState;

/// Create routes for both reference kinds.
pub fn routes() -> Router<AppState> {
    ReferenceKind::ALL
        .into_iter()
        .fold(Router::new(), |router, kind| router.merge(kind_routes(kind)))
}

fn kind_routes(kind: ReferenceKind) -> Router<AppState> {
    let collection = format!("/{}", kind.path());
    let item = format!("/{}/{{id}}", kind.path());

    Router::new()
        .route(
            &collection,
            get(move |State(state): State<AppState>, _auth: AuthUser| list_handler(state, kind)).post(
                move |State(state): State<AppState>, _auth: AuthUser, Json(details): Json<ReferenceDetails>| {
                    create_handler(state, kind, details)
                },
            ),
        )
        .route(
            &item,
            put(
                move |State(state): State<AppState>,
                      _auth: AuthUser,
                      Path(id): Path<String>,
                      Json(details): Json<ReferenceDetails>| {
                    update_handler(state, kind, id, details)
                },
            ),
        )
}

/// GET /{kind}
async fn list_handler(state: AppState, kind: ReferenceKind) -> Result<Json<Vec<RemoteReference>>> {
    Ok(Json(handlers::list_references(state.repo.as_ref(), kind).await?))
}

/// POST /{kind}
async fn create_handler(
    state: AppState,
    kind: ReferenceKind,
    details: ReferenceDetails,
) -> Result<(StatusCode, Json<CreatedResponse>)> {
    let created = handlers::create_reference(state.repo.as_ref(), kind, details).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /{kind}/{id}
async fn update_handler(
    state: AppState,
    kind: ReferenceKind,
    id: String,
    details: ReferenceDetails,
) -> Result<Json<RemoteReference>> {
    Ok(Json(
        handlers::update_reference(state.repo.as_ref(), kind, &id, details).await?,
    ))
}
