//! JSON API route handlers: search, proximity, and the heart toggle.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use tastetrail_core::StoreId;

use crate::error::AppError;
use crate::middleware::RequireAuth;
use crate::models::{NearbyStore, Store};
use crate::services::directory::DirectoryService;
use crate::state::AppState;

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Proximity query parameters.
#[derive(Debug, Deserialize)]
pub struct NearQuery {
    pub lng: Option<f64>,
    pub lat: Option<f64>,
}

/// Full-text store search, best match first, capped at 5.
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Store>>, AppError> {
    let directory = DirectoryService::new(state.pool());
    Ok(Json(directory.search(&query.q).await?))
}

/// Stores within 10km of a point, nearest first, capped at 10.
pub async fn near(
    State(state): State<AppState>,
    Query(query): Query<NearQuery>,
) -> Result<Json<Vec<NearbyStore>>, AppError> {
    let directory = DirectoryService::new(state.pool());
    Ok(Json(directory.near(query.lng, query.lat).await?))
}

/// Toggle a store in the authenticated user's favorites; answers with the
/// updated favorite set.
pub async fn heart(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Path(id): Path<i32>,
) -> Result<Json<Vec<StoreId>>, AppError> {
    let directory = DirectoryService::new(state.pool());
    Ok(Json(
        directory.toggle_heart(current.id, StoreId::new(id)).await?,
    ))
}
