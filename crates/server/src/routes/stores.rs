//! Store route handlers: listing, detail, mutation, tags, top-rated,
//! hearts, and reviews.

use axum::{
    Form, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use tastetrail_core::StoreId;

use crate::error::AppError;
use crate::middleware::RequireAuth;
use crate::models::{RatedStore, Store};
use crate::services::directory::{
    DirectoryService, Page, PageOutcome, StoreDetail, StoreInput, TagListing,
};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Store create/update form data.
///
/// Tags arrive as one comma-separated field.
#[derive(Debug, Deserialize)]
pub struct StoreForm {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub address: String,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    #[serde(default)]
    pub photo: Option<String>,
}

impl StoreForm {
    fn into_input(self) -> StoreInput {
        StoreInput {
            name: self.name,
            description: self.description,
            tags: self
                .tags
                .as_deref()
                .unwrap_or_default()
                .split(',')
                .map(str::to_string)
                .collect(),
            address: self.address,
            longitude: self.longitude,
            latitude: self.latitude,
            photo: self.photo,
        }
    }
}

/// Review form data.
#[derive(Debug, Deserialize)]
pub struct ReviewForm {
    pub rating: i32,
    #[serde(default)]
    pub text: String,
}

// =============================================================================
// Listing
// =============================================================================

/// First page of the store listing.
pub async fn index(state: State<AppState>) -> Result<Response, AppError> {
    page(state, Path(1)).await
}

/// One page of the store listing, newest first.
///
/// Requests past the last page redirect to the last valid page with a
/// notice instead of answering with a silently empty page.
pub async fn page(
    State(state): State<AppState>,
    Path(page): Path<i64>,
) -> Result<Response, AppError> {
    let directory = DirectoryService::new(state.pool());

    match directory.page(page).await? {
        PageOutcome::Page(listing) => Ok(Json::<Page<Store>>(listing).into_response()),
        PageOutcome::OutOfRange { last_page } => {
            let notice =
                format!("Page {page} does not exist; you were taken to page {last_page}");
            let to = format!(
                "/stores/page/{last_page}?notice={}",
                urlencoding::encode(&notice)
            );
            Ok(Redirect::to(&to).into_response())
        }
    }
}

/// Store detail with author and reviews.
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<StoreDetail>, AppError> {
    let directory = DirectoryService::new(state.pool());
    Ok(Json(directory.store_detail(&slug).await?))
}

/// Tag counts plus every store with at least one tag.
pub async fn tags(State(state): State<AppState>) -> Result<Json<TagListing>, AppError> {
    let directory = DirectoryService::new(state.pool());
    Ok(Json(directory.tags(None).await?))
}

/// Tag counts plus the stores carrying one tag.
pub async fn tag(
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> Result<Json<TagListing>, AppError> {
    let directory = DirectoryService::new(state.pool());
    Ok(Json(directory.tags(Some(&tag)).await?))
}

/// Stores with at least two reviews, by average rating.
pub async fn top(State(state): State<AppState>) -> Result<Json<Vec<RatedStore>>, AppError> {
    let directory = DirectoryService::new(state.pool());
    Ok(Json(directory.top_rated().await?))
}

/// The authenticated user's hearted stores.
pub async fn hearts(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<Vec<Store>>, AppError> {
    let directory = DirectoryService::new(state.pool());
    Ok(Json(directory.hearted(current.id).await?))
}

// =============================================================================
// Mutation
// =============================================================================

/// Handle the create-store form.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Form(form): Form<StoreForm>,
) -> Result<Response, AppError> {
    let directory = DirectoryService::new(state.pool());

    let store = directory
        .create_store(current.id, &form.into_input())
        .await?;

    tracing::info!(store = %store.id, slug = %store.slug, "store created");
    let to = format!("/store/{}?success=created", store.slug);
    Ok(Redirect::to(&to).into_response())
}

/// Handle the edit-store form. Author-only.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Path(id): Path<i32>,
    Form(form): Form<StoreForm>,
) -> Result<Response, AppError> {
    let directory = DirectoryService::new(state.pool());

    let store = directory
        .update_store(current.id, StoreId::new(id), &form.into_input())
        .await?;

    let to = format!("/store/{}?success=updated", store.slug);
    Ok(Redirect::to(&to).into_response())
}

/// Handle the add-review form.
pub async fn add_review(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Path(id): Path<i32>,
    Form(form): Form<ReviewForm>,
) -> Result<Response, AppError> {
    let directory = DirectoryService::new(state.pool());

    let review = directory
        .add_review(current.id, StoreId::new(id), form.rating, &form.text)
        .await?;

    Ok((StatusCode::CREATED, Json(review)).into_response())
}
