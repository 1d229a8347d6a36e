//! HTTP route handlers for the directory service.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - First store listing page
//! GET  /health                 - Health check
//!
//! # Stores
//! GET  /stores                 - First store listing page
//! GET  /stores/page/{page}     - Store listing page
//! GET  /store/{slug}           - Store detail (author + reviews)
//! POST /stores                 - Create store (auth)
//! POST /stores/{id}            - Update store (auth, author-only)
//! GET  /tags                   - Tag counts + all tagged stores
//! GET  /tags/{tag}             - Tag counts + stores with one tag
//! GET  /top                    - Top-rated stores (>= 2 reviews)
//! GET  /hearts                 - Hearted stores (auth)
//! POST /reviews/{id}           - Add a review (auth)
//!
//! # Auth
//! GET  /login                  - Login notice echo
//! POST /login                  - Login action
//! GET  /register               - Register notice echo
//! POST /register               - Register action
//! POST /logout                 - Logout action
//!
//! # Account
//! GET  /account                - Account data (auth)
//! POST /account                - Update name/email (auth)
//! POST /account/forgot         - Request password reset
//! GET  /account/reset/{token}  - Check a reset token
//! POST /account/reset/{token}  - Complete a password reset
//!
//! # JSON API
//! GET  /api/search?q=          - Full-text search (top 5)
//! GET  /api/stores/near?lng=&lat= - Proximity query (top 10)
//! POST /api/stores/{id}/heart  - Toggle favorite (auth)
//! ```

pub mod account;
pub mod api;
pub mod auth;
pub mod stores;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/account", get(account::show).post(account::update))
        .route("/account/forgot", post(account::forgot))
        .route(
            "/account/reset/{token}",
            get(account::reset_prompt).post(account::reset_complete),
        )
}

/// Create the store routes router.
pub fn store_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(stores::index))
        .route("/stores", get(stores::index).post(stores::create))
        .route("/stores/page/{page}", get(stores::page))
        .route("/stores/{id}", post(stores::update))
        .route("/store/{slug}", get(stores::show))
        .route("/tags", get(stores::tags))
        .route("/tags/{tag}", get(stores::tag))
        .route("/top", get(stores::top))
        .route("/hearts", get(stores::hearts))
        .route("/reviews/{id}", post(stores::add_review))
}

/// Create the JSON API routes router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/search", get(api::search))
        .route("/stores/near", get(api::near))
        .route("/stores/{id}/heart", post(api::heart))
}

/// Create all routes for the directory service.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(store_routes())
        .merge(auth_routes())
        .merge(account_routes())
        .nest("/api", api_routes())
}
