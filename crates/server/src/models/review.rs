//! Review domain types.
//!
//! Reviews exist in this service only as the input to the top-rated
//! aggregation and the store detail page.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use tastetrail_core::{ReviewId, StoreId, UserId};

/// A review left on a store.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Review {
    /// Unique review ID.
    pub id: ReviewId,
    /// Reviewed store.
    pub store_id: StoreId,
    /// Review author.
    pub author_id: UserId,
    /// Star rating, 1 through 5.
    pub rating: i32,
    /// Free-text review body.
    pub text: String,
    /// When the review was left.
    pub created_at: DateTime<Utc>,
}
