//! Store domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use tastetrail_core::{Point, Slug, StoreId, UserId};

/// A directory store entry.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Store {
    /// Unique store ID.
    pub id: StoreId,
    /// Display name.
    pub name: String,
    /// URL-safe unique identifier derived from the name.
    pub slug: Slug,
    /// Free-text description.
    pub description: String,
    /// Tag set; order is irrelevant.
    pub tags: Vec<String>,
    /// Street address.
    pub address: String,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Optional filename of a resized photo (produced out of process).
    pub photo: Option<String>,
    /// Owning user; immutable after creation.
    pub author_id: UserId,
    /// Creation timestamp; listings order by this, newest first.
    pub created_at: DateTime<Utc>,
}

impl Store {
    /// The store's location as a coordinate pair.
    #[must_use]
    pub const fn location(&self) -> Point {
        Point {
            longitude: self.longitude,
            latitude: self.latitude,
        }
    }
}

/// One tag with the number of stores carrying it.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TagCount {
    /// The tag.
    pub tag: String,
    /// Number of stores that carry the tag.
    pub count: i64,
}

/// A store joined to its review aggregate.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RatedStore {
    /// Store ID.
    pub id: StoreId,
    /// Display name.
    pub name: String,
    /// URL-safe identifier.
    pub slug: Slug,
    /// Optional photo filename.
    pub photo: Option<String>,
    /// Mean review rating.
    pub average_rating: f64,
    /// Number of reviews contributing to the average.
    pub review_count: i64,
}

/// Reduced store projection returned by the proximity query.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct NearbyStore {
    /// URL-safe identifier.
    pub slug: Slug,
    /// Display name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Optional photo filename.
    pub photo: Option<String>,
    /// Distance from the query point in meters.
    pub distance_m: f64,
}
