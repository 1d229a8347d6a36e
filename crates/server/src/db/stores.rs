//! Store repository for database operations.
//!
//! Listing, filtering, and the directory aggregations. The aggregation and
//! ranking work (tag counts, top-rated join, text relevance, haversine
//! distance) happens inside `PostgreSQL`; this module only composes the SQL.

use sqlx::PgPool;

use tastetrail_core::{Slug, StoreId, UserId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::{NearbyStore, RatedStore, Store, TagCount};

const STORE_COLUMNS: &str =
    "id, name, slug, description, tags, address, longitude, latitude, photo, author_id, created_at";

/// Validated store fields as written by create/update.
#[derive(Debug, Clone)]
pub struct StoreFields {
    /// Display name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Tag set.
    pub tags: Vec<String>,
    /// Street address.
    pub address: String,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Optional photo filename.
    pub photo: Option<String>,
}

/// Repository for store database operations.
pub struct StoreRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StoreRepository<'a> {
    /// Create a new store repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug already exists
    /// (lost slug-derivation race).
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        author_id: UserId,
        slug: &Slug,
        fields: &StoreFields,
    ) -> Result<Store, RepositoryError> {
        sqlx::query_as::<_, Store>(&format!(
            r#"
            INSERT INTO directory.store
                (name, slug, description, tags, address, longitude, latitude, photo, author_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {STORE_COLUMNS}
            "#
        ))
        .bind(&fields.name)
        .bind(slug)
        .bind(&fields.description)
        .bind(&fields.tags)
        .bind(&fields.address)
        .bind(fields.longitude)
        .bind(fields.latitude)
        .bind(&fields.photo)
        .bind(author_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "slug"))
    }

    /// Update a store's fields (and possibly its slug, after a rename).
    ///
    /// Ownership is checked by the caller before this is invoked; the
    /// author column is never touched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the store doesn't exist.
    /// Returns `RepositoryError::Conflict` on a slug collision.
    pub async fn update(
        &self,
        id: StoreId,
        slug: &Slug,
        fields: &StoreFields,
    ) -> Result<Store, RepositoryError> {
        sqlx::query_as::<_, Store>(&format!(
            r#"
            UPDATE directory.store
            SET name = $2, slug = $3, description = $4, tags = $5,
                address = $6, longitude = $7, latitude = $8, photo = $9
            WHERE id = $1
            RETURNING {STORE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&fields.name)
        .bind(slug)
        .bind(&fields.description)
        .bind(&fields.tags)
        .bind(&fields.address)
        .bind(fields.longitude)
        .bind(fields.latitude)
        .bind(&fields.photo)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "slug"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Get a store by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        let store = sqlx::query_as::<_, Store>(&format!(
            "SELECT {STORE_COLUMNS} FROM directory.store WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(store)
    }

    /// Get a store by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Store>, RepositoryError> {
        let store = sqlx::query_as::<_, Store>(&format!(
            "SELECT {STORE_COLUMNS} FROM directory.store WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(store)
    }

    /// All existing slugs starting with the given base, as candidates for
    /// collision disambiguation.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn slugs_with_prefix(&self, base: &str) -> Result<Vec<String>, RepositoryError> {
        let slugs = sqlx::query_scalar::<_, String>(
            "SELECT slug FROM directory.store WHERE slug ILIKE $1 || '%'",
        )
        .bind(base)
        .fetch_all(self.pool)
        .await?;

        Ok(slugs)
    }

    /// One page of stores, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn page(&self, limit: i64, offset: i64) -> Result<Vec<Store>, RepositoryError> {
        let stores = sqlx::query_as::<_, Store>(&format!(
            r#"
            SELECT {STORE_COLUMNS} FROM directory.store
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok(stores)
    }

    /// Total number of stores.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT count(*) FROM directory.store")
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }

    /// Stores carrying a given tag, or (with `None`) stores carrying at
    /// least one tag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn by_tag(&self, tag: Option<&str>) -> Result<Vec<Store>, RepositoryError> {
        let stores = match tag {
            Some(tag) => {
                sqlx::query_as::<_, Store>(&format!(
                    r#"
                    SELECT {STORE_COLUMNS} FROM directory.store
                    WHERE $1 = ANY(tags)
                    ORDER BY created_at DESC
                    "#
                ))
                .bind(tag)
                .fetch_all(self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Store>(&format!(
                    r#"
                    SELECT {STORE_COLUMNS} FROM directory.store
                    WHERE cardinality(tags) > 0
                    ORDER BY created_at DESC
                    "#
                ))
                .fetch_all(self.pool)
                .await?
            }
        };

        Ok(stores)
    }

    /// Per-tag store counts, most common first.
    ///
    /// A store with N tags contributes to N groups.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn tag_counts(&self) -> Result<Vec<TagCount>, RepositoryError> {
        let tags = sqlx::query_as::<_, TagCount>(
            r#"
            SELECT tag, count(*) AS count
            FROM directory.store, unnest(tags) AS tag
            GROUP BY tag
            ORDER BY count DESC, tag ASC
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(tags)
    }

    /// Full-text relevance search over name and description.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(&self, query: &str, limit: i64) -> Result<Vec<Store>, RepositoryError> {
        let stores = sqlx::query_as::<_, Store>(&format!(
            r#"
            SELECT {STORE_COLUMNS} FROM directory.store
            WHERE to_tsvector('english', name || ' ' || description)
                  @@ plainto_tsquery('english', $1)
            ORDER BY ts_rank(
                to_tsvector('english', name || ' ' || description),
                plainto_tsquery('english', $1)
            ) DESC
            LIMIT $2
            "#
        ))
        .bind(query)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(stores)
    }

    /// Stores within `max_distance_m` meters of a point, nearest first,
    /// projected to the reduced field set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn near(
        &self,
        longitude: f64,
        latitude: f64,
        max_distance_m: f64,
        limit: i64,
    ) -> Result<Vec<NearbyStore>, RepositoryError> {
        // Haversine over WGS84, mean earth radius in meters.
        let stores = sqlx::query_as::<_, NearbyStore>(
            r#"
            SELECT slug, name, description, longitude, latitude, photo, distance_m
            FROM (
                SELECT slug, name, description, longitude, latitude, photo,
                       2.0 * 6371000.0 * asin(sqrt(
                           pow(sin(radians(latitude - $2) / 2.0), 2)
                           + cos(radians($2)) * cos(radians(latitude))
                             * pow(sin(radians(longitude - $1) / 2.0), 2)
                       )) AS distance_m
                FROM directory.store
            ) AS nearby
            WHERE distance_m <= $3
            ORDER BY distance_m ASC
            LIMIT $4
            "#,
        )
        .bind(longitude)
        .bind(latitude)
        .bind(max_distance_m)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(stores)
    }

    /// Stores with at least `min_reviews` reviews, with their average
    /// rating, ordered by ascending average.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn top_rated(
        &self,
        min_reviews: i64,
        limit: i64,
    ) -> Result<Vec<RatedStore>, RepositoryError> {
        let stores = sqlx::query_as::<_, RatedStore>(
            r#"
            SELECT s.id, s.name, s.slug, s.photo,
                   avg(r.rating)::double precision AS average_rating,
                   count(r.id) AS review_count
            FROM directory.store s
            JOIN directory.review r ON r.store_id = s.id
            GROUP BY s.id, s.name, s.slug, s.photo
            HAVING count(r.id) >= $1
            ORDER BY average_rating ASC
            LIMIT $2
            "#,
        )
        .bind(min_reviews)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(stores)
    }

    /// The stores with the given IDs (a user's hearted set), newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn by_ids(&self, ids: &[StoreId]) -> Result<Vec<Store>, RepositoryError> {
        let raw: Vec<i32> = ids.iter().map(|id| id.as_i32()).collect();

        let stores = sqlx::query_as::<_, Store>(&format!(
            r#"
            SELECT {STORE_COLUMNS} FROM directory.store
            WHERE id = ANY($1)
            ORDER BY created_at DESC
            "#
        ))
        .bind(&raw)
        .fetch_all(self.pool)
        .await?;

        Ok(stores)
    }
}
