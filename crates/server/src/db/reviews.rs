//! Review repository for database operations.

use sqlx::PgPool;

use tastetrail_core::{StoreId, UserId};

use super::RepositoryError;
use crate::models::Review;

const REVIEW_COLUMNS: &str = "id, store_id, author_id, rating, text, created_at";

/// Repository for review database operations.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a review for a store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails (including
    /// foreign-key failures for unknown stores).
    pub async fn create(
        &self,
        store_id: StoreId,
        author_id: UserId,
        rating: i32,
        text: &str,
    ) -> Result<Review, RepositoryError> {
        let review = sqlx::query_as::<_, Review>(&format!(
            r#"
            INSERT INTO directory.review (store_id, author_id, rating, text)
            VALUES ($1, $2, $3, $4)
            RETURNING {REVIEW_COLUMNS}
            "#
        ))
        .bind(store_id)
        .bind(author_id)
        .bind(rating)
        .bind(text)
        .fetch_one(self.pool)
        .await?;

        Ok(review)
    }

    /// All reviews for a store, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn for_store(&self, store_id: StoreId) -> Result<Vec<Review>, RepositoryError> {
        let reviews = sqlx::query_as::<_, Review>(&format!(
            r#"
            SELECT {REVIEW_COLUMNS} FROM directory.review
            WHERE store_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(store_id)
        .fetch_all(self.pool)
        .await?;

        Ok(reviews)
    }
}
