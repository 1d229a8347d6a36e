//! User repository for database operations.
//!
//! Covers credential lookup, account updates, reset-token state, and the
//! favorites join table.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use tastetrail_core::{Email, StoreId, UserId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::User;

const USER_COLUMNS: &str = "id, email, name, created_at, updated_at";

/// Row shape for credential lookups.
#[derive(FromRow)]
struct UserWithHashRow {
    id: UserId,
    email: Email,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    password_hash: String,
}

impl UserWithHashRow {
    fn split(self) -> (User, String) {
        (
            User {
                id: self.id,
                email: self.email,
                name: self.name,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
            self.password_hash,
        )
    }
}

/// Row shape for reset-token lookups.
#[derive(FromRow)]
struct UserWithResetRow {
    id: UserId,
    email: Email,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    reset_expires_at: DateTime<Utc>,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"SELECT {USER_COLUMNS} FROM directory."user" WHERE email = $1"#
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"SELECT {USER_COLUMNS} FROM directory."user" WHERE id = $1"#
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Create a new user with email, name, and password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        email: &Email,
        name: &str,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO directory."user" (email, name, password_hash)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(email)
        .bind(name)
        .bind(password_hash)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "email"))
    }

    /// Get a user's password hash by email.
    ///
    /// Returns `None` if the user doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserWithHashRow>(
            r#"
            SELECT id, email, name, created_at, updated_at, password_hash
            FROM directory."user"
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(UserWithHashRow::split))
    }

    /// Update a user's name and email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the new email is taken.
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn update_account(
        &self,
        id: UserId,
        name: &str,
        email: &Email,
    ) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE directory."user"
            SET name = $2, email = $3, updated_at = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .bind(email)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "email"))?
        .ok_or(RepositoryError::NotFound)
    }

    // =========================================================================
    // Reset-token state
    // =========================================================================

    /// Store a reset token and its expiry on the user.
    ///
    /// Overwrites any previous pending token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn set_reset_token(
        &self,
        id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE directory."user"
            SET reset_token = $2, reset_expires_at = $3, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token)
        .bind(expires_at)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Find the user holding a reset token, together with its expiry.
    ///
    /// The expiry is returned unchecked; the caller decides whether the
    /// token is still usable.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_reset_token(
        &self,
        token: &str,
    ) -> Result<Option<(User, DateTime<Utc>)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserWithResetRow>(
            r#"
            SELECT id, email, name, created_at, updated_at, reset_expires_at
            FROM directory."user"
            WHERE reset_token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|r| {
            (
                User {
                    id: r.id,
                    email: r.email,
                    name: r.name,
                    created_at: r.created_at,
                    updated_at: r.updated_at,
                },
                r.reset_expires_at,
            )
        }))
    }

    /// Set a new password hash and clear the reset token, guarded on the
    /// token still being present and unexpired at write time.
    ///
    /// Returns `None` if no row matched: the token was consumed or expired
    /// between validation and the write.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn complete_reset(
        &self,
        token: &str,
        new_password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE directory."user"
            SET password_hash = $2,
                reset_token = NULL,
                reset_expires_at = NULL,
                updated_at = now()
            WHERE reset_token = $1 AND reset_expires_at > $3
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(token)
        .bind(new_password_hash)
        .bind(now)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    // =========================================================================
    // Favorites
    // =========================================================================

    /// Get the set of store IDs the user has hearted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn favorites(&self, id: UserId) -> Result<Vec<StoreId>, RepositoryError> {
        let ids = sqlx::query_scalar::<_, StoreId>(
            r#"
            SELECT store_id FROM directory.user_favorite
            WHERE user_id = $1
            ORDER BY store_id
            "#,
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(ids)
    }

    /// Add a store to the user's favorites. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn add_favorite(
        &self,
        id: UserId,
        store_id: StoreId,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO directory.user_favorite (user_id, store_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(id)
        .bind(store_id)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Remove a store from the user's favorites. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove_favorite(
        &self,
        id: UserId,
        store_id: StoreId,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            DELETE FROM directory.user_favorite
            WHERE user_id = $1 AND store_id = $2
            "#,
        )
        .bind(id)
        .bind(store_id)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
