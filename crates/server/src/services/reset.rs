//! Password-reset flow.
//!
//! Per user the reset state is a small machine: no pending reset, then a
//! `(token, expiry)` pair, then back to nothing once the reset completes or
//! the token expires. Tokens are opaque 160-bit hex strings, valid for one
//! hour, single-use.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sqlx::PgPool;
use thiserror::Error;

use tastetrail_core::{Email, EmailError};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::User;
use crate::services::auth::{self, AuthError};
use crate::services::email::{Mailer, MailerError};

/// Random bytes per reset token (160 bits).
const RESET_TOKEN_BYTES: usize = 20;

/// How long a reset token stays valid.
const RESET_TOKEN_TTL_HOURS: i64 = 1;

/// Errors that can occur in the password-reset flow.
#[derive(Debug, Error)]
pub enum ResetError {
    /// No account with the given email.
    ///
    /// Surfaced distinctly to the caller (inherited behavior), unlike token
    /// validation which never reveals why it failed.
    #[error("no account with that email")]
    UserNotFound,

    /// The token is unknown, already consumed, or expired. One variant for
    /// all three cases.
    #[error("token is invalid or has expired")]
    TokenInvalidOrExpired,

    /// Password and confirmation differ.
    #[error("passwords do not match")]
    PasswordMismatch,

    /// New password fails the strength requirements.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// The reset email could not be dispatched.
    #[error("notification failed: {0}")]
    Notification(#[from] MailerError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl From<AuthError> for ResetError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::WeakPassword(msg) => Self::WeakPassword(msg),
            AuthError::Repository(e) => Self::Repository(e),
            _ => Self::PasswordHash,
        }
    }
}

/// Password-reset service.
pub struct PasswordResetService<'a> {
    users: UserRepository<'a>,
    mailer: &'a Mailer,
    base_url: &'a str,
}

impl<'a> PasswordResetService<'a> {
    /// Create a new password-reset service.
    ///
    /// `base_url` is the public origin embedded in reset links.
    #[must_use]
    pub const fn new(pool: &'a PgPool, mailer: &'a Mailer, base_url: &'a str) -> Self {
        Self {
            users: UserRepository::new(pool),
            mailer,
            base_url,
        }
    }

    /// Issue a reset token for the account with the given email and mail the
    /// reset link.
    ///
    /// The token is persisted before the notification goes out; if
    /// persistence fails nothing is dispatched.
    ///
    /// # Errors
    ///
    /// Returns `ResetError::UserNotFound` if no account has this email.
    /// Returns `ResetError::Notification` if the email cannot be sent.
    pub async fn request_reset(&self, email: &str) -> Result<(), ResetError> {
        let email = Email::parse(email)?;

        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(ResetError::UserNotFound)?;

        let token = generate_reset_token();
        let expires_at = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);

        self.users
            .set_reset_token(user.id, &token, expires_at)
            .await?;

        let reset_url = format!("{}/account/reset/{token}", self.base_url);
        self.mailer
            .send_password_reset(&user.email, &user.name, &reset_url)
            .await?;

        tracing::info!(user = %user.id, "password reset requested");
        Ok(())
    }

    /// Check that a token exists and is still usable, returning its user.
    ///
    /// # Errors
    ///
    /// Returns `ResetError::TokenInvalidOrExpired` for an unknown, consumed,
    /// or expired token; the cause is never distinguished.
    pub async fn validate_token(&self, token: &str) -> Result<User, ResetError> {
        let (user, expires_at) = self
            .users
            .find_by_reset_token(token)
            .await?
            .ok_or(ResetError::TokenInvalidOrExpired)?;

        if !token_usable(expires_at, Utc::now()) {
            return Err(ResetError::TokenInvalidOrExpired);
        }

        Ok(user)
    }

    /// Complete the reset: set the new password, clear the token, and return
    /// the user for auto-login.
    ///
    /// # Errors
    ///
    /// Returns `ResetError::PasswordMismatch` if the confirmation differs.
    /// Returns `ResetError::TokenInvalidOrExpired` if the token is unknown,
    /// consumed (including concurrently), or expired.
    pub async fn complete_reset(
        &self,
        token: &str,
        password: &str,
        password_confirm: &str,
    ) -> Result<User, ResetError> {
        confirm_passwords_match(password, password_confirm)?;
        auth::validate_password(password)?;

        // Re-validate before hashing so a dead token fails fast.
        self.validate_token(token).await?;

        let password_hash = auth::hash_password(password)?;

        // The UPDATE is guarded on the token still being live, so a token
        // consumed or expired between validation and the write loses here.
        let user = self
            .users
            .complete_reset(token, &password_hash, Utc::now())
            .await?
            .ok_or(ResetError::TokenInvalidOrExpired)?;

        tracing::info!(user = %user.id, "password reset completed");
        Ok(user)
    }
}

/// Pure confirmation check for the two password fields.
///
/// # Errors
///
/// Returns `ResetError::PasswordMismatch` if they differ.
pub fn confirm_passwords_match(password: &str, confirmation: &str) -> Result<(), ResetError> {
    if password == confirmation {
        Ok(())
    } else {
        Err(ResetError::PasswordMismatch)
    }
}

/// Whether a token expiring at `expires_at` is still usable at `now`.
///
/// Strictly greater: a token expiring exactly now is already dead.
fn token_usable(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    expires_at > now
}

/// Generate an opaque reset token: 20 random bytes, hex-encoded.
fn generate_reset_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_reset_token_shape() {
        let token = generate_reset_token();
        assert_eq!(token.len(), RESET_TOKEN_BYTES * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_reset_token_unique() {
        assert_ne!(generate_reset_token(), generate_reset_token());
    }

    #[test]
    fn test_token_expiry_is_strict() {
        let now = Utc::now();
        // Expiring exactly now is expired; one millisecond later is not.
        assert!(!token_usable(now, now));
        assert!(token_usable(now + Duration::milliseconds(1), now));
        assert!(!token_usable(now - Duration::milliseconds(1), now));
    }

    #[test]
    fn test_confirm_passwords_match() {
        assert!(confirm_passwords_match("hunter22", "hunter22").is_ok());
        assert!(matches!(
            confirm_passwords_match("hunter22", "hunter23"),
            Err(ResetError::PasswordMismatch)
        ));
    }
}
