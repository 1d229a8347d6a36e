//! Authentication service.
//!
//! Registration, login, and account updates over Argon2id password hashes.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;

use tastetrail_core::{Email, UserId};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::error::FieldError;
use crate::models::User;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Registration form input, prior to validation.
#[derive(Debug, Clone)]
pub struct Registration {
    /// Display name.
    pub name: String,
    /// Email address, not yet parsed.
    pub email: String,
    /// Password in plaintext (never stored).
    pub password: String,
    /// Password confirmation.
    pub password_confirm: String,
}

/// Authentication service.
///
/// Handles user registration, login, and account updates.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Register a new user.
    ///
    /// Validation failures are aggregated per field and detected before any
    /// write. The caller logs the user in afterwards.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` if any field is missing or malformed.
    /// Returns `AuthError::UserAlreadyExists` if the email is registered.
    pub async fn register(&self, input: &Registration) -> Result<User, AuthError> {
        let email = validate_registration(input)?;

        let password_hash = hash_password(&input.password)?;

        let user = self
            .users
            .create(&email, input.name.trim(), &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        // Validate email format
        let email = Email::parse(email)?;

        // Get user with password hash
        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        // Verify password
        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Update the authenticated user's name and email.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` if the name is empty or the email is
    /// malformed.
    /// Returns `AuthError::UserAlreadyExists` if the new email is taken.
    pub async fn update_account(
        &self,
        user_id: UserId,
        name: &str,
        email: &str,
    ) -> Result<User, AuthError> {
        let mut errors = Vec::new();

        if name.trim().is_empty() {
            errors.push(FieldError::new("name", "You must supply a name"));
        }
        let email = match Email::parse(email) {
            Ok(email) => Some(email),
            Err(e) => {
                errors.push(FieldError::new("email", e.to_string()));
                None
            }
        };

        if !errors.is_empty() {
            return Err(AuthError::Validation(errors));
        }
        let Some(email) = email else {
            return Err(AuthError::Validation(errors));
        };

        self.users
            .update_account(user_id, name.trim(), &email)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })
    }
}

/// Validate a registration form, aggregating per-field failures.
fn validate_registration(input: &Registration) -> Result<Email, AuthError> {
    let mut errors = Vec::new();

    if input.name.trim().is_empty() {
        errors.push(FieldError::new("name", "You must supply your name"));
    }

    let email = match Email::parse(&input.email) {
        Ok(email) => Some(email),
        Err(e) => {
            errors.push(FieldError::new("email", e.to_string()));
            None
        }
    };

    if input.password.is_empty() {
        errors.push(FieldError::new("password", "Password cannot be blank"));
    } else if let Err(AuthError::WeakPassword(msg)) = validate_password(&input.password) {
        errors.push(FieldError::new("password", msg));
    }

    if input.password_confirm.is_empty() {
        errors.push(FieldError::new(
            "password-confirm",
            "Password confirmation cannot be blank",
        ));
    } else if input.password != input.password_confirm {
        errors.push(FieldError::new(
            "password-confirm",
            "Your passwords do not match",
        ));
    }

    match email {
        Some(email) if errors.is_empty() => Ok(email),
        _ => Err(AuthError::Validation(errors)),
    }
}

/// Validate password meets requirements.
pub(crate) fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
pub(crate) fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
pub(crate) fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn registration() -> Registration {
        Registration {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "correct horse".to_string(),
            password_confirm: "correct horse".to_string(),
        }
    }

    #[test]
    fn test_validate_registration_ok() {
        let email = validate_registration(&registration()).unwrap();
        assert_eq!(email.as_str(), "ada@example.com");
    }

    #[test]
    fn test_validate_registration_aggregates_fields() {
        let input = Registration {
            name: "  ".to_string(),
            email: "not-an-email".to_string(),
            password: String::new(),
            password_confirm: String::new(),
        };
        let Err(AuthError::Validation(errors)) = validate_registration(&input) else {
            panic!("expected validation failure");
        };

        let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, ["name", "email", "password", "password-confirm"]);
    }

    #[test]
    fn test_validate_registration_mismatch() {
        let input = Registration {
            password_confirm: "something else".to_string(),
            ..registration()
        };
        let Err(AuthError::Validation(errors)) = validate_registration(&input) else {
            panic!("expected validation failure");
        };
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "password-confirm");
    }

    #[test]
    fn test_validate_password_length() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough").is_ok());
    }

    #[test]
    fn test_hash_and_verify_roundtrip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }
}
