//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! tt-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `DIRECTORY_DATABASE_URL` - `PostgreSQL` connection string
//!   (falls back to `DATABASE_URL`)

use secrecy::SecretString;

use tastetrail_server::db;

/// Errors that can occur while migrating.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run the directory database migrations.
///
/// # Errors
///
/// Returns `MigrationError` if the database URL is missing, the connection
/// fails, or a migration fails to apply.
pub async fn run() -> Result<(), MigrationError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DIRECTORY_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| MigrationError::MissingEnvVar("DIRECTORY_DATABASE_URL"))?;

    tracing::info!("Connecting to directory database...");
    let pool = db::create_pool(&database_url).await?;

    tracing::info!("Running directory migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Directory migrations complete!");
    Ok(())
}
