//! Seed the database with sample users, stores, and reviews.
//!
//! The input is a JSON file:
//!
//! ```json
//! {
//!   "users": [
//!     {"name": "Ada", "email": "ada@example.com", "password": "correct horse"}
//!   ],
//!   "stores": [
//!     {"name": "Cafe Luna", "description": "Coffee", "tags": ["coffee"],
//!      "address": "1 Crescent St", "longitude": -71.06, "latitude": 42.36,
//!      "author": "ada@example.com"}
//!   ],
//!   "reviews": [
//!     {"store": "Cafe Luna", "author": "ada@example.com", "rating": 5,
//!      "text": "Lovely"}
//!   ]
//! }
//! ```
//!
//! Seeding goes through the same services as the HTTP handlers, so slugs,
//! validation, and password hashing behave exactly like production writes.

use std::collections::HashMap;
use std::path::Path;

use secrecy::SecretString;
use serde::Deserialize;
use tracing::info;

use tastetrail_core::{StoreId, UserId};
use tastetrail_server::db;
use tastetrail_server::services::auth::{AuthService, Registration};
use tastetrail_server::services::directory::{DirectoryService, StoreInput};

/// One sample user.
#[derive(Debug, Deserialize)]
struct SeedUser {
    name: String,
    email: String,
    password: String,
}

/// One sample store, owned by the user with the given email.
#[derive(Debug, Deserialize)]
struct SeedStore {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    tags: Vec<String>,
    address: String,
    longitude: f64,
    latitude: f64,
    #[serde(default)]
    photo: Option<String>,
    author: String,
}

/// One sample review, keyed by store name and author email.
#[derive(Debug, Deserialize)]
struct SeedReview {
    store: String,
    author: String,
    rating: i32,
    #[serde(default)]
    text: String,
}

/// The sample-data file.
#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    users: Vec<SeedUser>,
    #[serde(default)]
    stores: Vec<SeedStore>,
    #[serde(default)]
    reviews: Vec<SeedReview>,
}

/// Load a sample-data file into the database.
///
/// # Arguments
///
/// * `file_path` - Path to the JSON sample-data file
/// * `clear_existing` - If true, wipe directory data first
///
/// # Errors
///
/// Returns an error if environment variables are missing, the file cannot
/// be read, or any insert fails.
pub async fn run(file_path: &str, clear_existing: bool) -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DIRECTORY_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| "DIRECTORY_DATABASE_URL not set")?;

    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading sample data from file");
    let content = tokio::fs::read_to_string(path).await?;
    let data: SeedFile = serde_json::from_str(&content)?;

    info!(
        users = data.users.len(),
        stores = data.stores.len(),
        reviews = data.reviews.len(),
        "Parsed sample data"
    );

    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");

    if clear_existing {
        info!("Clearing existing directory data");
        sqlx::query("DELETE FROM directory.review")
            .execute(&pool)
            .await?;
        sqlx::query("DELETE FROM directory.user_favorite")
            .execute(&pool)
            .await?;
        sqlx::query("DELETE FROM directory.store")
            .execute(&pool)
            .await?;
        sqlx::query(r#"DELETE FROM directory."user""#)
            .execute(&pool)
            .await?;
    }

    let auth = AuthService::new(&pool);
    let directory = DirectoryService::new(&pool);

    // Users first; stores and reviews refer to them by email.
    let mut users_by_email: HashMap<String, UserId> = HashMap::new();
    for seed in &data.users {
        let user = auth
            .register(&Registration {
                name: seed.name.clone(),
                email: seed.email.clone(),
                password: seed.password.clone(),
                password_confirm: seed.password.clone(),
            })
            .await?;
        users_by_email.insert(user.email.as_str().to_string(), user.id);
    }
    info!(count = users_by_email.len(), "Seeded users");

    // Stores go through the directory service so slugs derive and
    // disambiguate exactly as they do in production.
    let mut stores_by_name: HashMap<String, StoreId> = HashMap::new();
    for seed in &data.stores {
        let author = lookup(&users_by_email, &seed.author.to_lowercase(), "user")?;
        let store = directory
            .create_store(
                author,
                &StoreInput {
                    name: seed.name.clone(),
                    description: seed.description.clone(),
                    tags: seed.tags.clone(),
                    address: seed.address.clone(),
                    longitude: Some(seed.longitude),
                    latitude: Some(seed.latitude),
                    photo: seed.photo.clone(),
                },
            )
            .await?;
        stores_by_name.insert(seed.name.clone(), store.id);
    }
    info!(count = stores_by_name.len(), "Seeded stores");

    for seed in &data.reviews {
        let author = lookup(&users_by_email, &seed.author.to_lowercase(), "user")?;
        let store = lookup(&stores_by_name, &seed.store, "store")?;
        directory
            .add_review(author, store, seed.rating, &seed.text)
            .await?;
    }
    info!(count = data.reviews.len(), "Seeded reviews");

    info!("Seeding complete");
    Ok(())
}

/// Look up a seeded entity by key, with a readable error on dangling refs.
fn lookup<T: Copy>(
    map: &HashMap<String, T>,
    key: &str,
    what: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    map.get(key)
        .copied()
        .ok_or_else(|| format!("unknown {what}: {key}").into())
}
