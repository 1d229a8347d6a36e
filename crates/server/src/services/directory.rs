//! Store directory service.
//!
//! Listing, tag filtering, search, proximity, the top-rated aggregation,
//! favorites, and store mutation. Query execution is delegated to
//! `PostgreSQL` through [`StoreRepository`]; this layer owns the decisions
//! around it: pagination outcomes, slug derivation, validation, ownership.

use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;

use tastetrail_core::{Point, Slug, StoreId, UserId};

use crate::db::RepositoryError;
use crate::db::reviews::ReviewRepository;
use crate::db::stores::{StoreFields, StoreRepository};
use crate::db::users::UserRepository;
use crate::error::FieldError;
use crate::models::{NearbyStore, RatedStore, Review, Store, TagCount, User};

/// Stores shown per listing page.
pub const PAGE_SIZE: i64 = 3;

/// Result cap for full-text search.
const SEARCH_LIMIT: i64 = 5;

/// Result cap for the proximity query.
const NEAR_LIMIT: i64 = 10;

/// Default proximity radius in meters.
const NEAR_MAX_DISTANCE_M: f64 = 10_000.0;

/// Minimum review count to qualify for the top-rated listing.
const TOP_RATED_MIN_REVIEWS: i64 = 2;

/// Result cap for the top-rated listing.
const TOP_RATED_LIMIT: i64 = 10;

/// Tag sentinel matching every store that has at least one tag.
const ANY_TAG: &str = "any";

/// Errors that can occur in directory operations.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Store (or other referenced entity) not found.
    #[error("not found")]
    NotFound,

    /// A non-author attempted to edit a store. Rejected before any mutation.
    #[error("you must own the store to edit it")]
    OwnershipViolation,

    /// Per-field validation failures, detected before any mutation.
    #[error("validation failed on {} field(s)", .0.len())]
    Validation(Vec<FieldError>),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Raw store form input, prior to validation.
#[derive(Debug, Clone, Default)]
pub struct StoreInput {
    /// Display name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Tags as submitted; normalized during validation.
    pub tags: Vec<String>,
    /// Street address.
    pub address: String,
    /// Longitude, if supplied.
    pub longitude: Option<f64>,
    /// Latitude, if supplied.
    pub latitude: Option<f64>,
    /// Photo filename from the (external) upload pipeline.
    pub photo: Option<String>,
}

impl StoreInput {
    /// Validate into writable fields, aggregating failures per field.
    ///
    /// # Errors
    ///
    /// Returns every failed field at once; nothing is written on failure.
    pub fn validate(&self) -> Result<StoreFields, DirectoryError> {
        let mut errors = Vec::new();

        let name = self.name.trim();
        if name.is_empty() {
            errors.push(FieldError::new("name", "Please enter the store name"));
        } else if Slug::derive(name).is_empty() {
            errors.push(FieldError::new(
                "name",
                "The store name must contain letters or numbers",
            ));
        }

        let address = self.address.trim();
        if address.is_empty() {
            errors.push(FieldError::new("address", "You must supply an address"));
        }

        let point = match (self.longitude, self.latitude) {
            (Some(longitude), Some(latitude)) => match Point::new(longitude, latitude) {
                Ok(point) => Some(point),
                Err(e) => {
                    errors.push(FieldError::new("location", e.to_string()));
                    None
                }
            },
            _ => {
                errors.push(FieldError::new("location", "You must supply coordinates"));
                None
            }
        };

        match point {
            Some(point) if errors.is_empty() => Ok(StoreFields {
                name: name.to_string(),
                description: self.description.trim().to_string(),
                tags: normalize_tags(&self.tags),
                address: address.to_string(),
                longitude: point.longitude,
                latitude: point.latitude,
                photo: self.photo.clone(),
            }),
            _ => Err(DirectoryError::Validation(errors)),
        }
    }
}

/// One resolved listing page.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    /// The page's items.
    pub items: Vec<T>,
    /// 1-based page number.
    pub page: i64,
    /// Total number of pages (at least 1).
    pub pages: i64,
    /// Total item count.
    pub count: i64,
}

/// Outcome of a page request.
#[derive(Debug, Clone)]
pub enum PageOutcome<T> {
    /// The requested page.
    Page(Page<T>),
    /// The request pointed past the end; callers redirect to the last valid
    /// page with a notice instead of returning an empty page silently.
    OutOfRange {
        /// Last page that has items.
        last_page: i64,
    },
}

/// Tag listing: the per-tag counts plus the stores matching the filter.
#[derive(Debug, Clone, Serialize)]
pub struct TagListing {
    /// All tags with their counts, most common first.
    pub tags: Vec<TagCount>,
    /// The active tag, if filtering by one.
    pub tag: Option<String>,
    /// Stores matching the filter.
    pub stores: Vec<Store>,
}

/// A store with its author and reviews.
#[derive(Debug, Clone, Serialize)]
pub struct StoreDetail {
    /// The store itself.
    pub store: Store,
    /// The owning user.
    pub author: User,
    /// Reviews, newest first.
    pub reviews: Vec<Review>,
}

/// Store directory service.
pub struct DirectoryService<'a> {
    stores: StoreRepository<'a>,
    users: UserRepository<'a>,
    reviews: ReviewRepository<'a>,
}

impl<'a> DirectoryService<'a> {
    /// Create a new directory service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            stores: StoreRepository::new(pool),
            users: UserRepository::new(pool),
            reviews: ReviewRepository::new(pool),
        }
    }

    // =========================================================================
    // Listing and aggregation
    // =========================================================================

    /// One page of stores, newest first.
    ///
    /// The page of items and the total count have no data dependency, so
    /// both queries are issued concurrently and joined.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Repository` if either query fails.
    pub async fn page(&self, page: i64) -> Result<PageOutcome<Store>, DirectoryError> {
        let page = page.max(1);
        let offset = (page - 1) * PAGE_SIZE;

        let (stores, count) =
            tokio::try_join!(self.stores.page(PAGE_SIZE, offset), self.stores.count())?;

        Ok(resolve_page(page, count, PAGE_SIZE, stores))
    }

    /// Tag counts plus the stores matching `tag`.
    ///
    /// `None` or the `any` sentinel matches every store with at least one
    /// tag. Both queries are issued concurrently.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Repository` if either query fails.
    pub async fn tags(&self, tag: Option<&str>) -> Result<TagListing, DirectoryError> {
        let filter = tag.filter(|t| *t != ANY_TAG);

        let (tags, stores) =
            tokio::try_join!(self.stores.tag_counts(), self.stores.by_tag(filter))?;

        Ok(TagListing {
            tags,
            tag: tag.map(ToString::to_string),
            stores,
        })
    }

    /// Full-text search over name and description, by descending relevance,
    /// capped at 5 results.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Repository` if the query fails.
    pub async fn search(&self, query: &str) -> Result<Vec<Store>, DirectoryError> {
        Ok(self.stores.search(query, SEARCH_LIMIT).await?)
    }

    /// Stores within 10km of a point, nearest first, capped at 10.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Validation` if the coordinates are missing
    /// or out of range.
    pub async fn near(
        &self,
        longitude: Option<f64>,
        latitude: Option<f64>,
    ) -> Result<Vec<NearbyStore>, DirectoryError> {
        let point = match (longitude, latitude) {
            (Some(longitude), Some(latitude)) => Point::new(longitude, latitude)
                .map_err(|e| {
                    DirectoryError::Validation(vec![FieldError::new("location", e.to_string())])
                })?,
            _ => {
                return Err(DirectoryError::Validation(vec![FieldError::new(
                    "location",
                    "You must supply coordinates",
                )]));
            }
        };

        Ok(self
            .stores
            .near(point.longitude, point.latitude, NEAR_MAX_DISTANCE_M, NEAR_LIMIT)
            .await?)
    }

    /// Stores with at least two reviews and their average rating.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Repository` if the query fails.
    pub async fn top_rated(&self) -> Result<Vec<RatedStore>, DirectoryError> {
        Ok(self
            .stores
            .top_rated(TOP_RATED_MIN_REVIEWS, TOP_RATED_LIMIT)
            .await?)
    }

    /// A store with its author and reviews, by slug.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::NotFound` for an unknown slug.
    pub async fn store_detail(&self, slug: &str) -> Result<StoreDetail, DirectoryError> {
        let store = self
            .stores
            .get_by_slug(slug)
            .await?
            .ok_or(DirectoryError::NotFound)?;

        let (author, reviews) = tokio::try_join!(
            self.users.get_by_id(store.author_id),
            self.reviews.for_store(store.id)
        )?;

        let author = author.ok_or_else(|| {
            RepositoryError::DataCorruption(format!("store {} has no author row", store.id))
        })?;

        Ok(StoreDetail {
            store,
            author,
            reviews,
        })
    }

    // =========================================================================
    // Favorites
    // =========================================================================

    /// Toggle a store in the user's favorites, returning the updated set.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::NotFound` for an unknown store.
    pub async fn toggle_heart(
        &self,
        user_id: UserId,
        store_id: StoreId,
    ) -> Result<Vec<StoreId>, DirectoryError> {
        self.stores
            .get_by_id(store_id)
            .await?
            .ok_or(DirectoryError::NotFound)?;

        let favorites = self.users.favorites(user_id).await?;
        match toggle_for(&favorites, store_id) {
            Toggle::Add => self.users.add_favorite(user_id, store_id).await?,
            Toggle::Remove => self.users.remove_favorite(user_id, store_id).await?,
        }

        Ok(self.users.favorites(user_id).await?)
    }

    /// The stores the user has hearted.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Repository` if a query fails.
    pub async fn hearted(&self, user_id: UserId) -> Result<Vec<Store>, DirectoryError> {
        let favorites = self.users.favorites(user_id).await?;
        Ok(self.stores.by_ids(&favorites).await?)
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Create a store owned by `author`.
    ///
    /// The slug is derived from the name and disambiguated against existing
    /// slugs. The collision check is read-then-write and not transactional;
    /// a lost race surfaces as a `Conflict` from the unique index.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Validation` before any write if fields are
    /// missing or malformed.
    pub async fn create_store(
        &self,
        author: UserId,
        input: &StoreInput,
    ) -> Result<Store, DirectoryError> {
        let fields = input.validate()?;
        let slug = self.derive_unique_slug(&fields.name).await?;

        Ok(self.stores.create(author, &slug, &fields).await?)
    }

    /// Update a store. Only the author may edit; the check happens before
    /// validation and any write. Renames re-derive the slug.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::OwnershipViolation` for a non-author editor.
    /// Returns `DirectoryError::NotFound` for an unknown store.
    pub async fn update_store(
        &self,
        editor: UserId,
        store_id: StoreId,
        input: &StoreInput,
    ) -> Result<Store, DirectoryError> {
        let store = self
            .stores
            .get_by_id(store_id)
            .await?
            .ok_or(DirectoryError::NotFound)?;

        confirm_owner(&store, editor)?;

        let fields = input.validate()?;

        let slug = if fields.name == store.name {
            store.slug.clone()
        } else {
            self.derive_unique_slug(&fields.name).await?
        };

        Ok(self.stores.update(store_id, &slug, &fields).await?)
    }

    /// Add a review to a store.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Validation` for an out-of-range rating.
    /// Returns `DirectoryError::NotFound` for an unknown store.
    pub async fn add_review(
        &self,
        author: UserId,
        store_id: StoreId,
        rating: i32,
        text: &str,
    ) -> Result<Review, DirectoryError> {
        if !(1..=5).contains(&rating) {
            return Err(DirectoryError::Validation(vec![FieldError::new(
                "rating",
                "Rating must be between 1 and 5",
            )]));
        }

        self.stores
            .get_by_id(store_id)
            .await?
            .ok_or(DirectoryError::NotFound)?;

        Ok(self
            .reviews
            .create(store_id, author, rating, text.trim())
            .await?)
    }

    /// Derive the slug for `name`, disambiguated against existing slugs in
    /// the same family.
    async fn derive_unique_slug(&self, name: &str) -> Result<Slug, DirectoryError> {
        let base = Slug::derive(name);
        let existing = self.stores.slugs_with_prefix(base.as_str()).await?;
        Ok(Slug::unique_among(name, &existing))
    }
}

/// Reject anyone but the store's author, before any mutation happens.
fn confirm_owner(store: &Store, user: UserId) -> Result<(), DirectoryError> {
    if store.author_id == user {
        Ok(())
    } else {
        Err(DirectoryError::OwnershipViolation)
    }
}

/// Direction of a favorite toggle.
#[derive(Debug, PartialEq, Eq)]
enum Toggle {
    /// The store is not in the set; add it.
    Add,
    /// The store is in the set; remove it.
    Remove,
}

/// Set semantics for the favorite toggle.
fn toggle_for(favorites: &[StoreId], store_id: StoreId) -> Toggle {
    if favorites.contains(&store_id) {
        Toggle::Remove
    } else {
        Toggle::Add
    }
}

/// Normalize a submitted tag list: trim, drop empties, dedup preserving the
/// submitted order.
fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut seen = Vec::new();
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !seen.iter().any(|s| s == tag) {
            seen.push(tag.to_string());
        }
    }
    seen
}

/// Resolve a fetched page into a page or an out-of-range redirect directive.
fn resolve_page<T>(page: i64, count: i64, page_size: i64, items: Vec<T>) -> PageOutcome<T> {
    let pages = i64::try_from((count as u64).div_ceil(page_size as u64)).unwrap_or(i64::MAX).max(1);

    if items.is_empty() && page > 1 {
        PageOutcome::OutOfRange { last_page: pages }
    } else {
        PageOutcome::Page(Page {
            items,
            page,
            pages,
            count,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // =========================================================================
    // Pagination
    // =========================================================================

    #[test]
    fn test_resolve_page_valid() {
        let outcome = resolve_page(2, 7, 3, vec!["d", "e", "f"]);
        let PageOutcome::Page(page) = outcome else {
            panic!("expected a page");
        };
        assert_eq!(page.page, 2);
        assert_eq!(page.pages, 3);
        assert_eq!(page.count, 7);
    }

    #[test]
    fn test_resolve_page_past_end_redirects_to_last() {
        let outcome = resolve_page::<&str>(9, 7, 3, vec![]);
        let PageOutcome::OutOfRange { last_page } = outcome else {
            panic!("expected out-of-range");
        };
        assert_eq!(last_page, 3);
    }

    #[test]
    fn test_resolve_page_empty_directory_first_page_is_valid() {
        // An empty first page is a legitimate (empty) listing, not a
        // redirect loop.
        let outcome = resolve_page::<&str>(1, 0, 3, vec![]);
        let PageOutcome::Page(page) = outcome else {
            panic!("expected a page");
        };
        assert!(page.items.is_empty());
        assert_eq!(page.pages, 1);
    }

    #[test]
    fn test_resolve_page_exact_boundary() {
        // 6 items over page size 3 is exactly 2 pages; page 3 is out of
        // range, page 2 is the last valid one.
        let outcome = resolve_page::<&str>(3, 6, 3, vec![]);
        let PageOutcome::OutOfRange { last_page } = outcome else {
            panic!("expected out-of-range");
        };
        assert_eq!(last_page, 2);
    }

    // =========================================================================
    // Favorites
    // =========================================================================

    /// Apply a toggle to an in-memory set the way the repository would.
    fn apply_toggle(favorites: &mut Vec<StoreId>, store_id: StoreId) {
        match toggle_for(favorites, store_id) {
            Toggle::Add => favorites.push(store_id),
            Toggle::Remove => favorites.retain(|id| *id != store_id),
        }
    }

    #[test]
    fn test_toggle_adds_when_absent_and_removes_when_present() {
        let mut favorites = vec![StoreId::new(1), StoreId::new(2)];

        apply_toggle(&mut favorites, StoreId::new(3));
        assert_eq!(favorites.len(), 3);
        assert!(favorites.contains(&StoreId::new(3)));

        apply_toggle(&mut favorites, StoreId::new(1));
        assert_eq!(favorites.len(), 2);
        assert!(!favorites.contains(&StoreId::new(1)));
    }

    #[test]
    fn test_toggle_twice_restores_original_set() {
        let original = vec![StoreId::new(1), StoreId::new(2)];

        let mut favorites = original.clone();
        apply_toggle(&mut favorites, StoreId::new(5));
        apply_toggle(&mut favorites, StoreId::new(5));
        assert_eq!(favorites, original);

        let mut favorites = original.clone();
        apply_toggle(&mut favorites, StoreId::new(2));
        apply_toggle(&mut favorites, StoreId::new(2));
        // Set semantics: same membership, order not guaranteed.
        assert_eq!(favorites.len(), original.len());
        for id in &original {
            assert!(favorites.contains(id));
        }
    }

    // =========================================================================
    // Ownership
    // =========================================================================

    fn store_owned_by(author: UserId) -> Store {
        Store {
            id: StoreId::new(1),
            name: "Cafe Luna".to_string(),
            slug: tastetrail_core::Slug::derive("Cafe Luna"),
            description: String::new(),
            tags: vec![],
            address: "1 Crescent St".to_string(),
            longitude: -71.06,
            latitude: 42.36,
            photo: None,
            author_id: author,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_confirm_owner_accepts_author() {
        let store = store_owned_by(UserId::new(1));
        assert!(confirm_owner(&store, UserId::new(1)).is_ok());
    }

    #[test]
    fn test_confirm_owner_rejects_everyone_else() {
        let store = store_owned_by(UserId::new(1));
        assert!(matches!(
            confirm_owner(&store, UserId::new(2)),
            Err(DirectoryError::OwnershipViolation)
        ));
    }

    // =========================================================================
    // Validation
    // =========================================================================

    fn valid_input() -> StoreInput {
        StoreInput {
            name: "Cafe Luna".to_string(),
            description: "Coffee and moonlight".to_string(),
            tags: vec!["coffee".to_string()],
            address: "1 Crescent St".to_string(),
            longitude: Some(-71.06),
            latitude: Some(42.36),
            photo: None,
        }
    }

    #[test]
    fn test_store_input_valid() {
        let fields = valid_input().validate().unwrap();
        assert_eq!(fields.name, "Cafe Luna");
        assert_eq!(fields.tags, vec!["coffee".to_string()]);
    }

    #[test]
    fn test_store_input_aggregates_errors() {
        let input = StoreInput {
            name: String::new(),
            address: "  ".to_string(),
            longitude: None,
            latitude: None,
            ..StoreInput::default()
        };
        let Err(DirectoryError::Validation(errors)) = input.validate() else {
            panic!("expected validation failure");
        };

        let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, ["name", "address", "location"]);
    }

    #[test]
    fn test_store_input_rejects_out_of_range_coordinates() {
        let input = StoreInput {
            longitude: Some(540.0),
            ..valid_input()
        };
        let Err(DirectoryError::Validation(errors)) = input.validate() else {
            panic!("expected validation failure");
        };
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "location");
    }

    #[test]
    fn test_store_input_requires_both_coordinates() {
        let input = StoreInput {
            latitude: None,
            ..valid_input()
        };
        assert!(matches!(
            input.validate(),
            Err(DirectoryError::Validation(_))
        ));
    }

    #[test]
    fn test_normalize_tags_dedups_and_trims() {
        let tags = vec![
            " coffee ".to_string(),
            "coffee".to_string(),
            String::new(),
            "wifi".to_string(),
        ];
        assert_eq!(
            normalize_tags(&tags),
            vec!["coffee".to_string(), "wifi".to_string()]
        );
    }
}
