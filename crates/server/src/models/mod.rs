//! Domain models for the directory service.

pub mod review;
pub mod session;
pub mod store;
pub mod user;

pub use review::Review;
pub use session::CurrentUser;
pub use store::{NearbyStore, RatedStore, Store, TagCount};
pub use user::User;
