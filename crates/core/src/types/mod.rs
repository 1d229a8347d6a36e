//! Core types for TasteTrail.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod point;
pub mod slug;

pub use email::{Email, EmailError};
pub use id::*;
pub use point::{Point, PointError};
pub use slug::Slug;
