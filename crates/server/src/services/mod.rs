//! Business-logic services for the directory.

pub mod auth;
pub mod directory;
pub mod email;
pub mod reset;
