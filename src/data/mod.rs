//! Data layer module
//!
//! Handles all data persistence:
//! - SQLite database operations
//! - Cached remote content (comments, conversations, messages)
//! - Sync status bookkeeping
//! - Publications

mod database;
mod models;

pub use database::{Database, PublicationFilter};
pub use models::*;

#[cfg(test)]
mod database_test;
