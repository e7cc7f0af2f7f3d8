//! Data store access
//!
//! This module provides:
//! - `DataSource`, the read-only seam the search index is built through
//! - `ApiClient`, the reqwest-backed implementation for the REST backend
//! - Record types for users and posts

mod client;
mod types;

use async_trait::async_trait;

use crate::error::Result;

pub use client::{ApiClient, ApiClientBuilder};
pub use types::{PostRecord, UserRecord};

/// Bulk, read-only access to the user and post collections
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetch every user (single request, not paginated)
    async fn fetch_users(&self) -> Result<Vec<UserRecord>>;

    /// Fetch every post (single request, not paginated)
    async fn fetch_posts(&self) -> Result<Vec<PostRecord>>;
}
