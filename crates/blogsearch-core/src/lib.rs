//! Blogsearch Core Library
//!
//! This crate provides the search subsystem of a social blogging client:
//! - Data store access (REST `users` / `posts` collections)
//! - Search index snapshots with time-based caching
//! - Accent-insensitive ranking of users and posts
//! - Debounced query control with keyboard navigation
//! - Recent searches persisted per user
//! - Configuration (TOML file + environment overrides)

pub mod api;
pub mod config;
pub mod error;
pub mod search;
pub mod storage;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::search::{Key, QueryController, SearchResultSet, SearchState};
}
