//! Search domain module
//!
//! Client-side search over the users and posts of a blogging data store.
//!
//! # Architecture
//!
//! - **Normalizer**: `normalize`, `sanitize` for accent/case tolerant matching
//! - **Index**: `IndexCache` snapshots the data store into `SearchIndex`,
//!   rebuilt when older than its TTL
//! - **Ranker**: `Ranker` scores exact/prefix/contains matches per category
//! - **Controller**: `QueryController` debounces keystrokes, publishes
//!   `SearchState` and handles keyboard navigation
//! - **Recent**: `RecencyStore` keeps the last few selected queries per owner
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use blogsearch_core::config::Config;
//! use blogsearch_core::search::{ChannelNavigator, Key, QueryControllerBuilder};
//!
//! let (navigator, mut urls) = ChannelNavigator::new();
//! let controller = QueryControllerBuilder::from_config(&Config::load()?)?
//!     .owner_id("u42")
//!     .navigator(Arc::new(navigator))
//!     .build()?;
//!
//! controller.search("nguyen");
//! let mut state = controller.subscribe();
//! state.wait_for(|s| !s.loading).await?;
//! controller.handle_key(Key::ArrowDown);
//! controller.handle_key(Key::Enter);
//! let url = urls.recv().await;
//! ```

pub mod clock;
pub mod controller;
pub mod entity;
pub mod index;
pub mod normalize;
pub mod ranker;
pub mod recent;

// Re-export main types
pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{
    ChannelNavigator, Key, Navigator, QueryController, QueryControllerBuilder, SearchPhase,
    SearchState,
};
pub use entity::{
    EntityType, MatchKind, RecentQuery, SearchIndex, SearchResult, SearchResultSet,
    SearchableEntity,
};
pub use index::{IndexCache, build_index};
pub use normalize::{normalize, prepare_query, sanitize};
pub use ranker::{Ranker, rank};
pub use recent::RecencyStore;
