//! Search index building and time-based caching
//!
//! `IndexCache` owns the only copy of the current `SearchIndex`. Callers get
//! a shared, read-only handle; a rebuild swaps the handle in one assignment.
//! There is no invalidation hook other than the TTL, and concurrent callers
//! during a rebuild are not deduplicated.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::api::{DataSource, PostRecord, UserRecord};
use crate::error::{Error, Result};

use super::clock::Clock;
use super::entity::{EntityType, SearchIndex, SearchableEntity};
use super::normalize::normalize;

/// Default time an index stays fresh
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Author label for posts whose user is not in the user set
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// Time-expiring cache around index builds
pub struct IndexCache {
    source: Arc<dyn DataSource>,
    clock: Arc<dyn Clock>,
    ttl: TimeDelta,
    cached: RwLock<Option<Arc<SearchIndex>>>,
}

impl std::fmt::Debug for IndexCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexCache")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl IndexCache {
    pub fn new(source: Arc<dyn DataSource>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            source,
            clock,
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            cached: RwLock::new(None),
        }
    }

    /// Current index, rebuilding it first if missing or stale.
    ///
    /// Never fails: a rebuild error is logged and an empty index stamped
    /// `now` is cached in its place, so search degrades to "no results" and
    /// the data store is not asked again until that empty index expires.
    pub async fn get_index(&self) -> Arc<SearchIndex> {
        let now = self.clock.now();
        if let Some(index) = self.fresh(now).await {
            debug!(built_at = %index.built_at, "Using cached search index");
            return index;
        }

        match self.refresh().await {
            Ok(index) => index,
            Err(e) => {
                warn!(error = %e, code = e.code(), "Search index rebuild failed, using empty index");
                let empty = Arc::new(SearchIndex::empty(self.next_built_at(now).await));
                *self.cached.write().await = Some(Arc::clone(&empty));
                empty
            }
        }
    }

    /// Rebuild unconditionally and replace the cached index.
    ///
    /// On error the cache slot is left untouched and the error is returned.
    pub async fn refresh(&self) -> Result<Arc<SearchIndex>> {
        let started = Instant::now();
        let (users, posts) = tokio::try_join!(self.source.fetch_users(), self.source.fetch_posts())
            .map_err(|e| match e {
                Error::NetworkError(_) | Error::DataStoreStatus { .. } => e,
                other => Error::IndexFetchFailed(other.to_string()),
            })?;

        let built_at = self.next_built_at(self.clock.now()).await;
        let index = Arc::new(build_index(&users, &posts, built_at));

        *self.cached.write().await = Some(Arc::clone(&index));

        info!(
            users = index.users.len(),
            posts = index.posts.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Search index rebuilt"
        );
        Ok(index)
    }

    /// The cached index regardless of age, without triggering a rebuild
    pub async fn cached(&self) -> Option<Arc<SearchIndex>> {
        self.cached.read().await.clone()
    }

    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    async fn fresh(&self, now: DateTime<Utc>) -> Option<Arc<SearchIndex>> {
        let cached = self.cached.read().await;
        cached
            .as_ref()
            .filter(|index| now - index.built_at < self.ttl)
            .cloned()
    }

    /// `built_at` never moves backwards, even if the clock does
    async fn next_built_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.cached.read().await.as_ref() {
            Some(previous) if previous.built_at > now => previous.built_at,
            _ => now,
        }
    }
}

/// Turn raw records into searchable entities, preserving data-store order
pub fn build_index(
    users: &[UserRecord],
    posts: &[PostRecord],
    built_at: DateTime<Utc>,
) -> SearchIndex {
    let mut authors: HashMap<&str, &str> = HashMap::with_capacity(users.len());
    for user in users {
        authors.entry(user.id.as_str()).or_insert(user.name.as_str());
    }

    let users = users
        .iter()
        .map(|user| SearchableEntity {
            id: user.id.clone(),
            entity_type: EntityType::User,
            display_title: user.name.clone(),
            display_subtitle: user.email.clone(),
            avatar: user.avatar.clone().filter(|a| !a.trim().is_empty()),
            normalized_title: normalize(&user.name),
            normalized_text: normalize(&format!("{} {}", user.name, user.email)),
        })
        .collect();

    let posts = posts
        .iter()
        .map(|post| {
            let author = Some(post.user_id.as_str())
                .filter(|id| !id.is_empty())
                .and_then(|id| authors.get(id).copied())
                .unwrap_or(UNKNOWN_AUTHOR);
            SearchableEntity {
                id: post.id.clone(),
                entity_type: EntityType::Post,
                display_title: post.title.clone(),
                display_subtitle: format!("{} • {}", author, display_date(&post.created_at)),
                avatar: None,
                normalized_title: normalize(&post.title),
                normalized_text: normalize(&format!("{} {}", post.title, post.content)),
            }
        })
        .collect();

    SearchIndex {
        users,
        posts,
        built_at,
    }
}

/// Render a `createdAt` value as M/D/YYYY, or return it untouched
fn display_date(raw: &str) -> String {
    let raw = raw.trim();
    let date = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc).date_naive())
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok().map(|dt| dt.date()))
        .or_else(|| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok());

    match date {
        Some(date) => date.format("%-m/%-d/%Y").to_string(),
        None => raw.to_string(),
    }
}
