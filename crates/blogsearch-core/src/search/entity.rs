//! Search entity and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Types of entities that can be searched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    User,
    Post,
}

impl EntityType {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Post => "post",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a query matched an entity, strongest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Normalized name/title equals the query
    Exact,
    /// Normalized name/title starts with the query
    Prefix,
    /// Query occurs inside a post title
    Title,
    /// Query occurs inside a user's searchable text
    Contains,
    /// Query occurs only in a post body
    Content,
}

impl MatchKind {
    pub fn score(&self) -> u32 {
        match self {
            Self::Exact => 100,
            Self::Prefix => 80,
            Self::Title => 70,
            Self::Contains => 60,
            Self::Content => 50,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Prefix => "prefix",
            Self::Title => "title",
            Self::Contains => "contains",
            Self::Content => "content",
        }
    }
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user or post snapshot prepared for matching
///
/// Built once per index refresh and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchableEntity {
    pub id: String,
    pub entity_type: EntityType,
    /// User name or post title, as stored
    pub display_title: String,
    /// User email, or "author • date" for posts
    pub display_subtitle: String,
    pub avatar: Option<String>,
    /// Normalized user name or post title
    pub normalized_title: String,
    /// Normalized "name email" for users, "title content" for posts
    pub normalized_text: String,
}

impl SearchableEntity {
    /// Navigation target for this entity
    pub fn url(&self) -> String {
        match self.entity_type {
            EntityType::User => format!("/profile/{}", self.id),
            EntityType::Post => format!("/post/{}", self.id),
        }
    }
}

/// Snapshot of every searchable user and post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchIndex {
    pub users: Vec<SearchableEntity>,
    pub posts: Vec<SearchableEntity>,
    pub built_at: DateTime<Utc>,
}

impl SearchIndex {
    /// An index with no entities, used when a rebuild fails
    pub fn empty(built_at: DateTime<Utc>) -> Self {
        Self {
            users: Vec::new(),
            posts: Vec::new(),
            built_at,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.posts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.users.len() + self.posts.len()
    }
}

/// A single ranked hit, derived per query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub entity_type: EntityType,
    pub title: String,
    pub subtitle: String,
    pub avatar: Option<String>,
    pub url: String,
    pub match_kind: MatchKind,
}

impl SearchResult {
    pub fn from_entity(entity: &SearchableEntity, match_kind: MatchKind) -> Self {
        Self {
            id: entity.id.clone(),
            entity_type: entity.entity_type,
            title: entity.display_title.clone(),
            subtitle: entity.display_subtitle.clone(),
            avatar: entity.avatar.clone(),
            url: entity.url(),
            match_kind,
        }
    }

    pub fn score(&self) -> u32 {
        self.match_kind.score()
    }
}

/// Ranked, capped results for one query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultSet {
    pub users: Vec<SearchResult>,
    pub posts: Vec<SearchResult>,
    /// Sum of the capped list lengths, not the raw match count
    pub total: usize,
}

impl SearchResultSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(users: Vec<SearchResult>, posts: Vec<SearchResult>) -> Self {
        let total = users.len() + posts.len();
        Self { users, posts, total }
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Users then posts, the order keyboard selection walks
    pub fn iter(&self) -> impl Iterator<Item = &SearchResult> {
        self.users.iter().chain(self.posts.iter())
    }

    /// Result at a keyboard selection position
    pub fn get(&self, position: usize) -> Option<&SearchResult> {
        self.iter().nth(position)
    }
}

/// A persisted recent search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentQuery {
    pub text: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
}
