//! Match scoring and result ordering
//!
//! Each entity gets at most one `MatchKind`, the strongest that applies.
//! Within a category results are ordered by descending score; ties keep
//! index order (the sort is stable). Each category is then capped, and
//! `total` is counted after the cap.

use std::cmp::Reverse;

use super::entity::{MatchKind, SearchIndex, SearchResult, SearchResultSet, SearchableEntity};

/// Default per-category result cap
pub const MAX_RESULTS_PER_CATEGORY: usize = 5;

/// Scores an index against a normalized query
#[derive(Debug, Clone, Copy)]
pub struct Ranker {
    max_per_category: usize,
    match_user_email: bool,
}

impl Default for Ranker {
    fn default() -> Self {
        Self {
            max_per_category: MAX_RESULTS_PER_CATEGORY,
            match_user_email: false,
        }
    }
}

impl Ranker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_per_category(mut self, max: usize) -> Self {
        self.max_per_category = max;
        self
    }

    /// Let user `contains` matches look at name and email
    pub fn with_user_email_matching(mut self, enabled: bool) -> Self {
        self.match_user_email = enabled;
        self
    }

    /// Rank `index` against an already normalized query
    pub fn rank(&self, query: &str, index: &SearchIndex) -> SearchResultSet {
        if query.is_empty() {
            return SearchResultSet::empty();
        }

        let users = self.rank_category(&index.users, |user| self.match_user(query, user));
        let posts = self.rank_category(&index.posts, |post| match_post(query, post));
        SearchResultSet::new(users, posts)
    }

    fn rank_category<F>(&self, entities: &[SearchableEntity], matcher: F) -> Vec<SearchResult>
    where
        F: Fn(&SearchableEntity) -> Option<MatchKind>,
    {
        let mut results: Vec<SearchResult> = entities
            .iter()
            .filter_map(|entity| matcher(entity).map(|kind| SearchResult::from_entity(entity, kind)))
            .collect();
        // `sort_by_key` is stable, so equal scores keep index order.
        results.sort_by_key(|result| Reverse(result.score()));
        results.truncate(self.max_per_category);
        results
    }

    fn match_user(&self, query: &str, user: &SearchableEntity) -> Option<MatchKind> {
        let name = user.normalized_title.as_str();
        if name == query {
            Some(MatchKind::Exact)
        } else if name.starts_with(query) {
            Some(MatchKind::Prefix)
        } else if name.contains(query)
            || (self.match_user_email && user.normalized_text.contains(query))
        {
            Some(MatchKind::Contains)
        } else {
            None
        }
    }
}

fn match_post(query: &str, post: &SearchableEntity) -> Option<MatchKind> {
    let title = post.normalized_title.as_str();
    if title == query {
        Some(MatchKind::Exact)
    } else if title.starts_with(query) {
        Some(MatchKind::Prefix)
    } else if title.contains(query) {
        Some(MatchKind::Title)
    } else if post.normalized_text.contains(query) {
        Some(MatchKind::Content)
    } else {
        None
    }
}

/// Rank with the default cap and name-only user matching
pub fn rank(query: &str, index: &SearchIndex) -> SearchResultSet {
    Ranker::default().rank(query, index)
}
