//! Recent searches, persisted per owner
//!
//! The list is most-recent-first, deduplicated by exact text and capped.
//! Storage failures never lose the in-memory list; they are reported to the
//! caller, which logs them.

use std::sync::Arc;

use tracing::warn;

use crate::error::Result;
use crate::storage::KeyValueStore;

use super::clock::Clock;
use super::entity::RecentQuery;

/// Default number of recent searches kept
pub const MAX_RECENT_SEARCHES: usize = 5;

const KEY_PREFIX: &str = "recent_searches_";
const GUEST_OWNER: &str = "guest";

/// Storage key for an owner, or the shared guest bucket
///
/// Characters outside `[A-Za-z0-9-]` are written as `_` followed by the hex
/// of their UTF-8 bytes, so distinct owner ids never share a key.
pub fn storage_key(owner_id: Option<&str>) -> String {
    let owner = owner_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .unwrap_or(GUEST_OWNER);

    let mut key = String::with_capacity(KEY_PREFIX.len() + owner.len());
    key.push_str(KEY_PREFIX);
    let mut buf = [0u8; 4];
    for c in owner.chars() {
        if c.is_ascii_alphanumeric() || c == '-' {
            key.push(c);
        } else {
            key.push('_');
            key.push_str(&hex::encode_upper(c.encode_utf8(&mut buf).as_bytes()));
        }
    }
    key
}

/// Bounded most-recent-first list of past queries
pub struct RecencyStore {
    storage: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    owner_id: Option<String>,
    capacity: usize,
    entries: Vec<RecentQuery>,
}

impl std::fmt::Debug for RecencyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecencyStore")
            .field("owner_id", &self.owner_id)
            .field("capacity", &self.capacity)
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

impl RecencyStore {
    /// Load the owner's list; unreadable or corrupt data yields an empty list
    pub fn load(
        storage: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        owner_id: Option<String>,
        capacity: usize,
    ) -> Self {
        let mut store = Self {
            storage,
            clock,
            owner_id,
            capacity: capacity.max(1),
            entries: Vec::new(),
        };

        match store.read_entries() {
            Ok(entries) => store.entries = entries,
            Err(e) => {
                warn!(key = %store.key(), error = %e, "Failed to load recent searches");
            }
        }
        store
    }

    fn read_entries(&self) -> Result<Vec<RecentQuery>> {
        let Some(raw) = self.storage.get(&self.key())? else {
            return Ok(Vec::new());
        };
        let mut entries: Vec<RecentQuery> = serde_json::from_str(&raw)?;
        // Stable: equal timestamps keep their stored order.
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.truncate(self.capacity);
        Ok(entries)
    }

    pub fn key(&self) -> String {
        storage_key(self.owner_id.as_deref())
    }

    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    pub fn entries(&self) -> &[RecentQuery] {
        &self.entries
    }

    /// Query texts, most recent first
    pub fn queries(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.text.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a query at the front. Blank input is ignored.
    ///
    /// The in-memory list is updated even when persisting fails.
    pub fn add(&mut self, query: &str) -> Result<()> {
        let text = query.trim();
        if text.is_empty() {
            return Ok(());
        }

        let now = self.clock.now().timestamp_millis();
        let timestamp = self
            .entries
            .first()
            .map_or(now, |latest| now.max(latest.timestamp));

        self.entries.retain(|e| e.text != text);
        self.entries.insert(
            0,
            RecentQuery {
                text: text.to_string(),
                timestamp,
                owner_id: self.owner_id.clone(),
            },
        );
        self.entries.truncate(self.capacity);

        self.persist()
    }

    /// Forget every recent query for this owner
    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        self.storage.remove(&self.key())
    }

    fn persist(&self) -> Result<()> {
        let json = serde_json::to_string(&self.entries)?;
        self.storage.set(&self.key(), &json)
    }
}
