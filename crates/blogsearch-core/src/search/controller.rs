//! Debounced query controller
//!
//! Owns the observable search state and drives it through
//! `Idle -> PendingDebounce -> Loaded`. Every armed debounce task carries a
//! generation number and the query it was armed for; its outcome is
//! published only if both still match the controller's current state, so a
//! superseded keystroke can never overwrite newer results.
//!
//! Methods that arm a debounce task (`search`, and `handle_key` for Enter on
//! a recent query) must be called from within a tokio runtime.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, DataSource};
use crate::config::{Config, SearchConfig};
use crate::error::{Error, Result};
use crate::storage::{FileStore, KeyValueStore, MemoryStore};

use super::clock::{Clock, SystemClock};
use super::entity::{SearchResult, SearchResultSet};
use super::index::IndexCache;
use super::normalize::prepare_query;
use super::ranker::Ranker;
use super::recent::RecencyStore;

/// Where the controller is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    /// No query, dropdown closed
    Idle,
    /// Keystroke received, debounce timer armed
    PendingDebounce,
    /// Results for the current query are published
    Loaded,
}

/// Snapshot of everything a search box renders
#[derive(Debug, Clone, PartialEq)]
pub struct SearchState {
    /// Raw text as typed
    pub query: String,
    pub results: SearchResultSet,
    /// Recent query texts, most recent first
    pub recent: Vec<String>,
    pub loading: bool,
    /// Keyboard highlight; indexes `recent` when the query is blank,
    /// otherwise users followed by posts
    pub selected: Option<usize>,
    pub dropdown_open: bool,
    pub phase: SearchPhase,
}

impl SearchState {
    fn idle(recent: Vec<String>) -> Self {
        Self {
            query: String::new(),
            results: SearchResultSet::empty(),
            recent,
            loading: false,
            selected: None,
            dropdown_open: false,
            phase: SearchPhase::Idle,
        }
    }

    fn reset_to_idle(&mut self, query: String) {
        self.query = query;
        self.results = SearchResultSet::empty();
        self.loading = false;
        self.selected = None;
        self.dropdown_open = false;
        self.phase = SearchPhase::Idle;
    }
}

/// Keys the dropdown reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowUp,
    ArrowDown,
    Tab,
    Enter,
    Escape,
}

impl Key {
    /// Parse a DOM-style key name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ArrowUp" => Some(Self::ArrowUp),
            "ArrowDown" => Some(Self::ArrowDown),
            "Tab" => Some(Self::Tab),
            "Enter" => Some(Self::Enter),
            "Escape" | "Esc" => Some(Self::Escape),
            _ => None,
        }
    }
}

/// Receives the URL of a selected result
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &str);
}

/// Forwards navigation requests over a channel
#[derive(Debug, Clone)]
pub struct ChannelNavigator {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelNavigator {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Navigator for ChannelNavigator {
    fn navigate(&self, url: &str) {
        if self.tx.send(url.to_string()).is_err() {
            warn!(url, "Navigation receiver dropped");
        }
    }
}

/// Handle to a search box's controller; clones share state
#[derive(Clone)]
pub struct QueryController {
    inner: Arc<Inner>,
}

struct Inner {
    index: Arc<IndexCache>,
    ranker: Ranker,
    debounce: Duration,
    max_query_length: usize,
    navigator: Arc<dyn Navigator>,
    recent: Mutex<RecencyStore>,
    state: watch::Sender<SearchState>,
    generation: AtomicU64,
    pending: Mutex<Option<JoinHandle<()>>>,
    searches_executed: AtomicU64,
}

impl std::fmt::Debug for QueryController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryController")
            .field("debounce", &self.inner.debounce)
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

impl QueryController {
    /// Create a new builder
    pub fn builder() -> QueryControllerBuilder {
        QueryControllerBuilder::new()
    }

    /// Current state snapshot
    pub fn state(&self) -> SearchState {
        self.inner.state.borrow().clone()
    }

    /// Watch state changes
    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.inner.state.subscribe()
    }

    /// Shared index cache
    pub fn index(&self) -> &Arc<IndexCache> {
        &self.inner.index
    }

    /// Number of ranking passes run so far
    pub fn searches_executed(&self) -> u64 {
        self.inner.searches_executed.load(Ordering::SeqCst)
    }

    /// Record a keystroke.
    ///
    /// Blank text goes straight to `Idle`. Anything else opens the dropdown,
    /// sets `loading` and (re)arms the debounce timer.
    pub fn search(&self, text: &str) {
        let text = text.to_string();

        if text.trim().is_empty() {
            self.inner.state.send_modify(|s| s.reset_to_idle(text));
            return;
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut pending = self.inner.pending_task();
        if let Some(previous) = pending.take() {
            previous.abort();
        }

        self.inner.state.send_modify(|s| {
            s.query = text.clone();
            s.dropdown_open = true;
            s.loading = true;
            s.phase = SearchPhase::PendingDebounce;
        });

        let inner = Arc::clone(&self.inner);
        *pending = Some(tokio::spawn(async move {
            inner.run_debounced(generation, text).await;
        }));
    }

    /// Cancel any pending search and return to `Idle`
    pub fn clear_search(&self) {
        self.inner.cancel_pending();
        self.inner.state.send_modify(|s| s.reset_to_idle(String::new()));
    }

    /// Remember the typed query, reset, then navigate to the result
    pub fn select_result(&self, result: &SearchResult) {
        let query = self.inner.state.borrow().query.clone();
        self.add_to_recent(&query);
        self.clear_search();
        info!(url = %result.url, kind = %result.entity_type, "Search result selected");
        self.inner.navigator.navigate(&result.url);
    }

    /// Push a query onto the recent list
    pub fn add_to_recent(&self, query: &str) {
        let queries = {
            let mut recent = self.inner.recent_store();
            if let Err(e) = recent.add(query) {
                warn!(error = %e, code = e.code(), "Failed to persist recent searches");
            }
            recent.queries()
        };
        self.inner.state.send_modify(|s| s.recent = queries);
    }

    /// Forget all recent queries
    pub fn clear_recent(&self) {
        {
            let mut recent = self.inner.recent_store();
            if let Err(e) = recent.clear() {
                warn!(error = %e, code = e.code(), "Failed to clear recent searches");
            }
        }
        self.inner.state.send_modify(|s| {
            s.recent.clear();
            if s.query.trim().is_empty() {
                s.selected = None;
            }
        });
    }

    /// Open the dropdown, e.g. when the search box gains focus
    pub fn focus(&self) {
        self.inner.state.send_if_modified(|s| {
            let changed = !s.dropdown_open;
            s.dropdown_open = true;
            changed
        });
    }

    /// Close the dropdown without touching query or results
    pub fn close_dropdown(&self) {
        self.inner.state.send_if_modified(|s| {
            let changed = s.dropdown_open || s.selected.is_some();
            s.dropdown_open = false;
            s.selected = None;
            changed
        });
    }

    /// React to a navigation key. Returns whether the key was consumed.
    pub fn handle_key(&self, key: Key) -> bool {
        let snapshot = self.state();
        if !snapshot.dropdown_open {
            return false;
        }

        if snapshot.query.trim().is_empty() && !snapshot.recent.is_empty() {
            let len = snapshot.recent.len();
            match key {
                Key::ArrowDown | Key::Tab => self.move_selection(len, next_index),
                Key::ArrowUp => self.move_selection(len, previous_index),
                Key::Enter => {
                    if let Some(query) = snapshot.selected.and_then(|i| snapshot.recent.get(i)) {
                        self.search(query);
                    }
                }
                Key::Escape => self.clear_search(),
            }
            return true;
        }

        if snapshot.results.total == 0 {
            return false;
        }

        let len = snapshot.results.users.len() + snapshot.results.posts.len();
        match key {
            Key::ArrowDown | Key::Tab => self.move_selection(len, next_index),
            Key::ArrowUp => self.move_selection(len, previous_index),
            Key::Enter => {
                if let Some(result) = snapshot.selected.and_then(|i| snapshot.results.get(i)) {
                    self.select_result(result);
                }
            }
            Key::Escape => self.clear_search(),
        }
        true
    }

    fn move_selection(&self, len: usize, step: fn(Option<usize>, usize) -> usize) {
        self.inner
            .state
            .send_modify(|s| s.selected = Some(step(s.selected, len)));
    }
}

/// Down/Tab: wrap from the last entry (or nothing) to the first
fn next_index(selected: Option<usize>, len: usize) -> usize {
    match selected {
        Some(i) if i + 1 < len => i + 1,
        _ => 0,
    }
}

/// Up: wrap from the first entry (or nothing) to the last
fn previous_index(selected: Option<usize>, len: usize) -> usize {
    match selected {
        Some(i) if i > 0 && i < len => i - 1,
        _ => len.saturating_sub(1),
    }
}

impl Inner {
    fn pending_task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn recent_store(&self) -> MutexGuard<'_, RecencyStore> {
        self.recent.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn cancel_pending(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(previous) = self.pending_task().take() {
            previous.abort();
        }
    }

    fn is_current(&self, generation: u64, query: &str, state: &SearchState) -> bool {
        self.generation.load(Ordering::SeqCst) == generation && state.query == query
    }

    async fn run_debounced(&self, generation: u64, query: String) {
        tokio::time::sleep(self.debounce).await;

        let still_current = self.is_current(generation, &query, &self.state.borrow());
        if !still_current {
            debug!(query = %query, "Debounced search superseded before running");
            return;
        }

        let results = match self.execute(&query).await {
            Ok(results) => results,
            Err(e) => {
                warn!(query = %query, error = %e, code = e.code(), "Search failed, publishing empty results");
                SearchResultSet::empty()
            }
        };

        let published = self.state.send_if_modified(|s| {
            if !self.is_current(generation, &query, s) {
                return false;
            }
            s.results = results;
            s.loading = false;
            s.selected = None;
            s.phase = SearchPhase::Loaded;
            true
        });

        if !published {
            debug!(query = %query, "Discarded results for superseded query");
        }
    }

    /// sanitize -> normalize -> index -> rank
    async fn execute(&self, query: &str) -> Result<SearchResultSet> {
        let normalized = prepare_query(query, self.max_query_length);
        if normalized.is_empty() {
            return Ok(SearchResultSet::empty());
        }

        let index = self.index.get_index().await;
        self.searches_executed.fetch_add(1, Ordering::SeqCst);

        let ranker = self.ranker;
        let results = tokio::task::spawn_blocking(move || ranker.rank(&normalized, &index))
            .await
            .map_err(|e| Error::RankingFailed(e.to_string()))?;

        debug!(
            query = %query,
            users = results.users.len(),
            posts = results.posts.len(),
            "Search executed"
        );
        Ok(results)
    }
}

/// Builder for creating a QueryController
pub struct QueryControllerBuilder {
    config: SearchConfig,
    index: Option<Arc<IndexCache>>,
    source: Option<Arc<dyn DataSource>>,
    clock: Option<Arc<dyn Clock>>,
    storage: Option<Arc<dyn KeyValueStore>>,
    navigator: Option<Arc<dyn Navigator>>,
    owner_id: Option<String>,
}

impl Default for QueryControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryControllerBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            config: SearchConfig::default(),
            index: None,
            source: None,
            clock: None,
            storage: None,
            navigator: None,
            owner_id: None,
        }
    }

    /// Wire the REST client and file-backed storage described by `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let source = ApiClient::new(&config.api)?;
        let data_dir = config
            .storage
            .resolved_data_dir()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        Ok(Self::new()
            .search_config(config.search.clone())
            .data_source(Arc::new(source))
            .storage(Arc::new(FileStore::new(data_dir))))
    }

    pub fn search_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    /// Share an existing index cache instead of creating one
    pub fn index(mut self, index: Arc<IndexCache>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn data_source(mut self, source: Arc<dyn DataSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Durable storage for recent searches (defaults to in-memory)
    pub fn storage(mut self, storage: Arc<dyn KeyValueStore>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Authenticated user; recent searches go to the guest bucket without one
    pub fn owner_id(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    /// Build the controller, loading the owner's recent searches
    pub fn build(self) -> Result<QueryController> {
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let index = match (self.index, self.source) {
            (Some(index), _) => index,
            (None, Some(source)) => Arc::new(IndexCache::new(
                source,
                Arc::clone(&clock),
                self.config.cache_ttl(),
            )),
            (None, None) => {
                return Err(Error::ConfigError(
                    "A data source or index cache is required".to_string(),
                ));
            }
        };

        let navigator = self
            .navigator
            .ok_or_else(|| Error::ConfigError("A navigator is required".to_string()))?;

        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let recent = RecencyStore::load(
            storage,
            Arc::clone(&clock),
            self.owner_id,
            self.config.max_recent_searches,
        );

        let ranker = Ranker::new()
            .with_max_per_category(self.config.max_results_per_category)
            .with_user_email_matching(self.config.match_user_email);

        let (state, _) = watch::channel(SearchState::idle(recent.queries()));

        Ok(QueryController {
            inner: Arc::new(Inner {
                index,
                ranker,
                debounce: self.config.debounce(),
                max_query_length: self.config.max_query_length,
                navigator,
                recent: Mutex::new(recent),
                state,
                generation: AtomicU64::new(0),
                pending: Mutex::new(None),
                searches_executed: AtomicU64::new(0),
            }),
        })
    }
}
