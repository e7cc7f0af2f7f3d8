//! Blogsearch Core Integration Tests

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use blogsearch_core::{
    Error, Result,
    api::{DataSource, PostRecord, UserRecord},
    config::{Config, SearchConfig},
    search::{
        ChannelNavigator, IndexCache, Key, ManualClock, MatchKind, QueryController,
        QueryControllerBuilder, SearchPhase, SearchResultSet, SearchState, normalize,
    },
    storage::{FileStore, KeyValueStore, MemoryStore},
};
use chrono::{DateTime, Utc};
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;

struct FakeStore {
    users: Vec<UserRecord>,
    posts: Vec<PostRecord>,
    delay: Duration,
    offline: bool,
    fetches: AtomicUsize,
}

impl FakeStore {
    fn new(users: Vec<UserRecord>, posts: Vec<PostRecord>) -> Self {
        Self {
            users,
            posts,
            delay: Duration::ZERO,
            offline: false,
            fetches: AtomicUsize::new(0),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn offline() -> Self {
        let mut store = Self::new(vec![], vec![]);
        store.offline = true;
        store
    }
}

#[async_trait]
impl DataSource for FakeStore {
    async fn fetch_users(&self) -> Result<Vec<UserRecord>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.offline {
            return Err(Error::DataStoreStatus {
                status: 503,
                url: "http://localhost:3000/users".to_string(),
            });
        }
        Ok(self.users.clone())
    }

    async fn fetch_posts(&self) -> Result<Vec<PostRecord>> {
        Ok(self.posts.clone())
    }
}

fn epoch() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-05-20T10:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn build(
    store: Arc<FakeStore>,
    storage: Arc<dyn KeyValueStore>,
    owner: Option<&str>,
) -> (QueryController, UnboundedReceiver<String>) {
    let (navigator, urls) = ChannelNavigator::new();
    let mut builder = QueryController::builder()
        .data_source(store)
        .clock(Arc::new(ManualClock::new(epoch())))
        .storage(storage)
        .navigator(Arc::new(navigator));
    if let Some(owner) = owner {
        builder = builder.owner_id(owner);
    }
    (builder.build().unwrap(), urls)
}

async fn wait_loaded(controller: &QueryController) -> SearchState {
    controller
        .subscribe()
        .wait_for(|s| s.phase == SearchPhase::Loaded)
        .await
        .unwrap()
        .clone()
}

fn john_and_jane() -> FakeStore {
    FakeStore::new(
        vec![
            UserRecord::new("1", "John Doe", "john@example.com"),
            UserRecord::new("2", "Jane", "jane@example.com"),
        ],
        vec![PostRecord::new("10", "2", "Hello World", "Hi everyone").with_created_at("2024-01-01")],
    )
}

#[tokio::test(start_paused = true)]
async fn test_john_query_finds_one_prefix_user() {
    let (controller, _urls) = build(Arc::new(john_and_jane()), Arc::new(MemoryStore::new()), None);

    controller.search("john");
    let state = wait_loaded(&controller).await;

    assert_eq!(state.results.users.len(), 1);
    assert_eq!(state.results.users[0].id, "1");
    assert_eq!(state.results.users[0].match_kind, MatchKind::Prefix);
    assert!(state.results.posts.is_empty());
    assert_eq!(state.results.total, 1);
}

#[tokio::test(start_paused = true)]
async fn test_empty_query_resets_regardless_of_prior_state() {
    let (controller, _urls) = build(Arc::new(john_and_jane()), Arc::new(MemoryStore::new()), None);

    controller.search("hello");
    let state = wait_loaded(&controller).await;
    assert_eq!(state.results.total, 1);
    assert_eq!(state.results.posts[0].subtitle, "Jane • 1/1/2024");

    controller.search("");
    let state = controller.state();
    assert_eq!(state.results, SearchResultSet::empty());
    assert!(!state.dropdown_open);
    assert_eq!(state.selected, None);
    assert_eq!(state.phase, SearchPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_ten_test_users_capped_in_index_order() {
    let users = (0..10)
        .map(|n| UserRecord::new(format!("user-{n}"), format!("Test User {n}"), format!("user{n}@test.com")))
        .collect();
    let (controller, _urls) = build(
        Arc::new(FakeStore::new(users, vec![])),
        Arc::new(MemoryStore::new()),
        None,
    );

    controller.search("test");
    let state = wait_loaded(&controller).await;

    let ids: Vec<_> = state.results.users.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["user-0", "user-1", "user-2", "user-3", "user-4"]);
    assert!(
        state
            .results
            .users
            .iter()
            .all(|r| matches!(r.match_kind, MatchKind::Prefix | MatchKind::Contains))
    );
}

#[tokio::test(start_paused = true)]
async fn test_rapid_keystrokes_rank_once() {
    let store = Arc::new(john_and_jane());
    let (controller, _urls) = build(Arc::clone(&store), Arc::new(MemoryStore::new()), None);

    controller.search("j");
    tokio::time::sleep(Duration::from_millis(100)).await;
    controller.search("jo");
    tokio::time::sleep(Duration::from_millis(100)).await;
    controller.search("joh");

    let state = wait_loaded(&controller).await;
    assert_eq!(state.query, "joh");
    assert_eq!(controller.searches_executed(), 1);
    assert_eq!(store.fetches.load(Ordering::SeqCst), 1);
    assert_eq!(state.results.users[0].id, "1");
}

#[tokio::test(start_paused = true)]
async fn test_superseded_query_never_publishes() {
    let store = Arc::new(john_and_jane().with_delay(Duration::from_secs(1)));
    let (controller, _urls) = build(Arc::clone(&store), Arc::new(MemoryStore::new()), None);
    let mut states = controller.subscribe();

    controller.search("jane");
    // Past the debounce window: the "jane" lookup is now waiting on the store.
    tokio::time::sleep(Duration::from_millis(350)).await;
    controller.search("hello");

    let state = wait_loaded(&controller).await;
    assert_eq!(state.query, "hello");
    assert_eq!(state.results.posts.len(), 1);
    assert!(state.results.users.is_empty());
    assert_eq!(controller.searches_executed(), 1);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(controller.state().query, "hello");
    assert!(states.has_changed().unwrap());
    let latest = states.borrow_and_update().clone();
    assert_eq!(latest.results, state.results);
}

#[tokio::test(start_paused = true)]
async fn test_store_outage_degrades_to_no_results() {
    let store = Arc::new(FakeStore::offline());
    let (controller, _urls) = build(Arc::clone(&store), Arc::new(MemoryStore::new()), None);

    controller.search("anything");
    let state = wait_loaded(&controller).await;

    assert!(state.results.is_empty());
    assert!(!state.loading);
    assert!(state.dropdown_open);
}

#[tokio::test(start_paused = true)]
async fn test_store_outage_is_not_refetched_within_ttl() {
    let store = Arc::new(FakeStore::offline());
    let (controller, _urls) = build(Arc::clone(&store), Arc::new(MemoryStore::new()), None);

    for query in ["a", "ab", "abc"] {
        controller.search(query);
        let state = wait_loaded(&controller).await;
        assert_eq!(state.query, query);
        assert!(state.results.is_empty());
    }

    assert_eq!(controller.searches_executed(), 3);
    assert_eq!(store.fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_selection_records_query_then_navigates() {
    let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let (controller, mut urls) = build(Arc::new(john_and_jane()), Arc::clone(&storage), Some("u7"));

    controller.search("  Jane ");
    let state = wait_loaded(&controller).await;
    controller.select_result(&state.results.users[0]);

    assert_eq!(urls.recv().await.as_deref(), Some("/profile/2"));
    let state = controller.state();
    assert_eq!(state.recent, vec!["Jane"]);
    assert_eq!(state.query, "");
    assert_eq!(state.phase, SearchPhase::Idle);

    let stored = storage.get("recent_searches_u7").unwrap().unwrap();
    let stored: serde_json::Value = serde_json::from_str(&stored).unwrap();
    assert_eq!(stored[0]["text"], "Jane");
    assert_eq!(stored[0]["ownerId"], "u7");
}

#[tokio::test(start_paused = true)]
async fn test_recent_queries_keyboard_navigation() {
    let (controller, _urls) = build(Arc::new(john_and_jane()), Arc::new(MemoryStore::new()), None);
    for query in ["hello", "jane", "john"] {
        controller.add_to_recent(query);
    }
    assert_eq!(controller.state().recent, vec!["john", "jane", "hello"]);

    controller.focus();
    assert!(controller.handle_key(Key::ArrowUp));
    assert_eq!(controller.state().selected, Some(2));
    assert!(controller.handle_key(Key::ArrowDown));
    assert_eq!(controller.state().selected, Some(0));
    assert!(controller.handle_key(Key::Tab));
    assert_eq!(controller.state().selected, Some(1));

    assert!(controller.handle_key(Key::Enter));
    assert_eq!(controller.state().query, "jane");
    let state = wait_loaded(&controller).await;
    assert_eq!(state.results.users[0].id, "2");
    assert_eq!(state.results.users[0].match_kind, MatchKind::Exact);

    controller.clear_search();
    controller.focus();
    assert!(controller.handle_key(Key::Escape));
    assert!(!controller.state().dropdown_open);
}

#[tokio::test(start_paused = true)]
async fn test_recent_dedup_and_cap_through_controller() {
    let (controller, _urls) = build(Arc::new(john_and_jane()), Arc::new(MemoryStore::new()), None);

    let others = ["alpha", "beta", "gamma", "delta"];
    for i in 0..7 {
        controller.add_to_recent("rust");
        if let Some(other) = others.get(i) {
            controller.add_to_recent(other);
        }
    }

    let recent = controller.state().recent;
    assert_eq!(recent, vec!["rust", "delta", "gamma", "beta", "alpha"]);
    assert_eq!(recent.iter().filter(|q| *q == "rust").count(), 1);

    controller.clear_recent();
    assert!(controller.state().recent.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_recent_searches_survive_restart_on_disk() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(john_and_jane());

    {
        let storage: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(temp.path()));
        let (controller, _urls) = build(Arc::clone(&store), storage, Some("alice"));
        controller.add_to_recent("first");
        controller.add_to_recent("second");
    }

    let storage: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(temp.path()));
    let (alice, _urls) = build(Arc::clone(&store), Arc::clone(&storage), Some("alice"));
    assert_eq!(alice.state().recent, vec!["second", "first"]);

    let (guest, _urls) = build(store, storage, None);
    assert!(guest.state().recent.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_controllers_can_share_one_index() {
    let store = Arc::new(john_and_jane());
    let index = Arc::new(IndexCache::new(
        Arc::clone(&store) as Arc<dyn DataSource>,
        Arc::new(ManualClock::new(epoch())),
        Duration::from_secs(300),
    ));

    let mut controllers = Vec::new();
    for _ in 0..2 {
        let (navigator, _urls) = ChannelNavigator::new();
        let controller = QueryControllerBuilder::new()
            .index(Arc::clone(&index))
            .navigator(Arc::new(navigator))
            .build()
            .unwrap();
        controllers.push(controller);
    }

    controllers[0].search("john");
    wait_loaded(&controllers[0]).await;
    controllers[1].search("jane");
    wait_loaded(&controllers[1]).await;

    assert_eq!(store.fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_custom_search_config_applies() {
    let users = (0..4)
        .map(|n| UserRecord::new(format!("{n}"), "Kim", format!("kim{n}@example.com")))
        .collect();
    let (navigator, _urls) = ChannelNavigator::new();
    let controller = QueryController::builder()
        .search_config(SearchConfig {
            debounce_ms: 50,
            max_results_per_category: 2,
            ..SearchConfig::default()
        })
        .data_source(Arc::new(FakeStore::new(users, vec![])))
        .navigator(Arc::new(navigator))
        .build()
        .unwrap();

    controller.search("kim");
    tokio::time::sleep(Duration::from_millis(60)).await;
    let state = wait_loaded(&controller).await;
    assert_eq!(state.results.users.len(), 2);
    assert_eq!(state.results.total, 2);
}

#[test]
fn test_builder_from_default_config() {
    let temp = TempDir::new().unwrap();
    let mut config = Config::default();
    config
        .set("storage.data_dir", &temp.path().display().to_string())
        .unwrap();

    let (navigator, _urls) = ChannelNavigator::new();
    let controller = QueryControllerBuilder::from_config(&config)
        .unwrap()
        .navigator(Arc::new(navigator))
        .build()
        .unwrap();

    assert_eq!(controller.state().phase, SearchPhase::Idle);
    assert_eq!(controller.searches_executed(), 0);
}

#[test]
fn test_normalize_idempotent_over_mixed_scripts() {
    for text in ["Phở Bò", "ĐÀ NẴNG", "Zoë Saldaña", "  ", "Ünïcödé"] {
        let once = normalize(text);
        assert_eq!(normalize(&once), once);
    }
}
