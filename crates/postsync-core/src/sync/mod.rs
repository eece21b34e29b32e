//! Feed synchronization engine
//!
//! [`SyncEngine`] owns the in-memory post list and keeps it consistent with a
//! [`RemoteSource`] and a [`LocalStore`]:
//!
//! - `load` picks the remote or the local path from a connectivity check,
//!   merges locally saved likes into the remote page and persists the result
//! - `load_next_page` appends further remote pages, at most one in flight
//! - `toggle_like` flips a like in memory first and then persists it
//!
//! Observers subscribe to [`FeedEvent`]s instead of polling.

mod events;
mod merge;
mod pagination;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{broadcast, Mutex};

use crate::config::{EngineConfig, PageFailurePolicy};
use crate::connectivity::ConnectivityProbe;
use crate::error::{Error, Result};
use crate::models::{LocalPostRecord, Post, PostId};
use crate::remote::RemoteSource;
use crate::store::LocalStore;

pub use events::FeedEvent;
pub use merge::{merge_with_saved_likes, saved_likes, LikeIndex};
pub use pagination::should_load_more;

use events::EVENT_CAPACITY;
use pagination::PagingGuard;

const FIRST_PAGE: u32 = 1;

/// Where a load took its posts from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Remote,
    Local,
}

/// Result of a completed `load` or `refresh`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOutcome {
    pub source: LoadSource,
    /// Number of posts now in the list
    pub posts: usize,
    /// Whether the local store now mirrors the list
    pub persisted: bool,
}

/// Result of a pagination request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// The scroll position has not crossed the threshold
    BelowThreshold,
    /// Another page fetch is in flight; the request was dropped
    AlreadyPaging,
    /// The page was fetched and `added` new posts appended
    Appended { page: u32, added: usize },
    /// The list was replaced while the page was in flight; the page was discarded
    Superseded { page: u32 },
}

/// Result of a like toggle on a post present in the list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeToggle {
    /// Position of the post in the list
    pub index: usize,
    /// The like state after the flip
    pub is_liked: bool,
    /// Whether the local store recorded the new state
    pub persisted: bool,
}

#[derive(Debug)]
struct Feed {
    posts: Vec<Post>,
    /// Last page requested for the current list
    page: u32,
    /// Bumped whenever the list is replaced
    generation: u64,
    /// Toggles the store did not acknowledge, reapplied on the next merge
    unsynced: LikeIndex,
    last_error: Option<String>,
}

impl Feed {
    fn new() -> Self {
        Self {
            posts: Vec::new(),
            page: FIRST_PAGE,
            generation: 0,
            unsynced: LikeIndex::new(),
            last_error: None,
        }
    }

    fn replace(&mut self, posts: Vec<Post>) {
        self.posts = posts;
        self.page = FIRST_PAGE;
        self.generation += 1;
        self.last_error = None;
    }

    /// Append a page, skipping ids already listed. Returns how many were added.
    fn append(&mut self, page: Vec<Post>) -> usize {
        let mut known: HashSet<PostId> = self.posts.iter().map(|post| post.id).collect();
        let before = self.posts.len();
        for mut post in page {
            if !known.insert(post.id) {
                tracing::debug!("Skipping post {} already in the feed", post.id);
                continue;
            }
            post.is_liked = Some(false);
            self.posts.push(post);
        }
        self.posts.len() - before
    }
}

/// Keeps the post list in sync with a remote source and a local store
pub struct SyncEngine<R, S, P> {
    config: EngineConfig,
    remote: R,
    store: S,
    probe: P,
    feed: Mutex<Feed>,
    /// Serializes `load` and `refresh`
    load_gate: Mutex<()>,
    paging: AtomicBool,
    events: broadcast::Sender<FeedEvent>,
}

impl<R, S, P> SyncEngine<R, S, P>
where
    R: RemoteSource,
    S: LocalStore,
    P: ConnectivityProbe,
{
    /// Create an engine with an empty list and the page cursor at 1
    pub fn new(config: EngineConfig, remote: R, store: S, probe: P) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            config,
            remote,
            store,
            probe,
            feed: Mutex::new(Feed::new()),
            load_gate: Mutex::new(()),
            paging: AtomicBool::new(false),
            events,
        }
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub const fn remote(&self) -> &R {
        &self.remote
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Subscribe to loading and item change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.events.subscribe()
    }

    /// Snapshot of the current list
    pub async fn posts(&self) -> Vec<Post> {
        self.feed.lock().await.posts.clone()
    }

    /// The post at `index`, if any
    pub async fn post(&self, index: usize) -> Option<Post> {
        self.feed.lock().await.posts.get(index).cloned()
    }

    pub async fn len(&self) -> usize {
        self.feed.lock().await.posts.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.feed.lock().await.posts.is_empty()
    }

    /// Last page requested for the current list
    pub async fn current_page(&self) -> u32 {
        self.feed.lock().await.page
    }

    /// Whether a pagination fetch is in flight
    pub fn is_paging(&self) -> bool {
        self.paging.load(Ordering::Acquire)
    }

    /// Message of the most recent failure, cleared by a successful load
    pub async fn last_error(&self) -> Option<String> {
        self.feed.lock().await.last_error.clone()
    }

    /// Populate the list from the remote source when online, else from the
    /// local store.
    ///
    /// Fires `LoadingChanged(true)` on entry and `LoadingChanged(false)` on
    /// exit whatever the outcome. On error the list is left as it was.
    pub async fn load(&self) -> Result<LoadOutcome> {
        let _gate = self.load_gate.lock().await;
        self.emit(FeedEvent::LoadingChanged(true));

        let result = if self.probe.is_online().await {
            self.load_remote().await
        } else {
            tracing::info!("Offline, loading posts from the local store");
            self.load_local().await
        };

        match &result {
            Ok(outcome) => tracing::info!(
                "Loaded {} posts from {:?} (persisted: {})",
                outcome.posts,
                outcome.source,
                outcome.persisted
            ),
            Err(error) => {
                tracing::warn!("Feed load failed: {error}");
                self.feed.lock().await.last_error = Some(error.to_string());
            }
        }

        self.emit(FeedEvent::LoadingChanged(false));
        result
    }

    /// Reload from the first page.
    ///
    /// The current list stays visible until the reload replaces it. A page
    /// still in flight when the list is replaced is discarded; if the reload
    /// fails, that page is appended to the list that was kept.
    pub async fn refresh(&self) -> Result<LoadOutcome> {
        self.load().await
    }

    async fn load_remote(&self) -> Result<LoadOutcome> {
        let page = self.fetch_page(FIRST_PAGE).await?;

        // Held from the snapshot read through the bulk save so a toggle
        // cannot persist in between and be overwritten
        let mut feed = self.feed.lock().await;
        let snapshot = self.store.fetch_all().await?;
        let saved = saved_likes(&snapshot);
        let merged = merge_with_saved_likes(page, &saved, &feed.unsynced);
        let records: Vec<LocalPostRecord> = merged.iter().map(LocalPostRecord::from).collect();
        feed.replace(merged);

        let persisted = match self.store.replace_all(&records).await {
            Ok(()) => {
                feed.unsynced
                    .retain(|id, _| !records.iter().any(|record| record.id == *id));
                true
            }
            Err(error) => {
                tracing::warn!("Failed to persist feed snapshot: {error}");
                feed.last_error = Some(error.to_string());
                false
            }
        };

        Ok(LoadOutcome {
            source: LoadSource::Remote,
            posts: feed.posts.len(),
            persisted,
        })
    }

    async fn load_local(&self) -> Result<LoadOutcome> {
        let mut feed = self.feed.lock().await;
        let snapshot = self.store.fetch_all().await?;
        let mut seen = HashSet::with_capacity(snapshot.len());
        let posts: Vec<Post> = snapshot
            .into_iter()
            .filter(|record| seen.insert(record.id))
            .map(Post::from)
            .collect();
        feed.replace(posts);

        Ok(LoadOutcome {
            source: LoadSource::Local,
            posts: feed.posts.len(),
            persisted: true,
        })
    }

    /// Request the next page if the scroll position has crossed the threshold
    pub async fn load_next_page_if_needed(
        &self,
        scroll_offset: f64,
        content_height: f64,
        viewport_height: f64,
    ) -> Result<PageOutcome> {
        if !should_load_more(
            scroll_offset,
            content_height,
            viewport_height,
            self.config.lookahead,
        ) {
            return Ok(PageOutcome::BelowThreshold);
        }
        self.load_next_page().await
    }

    /// Fetch the next remote page and append it.
    ///
    /// Only one page fetch runs at a time; concurrent calls return
    /// [`PageOutcome::AlreadyPaging`]. Appended posts are not merged with
    /// saved likes and start out not liked.
    pub async fn load_next_page(&self) -> Result<PageOutcome> {
        let Some(_guard) = PagingGuard::try_acquire(&self.paging) else {
            tracing::debug!("Page fetch already in flight, ignoring request");
            return Ok(PageOutcome::AlreadyPaging);
        };

        let (page, generation) = {
            let mut feed = self.feed.lock().await;
            feed.page += 1;
            (feed.page, feed.generation)
        };
        tracing::debug!("Fetching page {page}");

        let fetched = match self.fetch_page(page).await {
            Ok(posts) => posts,
            Err(error) => {
                tracing::warn!("Failed to fetch page {page}: {error}");
                let mut feed = self.feed.lock().await;
                if self.config.page_failure_policy == PageFailurePolicy::Retry
                    && feed.generation == generation
                    && feed.page == page
                {
                    feed.page -= 1;
                }
                feed.last_error = Some(error.to_string());
                return Err(error);
            }
        };

        let mut feed = self.feed.lock().await;
        if feed.generation != generation {
            tracing::debug!("Feed replaced while page {page} was in flight, dropping it");
            return Ok(PageOutcome::Superseded { page });
        }
        let added = feed.append(fetched);
        drop(feed);

        self.emit(FeedEvent::LoadingChanged(false));
        Ok(PageOutcome::Appended { page, added })
    }

    /// Flip the like state of the post with `id` and persist it.
    ///
    /// The in-memory flip and its `ItemChanged` event happen before the store
    /// is touched and are kept even if persistence fails. The feed stays
    /// locked until the store write finishes, so a subscriber reading the
    /// post in response to `ItemChanged` waits for persistence. Returns `None`
    /// when no listed post has `id`.
    pub async fn toggle_like(&self, id: PostId) -> Option<LikeToggle> {
        let mut feed = self.feed.lock().await;
        let index = feed.posts.iter().position(|post| post.id == id)?;
        let post = &mut feed.posts[index];
        let is_liked = post.toggle_like();
        let record = LocalPostRecord::from(&*post);
        self.emit(FeedEvent::ItemChanged(index));

        let persisted = match self.persist_like(&record).await {
            Ok(()) => {
                feed.unsynced.remove(&id);
                true
            }
            Err(error) => {
                tracing::warn!("Like on post {id} not persisted: {error}");
                feed.unsynced.insert(id, is_liked);
                feed.last_error = Some(error.to_string());
                false
            }
        };

        Some(LikeToggle {
            index,
            is_liked,
            persisted,
        })
    }

    async fn persist_like(&self, record: &LocalPostRecord) -> Result<()> {
        if self.store.set_liked(record.id, record.is_liked).await? {
            return Ok(());
        }
        if self.config.persist_unsynced_likes {
            tracing::debug!("Post {} has no stored row, inserting it", record.id);
            return self.store.upsert_one(record).await;
        }
        Err(Error::NotPersisted(record.id))
    }

    async fn fetch_page(&self, page: u32) -> Result<Vec<Post>> {
        tokio::time::timeout(
            self.config.fetch_timeout,
            self.remote.fetch_page(page, self.config.page_size),
        )
        .await
        .map_err(|_| Error::Timeout(self.config.fetch_timeout))?
    }

    fn emit(&self, event: FeedEvent) {
        // No subscribers is fine
        self.events.send(event).ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::FixedConnectivity;
    use crate::store::MemoryPostStore;
    use pretty_assertions::assert_eq;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;
    use tokio::sync::broadcast::error::TryRecvError;
    use tokio::sync::Notify;

    /// Serves scripted pages; one page can be held at a gate until notified
    #[derive(Default)]
    struct FakeRemote {
        pages: std::sync::Mutex<HashMap<u32, Vec<Post>>>,
        failing: std::sync::Mutex<HashSet<u32>>,
        calls: std::sync::Mutex<Vec<u32>>,
        gated_page: AtomicU32,
        gate: Notify,
        hang: AtomicBool,
    }

    impl FakeRemote {
        fn with_pages(pages: Vec<(u32, Vec<Post>)>) -> Self {
            Self {
                pages: std::sync::Mutex::new(pages.into_iter().collect()),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<u32> {
            self.calls.lock().unwrap().clone()
        }

        fn fail_page(&self, page: u32, failing: bool) {
            let mut set = self.failing.lock().unwrap();
            if failing {
                set.insert(page);
            } else {
                set.remove(&page);
            }
        }

        fn set_page(&self, page: u32, posts: Vec<Post>) {
            self.pages.lock().unwrap().insert(page, posts);
        }

        fn hold_page(&self, page: u32) {
            self.gated_page.store(page, Ordering::SeqCst);
        }
    }

    impl RemoteSource for FakeRemote {
        async fn fetch_page(&self, page: u32, _page_size: u32) -> Result<Vec<Post>> {
            self.calls.lock().unwrap().push(page);
            if self.gated_page.load(Ordering::SeqCst) == page {
                self.gate.notified().await;
            }
            if self.hang.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            if self.failing.lock().unwrap().contains(&page) {
                return Err(Error::Transport(format!("page {page} unavailable")));
            }
            Ok(self
                .pages
                .lock()
                .unwrap()
                .get(&page)
                .cloned()
                .unwrap_or_default())
        }
    }

    /// Memory store whose writes can be made to fail
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryPostStore,
        fail_writes: AtomicBool,
    }

    impl FlakyStore {
        fn check(&self) -> Result<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(Error::Persistence("disk full".to_string()));
            }
            Ok(())
        }
    }

    impl LocalStore for FlakyStore {
        async fn replace_all(&self, records: &[LocalPostRecord]) -> Result<()> {
            self.check()?;
            self.inner.replace_all(records).await
        }

        async fn upsert_one(&self, record: &LocalPostRecord) -> Result<()> {
            self.check()?;
            self.inner.upsert_one(record).await
        }

        async fn set_liked(&self, id: PostId, is_liked: bool) -> Result<bool> {
            self.check()?;
            self.inner.set_liked(id, is_liked).await
        }

        async fn fetch_all(&self) -> Result<Vec<LocalPostRecord>> {
            self.inner.fetch_all().await
        }
    }

    /// Memory store whose `fetch_all` can be held after it has read its rows
    #[derive(Default)]
    struct GatedStore {
        inner: MemoryPostStore,
        hold_reads: AtomicBool,
        reading: AtomicBool,
        gate: Notify,
    }

    impl LocalStore for GatedStore {
        async fn replace_all(&self, records: &[LocalPostRecord]) -> Result<()> {
            self.inner.replace_all(records).await
        }

        async fn upsert_one(&self, record: &LocalPostRecord) -> Result<()> {
            self.inner.upsert_one(record).await
        }

        async fn set_liked(&self, id: PostId, is_liked: bool) -> Result<bool> {
            self.inner.set_liked(id, is_liked).await
        }

        async fn fetch_all(&self) -> Result<Vec<LocalPostRecord>> {
            let snapshot = self.inner.fetch_all().await?;
            if self.hold_reads.load(Ordering::SeqCst) {
                self.reading.store(true, Ordering::SeqCst);
                self.gate.notified().await;
            }
            Ok(snapshot)
        }
    }

    fn post(id: i64) -> Post {
        Post::new(id, 1, &format!("title {id}"), &format!("body {id}"))
    }

    fn posts(ids: std::ops::RangeInclusive<i64>) -> Vec<Post> {
        ids.map(post).collect()
    }

    fn record(id: i64, is_liked: bool) -> LocalPostRecord {
        LocalPostRecord {
            id: PostId::new(id),
            user_id: 1,
            title: Some(format!("stored {id}")),
            body: None,
            is_liked,
        }
    }

    fn likes(list: &[Post]) -> Vec<(i64, Option<bool>)> {
        list.iter().map(|p| (p.id.get(), p.is_liked)).collect()
    }

    fn drain(rx: &mut broadcast::Receiver<FeedEvent>) -> Vec<FeedEvent> {
        let mut events = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty | TryRecvError::Closed) => return events,
                Err(TryRecvError::Lagged(_)) => {}
            }
        }
    }

    fn online_engine(
        remote: FakeRemote,
        store: MemoryPostStore,
    ) -> SyncEngine<FakeRemote, MemoryPostStore, FixedConnectivity> {
        SyncEngine::new(
            EngineConfig::default(),
            remote,
            store,
            FixedConnectivity::online(),
        )
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_offline_load_uses_store_without_fetching() {
        let store = MemoryPostStore::with_records(vec![record(3, true), record(1, false)]);
        let engine = SyncEngine::new(
            EngineConfig::default(),
            FakeRemote::with_pages(vec![(1, posts(1..=2))]),
            store,
            FixedConnectivity::offline(),
        );

        let outcome = engine.load().await.unwrap();

        assert_eq!(outcome.source, LoadSource::Local);
        assert!(engine.remote().calls().is_empty());
        let list = engine.posts().await;
        assert_eq!(likes(&list), vec![(3, Some(true)), (1, Some(false))]);
        assert_eq!(list[0].title, "stored 3");
        assert_eq!(list[0].body, "");
        assert_eq!(engine.store().fetch_all().await.unwrap().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_online_load_merges_and_replaces_snapshot() {
        let store = MemoryPostStore::with_records(vec![record(2, true), record(50, true)]);
        let engine = online_engine(FakeRemote::with_pages(vec![(1, posts(1..=3))]), store);

        let outcome = engine.load().await.unwrap();

        assert_eq!(
            outcome,
            LoadOutcome {
                source: LoadSource::Remote,
                posts: 3,
                persisted: true
            }
        );
        assert_eq!(
            likes(&engine.posts().await),
            vec![(1, Some(false)), (2, Some(true)), (3, Some(false))]
        );
        // Local-only row 50 is gone after the snapshot replace
        let stored: Vec<i64> = engine
            .store()
            .fetch_all()
            .await
            .unwrap()
            .iter()
            .map(|r| r.id.get())
            .collect();
        assert_eq!(stored, vec![1, 2, 3]);
        assert_eq!(engine.current_page().await, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_load_emits_loading_events() {
        let engine = online_engine(
            FakeRemote::with_pages(vec![(1, posts(1..=2))]),
            MemoryPostStore::new(),
        );
        let mut rx = engine.subscribe();

        engine.load().await.unwrap();

        assert_eq!(
            drain(&mut rx),
            vec![FeedEvent::LoadingChanged(true), FeedEvent::LoadingChanged(false)]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_refresh_preserves_likes() {
        let engine = online_engine(
            FakeRemote::with_pages(vec![(1, posts(1..=5))]),
            MemoryPostStore::new(),
        );
        engine.load().await.unwrap();

        let toggle = engine.toggle_like(PostId::new(4)).await.unwrap();
        assert!(toggle.persisted);

        engine.refresh().await.unwrap();
        let list = engine.posts().await;
        assert_eq!(list[3].is_liked, Some(true));
        assert!(list.iter().filter(|p| p.id != PostId::new(4)).all(|p| !p.liked()));

        // A second refresh merges to the same result
        engine.refresh().await.unwrap();
        assert_eq!(engine.posts().await, list);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failed_load_keeps_list_and_reports() {
        let engine = online_engine(
            FakeRemote::with_pages(vec![(1, posts(1..=3))]),
            MemoryPostStore::new(),
        );
        engine.load().await.unwrap();
        let before = engine.posts().await;

        engine.remote().fail_page(1, true);
        let mut rx = engine.subscribe();
        let err = engine.refresh().await.unwrap_err();

        assert!(matches!(err, Error::Transport(_)));
        assert_eq!(engine.posts().await, before);
        assert!(engine.last_error().await.is_some());
        assert_eq!(
            drain(&mut rx),
            vec![FeedEvent::LoadingChanged(true), FeedEvent::LoadingChanged(false)]
        );

        engine.remote().fail_page(1, false);
        engine.refresh().await.unwrap();
        assert_eq!(engine.last_error().await, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_persist_failure_keeps_new_list() {
        let store = FlakyStore::default();
        store.fail_writes.store(true, Ordering::SeqCst);
        let engine = SyncEngine::new(
            EngineConfig::default(),
            FakeRemote::with_pages(vec![(1, posts(1..=2))]),
            store,
            FixedConnectivity::online(),
        );

        let outcome = engine.load().await.unwrap();

        assert!(!outcome.persisted);
        assert_eq!(engine.len().await, 2);
        assert!(engine.store().inner.fetch_all().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_toggle_like_emits_item_changed() {
        let engine = online_engine(
            FakeRemote::with_pages(vec![(1, posts(1..=3))]),
            MemoryPostStore::new(),
        );
        engine.load().await.unwrap();
        let mut rx = engine.subscribe();

        let toggle = engine.toggle_like(PostId::new(3)).await.unwrap();

        assert_eq!(
            toggle,
            LikeToggle {
                index: 2,
                is_liked: true,
                persisted: true
            }
        );
        assert_eq!(drain(&mut rx), vec![FeedEvent::ItemChanged(2)]);
        assert_eq!(engine.store().liked(PostId::new(3)).await, Some(true));

        let toggle = engine.toggle_like(PostId::new(3)).await.unwrap();
        assert!(!toggle.is_liked);
        assert_eq!(engine.store().liked(PostId::new(3)).await, Some(false));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_toggle_unknown_id_is_noop() {
        let engine = online_engine(
            FakeRemote::with_pages(vec![(1, posts(1..=2))]),
            MemoryPostStore::new(),
        );
        engine.load().await.unwrap();
        let mut rx = engine.subscribe();

        assert_eq!(engine.toggle_like(PostId::new(99)).await, None);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_like_on_unstored_post_carried_to_next_refresh() {
        let engine = online_engine(
            FakeRemote::with_pages(vec![(1, posts(1..=2)), (2, posts(3..=4))]),
            MemoryPostStore::new(),
        );
        engine.load().await.unwrap();
        engine.load_next_page().await.unwrap();

        // Post 3 came from pagination, so the store has no row for it
        let toggle = engine.toggle_like(PostId::new(3)).await.unwrap();
        assert!(toggle.is_liked);
        assert!(!toggle.persisted);
        assert_eq!(engine.post(2).await.unwrap().is_liked, Some(true));
        assert_eq!(engine.store().liked(PostId::new(3)).await, None);
        assert!(engine.last_error().await.is_some());

        // The first page now includes post 3; the refresh reconciles the like
        engine.remote().set_page(1, posts(1..=3));
        engine.refresh().await.unwrap();
        assert_eq!(engine.post(2).await.unwrap().is_liked, Some(true));
        assert_eq!(engine.store().liked(PostId::new(3)).await, Some(true));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_persist_unsynced_likes_inserts_row() {
        let engine = SyncEngine::new(
            EngineConfig::default().with_persist_unsynced_likes(true),
            FakeRemote::with_pages(vec![(1, posts(1..=2)), (2, posts(3..=4))]),
            MemoryPostStore::new(),
            FixedConnectivity::online(),
        );
        engine.load().await.unwrap();
        engine.load_next_page().await.unwrap();

        let toggle = engine.toggle_like(PostId::new(4)).await.unwrap();

        assert!(toggle.persisted);
        assert_eq!(engine.store().liked(PostId::new(4)).await, Some(true));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_pagination_appends_without_merge() {
        let store = MemoryPostStore::with_records(vec![record(3, true)]);
        let engine = online_engine(
            FakeRemote::with_pages(vec![(1, posts(1..=2)), (2, posts(3..=4))]),
            store,
        );
        engine.load().await.unwrap();
        let mut rx = engine.subscribe();

        let outcome = engine.load_next_page().await.unwrap();

        assert_eq!(outcome, PageOutcome::Appended { page: 2, added: 2 });
        assert_eq!(
            likes(&engine.posts().await),
            vec![
                (1, Some(false)),
                (2, Some(false)),
                (3, Some(false)),
                (4, Some(false))
            ]
        );
        assert_eq!(drain(&mut rx), vec![FeedEvent::LoadingChanged(false)]);
        assert_eq!(engine.current_page().await, 2);
        assert!(!engine.is_paging());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_pagination_skips_listed_ids() {
        let engine = online_engine(
            FakeRemote::with_pages(vec![(1, posts(1..=3)), (2, posts(3..=5))]),
            MemoryPostStore::new(),
        );
        engine.load().await.unwrap();

        let outcome = engine.load_next_page().await.unwrap();

        assert_eq!(outcome, PageOutcome::Appended { page: 2, added: 2 });
        assert_eq!(engine.len().await, 5);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_threshold_gates_pagination() {
        let engine = online_engine(
            FakeRemote::with_pages(vec![(1, posts(1..=10)), (2, posts(11..=20))]),
            MemoryPostStore::new(),
        );
        engine.load().await.unwrap();

        let outcome = engine
            .load_next_page_if_needed(449.0, 1000.0, 500.0)
            .await
            .unwrap();
        assert_eq!(outcome, PageOutcome::BelowThreshold);
        assert_eq!(engine.remote().calls(), vec![1]);

        let outcome = engine
            .load_next_page_if_needed(451.0, 1000.0, 500.0)
            .await
            .unwrap();
        assert_eq!(outcome, PageOutcome::Appended { page: 2, added: 10 });
        assert_eq!(engine.remote().calls(), vec![1, 2]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_page_requests_fetch_once() {
        let engine = online_engine(
            FakeRemote::with_pages(vec![(1, posts(1..=10)), (2, posts(11..=20))]),
            MemoryPostStore::new(),
        );
        engine.load().await.unwrap();
        engine.remote().hold_page(2);

        let (first, second) = tokio::join!(
            engine.load_next_page_if_needed(451.0, 1000.0, 500.0),
            async {
                while !engine.is_paging() {
                    tokio::task::yield_now().await;
                }
                let outcome = engine.load_next_page_if_needed(460.0, 1000.0, 500.0).await;
                engine.remote().gate.notify_one();
                outcome
            }
        );

        assert_eq!(first.unwrap(), PageOutcome::Appended { page: 2, added: 10 });
        assert_eq!(second.unwrap(), PageOutcome::AlreadyPaging);
        assert_eq!(engine.remote().calls(), vec![1, 2]);
        assert_eq!(engine.len().await, 20);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failed_page_advances_cursor_by_default() {
        let engine = online_engine(
            FakeRemote::with_pages(vec![(1, posts(1..=2)), (3, posts(5..=6))]),
            MemoryPostStore::new(),
        );
        engine.load().await.unwrap();
        engine.remote().fail_page(2, true);

        assert!(engine.load_next_page().await.is_err());
        assert!(!engine.is_paging());
        assert_eq!(engine.current_page().await, 2);

        let outcome = engine.load_next_page().await.unwrap();
        assert_eq!(outcome, PageOutcome::Appended { page: 3, added: 2 });
        assert_eq!(engine.remote().calls(), vec![1, 2, 3]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failed_page_retried_under_retry_policy() {
        let engine = SyncEngine::new(
            EngineConfig::default().with_page_failure_policy(PageFailurePolicy::Retry),
            FakeRemote::with_pages(vec![(1, posts(1..=2)), (2, posts(3..=4))]),
            MemoryPostStore::new(),
            FixedConnectivity::online(),
        );
        engine.load().await.unwrap();
        engine.remote().fail_page(2, true);

        assert!(engine.load_next_page().await.is_err());
        assert_eq!(engine.current_page().await, 1);

        engine.remote().fail_page(2, false);
        let outcome = engine.load_next_page().await.unwrap();
        assert_eq!(outcome, PageOutcome::Appended { page: 2, added: 2 });
        assert_eq!(engine.remote().calls(), vec![1, 2, 2]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_page_timeout_releases_paging_flag() {
        let engine = SyncEngine::new(
            EngineConfig::default().with_fetch_timeout(Duration::from_millis(50)),
            FakeRemote::with_pages(vec![(1, posts(1..=2)), (2, posts(3..=4))]),
            MemoryPostStore::new(),
            FixedConnectivity::online(),
        );
        engine.load().await.unwrap();

        engine.remote().hang.store(true, Ordering::SeqCst);
        let err = engine.load_next_page().await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
        assert!(!engine.is_paging());

        engine.remote().hang.store(false, Ordering::SeqCst);
        assert!(matches!(
            engine.load_next_page().await.unwrap(),
            PageOutcome::Appended { .. }
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_cancelled_page_fetch_releases_paging_flag() {
        let engine = online_engine(
            FakeRemote::with_pages(vec![(1, posts(1..=2)), (2, posts(3..=4))]),
            MemoryPostStore::new(),
        );
        engine.load().await.unwrap();
        engine.remote().hold_page(2);

        let cancelled =
            tokio::time::timeout(Duration::from_millis(20), engine.load_next_page()).await;
        assert!(cancelled.is_err());
        assert!(!engine.is_paging());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_refresh_supersedes_in_flight_page() {
        let engine = online_engine(
            FakeRemote::with_pages(vec![(1, posts(1..=2)), (2, posts(3..=4))]),
            MemoryPostStore::new(),
        );
        engine.load().await.unwrap();
        engine.remote().hold_page(2);

        let (page, refresh) = tokio::join!(engine.load_next_page(), async {
            while !engine.is_paging() {
                tokio::task::yield_now().await;
            }
            let outcome = engine.refresh().await;
            engine.remote().gate.notify_one();
            outcome
        });

        assert_eq!(page.unwrap(), PageOutcome::Superseded { page: 2 });
        assert_eq!(refresh.unwrap().posts, 2);
        assert_eq!(
            likes(&engine.posts().await),
            vec![(1, Some(false)), (2, Some(false))]
        );
        assert_eq!(engine.current_page().await, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_like_survives_restart() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("posts.db");

        {
            let db = crate::db::Database::open(&path).await.unwrap();
            let engine = SyncEngine::new(
                EngineConfig::default(),
                FakeRemote::with_pages(vec![(1, posts(1..=3))]),
                db.post_store(),
                FixedConnectivity::online(),
            );
            engine.load().await.unwrap();
            assert!(engine.toggle_like(PostId::new(2)).await.unwrap().persisted);
        }

        let db = crate::db::Database::open(&path).await.unwrap();
        let offline = SyncEngine::new(
            EngineConfig::default(),
            FakeRemote::default(),
            db.post_store(),
            FixedConnectivity::offline(),
        );
        offline.load().await.unwrap();
        assert_eq!(
            likes(&offline.posts().await),
            vec![(1, Some(false)), (2, Some(true)), (3, Some(false))]
        );

        let online = SyncEngine::new(
            EngineConfig::default(),
            FakeRemote::with_pages(vec![(1, posts(2..=4))]),
            db.post_store(),
            FixedConnectivity::online(),
        );
        online.load().await.unwrap();
        assert_eq!(
            likes(&online.posts().await),
            vec![(2, Some(true)), (3, Some(false)), (4, Some(false))]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_toggle_during_refresh_is_not_overwritten() {
        let engine = SyncEngine::new(
            EngineConfig::default(),
            FakeRemote::with_pages(vec![(1, posts(1..=3))]),
            GatedStore::default(),
            FixedConnectivity::online(),
        );
        engine.load().await.unwrap();
        engine.store().hold_reads.store(true, Ordering::SeqCst);

        let (refresh, toggle) = tokio::join!(engine.refresh(), async {
            // Refresh has read the snapshot and is parked before merging
            while !engine.store().reading.load(Ordering::SeqCst) {
                tokio::task::yield_now().await;
            }
            let (toggle, ()) = tokio::join!(engine.toggle_like(PostId::new(1)), async {
                for _ in 0..10 {
                    tokio::task::yield_now().await;
                }
                engine.store().gate.notify_one();
            });
            toggle
        });

        refresh.unwrap();
        let toggle = toggle.unwrap();
        assert!(toggle.is_liked);
        assert!(toggle.persisted);
        assert_eq!(engine.post(0).await.unwrap().is_liked, Some(true));
        assert_eq!(engine.store().inner.liked(PostId::new(1)).await, Some(true));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failed_refresh_keeps_in_flight_page() {
        let engine = online_engine(
            FakeRemote::with_pages(vec![(1, posts(1..=2)), (2, posts(3..=4))]),
            MemoryPostStore::new(),
        );
        engine.load().await.unwrap();
        engine.remote().fail_page(1, true);
        engine.remote().hold_page(2);

        let (page, refresh) = tokio::join!(engine.load_next_page(), async {
            while !engine.is_paging() {
                tokio::task::yield_now().await;
            }
            let outcome = engine.refresh().await;
            engine.remote().gate.notify_one();
            outcome
        });

        assert!(refresh.is_err());
        assert_eq!(page.unwrap(), PageOutcome::Appended { page: 2, added: 2 });
        let ids: Vec<i64> = engine.posts().await.iter().map(|p| p.id.get()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert_eq!(engine.current_page().await, 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_item_changed_reader_sees_persisted_like() {
        let engine = online_engine(
            FakeRemote::with_pages(vec![(1, posts(1..=3))]),
            MemoryPostStore::new(),
        );
        engine.load().await.unwrap();
        let mut rx = engine.subscribe();

        let (seen, toggle) = tokio::join!(
            async {
                let Ok(FeedEvent::ItemChanged(index)) = rx.recv().await else {
                    panic!("expected an item change");
                };
                let post = engine.post(index).await.unwrap();
                (post.is_liked, engine.store().liked(PostId::new(2)).await)
            },
            engine.toggle_like(PostId::new(2))
        );

        assert!(toggle.unwrap().persisted);
        assert_eq!(seen, (Some(true), Some(true)));
    }
}
