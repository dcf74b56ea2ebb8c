//! Full session lifecycle against in-memory collaborators: open, like,
//! background reorder, apply on navigation or idle timeout, degradation on
//! upstream failure, registry lifecycle.

use async_trait::async_trait;
use chrono::Utc;
use tokio_test::assert_ok;
use feed_personalization::services::session::SessionPhase;
use feed_personalization::services::SessionError;
use feed_personalization::{
    Config, ContentProvider, FeedSession, LikeHistoryProvider, LikeStatus, LikeToggler, MediaKind,
    Post, SessionRegistry,
};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn post(id: &str, category: &str, subcategory: Option<&str>) -> Post {
    Post {
        id: id.to_string(),
        category: category.to_string(),
        subcategory: subcategory.map(str::to_string),
        author_id: None,
        like_count: 0,
        comment_count: 0,
        media_url: format!("https://cdn.example/{id}.mp4"),
        media_kind: MediaKind::Video,
        created_at: Utc::now(),
    }
}

fn pool() -> Vec<Post> {
    vec![
        post("t1", "tech", Some("phones")),
        post("t2", "tech", None),
        post("t3", "tech", Some("laptops")),
        post("b1", "beauty", None),
        post("b2", "beauty", Some("skincare")),
        post("f1", "fashion", None),
    ]
}

/// In-memory stand-in for the document store collaborators.
struct FakeBackend {
    posts: Mutex<Vec<Post>>,
    liked: Mutex<Vec<Post>>,
    fail_fetches: AtomicBool,
}

impl FakeBackend {
    fn new(posts: Vec<Post>, liked: Vec<Post>) -> Arc<Self> {
        Arc::new(Self {
            posts: Mutex::new(posts),
            liked: Mutex::new(liked),
            fail_fetches: AtomicBool::new(false),
        })
    }

    fn set_failing(&self, failing: bool) {
        self.fail_fetches.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl ContentProvider for FakeBackend {
    async fn all_posts(&self) -> anyhow::Result<Vec<Post>> {
        if self.fail_fetches.load(Ordering::SeqCst) {
            anyhow::bail!("content store unavailable");
        }
        Ok(self.posts.lock().unwrap().clone())
    }
}

#[async_trait]
impl LikeHistoryProvider for FakeBackend {
    async fn liked_posts(&self, _user_id: Uuid) -> anyhow::Result<Vec<Post>> {
        if self.fail_fetches.load(Ordering::SeqCst) {
            anyhow::bail!("like store unavailable");
        }
        Ok(self.liked.lock().unwrap().clone())
    }
}

#[async_trait]
impl LikeToggler for FakeBackend {
    async fn like_or_dislike(
        &self,
        post_id: &str,
        currently_liked: bool,
    ) -> anyhow::Result<LikeStatus> {
        let posts = self.posts.lock().unwrap();
        let found = posts.iter().any(|post| post.id == post_id);
        anyhow::ensure!(found, "unknown post {post_id}");
        Ok(LikeStatus {
            count: u32::from(!currently_liked),
            has_liked: !currently_liked,
        })
    }
}

fn config() -> Config {
    let mut config = Config::default();
    config.ranking.rng_seed = Some(41);
    config.ranking.batch_size = 3;
    config
}

async fn open_session(backend: &Arc<FakeBackend>) -> FeedSession {
    FeedSession::open(
        Uuid::new_v4(),
        Arc::clone(backend) as Arc<dyn ContentProvider>,
        Arc::clone(backend) as Arc<dyn LikeHistoryProvider>,
        Arc::clone(backend) as Arc<dyn LikeToggler>,
        config(),
    )
    .await
    .expect("session must open against a healthy backend")
}

async fn wait_for_phase(session: &FeedSession, phase: SessionPhase) {
    for _ in 0..500 {
        if session.phase().await == phase {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("session never reached {phase:?}");
}

fn ids(posts: &[Post]) -> BTreeSet<String> {
    posts.iter().map(|post| post.id.clone()).collect()
}

#[tokio::test]
async fn session_personalizes_on_open_with_history() {
    init_tracing();
    let backend = FakeBackend::new(pool(), vec![post("t1", "tech", Some("phones"))]);
    let session = open_session(&backend).await;

    wait_for_phase(&session, SessionPhase::Ready).await;

    let snapshot = session.feed_snapshot().await;
    assert_eq!(ids(&snapshot), ids(&pool()));
    // All like weight sits on tech; tech fills the first (three-slot) batch.
    assert!(snapshot[..3].iter().all(|post| post.category == "tech"));
}

#[tokio::test]
async fn like_parks_reorder_and_navigation_applies_it() {
    init_tracing();
    let backend = FakeBackend::new(pool(), vec![post("t1", "tech", Some("phones"))]);
    let session = open_session(&backend).await;
    wait_for_phase(&session, SessionPhase::Ready).await;

    // Scroll one step, then like the post under the cursor.
    session.next().await;
    let seen_head: Vec<Post> = session.feed_snapshot().await[..=session.cursor().await].to_vec();

    let status = tokio_test::assert_ok!(session.toggle_like("b1").await);
    assert!(status.has_liked);

    wait_for_phase(&session, SessionPhase::PendingReorder).await;
    // Parked result must not move anything the viewer can see.
    let during = session.feed_snapshot().await;
    assert_eq!(during[..seen_head.len()], seen_head[..]);

    // Navigation merges: the seen head is preserved verbatim, the whole
    // feed is still a permutation of the pool.
    session.next().await;
    assert_eq!(session.phase().await, SessionPhase::Ready);
    let merged = session.feed_snapshot().await;
    assert_eq!(merged[..seen_head.len()], seen_head[..]);
    assert_eq!(ids(&merged), ids(&pool()));
}

#[tokio::test(start_paused = true)]
async fn pending_reorder_applies_after_idle_timeout() {
    init_tracing();
    let backend = FakeBackend::new(pool(), vec![post("t1", "tech", Some("phones"))]);
    let session = open_session(&backend).await;
    wait_for_phase(&session, SessionPhase::Ready).await;

    session.next().await;
    let seen_head: Vec<Post> = session.feed_snapshot().await[..=session.cursor().await].to_vec();

    tokio_test::assert_ok!(session.toggle_like("b2").await);
    wait_for_phase(&session, SessionPhase::PendingReorder).await;

    // No navigation at all: the idle timer must apply the reorder on its
    // own after the configured delay.
    tokio::time::sleep(Duration::from_millis(5_100)).await;

    assert_eq!(session.phase().await, SessionPhase::Ready);
    let merged = session.feed_snapshot().await;
    assert_eq!(merged[..seen_head.len()], seen_head[..]);
    assert_eq!(ids(&merged), ids(&pool()));
}

#[tokio::test]
async fn superseding_like_wins_over_stale_recompute() {
    init_tracing();
    let backend = FakeBackend::new(pool(), vec![post("t1", "tech", Some("phones"))]);
    let session = open_session(&backend).await;
    wait_for_phase(&session, SessionPhase::Ready).await;

    // Two toggles in quick succession: only the latest trigger's result may
    // land, and the session must settle into a single parked reorder.
    tokio_test::assert_ok!(session.toggle_like("b1").await);
    tokio_test::assert_ok!(session.toggle_like("f1").await);

    wait_for_phase(&session, SessionPhase::PendingReorder).await;
    session.next().await;
    assert_eq!(session.phase().await, SessionPhase::Ready);
    assert_eq!(ids(&session.feed_snapshot().await), ids(&pool()));
}

#[tokio::test]
async fn recompute_outage_keeps_the_displayed_feed() {
    init_tracing();
    let backend = FakeBackend::new(pool(), vec![post("t1", "tech", Some("phones"))]);
    let session = open_session(&backend).await;
    wait_for_phase(&session, SessionPhase::Ready).await;

    let before = session.feed_snapshot().await;

    // The toggle itself succeeds, the recompute's pool fetch does not.
    backend.set_failing(false);
    let toggled = session.toggle_like("b1").await;
    assert!(toggled.is_ok());
    backend.set_failing(true);

    // Give the failed recompute time to resolve; the feed must be exactly
    // what it was and the session must stay usable.
    for _ in 0..200 {
        tokio::task::yield_now().await;
    }
    assert_eq!(session.feed_snapshot().await, before);
    assert!(session.next().await.is_some());
}

#[tokio::test]
async fn like_toggle_outage_propagates() {
    let backend = FakeBackend::new(pool(), Vec::new());
    let session = open_session(&backend).await;

    let result = session.toggle_like("missing-post").await;
    assert!(matches!(result, Err(SessionError::Upstream(_))));
}

#[tokio::test]
async fn deleted_post_leaves_a_consistent_session() {
    let backend = FakeBackend::new(pool(), Vec::new());
    let session = open_session(&backend).await;

    session.next().await;
    session.remove_post("t2").await;

    let snapshot = session.feed_snapshot().await;
    assert_eq!(snapshot.len(), pool().len() - 1);
    assert!(snapshot.iter().all(|post| post.id != "t2"));
    assert!(session.current().await.is_some());
}

#[tokio::test]
async fn registry_owns_one_session_per_viewer() {
    let backend = FakeBackend::new(pool(), Vec::new());
    let registry = SessionRegistry::new(
        Arc::clone(&backend) as Arc<dyn ContentProvider>,
        Arc::clone(&backend) as Arc<dyn LikeHistoryProvider>,
        Arc::clone(&backend) as Arc<dyn LikeToggler>,
        config(),
    );

    let viewer = Uuid::new_v4();
    let session = registry.open(viewer).await.unwrap();
    let again = registry.open(viewer).await.unwrap();
    assert!(Arc::ptr_eq(&session, &again));

    let other = registry.open(Uuid::new_v4()).await.unwrap();
    assert!(!Arc::ptr_eq(&session, &other));
    assert_eq!(registry.active_count(), 2);

    assert!(registry.close(viewer));
    assert_eq!(registry.active_count(), 1);
}
