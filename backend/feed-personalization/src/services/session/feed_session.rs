// ============================================
// Feed Session Driver
// ============================================
//
// Async shell around the session state machine. Owns the provider handles,
// the locally maintained liked set, and the spawned work: one recompute
// task per trigger plus the pending-apply timer. The machine decides what
// every completion means; the driver only delivers events.

use super::machine::{NavDirection, RecomputeOutcome, SessionMachine, SessionPhase};
use super::{Result, SessionError};
use crate::config::Config;
use crate::models::Post;
use crate::providers::{ContentProvider, LikeHistoryProvider, LikeStatus, LikeToggler};
use crate::services::preferences::PreferenceEstimator;
use crate::services::ranking::FeedRanker;
use crate::services::sampling::{EntropySource, RandomSource, SeededSource};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One viewer's feed session, shared through the registry as an `Arc`. All
/// state lives behind one lock so navigation and like toggles never observe
/// a half-updated feed.
pub struct FeedSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    user_id: Uuid,
    config: Config,
    content: Arc<dyn ContentProvider>,
    like_history: Arc<dyn LikeHistoryProvider>,
    like_toggler: Arc<dyn LikeToggler>,
    estimator: PreferenceEstimator,
    ranker: FeedRanker,
    state: Mutex<SessionState>,
}

struct SessionState {
    machine: SessionMachine,
    /// Liked posts, most recent first. Fetched once on open, then
    /// maintained incrementally from toggle results.
    liked: Vec<Post>,
}

impl FeedSession {
    /// Open a session: fetch the pool snapshot, fetch like history, and
    /// kick off the initial personalization when there is any signal.
    ///
    /// A pool fetch failure is fatal (there is nothing to display); a like
    /// history failure only degrades to an unpersonalized feed.
    pub async fn open(
        user_id: Uuid,
        content: Arc<dyn ContentProvider>,
        like_history: Arc<dyn LikeHistoryProvider>,
        like_toggler: Arc<dyn LikeToggler>,
        config: Config,
    ) -> Result<Self> {
        let pool = content.all_posts().await.map_err(SessionError::Upstream)?;
        info!(%user_id, pool_len = pool.len(), "feed session opened");

        let session = Self {
            inner: Arc::new(SessionInner {
                user_id,
                ranker: FeedRanker::from_config(&config.ranking),
                config,
                content,
                like_history: Arc::clone(&like_history),
                like_toggler,
                estimator: PreferenceEstimator::new(),
                state: Mutex::new(SessionState {
                    machine: SessionMachine::new(pool),
                    liked: Vec::new(),
                }),
            }),
        };

        match like_history.liked_posts(user_id).await {
            Ok(liked) if !liked.is_empty() => {
                {
                    let mut state = session.inner.state.lock().await;
                    state.liked = liked;
                }
                session.trigger_recompute().await;
            }
            Ok(_) => debug!(%user_id, "no like history, feed stays unpersonalized"),
            Err(error) => {
                warn!(%user_id, %error, "like history unavailable, feed stays unpersonalized");
            }
        }

        Ok(session)
    }

    pub fn user_id(&self) -> Uuid {
        self.inner.user_id
    }

    /// Post under the cursor.
    pub async fn current(&self) -> Option<Post> {
        self.inner.state.lock().await.machine.current_post().cloned()
    }

    pub async fn cursor(&self) -> usize {
        self.inner.state.lock().await.machine.cursor()
    }

    pub async fn phase(&self) -> SessionPhase {
        self.inner.state.lock().await.machine.phase()
    }

    /// Consistent copy of the displayed ordering.
    pub async fn feed_snapshot(&self) -> Vec<Post> {
        self.inner.state.lock().await.machine.displayed().to_vec()
    }

    /// Advance to the next post. An apply event: a parked reorder merges
    /// before the cursor moves.
    pub async fn next(&self) -> Option<Post> {
        let mut state = self.inner.state.lock().await;
        state.machine.navigate(NavDirection::Forward).cloned()
    }

    /// Step back to the previous post. Also an apply event.
    pub async fn previous(&self) -> Option<Post> {
        let mut state = self.inner.state.lock().await;
        state.machine.navigate(NavDirection::Backward).cloned()
    }

    /// Like or unlike a post, then re-rank in the background.
    ///
    /// The collaborator's failure propagates to the caller (rollback of any
    /// optimistic UI update is the caller's concern); on success the local
    /// liked set is updated and a background recompute is triggered. The
    /// current feed keeps displaying untouched until that recompute lands.
    pub async fn toggle_like(&self, post_id: &str) -> Result<LikeStatus> {
        let (currently_liked, displayed_post) = {
            let state = self.inner.state.lock().await;
            (
                state.liked.iter().any(|post| post.id == post_id),
                state.machine.find_post(post_id).cloned(),
            )
        };

        let status = self
            .inner
            .like_toggler
            .like_or_dislike(post_id, currently_liked)
            .await
            .map_err(SessionError::Upstream)?;

        {
            let mut state = self.inner.state.lock().await;
            if status.has_liked {
                if !state.liked.iter().any(|post| post.id == post_id) {
                    if let Some(post) = displayed_post {
                        state.liked.insert(0, post);
                    }
                }
            } else {
                state.liked.retain(|post| post.id != post_id);
            }
        }

        self.trigger_recompute().await;

        Ok(status)
    }

    /// A post was deleted upstream. Drop it from this session's orderings
    /// and liked set.
    pub async fn remove_post(&self, post_id: &str) {
        let mut state = self.inner.state.lock().await;
        state.machine.remove_post(post_id);
        state.liked.retain(|post| post.id != post_id);
    }

    /// Register a recompute trigger and run it off the synchronous path.
    /// A trigger while another computation is in flight supersedes it; the
    /// stale result is dropped when it arrives.
    async fn trigger_recompute(&self) {
        let generation = {
            let mut state = self.inner.state.lock().await;
            state.machine.begin_recompute()
        };

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            if let Err(error) = recompute(Arc::clone(&inner), generation).await {
                warn!(
                    user_id = %inner.user_id,
                    generation,
                    %error,
                    "feed recompute failed, keeping current ordering"
                );
                let mut state = inner.state.lock().await;
                state.machine.fail_recompute(generation);
            }
        });
    }
}

/// One full recompute: like history -> preference model -> ranked pool,
/// then hand the result to the machine under the session lock.
async fn recompute(inner: Arc<SessionInner>, generation: u64) -> Result<()> {
    let liked = {
        let state = inner.state.lock().await;
        state.liked.clone()
    };
    let preferences = inner.estimator.estimate(&liked);

    let pool = inner
        .content
        .all_posts()
        .await
        .map_err(SessionError::Upstream)?;

    let mut rng = new_rng(&inner.config);
    let ranked = inner.ranker.rank(pool, &preferences, rng.as_mut())?;

    let mut state = inner.state.lock().await;
    match state.machine.complete_recompute(generation, ranked) {
        RecomputeOutcome::Applied => {
            debug!(user_id = %inner.user_id, generation, "recompute applied");
        }
        RecomputeOutcome::Parked => {
            drop(state);
            arm_apply_timer(inner, generation);
        }
        RecomputeOutcome::Superseded => {
            debug!(user_id = %inner.user_id, generation, "recompute superseded");
        }
    }

    Ok(())
}

/// Guarantee a parked reorder is never silently lost: after the configured
/// idle delay it merges on its own. The machine ignores the firing if the
/// pending was already consumed or replaced.
fn arm_apply_timer(inner: Arc<SessionInner>, generation: u64) {
    let delay = Duration::from_millis(inner.config.session.pending_apply_timeout_ms);
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let mut state = inner.state.lock().await;
        if state.machine.timeout_fired(generation) {
            info!(
                user_id = %inner.user_id,
                generation,
                "pending reorder applied after idle timeout"
            );
        }
    });
}

fn new_rng(config: &Config) -> Box<dyn RandomSource> {
    match config.ranking.rng_seed {
        Some(seed) => Box::new(SeededSource::new(seed)),
        None => Box::new(EntropySource::default()),
    }
}
