// ============================================
// Session Registry
// ============================================
//
// In-memory map of active feed sessions, one per viewer. Sessions are
// created when a feed view opens and destroyed when it closes; nothing is
// shared between them.

use super::feed_session::FeedSession;
use super::Result;
use crate::config::Config;
use crate::providers::{ContentProvider, LikeHistoryProvider, LikeToggler};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub struct SessionRegistry {
    sessions: DashMap<Uuid, Arc<FeedSession>>,
    content: Arc<dyn ContentProvider>,
    like_history: Arc<dyn LikeHistoryProvider>,
    like_toggler: Arc<dyn LikeToggler>,
    config: Config,
}

impl SessionRegistry {
    pub fn new(
        content: Arc<dyn ContentProvider>,
        like_history: Arc<dyn LikeHistoryProvider>,
        like_toggler: Arc<dyn LikeToggler>,
        config: Config,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            content,
            like_history,
            like_toggler,
            config,
        }
    }

    /// Session for `user_id`, creating one when the viewer has none. The
    /// existing session wins when the feed view was already open.
    pub async fn open(&self, user_id: Uuid) -> Result<Arc<FeedSession>> {
        if let Some(existing) = self.sessions.get(&user_id) {
            return Ok(Arc::clone(existing.value()));
        }

        let session = Arc::new(
            FeedSession::open(
                user_id,
                Arc::clone(&self.content),
                Arc::clone(&self.like_history),
                Arc::clone(&self.like_toggler),
                self.config.clone(),
            )
            .await?,
        );
        self.sessions.insert(user_id, Arc::clone(&session));
        info!(%user_id, active = self.sessions.len(), "feed session registered");
        Ok(session)
    }

    pub fn get(&self, user_id: Uuid) -> Option<Arc<FeedSession>> {
        self.sessions
            .get(&user_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Drop the viewer's session when the feed view closes. Returns whether
    /// one was active.
    pub fn close(&self, user_id: Uuid) -> bool {
        let removed = self.sessions.remove(&user_id).is_some();
        if removed {
            info!(%user_id, active = self.sessions.len(), "feed session closed");
        }
        removed
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }
}
