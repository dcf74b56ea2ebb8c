//! Contracts to the collaborators this engine stays deliberately blind to:
//! content storage, like-history queries, and the like-toggle endpoint.
//!
//! All of them are plain CRUD over a hosted document store; the engine only
//! sees already-fetched data.

use crate::models::Post;
use async_trait::async_trait;
use uuid::Uuid;

/// Result of a like/unlike round trip against the like collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeStatus {
    pub count: u32,
    pub has_liked: bool,
}

/// Read-only snapshot of the content pool used as ranking input.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentProvider: Send + Sync {
    async fn all_posts(&self) -> anyhow::Result<Vec<Post>>;
}

/// Supplies the posts a user has liked, in most-recent-first order.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LikeHistoryProvider: Send + Sync {
    async fn liked_posts(&self, user_id: Uuid) -> anyhow::Result<Vec<Post>>;
}

/// Persists a like or unlike. The returned status is the trigger for a
/// background re-rank but is otherwise opaque to the engine.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LikeToggler: Send + Sync {
    async fn like_or_dislike(&self, post_id: &str, currently_liked: bool)
        -> anyhow::Result<LikeStatus>;
}
