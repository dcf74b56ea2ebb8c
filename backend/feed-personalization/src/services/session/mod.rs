// ============================================
// Ranking Session
// ============================================
//
// Per-viewer feed session: owns the displayed ordering, the scroll cursor,
// and the lifecycle of background re-ranking.
//
// Split in two:
// - `machine`: a pure state machine driven by discrete events
//   (trigger-recompute, recompute-complete, navigate, timeout-fire), no
//   async, no I/O.
// - `FeedSession`: the async driver that wires providers, task spawning,
//   and the pending-apply timer to machine events.
//
// One session per viewer; sessions share nothing.

pub mod feed_session;
pub mod machine;
pub mod registry;

pub use feed_session::FeedSession;
pub use machine::{NavDirection, RecomputeOutcome, SessionMachine, SessionPhase};
pub use registry::SessionRegistry;

use crate::services::ranking::RankingError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// Like-history or pool fetch failed. Recomputation aborts and the
    /// previously displayed ordering is retained.
    #[error("upstream fetch failed: {0}")]
    Upstream(#[from] anyhow::Error),

    #[error(transparent)]
    Ranking(#[from] RankingError),
}

pub type Result<T> = std::result::Result<T, SessionError>;
