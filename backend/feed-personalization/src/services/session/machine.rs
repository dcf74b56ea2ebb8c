// ============================================
// Session State Machine
// ============================================
//
// Pure reducer for the feed session. Every mutation of the displayed
// ordering goes through one of the transitions below; nothing here is
// async and nothing here does I/O.
//
// Phases:
//   Idle ──begin──> Computing ──complete──> Ready
//   Ready ──begin──> (background) ──complete──> PendingReorder
//   PendingReorder ──navigate / timeout──> Ready
//
// A monotonically increasing generation counter supersedes stale work: a
// completion or timeout carrying an older generation than the latest
// trigger is dropped on arrival.

use crate::models::Post;
use std::collections::HashSet;
use tracing::{debug, info};

/// Where the session is in its recompute lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No personalization yet; the pool is shown in its fetched order.
    Idle,
    /// Initial recomputation in flight; nothing displayed is personalized.
    Computing,
    /// A personalized ordering is displayed.
    Ready,
    /// A fresher ordering is parked in the background, waiting for an
    /// apply event.
    PendingReorder,
}

/// Direction of a navigation event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavDirection {
    Forward,
    Backward,
}

/// What happened to a completed recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecomputeOutcome {
    /// The result replaced the displayed ordering wholesale. Only happens
    /// for the initial computation, before the viewer has a personalized
    /// feed to scroll.
    Applied,
    /// The result was parked as pending until the next apply event.
    Parked,
    /// A newer trigger superseded this result; it was dropped.
    Superseded,
}

#[derive(Debug)]
pub struct SessionMachine {
    displayed: Vec<Post>,
    pending: Option<Vec<Post>>,
    cursor: usize,
    phase: SessionPhase,
    /// Latest trigger. Completions must match it to win.
    generation: u64,
    /// Generation that produced the current `pending`; timers carry it so
    /// a stale timer cannot apply a newer pending early.
    pending_generation: u64,
}

impl SessionMachine {
    /// Open a session over the pool snapshot, shown as-is until a
    /// recomputation lands.
    pub fn new(pool: Vec<Post>) -> Self {
        Self {
            displayed: pool,
            pending: None,
            cursor: 0,
            phase: SessionPhase::Idle,
            generation: 0,
            pending_generation: 0,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn displayed(&self) -> &[Post] {
        &self.displayed
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn current_post(&self) -> Option<&Post> {
        self.displayed.get(self.cursor)
    }

    pub fn find_post(&self, post_id: &str) -> Option<&Post> {
        self.displayed.iter().find(|post| post.id == post_id)
    }

    /// Register a recompute trigger. Returns the generation the eventual
    /// completion must present. A trigger while another computation is in
    /// flight supersedes it: the stale result will be dropped on arrival.
    pub fn begin_recompute(&mut self) -> u64 {
        self.generation += 1;
        if self.phase == SessionPhase::Idle {
            self.phase = SessionPhase::Computing;
        }
        debug!(generation = self.generation, phase = ?self.phase, "recompute triggered");
        self.generation
    }

    /// Feed a finished recomputation back in.
    ///
    /// The displayed ordering is replaced wholesale only from the initial
    /// (blocking) computation; once the viewer has a ranked feed, results
    /// park as `pending` and wait for an apply event.
    pub fn complete_recompute(&mut self, generation: u64, feed: Vec<Post>) -> RecomputeOutcome {
        if generation != self.generation {
            debug!(
                generation,
                current = self.generation,
                "stale recompute result dropped"
            );
            return RecomputeOutcome::Superseded;
        }

        match self.phase {
            SessionPhase::Idle | SessionPhase::Computing => {
                self.displayed = feed;
                self.clamp_cursor();
                self.phase = SessionPhase::Ready;
                info!(
                    generation,
                    feed_len = self.displayed.len(),
                    "personalized feed applied"
                );
                RecomputeOutcome::Applied
            }
            SessionPhase::Ready | SessionPhase::PendingReorder => {
                self.pending = Some(feed);
                self.pending_generation = generation;
                self.phase = SessionPhase::PendingReorder;
                debug!(generation, "reorder parked as pending");
                RecomputeOutcome::Parked
            }
        }
    }

    /// A recomputation failed. The displayed ordering is untouched; an
    /// already parked pending (from an earlier successful run) stays
    /// parked. Only the initial computation falls back to `Idle`.
    pub fn fail_recompute(&mut self, generation: u64) {
        if generation != self.generation {
            return;
        }
        if self.phase == SessionPhase::Computing {
            self.phase = SessionPhase::Idle;
        }
        debug!(generation, phase = ?self.phase, "recompute failed, state kept");
    }

    /// Navigation is an apply event: a parked pending merges first, then
    /// the cursor moves (clamped to the feed bounds).
    pub fn navigate(&mut self, direction: NavDirection) -> Option<&Post> {
        if self.phase == SessionPhase::PendingReorder {
            self.apply_pending();
        }

        match direction {
            NavDirection::Forward => {
                if self.cursor + 1 < self.displayed.len() {
                    self.cursor += 1;
                }
            }
            NavDirection::Backward => {
                self.cursor = self.cursor.saturating_sub(1);
            }
        }

        self.displayed.get(self.cursor)
    }

    /// The idle timer fired for `generation`. Applies the parked pending
    /// only when it is still the one the timer was armed for. Returns
    /// whether an apply happened.
    pub fn timeout_fired(&mut self, generation: u64) -> bool {
        if self.phase != SessionPhase::PendingReorder || self.pending_generation != generation {
            return false;
        }
        self.apply_pending();
        true
    }

    /// A post disappeared from the pool (deleted or unliked away). Drop it
    /// from both orderings and keep the cursor in bounds. Never touches
    /// phase: an in-flight recomputation keeps its own snapshot.
    pub fn remove_post(&mut self, post_id: &str) {
        self.displayed.retain(|post| post.id != post_id);
        if let Some(pending) = self.pending.as_mut() {
            pending.retain(|post| post.id != post_id);
        }
        self.clamp_cursor();
    }

    fn apply_pending(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        self.displayed = merge_orderings(&self.displayed, pending, self.cursor);
        self.clamp_cursor();
        self.phase = SessionPhase::Ready;
        info!(
            cursor = self.cursor,
            feed_len = self.displayed.len(),
            "pending reorder merged"
        );
    }

    fn clamp_cursor(&mut self) {
        if self.displayed.is_empty() {
            self.cursor = 0;
        } else if self.cursor >= self.displayed.len() {
            self.cursor = self.displayed.len() - 1;
        }
    }
}

/// Cursor-preserving merge of a freshly computed ordering into the feed a
/// viewer is mid-scroll through.
///
/// Everything up to and including the cursor stays put; the tail is rebuilt
/// from `pending`'s order minus the posts already kept. When the cursor
/// post no longer exists in `pending` there is no anchor to preserve and
/// the ordering is replaced wholesale.
pub fn merge_orderings(displayed: &[Post], pending: Vec<Post>, cursor: usize) -> Vec<Post> {
    let Some(anchor) = displayed.get(cursor) else {
        return pending;
    };
    if !pending.iter().any(|post| post.id == anchor.id) {
        return pending;
    }

    let kept = &displayed[..=cursor];
    let kept_ids: HashSet<&str> = kept.iter().map(|post| post.id.as_str()).collect();

    let mut merged = Vec::with_capacity(pending.len());
    merged.extend_from_slice(kept);
    merged.extend(
        pending
            .into_iter()
            .filter(|post| !kept_ids.contains(post.id.as_str())),
    );
    merged
}
