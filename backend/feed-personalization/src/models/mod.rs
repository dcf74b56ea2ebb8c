use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Subcategory applied to posts that carry no explicit one.
pub const DEFAULT_SUBCATEGORY: &str = "general";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Image,
}

/// A unit of content in the pool. Read-only input from the ranking engine's
/// point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    /// Top-level content grouping (e.g. "tech", "fashion").
    pub category: String,
    /// Finer-grained tag within the category; `None` means "general".
    pub subcategory: Option<String>,
    pub author_id: Option<Uuid>,
    pub like_count: u32,
    pub comment_count: u32,
    pub media_url: String,
    pub media_kind: MediaKind,
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Subcategory with the implicit default applied.
    pub fn subcategory_or_default(&self) -> &str {
        self.subcategory.as_deref().unwrap_or(DEFAULT_SUBCATEGORY)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubcategoryPreference {
    pub count: u32,
    /// count / likes within the parent category.
    pub probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryPreference {
    pub category: String,
    pub like_count: u32,
    /// like_count / total likes.
    pub probability: f64,
    pub subcategory_preferences: HashMap<String, SubcategoryPreference>,
}

/// Derived weighting of categories and subcategories from a user's like
/// history. Ephemeral: recomputed on demand, never persisted.
///
/// Invariants: subcategory probabilities within a category sum to 1, and
/// category probabilities sum to 1 whenever `total_likes > 0`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PreferenceModel {
    pub total_likes: u32,
    pub category_preferences: HashMap<String, CategoryPreference>,
}

impl PreferenceModel {
    /// True when there is no like signal at all; ranking falls back to a
    /// plain shuffle.
    pub fn is_cold_start(&self) -> bool {
        self.total_likes == 0
    }
}
