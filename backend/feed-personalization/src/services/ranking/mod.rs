// ============================================
// Feed Ranker
// ============================================
//
// Turns the content pool into a personalized permutation. The output is
// assembled in batches: every slot picks a category weighted by the viewer's
// preferences, a subcategory weighted within that category, then one post
// uniformly from the chosen group. Each completed batch is shuffled before
// it is appended, so per-batch category weighting survives while a single
// category cannot fill a contiguous stretch of the feed.
//
// A viewer with no like history gets one plain unbiased shuffle instead.

use crate::config::RankingConfig;
use crate::models::{Post, PreferenceModel};
use crate::services::sampling::{
    shuffle, uniform_index, RandomSource, SamplerError, WeightedChoice, WeightedSampler,
};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RankingError {
    #[error("weighted selection failed: {0}")]
    Selection(#[from] SamplerError),
}

pub type Result<T> = std::result::Result<T, RankingError>;

pub struct FeedRanker {
    batch_size: usize,
    sampler: WeightedSampler,
}

impl Default for FeedRanker {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedRanker {
    pub fn new() -> Self {
        Self::with_batch_size(RankingConfig::default().batch_size)
    }

    /// Create with a custom batch size. Zero is clamped to one.
    pub fn with_batch_size(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            sampler: WeightedSampler::new(),
        }
    }

    pub fn from_config(config: &RankingConfig) -> Self {
        Self::with_batch_size(config.batch_size)
    }

    /// Produce a personalized permutation of `pool`: every post appears
    /// exactly once, none are dropped.
    ///
    /// The `Err` branch exists only so a malformed internal candidate set
    /// fails loudly instead of being swallowed; it is unreachable for
    /// well-formed groups.
    pub fn rank(
        &self,
        pool: Vec<Post>,
        preferences: &PreferenceModel,
        rng: &mut dyn RandomSource,
    ) -> Result<Vec<Post>> {
        if pool.is_empty() {
            return Ok(pool);
        }

        if preferences.is_cold_start() {
            let mut shuffled = pool;
            shuffle(&mut shuffled, rng);
            return Ok(shuffled);
        }

        let total = pool.len();

        // Working groups of remaining candidates. BTreeMap keeps candidate
        // enumeration order stable so seeded runs reproduce exactly.
        let mut groups: BTreeMap<String, Vec<Post>> = BTreeMap::new();
        for post in pool {
            groups.entry(post.category.clone()).or_default().push(post);
        }

        let mut ordered = Vec::with_capacity(total);
        let mut batch = Vec::with_capacity(self.batch_size);

        while ordered.len() + batch.len() < total {
            let post = self.draw_post(&mut groups, preferences, rng)?;
            batch.push(post);

            if batch.len() == self.batch_size {
                shuffle(&mut batch, rng);
                ordered.append(&mut batch);
            }
        }

        // Trailing partial batch.
        if !batch.is_empty() {
            shuffle(&mut batch, rng);
            ordered.append(&mut batch);
        }

        debug!(
            feed_len = ordered.len(),
            batch_size = self.batch_size,
            "ranked feed assembled"
        );

        Ok(ordered)
    }

    /// Draw one post: weighted category, weighted subcategory, uniform post.
    fn draw_post(
        &self,
        groups: &mut BTreeMap<String, Vec<Post>>,
        preferences: &PreferenceModel,
        rng: &mut dyn RandomSource,
    ) -> Result<Post> {
        let category = self.select_category(groups, preferences, rng)?;
        let post = self.select_from_category(groups, &category, preferences, rng)?;

        // Drop exhausted groups so the category candidate list stays honest.
        if groups.get(&category).is_some_and(Vec::is_empty) {
            groups.remove(&category);
        }

        Ok(post)
    }

    fn select_category(
        &self,
        groups: &BTreeMap<String, Vec<Post>>,
        preferences: &PreferenceModel,
        rng: &mut dyn RandomSource,
    ) -> Result<String> {
        let weighted: Vec<WeightedChoice<&String>> = groups
            .keys()
            .filter_map(|category| {
                preferences
                    .category_preferences
                    .get(category)
                    .map(|pref| WeightedChoice {
                        item: category,
                        weight: pref.probability,
                    })
            })
            .filter(|choice| choice.weight > 0.0)
            .collect();

        if weighted.is_empty() {
            // No preferred category has stock left; uniform pick over
            // whatever remains.
            let remaining: Vec<&String> = groups.keys().collect();
            if remaining.is_empty() {
                return Err(RankingError::Selection(SamplerError::InvalidInput(
                    "no categories with remaining posts",
                )));
            }
            return Ok(remaining[uniform_index(remaining.len(), rng)].clone());
        }

        let selected = self.sampler.select_one(&weighted, rng)?;
        Ok((*selected).clone())
    }

    fn select_from_category(
        &self,
        groups: &mut BTreeMap<String, Vec<Post>>,
        category: &str,
        preferences: &PreferenceModel,
        rng: &mut dyn RandomSource,
    ) -> Result<Post> {
        let posts = match groups.get_mut(category) {
            Some(posts) if !posts.is_empty() => posts,
            _ => {
                return Err(RankingError::Selection(SamplerError::InvalidInput(
                    "selected category has no remaining posts",
                )))
            }
        };

        // Partition the group's remaining posts by subcategory.
        let mut by_subcategory: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (index, post) in posts.iter().enumerate() {
            by_subcategory
                .entry(post.subcategory_or_default())
                .or_default()
                .push(index);
        }

        let weighted: Vec<WeightedChoice<&str>> = preferences
            .category_preferences
            .get(category)
            .map(|prefs| {
                by_subcategory
                    .keys()
                    .filter_map(|subcategory| {
                        prefs
                            .subcategory_preferences
                            .get(*subcategory)
                            .map(|sub| WeightedChoice {
                                item: *subcategory,
                                weight: sub.probability,
                            })
                    })
                    .filter(|choice| choice.weight > 0.0)
                    .collect()
            })
            .unwrap_or_default();

        let index = if weighted.is_empty() {
            // No subcategory history overlaps the remaining group; uniform
            // pick across the whole category.
            uniform_index(posts.len(), rng)
        } else {
            let subcategory = *self.sampler.select_one(&weighted, rng)?;
            let slots = by_subcategory.get(subcategory).ok_or(RankingError::Selection(
                SamplerError::InvalidInput("subcategory group out of sync"),
            ))?;
            slots[uniform_index(slots.len(), rng)]
        };

        Ok(posts.swap_remove(index))
    }
}
