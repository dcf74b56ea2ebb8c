// ============================================
// Preference Estimation
// ============================================
//
// Derives a category/subcategory like-probability model from a user's liked
// posts. Pure counting, no randomness:
//
//   P(category)    = likes_in_category / total_likes
//   P(subcategory) = likes_in_subcategory / likes_in_category

use crate::models::{CategoryPreference, Post, PreferenceModel, SubcategoryPreference};
use crate::utils::safe_ratio;
use std::collections::HashMap;
use tracing::debug;

/// Builds `PreferenceModel`s from like history. Stateless and deterministic:
/// the same liked-post list always yields the same model.
#[derive(Debug, Default)]
pub struct PreferenceEstimator;

impl PreferenceEstimator {
    pub fn new() -> Self {
        Self
    }

    /// Estimate the preference model from liked posts.
    ///
    /// An empty history yields `total_likes == 0` and no category entries;
    /// the ranker treats that as "no signal".
    pub fn estimate(&self, liked_posts: &[Post]) -> PreferenceModel {
        let mut category_stats: HashMap<String, (u32, HashMap<String, u32>)> = HashMap::new();

        for post in liked_posts {
            let (count, subcategories) =
                category_stats.entry(post.category.clone()).or_default();
            *count += 1;
            *subcategories
                .entry(post.subcategory_or_default().to_string())
                .or_insert(0) += 1;
        }

        let total_likes = liked_posts.len() as u32;
        let category_preferences = category_stats
            .into_iter()
            .map(|(category, (like_count, subcounts))| {
                let subcategory_preferences = subcounts
                    .into_iter()
                    .map(|(subcategory, count)| {
                        (
                            subcategory,
                            SubcategoryPreference {
                                count,
                                probability: safe_ratio(count, like_count),
                            },
                        )
                    })
                    .collect();

                let preference = CategoryPreference {
                    category: category.clone(),
                    like_count,
                    probability: safe_ratio(like_count, total_likes),
                    subcategory_preferences,
                };
                (category, preference)
            })
            .collect();

        debug!(total_likes, "estimated preference model");

        PreferenceModel {
            total_likes,
            category_preferences,
        }
    }
}
