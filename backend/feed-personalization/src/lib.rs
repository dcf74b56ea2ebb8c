pub mod config;
pub mod models;
pub mod providers;
pub mod services;
pub mod utils;

pub use config::Config;
pub use models::{CategoryPreference, MediaKind, Post, PreferenceModel, SubcategoryPreference};
pub use providers::{ContentProvider, LikeHistoryProvider, LikeStatus, LikeToggler};
pub use services::{
    FeedRanker, FeedSession, PreferenceEstimator, SessionRegistry, WeightedSampler,
};
