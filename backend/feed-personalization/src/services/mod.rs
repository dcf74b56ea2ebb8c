pub mod preferences;
pub mod ranking;
pub mod sampling;
pub mod session;

pub use preferences::PreferenceEstimator;
pub use ranking::{FeedRanker, RankingError};
pub use sampling::{
    EntropySource, RandomSource, SamplerError, ScriptedSource, SeededSource, WeightedChoice,
    WeightedSampler,
};
pub use session::{FeedSession, SessionError, SessionRegistry};
