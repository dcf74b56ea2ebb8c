use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub ranking: RankingConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RankingConfig {
    /// Number of feed slots assembled per weighted batch.
    pub batch_size: usize,
    /// Fixed RNG seed; set for reproducible orderings, leave unset in
    /// production.
    pub rng_seed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// How long a pending reorder may sit unapplied before it is merged
    /// automatically.
    pub pending_apply_timeout_ms: u64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            rng_seed: None,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pending_apply_timeout_ms: 5_000,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Config {
            ranking: RankingConfig {
                batch_size: env::var("RANKING_BATCH_SIZE")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .expect("RANKING_BATCH_SIZE must be a valid usize"),
                rng_seed: env::var("RANKING_RNG_SEED")
                    .ok()
                    .map(|raw| raw.parse().expect("RANKING_RNG_SEED must be a valid u64")),
            },
            session: SessionConfig {
                pending_apply_timeout_ms: env::var("PENDING_APPLY_TIMEOUT_MS")
                    .unwrap_or_else(|_| "5000".to_string())
                    .parse()
                    .expect("PENDING_APPLY_TIMEOUT_MS must be a valid u64"),
            },
        }
    }
}
