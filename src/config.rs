use serde::Deserialize;
use std::time::Duration;

use crate::services::{enrichment::RetryPolicy, similarity::DistanceMetric};

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Ratings dataset (userId, movieId, rating, timestamp)
    #[serde(default = "default_ratings_path")]
    pub ratings_path: String,

    /// Movie catalog dataset (movieId, title, genres)
    #[serde(default = "default_movies_path")]
    pub movies_path: String,

    /// Id crosswalk dataset (movieId, imdbId, tmdbId)
    #[serde(default = "default_links_path")]
    pub links_path: String,

    /// TMDb API key
    pub tmdb_api_key: String,

    /// TMDb API base URL
    #[serde(default = "default_tmdb_api_url")]
    pub tmdb_api_url: String,

    /// Base URL prepended to TMDb poster paths
    #[serde(default = "default_tmdb_image_url")]
    pub tmdb_image_url: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub similarity_metric: DistanceMetric,

    /// Neighbours returned when the request does not ask for a count
    #[serde(default = "default_k")]
    pub default_k: usize,

    #[serde(default = "default_max_k")]
    pub max_k: usize,

    /// Fuzzy matches scoring below this are rejected. 0.0 accepts every match.
    #[serde(default)]
    pub min_match_score: f64,

    /// Per-call timeout for the metadata service
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_initial_delay_ms")]
    pub retry_initial_delay_ms: u64,

    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,

    /// Maximum in-flight metadata calls per recommendation batch
    #[serde(default = "default_enrichment_concurrency")]
    pub enrichment_concurrency: usize,
}

fn default_ratings_path() -> String {
    "data/ratings.csv".to_string()
}

fn default_movies_path() -> String {
    "data/movies.csv".to_string()
}

fn default_links_path() -> String {
    "data/links.csv".to_string()
}

fn default_tmdb_api_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_tmdb_image_url() -> String {
    "https://image.tmdb.org/t/p/w500".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_k() -> usize {
    25
}

fn default_max_k() -> usize {
    100
}

fn default_request_timeout_ms() -> u64 {
    3000
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_initial_delay_ms() -> u64 {
    200
}

fn default_retry_max_delay_ms() -> u64 {
    2000
}

fn default_enrichment_concurrency() -> usize {
    8
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.default_k == 0 || self.default_k > self.max_k {
            anyhow::bail!(
                "DEFAULT_K must be between 1 and MAX_K ({}), got {}",
                self.max_k,
                self.default_k
            );
        }
        if !(0.0..=1.0).contains(&self.min_match_score) {
            anyhow::bail!(
                "MIN_MATCH_SCORE must be between 0.0 and 1.0, got {}",
                self.min_match_score
            );
        }
        if self.enrichment_concurrency == 0 {
            anyhow::bail!("ENRICHMENT_CONCURRENCY must be at least 1");
        }
        if self.request_timeout_ms == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_MS must be at least 1");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_delay: Duration::from_millis(self.retry_initial_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
            backoff_multiplier: 2.0,
        }
    }
}
