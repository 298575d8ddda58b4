/// Movie metadata provider abstraction
///
/// The enrichment client only depends on this trait, so the TMDb implementation can be
/// swapped for another catalog service or a test double.
use crate::models::{Credits, ExternalId, MovieRecord};

pub mod tmdb;

/// Outcome of a lookup that reached the provider
///
/// A missing record is an answer, not a failure, and is never retried.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

/// Failure to get an answer from the provider
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Timeouts, connection failures, 5xx and rate limiting; worth retrying
    #[error("transient provider failure: {0}")]
    Transient(String),

    /// Rejected request or unreadable response; retrying will not help
    #[error("permanent provider failure: {0}")]
    Permanent(String),
}

impl ProviderError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Transient(_))
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Trait for movie metadata providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Fetch a movie by its provider id
    async fn fetch_by_id(&self, id: ExternalId) -> ProviderResult<Lookup<MovieRecord>>;

    /// Search movies by title, best match first. No hits is an empty list.
    async fn search_by_title(&self, title: &str) -> ProviderResult<Vec<MovieRecord>>;

    /// Fetch cast and crew by provider id
    async fn fetch_credits_by_id(&self, id: ExternalId) -> ProviderResult<Lookup<Credits>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_errors_are_retryable() {
        assert!(ProviderError::Transient("503".into()).is_retryable());
        assert!(!ProviderError::Permanent("401".into()).is_retryable());
    }
}
