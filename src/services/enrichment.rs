/// Metadata enrichment for recommended movies
///
/// Lookup chain per movie:
/// 1. Fetch by TMDb id from the links crosswalk (skipped when the movie has no mapping)
/// 2. On "not found", search by title and take the first result
/// 3. When the search is empty too, or the provider keeps failing, use the placeholder
///
/// Transient failures (timeouts, 5xx, connection errors) are retried with exponential
/// backoff. "Not found" is an answer and goes straight to the title search.
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::{
    models::{Credits, ExternalId, ExternalIdMapping, ItemId, MetadataRecord, MovieRecord},
    services::providers::{Lookup, MetadataProvider, ProviderError, ProviderResult},
};

/// Cast members kept for display
pub const MAX_CAST: usize = 10;

const CAST_SEPARATOR: &str = ", ";
const DIRECTOR_JOB: &str = "Director";

/// Retry policy for transient provider failures
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt + 1`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay_ms =
            self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(attempt as i32);
        Duration::from_millis(delay_ms as u64).min(self.max_delay)
    }
}

/// Why one movie could not be enriched. Never escapes a batch.
#[derive(thiserror::Error, Debug)]
enum EnrichmentError {
    #[error("no record found by id or by title search")]
    NotFound,

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

#[derive(Clone)]
pub struct EnrichmentClient {
    provider: Arc<dyn MetadataProvider>,
    provider_name: &'static str,
    external_ids: Arc<HashMap<ItemId, ExternalId>>,
    retry_policy: RetryPolicy,
    call_timeout: Duration,
    max_concurrent: usize,
}

impl EnrichmentClient {
    pub fn new(
        provider: Arc<dyn MetadataProvider>,
        links: &[ExternalIdMapping],
        retry_policy: RetryPolicy,
        call_timeout: Duration,
        max_concurrent: usize,
    ) -> Self {
        let external_ids = links
            .iter()
            .map(|link| (link.item_id, link.external_id))
            .collect();

        Self {
            provider_name: provider.name(),
            provider,
            external_ids: Arc::new(external_ids),
            retry_policy,
            call_timeout,
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub fn external_id(&self, item_id: ItemId) -> Option<ExternalId> {
        self.external_ids.get(&item_id).copied()
    }

    /// Runs one provider call under the per-call timeout, retrying transient failures
    async fn call<T, F, Fut>(&self, operation: &'static str, mut request: F) -> ProviderResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ProviderResult<T>>,
    {
        let mut attempt = 0;
        loop {
            let outcome = match tokio::time::timeout(self.call_timeout, request()).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Transient(format!(
                    "{} timed out after {:?}",
                    operation, self.call_timeout
                ))),
            };

            match outcome {
                Err(error) if error.is_retryable() && attempt < self.retry_policy.max_retries => {
                    let delay = self.retry_policy.delay_for(attempt);
                    attempt += 1;
                    tracing::debug!(
                        provider = self.provider_name,
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Retrying metadata call"
                    );
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }

    async fn search_first(&self, title: &str) -> Result<MovieRecord, EnrichmentError> {
        // Rated movies missing from the catalog have no title to search by
        if title.trim().is_empty() {
            return Err(EnrichmentError::NotFound);
        }

        let results = self
            .call("search_by_title", || self.provider.search_by_title(title))
            .await?;
        results.into_iter().next().ok_or(EnrichmentError::NotFound)
    }

    async fn try_fetch_details(
        &self,
        item_id: ItemId,
        title: &str,
    ) -> Result<MovieRecord, EnrichmentError> {
        match self.external_id(item_id) {
            Some(external_id) => {
                let lookup = self
                    .call("fetch_by_id", || self.provider.fetch_by_id(external_id))
                    .await?;
                if let Lookup::Found(record) = lookup {
                    return Ok(record);
                }
                tracing::debug!(
                    item_id = %item_id,
                    external_id = %external_id,
                    "Movie not found by id, searching by title"
                );
            }
            None => {
                tracing::debug!(item_id = %item_id, "No TMDb id for movie, searching by title");
            }
        }

        self.search_first(title).await
    }

    async fn try_fetch_credits(
        &self,
        item_id: ItemId,
        title: &str,
    ) -> Result<Credits, EnrichmentError> {
        if let Some(external_id) = self.external_id(item_id) {
            let lookup = self
                .call("fetch_credits_by_id", || {
                    self.provider.fetch_credits_by_id(external_id)
                })
                .await?;
            if let Lookup::Found(credits) = lookup {
                return Ok(credits);
            }
        }

        let movie = self.search_first(title).await?;
        match self
            .call("fetch_credits_by_id", || {
                self.provider.fetch_credits_by_id(movie.external_id)
            })
            .await?
        {
            Lookup::Found(credits) => Ok(credits),
            Lookup::NotFound => Err(EnrichmentError::NotFound),
        }
    }

    /// Display metadata for one movie; the placeholder when every path fails
    pub async fn fetch_details(&self, item_id: ItemId, title: &str) -> MetadataRecord {
        match self.try_fetch_details(item_id, title).await {
            Ok(record) => record.into(),
            Err(error) => {
                tracing::warn!(
                    provider = self.provider_name,
                    item_id = %item_id,
                    title = %title,
                    error = %error,
                    "Enrichment failed, using placeholder"
                );
                MetadataRecord::placeholder()
            }
        }
    }

    /// Cast and crew for one movie; empty credits when every path fails
    pub async fn fetch_credits(&self, item_id: ItemId, title: &str) -> Credits {
        match self.try_fetch_credits(item_id, title).await {
            Ok(credits) => credits,
            Err(error) => {
                tracing::warn!(
                    provider = self.provider_name,
                    item_id = %item_id,
                    title = %title,
                    error = %error,
                    "Credits lookup failed, returning empty credits"
                );
                Credits::default()
            }
        }
    }

    /// Enriches candidates concurrently, at most `max_concurrent` calls in flight
    ///
    /// Output order matches input order. Dropping the returned future aborts every
    /// outstanding lookup.
    pub async fn enrich_batch(&self, candidates: Vec<(ItemId, String)>) -> Vec<MetadataRecord> {
        let total = candidates.len();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks = JoinSet::new();

        for (rank, (item_id, title)) in candidates.into_iter().enumerate() {
            let client = self.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return (rank, MetadataRecord::placeholder()),
                };
                (rank, client.fetch_details(item_id, &title).await)
            });
        }

        let mut slots: Vec<Option<MetadataRecord>> = vec![None; total];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((rank, record)) => slots[rank] = Some(record),
                Err(e) => tracing::error!(error = %e, "Enrichment task failed"),
            }
        }

        let records: Vec<MetadataRecord> = slots
            .into_iter()
            .map(|slot| slot.unwrap_or_else(MetadataRecord::placeholder))
            .collect();

        tracing::info!(
            total,
            placeholders = records.iter().filter(|r| r.is_placeholder()).count(),
            "Batch enrichment completed"
        );

        records
    }
}

/// First crew member whose job is "Director"
pub fn find_director(credits: &Credits) -> Option<String> {
    credits
        .crew
        .iter()
        .find(|member| member.job == DIRECTOR_JOB)
        .map(|member| member.name.clone())
}

/// Names of the first `MAX_CAST` cast members, in billing order
pub fn top_cast(credits: &Credits) -> Vec<String> {
    credits
        .cast
        .iter()
        .take(MAX_CAST)
        .map(|member| member.name.clone())
        .collect()
}

/// "A, B, C" with no trailing separator
pub fn format_cast(names: &[String]) -> String {
    names.join(CAST_SEPARATOR)
}
