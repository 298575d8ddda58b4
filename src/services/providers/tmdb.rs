/// The Movie Database (TMDb) v3 provider
///
/// API Flow:
/// 1. Details: /movie/{tmdb_id} → title, poster, overview, release date
/// 2. Search: /search/movie?query={title} → ranked list of movies
/// 3. Credits: /movie/{tmdb_id}/credits → cast and crew
///
/// Responses are not cached; every enrichment is a fresh round trip.
use reqwest::{Client as HttpClient, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::{
    error::{AppError, AppResult},
    models::{Credits, ExternalId, MovieRecord, TmdbMovie, TmdbSearchResponse},
    services::providers::{Lookup, MetadataProvider, ProviderError, ProviderResult},
};

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    image_url: String,
}

impl TmdbProvider {
    /// Creates a TMDb provider whose HTTP client enforces `timeout` on every call
    pub fn new(
        api_key: String,
        api_url: String,
        image_url: String,
        timeout: Duration,
    ) -> AppResult<Self> {
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            image_url: image_url.trim_end_matches('/').to_string(),
        })
    }

    /// GETs a TMDb endpoint, mapping 404 to `Lookup::NotFound`
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> ProviderResult<Lookup<T>> {
        let url = format!("{}{}", self.api_url, path);

        let response = self
            .http_client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(query)
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            tracing::debug!(path = %path, provider = "tmdb", "TMDb returned not found");
            return Ok(Lookup::NotFound);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                path = %path,
                status = %status,
                body = %body,
                provider = "tmdb",
                "TMDb request failed"
            );
            return Err(classify_status(status, &body));
        }

        response.json::<T>().await.map(Lookup::Found).map_err(|e| {
            if e.is_timeout() {
                ProviderError::Transient(format!("timed out reading TMDb response: {}", e))
            } else {
                ProviderError::Permanent(format!("failed to parse TMDb response: {}", e))
            }
        })
    }

    fn to_record(&self, movie: TmdbMovie) -> MovieRecord {
        MovieRecord {
            external_id: ExternalId(movie.id),
            title: movie.title,
            image_ref: movie
                .poster_path
                .filter(|path| !path.is_empty())
                .map(|path| format!("{}{}", self.image_url, path)),
            overview: movie.overview.filter(|text| !text.is_empty()),
            release_date: movie.release_date,
        }
    }
}

/// Maps a non-success, non-404 status to a provider error
pub fn classify_status(status: StatusCode, body: &str) -> ProviderError {
    let message = format!("TMDb returned status {}: {}", status, body);
    if status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
    {
        ProviderError::Transient(message)
    } else {
        ProviderError::Permanent(message)
    }
}

fn classify_request_error(error: reqwest::Error) -> ProviderError {
    if error.is_builder() {
        ProviderError::Permanent(format!("invalid TMDb request: {}", error))
    } else {
        ProviderError::Transient(format!("TMDb request failed: {}", error))
    }
}

#[async_trait::async_trait]
impl MetadataProvider for TmdbProvider {
    async fn fetch_by_id(&self, id: ExternalId) -> ProviderResult<Lookup<MovieRecord>> {
        let lookup = self
            .get_json::<TmdbMovie>(&format!("/movie/{}", id), &[])
            .await?;

        Ok(match lookup {
            Lookup::Found(movie) => Lookup::Found(self.to_record(movie)),
            Lookup::NotFound => Lookup::NotFound,
        })
    }

    async fn search_by_title(&self, title: &str) -> ProviderResult<Vec<MovieRecord>> {
        let lookup = self
            .get_json::<TmdbSearchResponse>("/search/movie", &[("query", title)])
            .await?;

        let records: Vec<MovieRecord> = match lookup {
            Lookup::Found(search) => search
                .results
                .into_iter()
                .map(|movie| self.to_record(movie))
                .collect(),
            Lookup::NotFound => Vec::new(),
        };

        tracing::debug!(
            title = %title,
            results = records.len(),
            provider = "tmdb",
            "Title search completed"
        );

        Ok(records)
    }

    async fn fetch_credits_by_id(&self, id: ExternalId) -> ProviderResult<Lookup<Credits>> {
        self.get_json::<Credits>(&format!("/movie/{}/credits", id), &[])
            .await
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn create_test_provider() -> TmdbProvider {
        TmdbProvider::new(
            "test_key".to_string(),
            "http://test.local/3/".to_string(),
            "https://image.tmdb.org/t/p/w500/".to_string(),
            Duration::from_secs(1),
        )
        .unwrap()
    }

    #[test]
    fn test_to_record_builds_image_url() {
        let provider = create_test_provider();
        let record = provider.to_record(TmdbMovie {
            id: 862,
            title: "Toy Story".to_string(),
            poster_path: Some("/uXDfjJbdP4ijW5hWSBrPrlKpxab.jpg".to_string()),
            overview: Some("Led by Woody...".to_string()),
            release_date: NaiveDate::from_ymd_opt(1995, 10, 30),
        });

        assert_eq!(record.external_id, ExternalId(862));
        assert_eq!(
            record.image_ref.as_deref(),
            Some("https://image.tmdb.org/t/p/w500/uXDfjJbdP4ijW5hWSBrPrlKpxab.jpg")
        );
        assert_eq!(record.overview.as_deref(), Some("Led by Woody..."));
    }

    #[test]
    fn test_to_record_without_poster() {
        let provider = create_test_provider();
        let record = provider.to_record(TmdbMovie {
            id: 1,
            title: "Obscure".to_string(),
            poster_path: None,
            overview: Some(String::new()),
            release_date: None,
        });

        assert_eq!(record.image_ref, None);
        assert_eq!(record.overview, None);
    }

    #[test]
    fn test_trailing_slash_trimmed_from_api_url() {
        let provider = create_test_provider();
        assert_eq!(provider.api_url, "http://test.local/3");
        assert_eq!(provider.name(), "tmdb");
    }

    #[test]
    fn test_classify_status_transient() {
        for status in [
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::REQUEST_TIMEOUT,
        ] {
            assert!(classify_status(status, "").is_retryable(), "{}", status);
        }
    }

    #[test]
    fn test_classify_status_permanent() {
        for status in [
            StatusCode::BAD_REQUEST,
            StatusCode::UNAUTHORIZED,
            StatusCode::FORBIDDEN,
            StatusCode::UNPROCESSABLE_ENTITY,
        ] {
            assert!(!classify_status(status, "").is_retryable(), "{}", status);
        }
    }
}
