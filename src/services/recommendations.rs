use std::sync::Arc;

use crate::{
    data::Datasets,
    error::{AppError, AppResult},
    models::{EnrichedCandidate, ItemId, MatchMethod, MovieDetail, Recommendations},
    services::{
        enrichment::{find_director, format_cast, top_cast, EnrichmentClient},
        rating_matrix::{self, RatingModel},
        similarity::{nearest_neighbors, DistanceMetric},
        title_resolver::{resolve, Catalog},
    },
};

/// Tunables for [`Recommender`]
#[derive(Debug, Clone)]
pub struct RecommenderSettings {
    pub metric: DistanceMetric,
    pub default_k: usize,
    pub max_k: usize,
    /// Fuzzy matches scoring below this are rejected
    pub min_match_score: f64,
}

impl Default for RecommenderSettings {
    fn default() -> Self {
        Self {
            metric: DistanceMetric::Cosine,
            default_k: 25,
            max_k: 100,
            min_match_score: 0.0,
        }
    }
}

/// Immutable recommendation context, built once at startup and shared by every request
pub struct Recommender {
    model: Arc<RatingModel>,
    catalog: Arc<Catalog>,
    enrichment: EnrichmentClient,
    settings: RecommenderSettings,
}

impl Recommender {
    pub fn new(
        model: RatingModel,
        catalog: Catalog,
        enrichment: EnrichmentClient,
        settings: RecommenderSettings,
    ) -> Self {
        Self {
            model: Arc::new(model),
            catalog: Arc::new(catalog),
            enrichment,
            settings,
        }
    }

    /// Builds the rating matrix and catalog index from loaded datasets
    ///
    /// Any failure here is fatal: the service must not start with a broken model.
    pub fn from_datasets(
        datasets: Datasets,
        enrichment: EnrichmentClient,
        settings: RecommenderSettings,
    ) -> AppResult<Self> {
        let model = rating_matrix::build(&datasets.interactions)?;
        let catalog = Catalog::new(datasets.catalog)?;

        if catalog.is_empty() {
            return Err(AppError::Configuration("movie catalog is empty".to_string()));
        }

        let untitled = model
            .items
            .ids()
            .iter()
            .filter(|id| catalog.title_of(**id).is_none())
            .count();
        if untitled > 0 {
            tracing::warn!(untitled, "Rated movies missing from the catalog");
        }

        Ok(Self::new(model, catalog, enrichment, settings))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn model(&self) -> &RatingModel {
        &self.model
    }

    /// Resolves the query, finds similar movies and enriches them in rank order
    ///
    /// A single movie's enrichment failure yields a placeholder record, never an error.
    pub async fn recommend(&self, query: &str, k: Option<usize>) -> AppResult<Recommendations> {
        let k = k.unwrap_or(self.settings.default_k);
        if k == 0 || k > self.settings.max_k {
            return Err(AppError::InvalidInput(format!(
                "k must be between 1 and {}",
                self.settings.max_k
            )));
        }

        let matched = resolve(query, &self.catalog)?;
        if matched.method == MatchMethod::Fuzzy && matched.score < self.settings.min_match_score {
            return Err(AppError::LowConfidenceMatch {
                query: query.to_string(),
                best_guess: matched.title,
                score: matched.score,
            });
        }

        let neighbors = nearest_neighbors(&self.model, matched.item_id, k, self.settings.metric)?;

        let candidates: Vec<(ItemId, String)> = neighbors
            .iter()
            .map(|neighbor| {
                let title = self
                    .catalog
                    .title_of(neighbor.item_id)
                    .unwrap_or_default()
                    .to_string();
                (neighbor.item_id, title)
            })
            .collect();

        let records = self.enrichment.enrich_batch(candidates.clone()).await;

        let items: Vec<EnrichedCandidate> = neighbors
            .into_iter()
            .zip(candidates)
            .zip(records)
            .enumerate()
            .map(|(rank, ((neighbor, (_, title)), metadata))| EnrichedCandidate {
                rank: rank + 1,
                item_id: neighbor.item_id,
                title,
                distance: neighbor.distance,
                metadata,
            })
            .collect();

        tracing::info!(
            query = %query,
            matched = %matched.title,
            method = ?matched.method,
            score = matched.score,
            results = items.len(),
            "Recommendations computed"
        );

        Ok(Recommendations {
            query: query.to_string(),
            matched,
            items,
        })
    }

    /// Full detail for one movie: metadata, director and the top-billed cast
    ///
    /// `title` drives the search fallback and defaults to the catalog title.
    pub async fn detail(&self, item_id: ItemId, title: Option<&str>) -> AppResult<MovieDetail> {
        let title = match title.map(str::trim).filter(|t| !t.is_empty()) {
            Some(title) => title.to_string(),
            None => self
                .catalog
                .title_of(item_id)
                .map(str::to_string)
                .ok_or_else(|| AppError::NotFound(format!("Movie {} not found", item_id)))?,
        };

        let (mut metadata, credits) = tokio::join!(
            self.enrichment.fetch_details(item_id, &title),
            self.enrichment.fetch_credits(item_id, &title)
        );

        let director = find_director(&credits);
        let cast = top_cast(&credits);
        let formatted_cast = format_cast(&cast);

        if !metadata.is_placeholder() {
            metadata.director = director.clone();
            metadata.cast = cast.clone();
        }

        Ok(MovieDetail {
            item_id,
            metadata,
            director,
            cast,
            formatted_cast,
        })
    }
}
