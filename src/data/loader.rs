/// CSV dataset loading
///
/// Reads the MovieLens-style ratings, movies and links files. Parsing happens once at
/// startup; any failure here is a configuration error and the service must not start.
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::{CatalogEntry, ExternalId, ExternalIdMapping, InteractionRecord, ItemId, UserId},
};

#[derive(Debug, Deserialize)]
struct RatingRow {
    #[serde(rename = "userId")]
    user_id: u32,
    #[serde(rename = "movieId")]
    movie_id: u32,
    rating: f64,
}

#[derive(Debug, Deserialize)]
struct MovieRow {
    #[serde(rename = "movieId")]
    movie_id: u32,
    title: String,
}

#[derive(Debug, Deserialize)]
struct LinkRow {
    #[serde(rename = "movieId")]
    movie_id: u32,
    #[serde(rename = "tmdbId")]
    tmdb_id: Option<u64>,
}

/// All static inputs the recommender is built from
#[derive(Debug, Clone)]
pub struct Datasets {
    pub interactions: Vec<InteractionRecord>,
    pub catalog: Vec<CatalogEntry>,
    pub links: Vec<ExternalIdMapping>,
}

impl Datasets {
    /// Loads the three datasets from disk
    pub fn from_paths(
        ratings_path: impl AsRef<Path>,
        movies_path: impl AsRef<Path>,
        links_path: impl AsRef<Path>,
    ) -> AppResult<Self> {
        let interactions = load_file(ratings_path.as_ref(), load_interactions)?;
        let catalog = load_file(movies_path.as_ref(), load_catalog)?;
        let links = load_file(links_path.as_ref(), load_links)?;

        tracing::info!(
            interactions = interactions.len(),
            movies = catalog.len(),
            links = links.len(),
            "Datasets loaded"
        );

        Ok(Self {
            interactions,
            catalog,
            links,
        })
    }
}

fn load_file<T>(path: &Path, parse: fn(File) -> AppResult<T>) -> AppResult<T> {
    let file = File::open(path).map_err(|e| {
        AppError::Configuration(format!("cannot open {}: {}", path.display(), e))
    })?;
    parse(file).map_err(|e| match e {
        AppError::Configuration(msg) => {
            AppError::Configuration(format!("{}: {}", path.display(), msg))
        }
        other => AppError::Configuration(format!("{}: {}", path.display(), other)),
    })
}

/// Parses `userId,movieId,rating[,timestamp]` rows
pub fn load_interactions<R: Read>(reader: R) -> AppResult<Vec<InteractionRecord>> {
    let mut csv_reader = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let mut records = Vec::new();

    for (line, row) in csv_reader.deserialize::<RatingRow>().enumerate() {
        let row = row?;
        if !row.rating.is_finite() {
            return Err(AppError::Configuration(format!(
                "row {}: rating {} is not a finite number",
                line + 1,
                row.rating
            )));
        }
        records.push(InteractionRecord {
            user_id: UserId(row.user_id),
            item_id: ItemId(row.movie_id),
            rating: row.rating,
        });
    }

    Ok(records)
}

/// Parses `movieId,title[,genres]` rows. Movie ids must be unique.
pub fn load_catalog<R: Read>(reader: R) -> AppResult<Vec<CatalogEntry>> {
    let mut csv_reader = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let mut entries = Vec::new();

    for row in csv_reader.deserialize::<MovieRow>() {
        let row = row?;
        entries.push(CatalogEntry {
            item_id: ItemId(row.movie_id),
            title: row.title,
        });
    }

    Ok(entries)
}

/// Parses `movieId[,imdbId],tmdbId` rows, skipping movies without a TMDb id
pub fn load_links<R: Read>(reader: R) -> AppResult<Vec<ExternalIdMapping>> {
    let mut csv_reader = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let mut links = Vec::new();
    let mut skipped = 0usize;

    for row in csv_reader.deserialize::<LinkRow>() {
        let row = row?;
        match row.tmdb_id {
            Some(tmdb_id) => links.push(ExternalIdMapping {
                item_id: ItemId(row.movie_id),
                external_id: ExternalId(tmdb_id),
            }),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        tracing::debug!(skipped, "Links without a TMDb id skipped");
    }

    Ok(links)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_interactions_ignores_timestamp() {
        let csv = "userId,movieId,rating,timestamp\n1,1,4.0,964982703\n1,3,4.5,964981247\n2,1,3.0,964982224\n";
        let records = load_interactions(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1], InteractionRecord::new(1, 3, 4.5));
    }

    #[test]
    fn test_load_interactions_rejects_non_finite_rating() {
        let csv = "userId,movieId,rating\n1,1,NaN\n";
        let result = load_interactions(csv.as_bytes());
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[test]
    fn test_load_interactions_rejects_malformed_row() {
        let csv = "userId,movieId,rating\n1,abc,4.0\n";
        assert!(matches!(
            load_interactions(csv.as_bytes()),
            Err(AppError::Csv(_))
        ));
    }

    #[test]
    fn test_load_catalog_handles_quoted_titles() {
        let csv = "movieId,title,genres\n1,Toy Story (1995),Adventure|Animation\n11,\"American President, The (1995)\",Comedy|Drama|Romance\n";
        let entries = load_catalog(csv.as_bytes()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].item_id, ItemId(11));
        assert_eq!(entries[1].title, "American President, The (1995)");
    }

    #[test]
    fn test_load_links_skips_missing_tmdb_id() {
        let csv = "movieId,imdbId,tmdbId\n1,0114709,862\n791,0113610,\n2,0113497,8844\n";
        let links = load_links(csv.as_bytes()).unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].external_id, ExternalId(862));
        assert_eq!(links[1].item_id, ItemId(2));
    }

    #[test]
    fn test_from_paths_missing_file_is_configuration_error() {
        let result = Datasets::from_paths(
            "/nonexistent/ratings.csv",
            "/nonexistent/movies.csv",
            "/nonexistent/links.csv",
        );
        match result {
            Err(AppError::Configuration(msg)) => assert!(msg.contains("ratings.csv")),
            other => panic!("expected configuration error, got {:?}", other),
        }
    }
}
