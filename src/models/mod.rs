use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Display;

/// Raw MovieLens user identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u32);

/// Raw MovieLens movie identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u32);

/// TMDb movie identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalId(pub u64);

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for ExternalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Dataset Types
// ============================================================================

/// One observed (user, movie, rating)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionRecord {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub rating: f64,
}

impl InteractionRecord {
    pub fn new(user_id: u32, item_id: u32, rating: f64) -> Self {
        Self {
            user_id: UserId(user_id),
            item_id: ItemId(item_id),
            rating,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub item_id: ItemId,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExternalIdMapping {
    pub item_id: ItemId,
    pub external_id: ExternalId,
}

// ============================================================================
// Resolution & Similarity Types
// ============================================================================

/// How a free-text query was matched to a catalog title
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    Exact,
    Fuzzy,
}

/// A resolved title with its match score in [0, 1]
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TitleMatch {
    pub item_id: ItemId,
    pub title: String,
    pub score: f64,
    pub method: MatchMethod,
}

/// A similar movie and its distance from the query movie
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Neighbor {
    pub item_id: ItemId,
    pub distance: f64,
}

// ============================================================================
// Metadata Types
// ============================================================================

/// Provider-neutral movie record returned by a metadata provider
#[derive(Debug, Clone, PartialEq)]
pub struct MovieRecord {
    pub external_id: ExternalId,
    pub title: String,
    pub image_ref: Option<String>,
    pub overview: Option<String>,
    pub release_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CastMember {
    pub name: String,
    #[serde(default)]
    pub character: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrewMember {
    pub name: String,
    pub job: String,
}

/// Cast and crew of a movie, in the order the provider returned them
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Credits {
    #[serde(default)]
    pub cast: Vec<CastMember>,
    #[serde(default)]
    pub crew: Vec<CrewMember>,
}

pub const PLACEHOLDER_TITLE: &str = "No movie found";

/// Display-ready movie metadata
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MetadataRecord {
    pub title: String,
    pub image_ref: Option<String>,
    pub external_id: Option<ExternalId>,
    pub overview: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub cast: Vec<String>,
    pub director: Option<String>,
}

impl MetadataRecord {
    /// Sentinel record used when every enrichment path failed for a movie
    pub fn placeholder() -> Self {
        Self {
            title: PLACEHOLDER_TITLE.to_string(),
            image_ref: None,
            external_id: None,
            overview: None,
            release_date: None,
            cast: Vec::new(),
            director: None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.external_id.is_none() && self.title == PLACEHOLDER_TITLE
    }
}

impl From<MovieRecord> for MetadataRecord {
    fn from(record: MovieRecord) -> Self {
        Self {
            title: record.title,
            image_ref: record.image_ref,
            external_id: Some(record.external_id),
            overview: record.overview,
            release_date: record.release_date,
            cast: Vec::new(),
            director: None,
        }
    }
}

// ============================================================================
// Response Types
// ============================================================================

/// One recommended movie, in similarity-rank order
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EnrichedCandidate {
    pub rank: usize,
    pub item_id: ItemId,
    pub title: String,
    pub distance: f64,
    pub metadata: MetadataRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendations {
    pub query: String,
    pub matched: TitleMatch,
    pub items: Vec<EnrichedCandidate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MovieDetail {
    pub item_id: ItemId,
    pub metadata: MetadataRecord,
    pub director: Option<String>,
    pub cast: Vec<String>,
    pub formatted_cast: String,
}

// ============================================================================
// TMDb API Types
// ============================================================================

/// Movie as returned by `/movie/{id}` and inside `/search/movie` results
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbMovie {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default, deserialize_with = "deserialize_release_date")]
    pub release_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct TmdbSearchResponse {
    #[serde(default)]
    pub results: Vec<TmdbMovie>,
}

/// TMDb sends "" for unknown release dates
fn deserialize_release_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(date) => NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
