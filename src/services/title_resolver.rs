use std::collections::{BTreeSet, HashMap};

use strsim::normalized_levenshtein;

use crate::{
    error::{AppError, AppResult},
    models::{CatalogEntry, ItemId, MatchMethod, TitleMatch},
};

/// Weight applied to matches against the bare form of a title (no year, article in front)
const BARE_TITLE_WEIGHT: f64 = 0.95;

/// Weight applied to substring and token-set matches, so a whole-title match wins a tie
const PARTIAL_WEIGHT: f64 = 0.9;

/// Default number of suggestions returned by title search
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Read-only movie catalog with exact title and id lookups
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    by_title: HashMap<String, ItemId>,
    by_id: HashMap<ItemId, usize>,
}

impl Catalog {
    /// Indexes the catalog. Movie ids must be unique; for a repeated title the last
    /// entry wins exact lookups.
    pub fn new(entries: Vec<CatalogEntry>) -> AppResult<Self> {
        let mut by_title = HashMap::with_capacity(entries.len());
        let mut by_id = HashMap::with_capacity(entries.len());

        for (position, entry) in entries.iter().enumerate() {
            if by_id.insert(entry.item_id, position).is_some() {
                return Err(AppError::Configuration(format!(
                    "movie id {} appears more than once in the catalog",
                    entry.item_id
                )));
            }
            if let Some(previous) = by_title.insert(entry.title.clone(), entry.item_id) {
                tracing::debug!(
                    title = %entry.title,
                    previous = %previous,
                    item_id = %entry.item_id,
                    "Duplicate title, exact lookups resolve to the later movie"
                );
            }
        }

        Ok(Self {
            entries,
            by_title,
            by_id,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn title_of(&self, item_id: ItemId) -> Option<&str> {
        self.by_id
            .get(&item_id)
            .map(|&position| self.entries[position].title.as_str())
    }

    pub fn id_of(&self, title: &str) -> Option<ItemId> {
        self.by_title.get(title).copied()
    }
}

/// Resolves a free-text query to a catalog movie
///
/// Exact, case-sensitive title lookup first. Otherwise the best fuzzy match is returned
/// whatever its score, so callers should check `score` before trusting it.
pub fn resolve(query: &str, catalog: &Catalog) -> AppResult<TitleMatch> {
    resolve_with(query, catalog, title_similarity)
}

/// [`resolve`] with a custom fuzzy scorer, called as `scorer(query, title)`
pub fn resolve_with<F>(query: &str, catalog: &Catalog, mut scorer: F) -> AppResult<TitleMatch>
where
    F: FnMut(&str, &str) -> f64,
{
    if catalog.is_empty() {
        return Err(AppError::NotFound(
            "movie catalog is empty".to_string(),
        ));
    }

    if let Some(item_id) = catalog.id_of(query) {
        return Ok(TitleMatch {
            item_id,
            title: query.to_string(),
            score: 1.0,
            method: MatchMethod::Exact,
        });
    }

    let mut best: Option<(&CatalogEntry, f64)> = None;
    for entry in catalog.entries() {
        let score = scorer(query, &entry.title);
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((entry, score));
        }
    }

    let (entry, score) = best.ok_or_else(|| AppError::Internal("no fuzzy candidate".to_string()))?;

    tracing::info!(
        query = %query,
        matched = %entry.title,
        score,
        "No exact title match, using fuzzy match"
    );

    Ok(TitleMatch {
        item_id: entry.item_id,
        title: entry.title.clone(),
        score,
        method: MatchMethod::Fuzzy,
    })
}

/// Similarity in [0, 1] between a user query and a catalog title
///
/// Best of four comparisons: the full title, its bare form (e.g. "Matrix, The (1999)"
/// tried as "The Matrix"), the best title substring as long as the query, and the
/// shared word set. The last two let "star wars" find "Star Wars: Episode IV - A New
/// Hope (1977)".
pub fn title_similarity(query: &str, title: &str) -> f64 {
    let query = normalize(query);
    let normalized_title = normalize(title);

    let full = normalized_levenshtein(&query, &normalized_title);
    let bare = normalized_levenshtein(&query, &normalize(&bare_title(title))) * BARE_TITLE_WEIGHT;
    let partial = partial_similarity(&query, &normalized_title) * PARTIAL_WEIGHT;
    let tokens = token_set_similarity(&query, &normalized_title) * PARTIAL_WEIGHT;

    full.max(bare).max(partial).max(tokens)
}

/// Best similarity between `query` and any window of `title` of the same length
fn partial_similarity(query: &str, title: &str) -> f64 {
    let needle: Vec<char> = query.chars().collect();
    let haystack: Vec<char> = title.chars().collect();
    if needle.is_empty() || needle.len() >= haystack.len() {
        return 0.0;
    }

    haystack
        .windows(needle.len())
        .map(|window| {
            let window: String = window.iter().collect();
            normalized_levenshtein(query, &window)
        })
        .fold(0.0, f64::max)
}

/// Compares the words both strings share against each side's full word set
///
/// A query whose words all appear in the title scores 1.0.
fn token_set_similarity(query: &str, title: &str) -> f64 {
    let query_tokens: BTreeSet<&str> = query.split_whitespace().collect();
    let title_tokens: BTreeSet<&str> = title.split_whitespace().collect();
    if query_tokens.is_empty() || title_tokens.is_empty() {
        return 0.0;
    }

    let common = join_tokens(query_tokens.intersection(&title_tokens));
    let with_query = join_parts(&common, &join_tokens(query_tokens.difference(&title_tokens)));
    let with_title = join_parts(&common, &join_tokens(title_tokens.difference(&query_tokens)));

    let mut best = normalized_levenshtein(&with_query, &with_title);
    if !common.is_empty() {
        best = best
            .max(normalized_levenshtein(&common, &with_query))
            .max(normalized_levenshtein(&common, &with_title));
    }
    best
}

fn join_tokens<'a, 'b: 'a>(tokens: impl Iterator<Item = &'a &'b str>) -> String {
    tokens.copied().collect::<Vec<&str>>().join(" ")
}

fn join_parts(head: &str, tail: &str) -> String {
    match (head.is_empty(), tail.is_empty()) {
        (true, _) => tail.to_string(),
        (_, true) => head.to_string(),
        _ => format!("{} {}", head, tail),
    }
}

fn normalize(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Drops a trailing "(1995)" and moves a trailing ", The" / ", A" / ", An" to the front
fn bare_title(title: &str) -> String {
    let mut bare = title.trim();

    if let Some(open) = bare.rfind('(') {
        let year = &bare[open..];
        let inner = year.trim_start_matches('(').trim_end_matches(')');
        if year.ends_with(')')
            && !inner.is_empty()
            && inner.chars().all(|c| c.is_ascii_digit() || c == '-' || c == '–')
        {
            bare = bare[..open].trim_end();
        }
    }

    for article in ["The", "A", "An"] {
        let suffix = format!(", {}", article);
        if let Some(stem) = bare.strip_suffix(suffix.as_str()) {
            return format!("{} {}", article, stem);
        }
    }

    bare.to_string()
}

/// Case-insensitive substring search over catalog titles, in catalog order
pub fn search_titles(catalog: &Catalog, query: &str, limit: usize) -> AppResult<Vec<String>> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Err(AppError::InvalidInput(
            "Search query cannot be empty".to_string(),
        ));
    }

    let titles: Vec<String> = catalog
        .entries()
        .iter()
        .filter(|entry| entry.title.to_lowercase().contains(&needle))
        .take(limit)
        .map(|entry| entry.title.clone())
        .collect();

    if titles.is_empty() {
        return Err(AppError::NotFound(format!("No movies found for '{}'", query)));
    }

    Ok(titles)
}
