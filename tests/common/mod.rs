#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cinematch_api::{
    data::{load_catalog, load_interactions, load_links, Datasets},
    models::{CastMember, Credits, CrewMember, ExternalId, MovieRecord},
    routes::{create_router, AppState},
    services::{
        enrichment::{EnrichmentClient, RetryPolicy},
        providers::{Lookup, MetadataProvider, ProviderResult},
        Recommender, RecommenderSettings,
    },
};

pub const RATINGS_CSV: &str = "userId,movieId,rating,timestamp
1,1,4.0,964982703
1,2,4.0,964981247
1,3,4.0,964982224
1,5,5.0,964983815
2,1,5.0,964982931
2,2,3.0,964982400
2,4,3.5,964980868
2,6,4.0,964982176
3,1,3.0,964984041
3,3,2.0,964984100
3,4,4.0,964983650
3,5,1.0,964981208
4,2,5.0,964980694
4,5,4.5,964981304
4,6,2.5,964982653
";

pub const MOVIES_CSV: &str = "movieId,title,genres
1,Toy Story (1995),Adventure|Animation|Children|Comedy|Fantasy
2,Jumanji (1995),Adventure|Children|Fantasy
3,Grumpier Old Men (1995),Comedy|Romance
4,Waiting to Exhale (1995),Comedy|Drama|Romance
5,Father of the Bride Part II (1995),Comedy
6,Heat (1995),Action|Crime|Thriller
7,Sabrina (1995),Comedy|Romance
";

/// Movie 4 has no TMDb id
pub const LINKS_CSV: &str = "movieId,imdbId,tmdbId
1,0114709,862
2,0113497,8844
3,0113228,15602
4,0114885,
5,0113041,11862
6,0113277,949
7,0114319,11860
";

pub fn datasets() -> Datasets {
    Datasets {
        interactions: load_interactions(RATINGS_CSV.as_bytes()).unwrap(),
        catalog: load_catalog(MOVIES_CSV.as_bytes()).unwrap(),
        links: load_links(LINKS_CSV.as_bytes()).unwrap(),
    }
}

/// In-memory metadata provider. Unknown ids are "not found"; searches only match
/// titles registered with `with_search`.
#[derive(Default)]
pub struct FakeProvider {
    movies: HashMap<u64, MovieRecord>,
    credits: HashMap<u64, Credits>,
    searches: HashMap<String, Vec<MovieRecord>>,
    calls: AtomicUsize,
}

impl FakeProvider {
    pub fn with_movie(mut self, id: u64, title: &str) -> Self {
        self.movies.insert(id, record(id, title));
        self
    }

    pub fn with_credits(mut self, id: u64, cast: &[&str], director: Option<&str>) -> Self {
        let credits = Credits {
            cast: cast
                .iter()
                .map(|name| CastMember {
                    name: name.to_string(),
                    character: None,
                })
                .collect(),
            crew: director
                .into_iter()
                .map(|name| CrewMember {
                    name: name.to_string(),
                    job: "Director".to_string(),
                })
                .collect(),
        };
        self.credits.insert(id, credits);
        self
    }

    /// Provider round trips made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn with_search(mut self, title: &str, results: Vec<MovieRecord>) -> Self {
        self.searches.insert(title.to_string(), results);
        self
    }
}

pub fn record(id: u64, title: &str) -> MovieRecord {
    MovieRecord {
        external_id: ExternalId(id),
        title: title.to_string(),
        image_ref: Some(format!("https://image.tmdb.org/t/p/w500/{}.jpg", id)),
        overview: None,
        release_date: None,
    }
}

#[async_trait::async_trait]
impl MetadataProvider for FakeProvider {
    async fn fetch_by_id(&self, id: ExternalId) -> ProviderResult<Lookup<MovieRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(match self.movies.get(&id.0) {
            Some(movie) => Lookup::Found(movie.clone()),
            None => Lookup::NotFound,
        })
    }

    async fn search_by_title(&self, title: &str) -> ProviderResult<Vec<MovieRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.searches.get(title).cloned().unwrap_or_default())
    }

    async fn fetch_credits_by_id(&self, id: ExternalId) -> ProviderResult<Lookup<Credits>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(match self.credits.get(&id.0) {
            Some(credits) => Lookup::Found(credits.clone()),
            None => Lookup::NotFound,
        })
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Every linked movie resolvable by id except movie 4, which has no link and no search hit
pub fn default_provider() -> FakeProvider {
    FakeProvider::default()
        .with_movie(862, "Toy Story")
        .with_movie(8844, "Jumanji")
        .with_movie(15602, "Grumpier Old Men")
        .with_movie(11862, "Father of the Bride Part II")
        .with_movie(949, "Heat")
        .with_movie(11860, "Sabrina")
        .with_credits(
            862,
            &[
                "Tom Hanks",
                "Tim Allen",
                "Don Rickles",
                "Jim Varney",
                "Wallace Shawn",
                "John Ratzenberger",
                "Annie Potts",
                "John Morris",
                "Erik von Detten",
                "Laurie Metcalf",
                "R. Lee Ermey",
                "Sarah Freeman",
            ],
            Some("John Lasseter"),
        )
}

pub fn build_recommender(provider: Arc<dyn MetadataProvider>, settings: RecommenderSettings) -> Recommender {
    let data = datasets();
    let enrichment = EnrichmentClient::new(
        provider,
        &data.links,
        RetryPolicy {
            max_retries: 1,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
        },
        Duration::from_millis(500),
        3,
    );
    Recommender::from_datasets(data, enrichment, settings).unwrap()
}

pub fn create_test_app(provider: Arc<FakeProvider>) -> axum::Router {
    let recommender = build_recommender(provider, RecommenderSettings::default());
    create_router(Arc::new(AppState::new(recommender)))
}
