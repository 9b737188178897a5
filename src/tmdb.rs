use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Days, NaiveDate, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::error::CatalogError;
use crate::genres::GenreDictionary;

pub const IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w500";

/// Genre browsing only looks this far ahead.
const GENRE_WINDOW_DAYS: u64 = 30;
/// Theatrical (2) or digital (3) releases.
const GENRE_RELEASE_TYPES: &str = "2|3";

/// A movie as shown to the user; genre ids are already resolved to names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub release_date: Option<String>,
    pub genres: Vec<String>,
    pub poster_url: Option<String>,
}

/// One remote page of results.
#[derive(Debug, Clone)]
pub struct MoviePage {
    pub movies: Vec<Movie>,
    pub elapsed: Duration,
}

/// Source of upcoming-movie listings.
pub trait Catalog: Send + Sync + 'static {
    fn list_upcoming(
        &self,
        region: &str,
        page: u32,
    ) -> impl Future<Output = Result<MoviePage, CatalogError>> + Send;

    fn list_upcoming_by_genre(
        &self,
        genre_id: i64,
        region: &str,
        page: u32,
    ) -> impl Future<Output = Result<MoviePage, CatalogError>> + Send;

    fn genres(&self) -> &GenreDictionary;
}

#[derive(Clone)]
pub struct TmdbClient {
    bearer: String,
    base_url: String,
    http: Client,
    genres: Arc<GenreDictionary>,
}

impl TmdbClient {
    pub fn new(bearer: String, base_url: String, timeout: Duration) -> reqwest::Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            bearer,
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            genres: Arc::default(),
        })
    }

    pub fn with_genres(mut self, genres: GenreDictionary) -> Self {
        self.genres = Arc::new(genres);
        self
    }

    /// Full genre list (EN), used to seed the local dictionary file.
    pub async fn fetch_genres(&self) -> Result<GenreDictionary, CatalogError> {
        let url = format!("{}/genre/movie/list?language=en", self.base_url);
        self.get_json(url, "genre/movie/list").await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: String,
        endpoint: &'static str,
    ) -> Result<T, CatalogError> {
        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.bearer)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(CatalogError::Status { status: resp.status(), endpoint });
        }
        Ok(resp.json().await?)
    }

    async fn fetch_page(&self, url: String, endpoint: &'static str) -> Result<MoviePage, CatalogError> {
        let started = Instant::now();
        let data: ResultsResp = self.get_json(url, endpoint).await?;
        let movies = normalize(data.results, &self.genres);
        let elapsed = started.elapsed();
        debug!(endpoint, movies = movies.len(), elapsed_ms = elapsed.as_millis() as u64, "catalog page fetched");
        Ok(MoviePage { movies, elapsed })
    }
}

impl Catalog for TmdbClient {
    async fn list_upcoming(&self, region: &str, page: u32) -> Result<MoviePage, CatalogError> {
        let url = upcoming_url(&self.base_url, region, page);
        self.fetch_page(url, "movie/upcoming").await
    }

    async fn list_upcoming_by_genre(
        &self,
        genre_id: i64,
        region: &str,
        page: u32,
    ) -> Result<MoviePage, CatalogError> {
        let today = Utc::now().date_naive();
        let url = discover_url(&self.base_url, genre_id, region, page, today);
        self.fetch_page(url, "discover/movie").await
    }

    fn genres(&self) -> &GenreDictionary {
        &self.genres
    }
}

fn upcoming_url(base: &str, region: &str, page: u32) -> String {
    format!(
        "{}/movie/upcoming?language=en-US&region={}&page={}",
        base,
        urlencoding::encode(region),
        page
    )
}

fn discover_url(base: &str, genre_id: i64, region: &str, page: u32, today: NaiveDate) -> String {
    let until = today + Days::new(GENRE_WINDOW_DAYS);
    format!(
        "{}/discover/movie?with_genres={}&region={}&include_adult=false&include_video=false\
         &language=en-US&sort_by=release_date.asc&release_date.gte={}&release_date.lte={}\
         &with_release_type={}&page={}",
        base,
        genre_id,
        urlencoding::encode(region),
        today.format("%Y-%m-%d"),
        until.format("%Y-%m-%d"),
        urlencoding::encode(GENRE_RELEASE_TYPES),
        page
    )
}

fn normalize(results: Vec<RawMovie>, genres: &GenreDictionary) -> Vec<Movie> {
    results
        .into_iter()
        .map(|m| Movie {
            id: m.id,
            title: m.title,
            release_date: m.release_date.filter(|d| !d.trim().is_empty()),
            genres: m
                .genre_ids
                .iter()
                .map(|id| genres.display_name(*id).to_string())
                .collect(),
            poster_url: m
                .poster_path
                .filter(|p| !p.is_empty())
                .map(|p| format!("{IMAGE_BASE}{p}")),
        })
        .collect()
}

/* ======= DTOs ======= */

#[derive(Deserialize, Debug)]
struct ResultsResp {
    #[serde(default)]
    results: Vec<RawMovie>,
}

#[derive(Deserialize, Debug)]
struct RawMovie {
    id: i64,
    #[serde(default)]
    title: String,
    release_date: Option<String>,
    #[serde(default)]
    genre_ids: Vec<i64>,
    poster_path: Option<String>,
}
