//! External metadata catalog capability
//!
//! The pipeline only talks to the catalog through the [`Catalog`] trait so the
//! TMDB client can be swapped for a scripted implementation in tests. Every call
//! may fail; callers treat a failure exactly like an empty result.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by catalog implementations
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog API key not configured")]
    NotConfigured,

    #[error("catalog API key is invalid")]
    Unauthorized,

    #[error("{0} not found in catalog")]
    NotFound(String),

    #[error("rate limited (429)")]
    RateLimited,

    #[error("catalog request failed with status {0}")]
    Status(u16),

    #[error("catalog request timed out")]
    Timeout,

    #[error("catalog request failed: {0}")]
    Http(String),

    #[error("failed to decode catalog response: {0}")]
    Decode(String),
}

impl CatalogError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited | Self::Timeout | Self::Http(_) => true,
            Self::Status(code) => *code == 408 || (500..600).contains(code),
            Self::NotConfigured | Self::Unauthorized | Self::NotFound(_) | Self::Decode(_) => false,
        }
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            Self::Status(status.as_u16())
        } else {
            Self::Http(e.to_string())
        }
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Movie search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieHit {
    pub id: u64,
    pub title: String,
    pub release_date: Option<String>,
    pub popularity: f64,
}

/// Series search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesHit {
    pub id: u64,
    pub name: String,
    pub first_air_date: Option<String>,
    pub popularity: f64,
}

/// Full movie record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieDetail {
    pub id: u64,
    pub title: String,
    pub original_title: Option<String>,
    pub release_date: Option<String>,
    pub overview: Option<String>,
    /// Lowercased genre names
    pub genres: Vec<String>,
    /// ISO 3166-1 production country codes
    pub production_countries: Vec<String>,
}

/// Full series record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesDetail {
    pub id: u64,
    pub name: String,
    pub original_name: Option<String>,
    pub first_air_date: Option<String>,
    pub origin_country: Vec<String>,
    /// Lowercased genre names
    pub genres: Vec<String>,
    pub overview: Option<String>,
}

/// A single episode
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeDetail {
    pub name: Option<String>,
    pub overview: Option<String>,
    pub air_date: Option<String>,
}

/// Read-only metadata catalog
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn search_movie(&self, query: &str) -> CatalogResult<Vec<MovieHit>>;

    async fn search_series(&self, query: &str) -> CatalogResult<Vec<SeriesHit>>;

    async fn movie_detail(&self, id: u64) -> CatalogResult<MovieDetail>;

    async fn series_detail(&self, id: u64) -> CatalogResult<SeriesDetail>;

    /// Lowercased keyword names attached to a movie
    async fn movie_keywords(&self, id: u64) -> CatalogResult<Vec<String>>;

    /// Lowercased keyword names attached to a series
    async fn series_keywords(&self, id: u64) -> CatalogResult<Vec<String>>;

    async fn episode_detail(&self, id: u64, season: u32, episode: u32)
    -> CatalogResult<EpisodeDetail>;
}

const ANIME_GENRES: &[&str] = &["animation", "anime"];
const ANIME_KEYWORDS: &[&str] = &["anime", "japanese animation"];

/// Anime if produced in Japan or tagged as animation/anime by genre or keyword.
pub fn looks_like_anime(countries: &[String], genres: &[String], keywords: &[String]) -> bool {
    let japanese = countries
        .iter()
        .any(|c| c.eq_ignore_ascii_case("JP") || c.eq_ignore_ascii_case("Japan"));
    let animated = genres
        .iter()
        .any(|g| ANIME_GENRES.contains(&g.to_lowercase().as_str()));
    let tagged = keywords
        .iter()
        .any(|k| ANIME_KEYWORDS.contains(&k.to_lowercase().as_str()));
    japanese || animated || tagged
}
