//! TMDB (The Movie Database) API client implementing the [`Catalog`] capability
//!
//! Base URL: https://api.themoviedb.org/3
//!
//! Rate limiting: TMDB allows ~40 requests per 10 seconds.
//! This client uses rate limiting and retry logic to handle this gracefully.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::catalog::{
    Catalog, CatalogError, CatalogResult, EpisodeDetail, MovieDetail, MovieHit, SeriesDetail,
    SeriesHit,
};
use super::rate_limiter::{RateLimitedClient, RetryConfig, retry_async};
use crate::config::CatalogConfig;

/// TMDB API client with rate limiting and retry logic
pub struct TmdbClient {
    client: Arc<RateLimitedClient>,
    base_url: String,
    api_key: String,
    language: Option<String>,
    retry_config: RetryConfig,
}

/// Paged search response from TMDB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbSearchResult<T> {
    pub page: i32,
    pub results: Vec<T>,
    pub total_pages: i32,
    pub total_results: i32,
}

/// Movie from TMDB (search results carry a subset of the fields)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbMovie {
    pub id: u64,
    pub title: String,
    pub original_title: Option<String>,
    pub overview: Option<String>,
    pub release_date: Option<String>,
    pub popularity: Option<f64>,
    /// Only in movie details
    pub genres: Option<Vec<TmdbGenre>>,
    /// Only in movie details
    pub production_countries: Option<Vec<TmdbProductionCountry>>,
}

/// TV show from TMDB (search results carry a subset of the fields)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbTvShow {
    pub id: u64,
    pub name: String,
    pub original_name: Option<String>,
    pub overview: Option<String>,
    pub first_air_date: Option<String>,
    pub popularity: Option<f64>,
    #[serde(default)]
    pub origin_country: Vec<String>,
    /// Only in TV details
    pub genres: Option<Vec<TmdbGenre>>,
}

/// Episode details from TMDB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbEpisode {
    pub id: u64,
    pub name: Option<String>,
    pub overview: Option<String>,
    pub air_date: Option<String>,
    pub season_number: Option<u32>,
    pub episode_number: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbGenre {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbProductionCountry {
    pub iso_3166_1: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbKeyword {
    pub id: i64,
    pub name: String,
}

/// Movie keywords use a `keywords` list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbMovieKeywords {
    #[serde(default)]
    pub keywords: Vec<TmdbKeyword>,
}

/// TV keywords use a `results` list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbTvKeywords {
    #[serde(default)]
    pub results: Vec<TmdbKeyword>,
}

impl TmdbClient {
    /// Create a new TMDB client from the catalog settings
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .context("TMDB API key not configured")?;

        let client = RateLimitedClient::for_tmdb(config.timeout)
            .context("Failed to create TMDB HTTP client")?;

        Ok(Self {
            client: Arc::new(client),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            language: config.language.clone(),
            retry_config: RetryConfig {
                max_retries: config.max_retries.max(1),
                ..RetryConfig::default()
            },
        })
    }

    /// Check if the client has a valid API key configured
    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// GET `{base_url}/{path}` and decode the JSON body, with retries
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        extra: &[(&str, String)],
        what: &str,
    ) -> CatalogResult<T> {
        if !self.has_api_key() {
            return Err(CatalogError::NotConfigured);
        }

        let url = format!("{}/{}", self.base_url, path);
        let mut params: Vec<(String, String)> = vec![("api_key".to_string(), self.api_key.clone())];
        if let Some(lang) = &self.language {
            params.push(("language".to_string(), lang.clone()));
        }
        params.extend(extra.iter().map(|(k, v)| (k.to_string(), v.clone())));

        let client = self.client.clone();
        let what = what.to_string();

        retry_async(
            || {
                let url = url.clone();
                let client = client.clone();
                let params = params.clone();
                let what = what.clone();
                async move {
                    let response = client.get_with_query(&url, &params).await?;

                    match response.status().as_u16() {
                        429 => {
                            warn!("TMDB rate limit hit, will retry");
                            return Err(CatalogError::RateLimited);
                        }
                        401 => return Err(CatalogError::Unauthorized),
                        404 => return Err(CatalogError::NotFound(what)),
                        status if !response.status().is_success() => {
                            return Err(CatalogError::Status(status));
                        }
                        _ => {}
                    }

                    response
                        .json::<T>()
                        .await
                        .map_err(|e| CatalogError::Decode(e.to_string()))
                }
            },
            &self.retry_config,
            path,
        )
        .await
    }
}

#[async_trait]
impl Catalog for TmdbClient {
    async fn search_movie(&self, query: &str) -> CatalogResult<Vec<MovieHit>> {
        info!("Searching TMDB for movie '{}'", query);

        let results: TmdbSearchResult<TmdbMovie> = self
            .get_json(
                "search/movie",
                &[
                    ("query", query.to_string()),
                    ("include_adult", "false".to_string()),
                ],
                "movie search",
            )
            .await?;

        debug!(count = results.results.len(), "TMDB movie search returned results");
        Ok(results.results.into_iter().map(MovieHit::from).collect())
    }

    async fn search_series(&self, query: &str) -> CatalogResult<Vec<SeriesHit>> {
        info!("Searching TMDB for series '{}'", query);

        let results: TmdbSearchResult<TmdbTvShow> = self
            .get_json(
                "search/tv",
                &[
                    ("query", query.to_string()),
                    ("include_adult", "false".to_string()),
                ],
                "series search",
            )
            .await?;

        debug!(count = results.results.len(), "TMDB series search returned results");
        Ok(results.results.into_iter().map(SeriesHit::from).collect())
    }

    async fn movie_detail(&self, id: u64) -> CatalogResult<MovieDetail> {
        debug!("Fetching movie details from TMDB (ID: {})", id);
        let movie: TmdbMovie = self
            .get_json(&format!("movie/{}", id), &[], "movie")
            .await?;
        Ok(movie.into())
    }

    async fn series_detail(&self, id: u64) -> CatalogResult<SeriesDetail> {
        debug!("Fetching series details from TMDB (ID: {})", id);
        let show: TmdbTvShow = self.get_json(&format!("tv/{}", id), &[], "series").await?;
        Ok(show.into())
    }

    async fn movie_keywords(&self, id: u64) -> CatalogResult<Vec<String>> {
        let keywords: TmdbMovieKeywords = self
            .get_json(&format!("movie/{}/keywords", id), &[], "movie keywords")
            .await?;
        Ok(keyword_names(keywords.keywords))
    }

    async fn series_keywords(&self, id: u64) -> CatalogResult<Vec<String>> {
        let keywords: TmdbTvKeywords = self
            .get_json(&format!("tv/{}/keywords", id), &[], "series keywords")
            .await?;
        Ok(keyword_names(keywords.results))
    }

    async fn episode_detail(
        &self,
        id: u64,
        season: u32,
        episode: u32,
    ) -> CatalogResult<EpisodeDetail> {
        debug!(
            "Fetching episode details from TMDB (ID: {}, S{:02}E{:02})",
            id, season, episode
        );
        let ep: TmdbEpisode = self
            .get_json(
                &format!("tv/{}/season/{}/episode/{}", id, season, episode),
                &[],
                "episode",
            )
            .await?;
        Ok(ep.into())
    }
}

fn keyword_names(keywords: Vec<TmdbKeyword>) -> Vec<String> {
    keywords.into_iter().map(|k| k.name.to_lowercase()).collect()
}

fn genre_names(genres: Option<Vec<TmdbGenre>>) -> Vec<String> {
    genres
        .unwrap_or_default()
        .into_iter()
        .map(|g| g.name.to_lowercase())
        .collect()
}

impl From<TmdbMovie> for MovieHit {
    fn from(movie: TmdbMovie) -> Self {
        Self {
            id: movie.id,
            title: movie.title,
            release_date: movie.release_date.filter(|d| !d.is_empty()),
            popularity: movie.popularity.unwrap_or(0.0),
        }
    }
}

impl From<TmdbTvShow> for SeriesHit {
    fn from(show: TmdbTvShow) -> Self {
        Self {
            id: show.id,
            name: show.name,
            first_air_date: show.first_air_date.filter(|d| !d.is_empty()),
            popularity: show.popularity.unwrap_or(0.0),
        }
    }
}

impl From<TmdbMovie> for MovieDetail {
    fn from(movie: TmdbMovie) -> Self {
        Self {
            id: movie.id,
            title: movie.title,
            original_title: movie.original_title,
            release_date: movie.release_date.filter(|d| !d.is_empty()),
            overview: movie.overview,
            genres: genre_names(movie.genres),
            production_countries: movie
                .production_countries
                .unwrap_or_default()
                .into_iter()
                .map(|c| c.iso_3166_1)
                .collect(),
        }
    }
}

impl From<TmdbTvShow> for SeriesDetail {
    fn from(show: TmdbTvShow) -> Self {
        Self {
            id: show.id,
            name: show.name,
            original_name: show.original_name,
            first_air_date: show.first_air_date.filter(|d| !d.is_empty()),
            origin_country: show.origin_country,
            genres: genre_names(show.genres),
            overview: show.overview,
        }
    }
}

impl From<TmdbEpisode> for EpisodeDetail {
    fn from(ep: TmdbEpisode) -> Self {
        Self {
            name: ep.name.filter(|n| !n.is_empty()),
            overview: ep.overview.filter(|o| !o.is_empty()),
            air_date: ep.air_date.filter(|d| !d.is_empty()),
        }
    }
}
