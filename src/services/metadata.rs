//! Metadata enricher
//!
//! Reconciles extracted attributes with the catalog. An id bound during
//! classification is never replaced; otherwise movies go through progressively
//! looser search queries and series through a single (anime-biased) search.
//! Every catalog failure degrades to "no enrichment".

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::catalog::{Catalog, CatalogResult, MovieHit};
use super::text_utils::{clean_title, first_words, series_search_title, strip_punctuation, with_year};
use crate::media::{FileAttributes, MediaCategory, year_of};

/// Attributes after enrichment and whether any catalog data was applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentOutcome {
    pub attributes: FileAttributes,
    pub applied: bool,
}

impl EnrichmentOutcome {
    fn unchanged(attributes: FileAttributes) -> Self {
        Self {
            attributes,
            applied: false,
        }
    }
}

/// Named movie search strategies, tried in this order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovieStrategy {
    CleanTitleWithYear,
    BareTitleWithYear,
    BareTitle,
    LeadingWords,
}

impl MovieStrategy {
    pub const ORDER: [MovieStrategy; 4] = [
        Self::CleanTitleWithYear,
        Self::BareTitleWithYear,
        Self::BareTitle,
        Self::LeadingWords,
    ];

    /// Search query for this strategy, `None` when it would be empty
    pub fn query(&self, title: &str, year: Option<&str>) -> Option<String> {
        let bare = strip_punctuation(title);
        let query = match self {
            Self::CleanTitleWithYear => with_year(&clean_title(title), year),
            Self::BareTitleWithYear => with_year(&bare, year),
            Self::BareTitle => bare,
            Self::LeadingWords => first_words(&strip_punctuation(&clean_title(title)), 3),
        };
        Some(query).filter(|q| !q.trim().is_empty())
    }
}

/// Fills title, year, catalog id and episode details from the catalog
pub struct MetadataEnricher {
    catalog: Arc<dyn Catalog>,
}

impl MetadataEnricher {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }

    pub async fn enrich(&self, attributes: FileAttributes, category: MediaCategory) -> EnrichmentOutcome {
        if let Some(id) = attributes.catalog_id {
            return self.refresh_bound(attributes, id, category).await;
        }
        if attributes.title_or_empty().trim().is_empty() {
            debug!("No title to search the catalog with");
            return EnrichmentOutcome::unchanged(attributes);
        }

        if category.is_series() {
            self.enrich_series(attributes, category).await
        } else {
            self.enrich_movie(attributes).await
        }
    }

    /// An id is already bound: no search, only refresh from the detail record.
    async fn refresh_bound(
        &self,
        mut attributes: FileAttributes,
        id: u64,
        category: MediaCategory,
    ) -> EnrichmentOutcome {
        debug!(catalog_id = id, "Catalog id already bound, refreshing details");

        let mut applied = false;
        if category.is_series() {
            if let Some(detail) = best_effort(self.catalog.series_detail(id).await, "series detail") {
                attributes.title = Some(detail.name).filter(|n| !n.is_empty()).or(attributes.title);
                attributes.year = detail
                    .first_air_date
                    .as_deref()
                    .and_then(year_of)
                    .or(attributes.year);
                applied = true;
            }
            applied |= self.fill_episode(&mut attributes, id).await;
        } else if let Some(detail) = best_effort(self.catalog.movie_detail(id).await, "movie detail") {
            attributes.title = Some(detail.title).filter(|t| !t.is_empty()).or(attributes.title);
            attributes.year = detail
                .release_date
                .as_deref()
                .and_then(year_of)
                .or(attributes.year);
            applied = true;
        }

        EnrichmentOutcome { attributes, applied }
    }

    async fn enrich_movie(&self, mut attributes: FileAttributes) -> EnrichmentOutcome {
        let title = attributes.title_or_empty().to_string();
        let year = attributes.year.clone();
        let mut tried: Vec<String> = Vec::new();

        for strategy in MovieStrategy::ORDER {
            let Some(query) = strategy.query(&title, year.as_deref()) else {
                continue;
            };
            if tried.contains(&query) {
                continue;
            }

            let hits = best_effort(self.catalog.search_movie(&query).await, "movie search")
                .unwrap_or_default();

            if let Some(hit) = hits.into_iter().next() {
                info!(
                    strategy = ?strategy,
                    query = %query,
                    catalog_id = hit.id,
                    "Found movie in catalog"
                );
                attributes.bind_catalog_id(hit.id);
                self.apply_movie_detail(&mut attributes, hit).await;
                return EnrichmentOutcome {
                    attributes,
                    applied: true,
                };
            }
            tried.push(query);
        }

        debug!(title = %title, "No catalog match for movie");
        EnrichmentOutcome::unchanged(attributes)
    }

    /// Canonical title and year from the detail record, or from the hit itself
    /// when the detail call fails.
    async fn apply_movie_detail(&self, attributes: &mut FileAttributes, hit: MovieHit) {
        let id = attributes.catalog_id.unwrap_or(hit.id);
        let (title, release_date) =
            match best_effort(self.catalog.movie_detail(id).await, "movie detail") {
                Some(detail) => (detail.title, detail.release_date.or(hit.release_date)),
                None => (hit.title, hit.release_date),
            };

        if !title.trim().is_empty() {
            attributes.title = Some(title);
        }
        attributes.year = release_date
            .as_deref()
            .and_then(year_of)
            .or(attributes.year.take());
    }

    async fn enrich_series(
        &self,
        mut attributes: FileAttributes,
        category: MediaCategory,
    ) -> EnrichmentOutcome {
        let query = series_search_title(attributes.title_or_empty());
        if query.is_empty() {
            return EnrichmentOutcome::unchanged(attributes);
        }

        let mut hits = Vec::new();
        if category.is_anime() {
            let anime_query = format!("{} anime", query);
            hits = best_effort(self.catalog.search_series(&anime_query).await, "series search")
                .unwrap_or_default();
        }
        if hits.is_empty() {
            hits = best_effort(self.catalog.search_series(&query).await, "series search")
                .unwrap_or_default();
        }

        let Some(hit) = hits.into_iter().next() else {
            debug!(query = %query, "No catalog match for series");
            return EnrichmentOutcome::unchanged(attributes);
        };

        let Some(detail) = best_effort(self.catalog.series_detail(hit.id).await, "series detail") else {
            return EnrichmentOutcome::unchanged(attributes);
        };

        info!(query = %query, catalog_id = detail.id, name = %detail.name, "Found series in catalog");
        attributes.bind_catalog_id(detail.id);
        if !detail.name.is_empty() {
            attributes.title = Some(detail.name);
        }
        attributes.year = detail
            .first_air_date
            .as_deref()
            .and_then(year_of)
            .or(attributes.year);

        let id = attributes.catalog_id.unwrap_or(detail.id);
        self.fill_episode(&mut attributes, id).await;

        EnrichmentOutcome {
            attributes,
            applied: true,
        }
    }

    /// Episode title, overview and air date when season and episode are known.
    async fn fill_episode(&self, attributes: &mut FileAttributes, id: u64) -> bool {
        let (Some(season), Some(episode)) = (attributes.season, attributes.episode) else {
            return false;
        };

        match best_effort(
            self.catalog.episode_detail(id, season, episode).await,
            "episode detail",
        ) {
            Some(detail) => {
                debug!(catalog_id = id, season, episode, name = ?detail.name, "Fetched episode details");
                if detail.name.is_some() {
                    attributes.episode_title = detail.name;
                }
                attributes.episode_overview = detail.overview;
                attributes.episode_air_date = detail.air_date;
                true
            }
            None => false,
        }
    }
}

/// A failed catalog call counts as an empty answer.
fn best_effort<T>(result: CatalogResult<T>, what: &str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(call = what, error = %e, "Catalog call failed, continuing without it");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::services::catalog::{CatalogError, EpisodeDetail, MovieDetail, SeriesDetail, SeriesHit};

    /// Answers searches from fixed tables and records every query
    #[derive(Default)]
    struct ScriptedCatalog {
        movies: HashMap<String, Vec<MovieHit>>,
        series: HashMap<String, Vec<SeriesHit>>,
        series_details: HashMap<u64, SeriesDetail>,
        movie_details: HashMap<u64, MovieDetail>,
        episodes: HashMap<(u64, u32, u32), EpisodeDetail>,
        queries: Mutex<Vec<String>>,
    }

    impl ScriptedCatalog {
        fn queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Catalog for ScriptedCatalog {
        async fn search_movie(&self, query: &str) -> CatalogResult<Vec<MovieHit>> {
            self.queries.lock().unwrap().push(query.to_string());
            Ok(self.movies.get(query).cloned().unwrap_or_default())
        }

        async fn search_series(&self, query: &str) -> CatalogResult<Vec<SeriesHit>> {
            self.queries.lock().unwrap().push(query.to_string());
            Ok(self.series.get(query).cloned().unwrap_or_default())
        }

        async fn movie_detail(&self, id: u64) -> CatalogResult<MovieDetail> {
            self.movie_details
                .get(&id)
                .cloned()
                .ok_or_else(|| CatalogError::NotFound("movie".to_string()))
        }

        async fn series_detail(&self, id: u64) -> CatalogResult<SeriesDetail> {
            self.series_details
                .get(&id)
                .cloned()
                .ok_or_else(|| CatalogError::NotFound("series".to_string()))
        }

        async fn movie_keywords(&self, _id: u64) -> CatalogResult<Vec<String>> {
            Ok(Vec::new())
        }

        async fn series_keywords(&self, _id: u64) -> CatalogResult<Vec<String>> {
            Ok(Vec::new())
        }

        async fn episode_detail(
            &self,
            id: u64,
            season: u32,
            episode: u32,
        ) -> CatalogResult<EpisodeDetail> {
            self.episodes
                .get(&(id, season, episode))
                .cloned()
                .ok_or(CatalogError::Timeout)
        }
    }

    fn movie_hit(id: u64, title: &str, date: &str) -> MovieHit {
        MovieHit {
            id,
            title: title.to_string(),
            release_date: Some(date.to_string()),
            popularity: 10.0,
        }
    }

    #[test]
    fn test_movie_strategy_queries() {
        let title = "Mission: Impossible - Fallout";
        assert_eq!(
            MovieStrategy::CleanTitleWithYear.query(title, Some("2018")).as_deref(),
            Some("Mission: Impossible Fallout 2018")
        );
        assert_eq!(
            MovieStrategy::BareTitleWithYear.query(title, Some("2018")).as_deref(),
            Some("Mission Impossible Fallout 2018")
        );
        assert_eq!(
            MovieStrategy::BareTitle.query(title, Some("2018")).as_deref(),
            Some("Mission Impossible Fallout")
        );
        assert_eq!(
            MovieStrategy::LeadingWords.query(title, None).as_deref(),
            Some("Mission Impossible Fallout")
        );
        assert_eq!(MovieStrategy::BareTitle.query("!!", None), None);
    }

    #[tokio::test]
    async fn test_movie_search_relaxes_until_hit() {
        let mut catalog = ScriptedCatalog::default();
        catalog.movies.insert(
            "The Lord of".to_string(),
            vec![movie_hit(120, "The Lord of the Rings", "2001-12-18")],
        );
        let catalog = Arc::new(catalog);
        let enricher = MetadataEnricher::new(catalog.clone());

        let attrs = FileAttributes {
            title: Some("The.Lord.of.the.Rings.Extended".to_string()),
            ..FileAttributes::default()
        };
        let outcome = enricher.enrich(attrs, MediaCategory::Movie).await;

        assert!(outcome.applied);
        assert_eq!(outcome.attributes.catalog_id, Some(120));
        assert_eq!(outcome.attributes.year.as_deref(), Some("2001"));
        // No detail record scripted: the hit itself names the movie
        assert_eq!(outcome.attributes.title.as_deref(), Some("The Lord of the Rings"));
        assert_eq!(
            catalog.queries(),
            vec![
                "The Lord of the Rings Extended".to_string(),
                "The Lord of".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_movie_hit_takes_canonical_title_from_detail() {
        let mut catalog = ScriptedCatalog::default();
        catalog.movies.insert(
            "Lotr Fellowship 2001".to_string(),
            vec![movie_hit(120, "Fellowship", "2001-01-01")],
        );
        catalog.movie_details.insert(
            120,
            MovieDetail {
                id: 120,
                title: "The Lord of the Rings: The Fellowship of the Ring".to_string(),
                release_date: Some("2001-12-18".to_string()),
                ..MovieDetail::default()
            },
        );
        let enricher = MetadataEnricher::new(Arc::new(catalog));

        let attrs = FileAttributes {
            title: Some("Lotr.Fellowship".to_string()),
            year: Some("2001".to_string()),
            ..FileAttributes::default()
        };
        let outcome = enricher.enrich(attrs, MediaCategory::Movie).await;

        assert!(outcome.applied);
        assert_eq!(outcome.attributes.catalog_id, Some(120));
        assert_eq!(
            outcome.attributes.title.as_deref(),
            Some("The Lord of the Rings: The Fellowship of the Ring")
        );
        assert_eq!(outcome.attributes.year.as_deref(), Some("2001"));
    }

    #[tokio::test]
    async fn test_bound_id_skips_search() {
        let mut catalog = ScriptedCatalog::default();
        catalog.movie_details.insert(
            19995,
            MovieDetail {
                id: 19995,
                title: "Avatar".to_string(),
                release_date: Some("2009-12-18".to_string()),
                ..MovieDetail::default()
            },
        );
        let catalog = Arc::new(catalog);
        let enricher = MetadataEnricher::new(catalog.clone());

        let attrs = FileAttributes {
            title: Some("avatar".to_string()),
            catalog_id: Some(19995),
            ..FileAttributes::default()
        };
        let outcome = enricher.enrich(attrs, MediaCategory::Movie).await;

        assert!(outcome.applied);
        assert_eq!(outcome.attributes.catalog_id, Some(19995));
        assert_eq!(outcome.attributes.title.as_deref(), Some("Avatar"));
        assert_eq!(outcome.attributes.year.as_deref(), Some("2009"));
        assert!(catalog.queries().is_empty());
    }

    #[tokio::test]
    async fn test_anime_series_query_falls_back_to_plain() {
        let mut catalog = ScriptedCatalog::default();
        catalog.series.insert(
            "One Piece".to_string(),
            vec![SeriesHit {
                id: 37854,
                name: "One Piece".to_string(),
                first_air_date: Some("1999-10-20".to_string()),
                popularity: 90.0,
            }],
        );
        catalog.series_details.insert(
            37854,
            SeriesDetail {
                id: 37854,
                name: "One Piece".to_string(),
                first_air_date: Some("1999-10-20".to_string()),
                ..SeriesDetail::default()
            },
        );
        catalog.episodes.insert(
            (37854, 1, 1001),
            EpisodeDetail {
                name: Some("Wano".to_string()),
                overview: None,
                air_date: Some("2021-11-21".to_string()),
            },
        );
        let catalog = Arc::new(catalog);
        let enricher = MetadataEnricher::new(catalog.clone());

        let attrs = FileAttributes {
            title: Some("One Piece".to_string()),
            season: Some(1),
            episode: Some(1001),
            language: Some("ita".to_string()),
            ..FileAttributes::default()
        };
        let outcome = enricher.enrich(attrs, MediaCategory::AnimeSeries).await;

        assert!(outcome.applied);
        assert_eq!(catalog.queries(), vec!["One Piece anime".to_string(), "One Piece".to_string()]);
        assert_eq!(outcome.attributes.catalog_id, Some(37854));
        assert_eq!(outcome.attributes.year.as_deref(), Some("1999"));
        assert_eq!(outcome.attributes.episode_title.as_deref(), Some("Wano"));
        assert_eq!(outcome.attributes.episode_air_date.as_deref(), Some("2021-11-21"));
    }

    #[tokio::test]
    async fn test_failed_episode_lookup_keeps_series_match() {
        let mut catalog = ScriptedCatalog::default();
        catalog.series.insert(
            "Breaking Bad".to_string(),
            vec![SeriesHit {
                id: 1396,
                name: "Breaking Bad".to_string(),
                first_air_date: None,
                popularity: 50.0,
            }],
        );
        catalog.series_details.insert(
            1396,
            SeriesDetail {
                id: 1396,
                name: "Breaking Bad".to_string(),
                first_air_date: Some("2008-01-20".to_string()),
                ..SeriesDetail::default()
            },
        );
        let enricher = MetadataEnricher::new(Arc::new(catalog));

        let attrs = FileAttributes {
            title: Some("Breaking Bad".to_string()),
            season: Some(1),
            episode: Some(1),
            ..FileAttributes::default()
        };
        let outcome = enricher.enrich(attrs, MediaCategory::Series).await;

        assert!(outcome.applied);
        assert_eq!(outcome.attributes.catalog_id, Some(1396));
        assert_eq!(outcome.attributes.episode_title, None);
    }

    #[tokio::test]
    async fn test_no_hits_leaves_attributes_alone() {
        let enricher = MetadataEnricher::new(Arc::new(ScriptedCatalog::default()));
        let attrs = FileAttributes {
            title: Some("Unknown Thing".to_string()),
            ..FileAttributes::default()
        };
        let outcome = enricher.enrich(attrs.clone(), MediaCategory::Movie).await;
        assert!(!outcome.applied);
        assert_eq!(outcome.attributes, attrs);
    }
}
