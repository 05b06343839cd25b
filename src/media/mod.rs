//! Media domain model shared by every pipeline stage
//!
//! A downloaded file flows through the stages as a [`FileAttributes`] value that
//! each stage takes by value and hands back refined. The category is decided once
//! by the classifier and never changes afterwards.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Category used when nothing else could decide. Kept as a named policy so callers
/// can tell a guess apart from a real decision via [`ClassificationSource::Fallback`].
pub const UNDETERMINED_FALLBACK: MediaCategory = MediaCategory::Movie;

/// The four library branches a file can be filed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaCategory {
    Movie,
    Series,
    AnimeMovie,
    AnimeSeries,
}

impl MediaCategory {
    pub fn from_flags(is_series: bool, is_anime: bool) -> Self {
        match (is_series, is_anime) {
            (false, false) => Self::Movie,
            (true, false) => Self::Series,
            (false, true) => Self::AnimeMovie,
            (true, true) => Self::AnimeSeries,
        }
    }

    pub fn is_series(&self) -> bool {
        matches!(self, Self::Series | Self::AnimeSeries)
    }

    pub fn is_anime(&self) -> bool {
        matches!(self, Self::AnimeMovie | Self::AnimeSeries)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Series => "series",
            Self::AnimeMovie => "anime_movie",
            Self::AnimeSeries => "anime_series",
        }
    }
}

impl fmt::Display for MediaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which classifier step produced the category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    /// The file sits under one of the configured category folders
    Taxonomy,
    /// A catalog search identified the title
    Catalog,
    /// The filename contains a well-known anime title
    KnownTitle,
    /// Path and filename cues
    Heuristic,
    /// Nothing matched, [`UNDETERMINED_FALLBACK`] was used
    Fallback,
}

/// Output of the classifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub category: MediaCategory,
    /// Catalog identifier bound while identifying the title, if any
    pub catalog_id: Option<u64>,
    pub source: ClassificationSource,
}

impl Classification {
    pub fn new(category: MediaCategory, source: ClassificationSource) -> Self {
        Self {
            category,
            catalog_id: None,
            source,
        }
    }

    pub fn with_catalog_id(mut self, id: u64) -> Self {
        self.catalog_id = Some(id);
        self
    }
}

/// Descriptive attributes accumulated for one file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAttributes {
    pub title: Option<String>,
    /// Four digit year, kept as text the way it is rendered
    pub year: Option<String>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub language: Option<String>,
    pub catalog_id: Option<u64>,
    pub episode_title: Option<String>,
    pub episode_overview: Option<String>,
    pub episode_air_date: Option<String>,
}

impl FileAttributes {
    /// Bind the catalog identifier unless one is already present.
    ///
    /// Returns `true` when the id was stored.
    pub fn bind_catalog_id(&mut self, id: u64) -> bool {
        if self.catalog_id.is_some() {
            return false;
        }
        self.catalog_id = Some(id);
        true
    }

    /// Drop every series-only field. Applied whenever the category is not a series.
    pub fn clear_series_fields(&mut self) {
        self.season = None;
        self.episode = None;
        self.episode_title = None;
        self.episode_overview = None;
        self.episode_air_date = None;
    }

    pub fn title_or_empty(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }
}

/// Take the leading four digit year of a catalog date such as `2009-12-18`.
pub fn year_of(date: &str) -> Option<String> {
    let year = date.get(..4)?;
    year.chars()
        .all(|c| c.is_ascii_digit())
        .then(|| year.to_string())
}
