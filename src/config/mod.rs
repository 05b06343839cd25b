//! Application configuration management

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

/// Library folder taxonomy under the configured root
#[derive(Debug, Clone)]
pub struct LibraryLayout {
    /// Library root path
    pub root_path: PathBuf,

    /// Folder for regular movies, relative to the root
    pub movie_folder: String,

    /// Folder for regular series, relative to the root
    pub series_folder: String,

    /// Anime root folder, relative to the root
    pub anime_folder: String,

    /// Dedicated anime movie folder, relative to the root (used only when it exists on disk)
    pub anime_movie_folder: Option<String>,

    /// Downloads are nested under a site-name folder right below the root
    pub add_site_name: bool,
}

impl LibraryLayout {
    /// Layout with the default folder names under `root_path`
    pub fn new(root_path: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root_path.into(),
            movie_folder: "Movies".to_string(),
            series_folder: "Series".to_string(),
            anime_folder: "Anime".to_string(),
            anime_movie_folder: None,
            add_site_name: false,
        }
    }

    pub fn movie_root(&self) -> PathBuf {
        self.root_path.join(&self.movie_folder)
    }

    pub fn series_root(&self) -> PathBuf {
        self.root_path.join(&self.series_folder)
    }

    pub fn anime_root(&self) -> PathBuf {
        self.root_path.join(&self.anime_folder)
    }

    /// The anime folder name already says "series" (e.g. `Anime/Serie`), so no
    /// extra `Serie` segment must be appended below it.
    pub fn anime_folder_implies_series(&self) -> bool {
        let folder = self.anime_folder.to_lowercase();
        let joined = self.anime_root().to_string_lossy().replace('\\', "/").to_lowercase();
        folder.contains("serie") || joined.contains("anime/serie")
    }

    /// Every folder of the taxonomy. None of these is ever pruned.
    pub fn category_roots(&self) -> Vec<PathBuf> {
        let mut roots = vec![
            self.root_path.clone(),
            self.movie_root(),
            self.series_root(),
            self.anime_root(),
            self.anime_root().join("Film"),
            self.anime_root().join("Serie"),
        ];
        if let Some(folder) = &self.anime_movie_folder {
            roots.push(self.root_path.join(folder));
        }
        roots
    }

    /// Whether `path` lies strictly below the root
    pub fn contains(&self, path: &Path) -> bool {
        path != self.root_path && path.starts_with(&self.root_path)
    }
}

/// Settings for the external metadata catalog (TMDB)
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// TMDB API key; the catalog is disabled without one
    pub api_key: Option<String>,

    /// API base URL
    pub base_url: String,

    /// Optional `language` query parameter (e.g. `it-IT`)
    pub language: Option<String>,

    /// Per-request timeout
    pub timeout: Duration,

    /// Attempts for transient failures
    pub max_retries: u32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.themoviedb.org/3".to_string(),
            language: None,
            timeout: Duration::from_secs(10),
            max_retries: 2,
        }
    }
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub layout: LibraryLayout,

    pub catalog: CatalogConfig,

    /// Enrich through the catalog and tag filenames with `{tmdb-N}`
    pub use_catalog_ids: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let layout = LibraryLayout {
            root_path: PathBuf::from(
                env::var("MEDIA_ROOT").unwrap_or_else(|_| "./data/media".to_string()),
            ),

            movie_folder: env::var("MOVIE_FOLDER_NAME").unwrap_or_else(|_| "Movies".to_string()),

            series_folder: env::var("SERIES_FOLDER_NAME")
                .unwrap_or_else(|_| "Series".to_string()),

            anime_folder: env::var("ANIME_FOLDER_NAME").unwrap_or_else(|_| "Anime".to_string()),

            anime_movie_folder: env::var("ANIME_MOVIE_FOLDER_NAME")
                .ok()
                .filter(|v| !v.trim().is_empty()),

            add_site_name: env_flag("ADD_SITE_NAME", false),
        };

        let catalog = CatalogConfig {
            api_key: env::var("TMDB_API_KEY").ok().filter(|k| !k.trim().is_empty()),

            base_url: env::var("TMDB_BASE_URL")
                .unwrap_or_else(|_| "https://api.themoviedb.org/3".to_string()),

            language: env::var("TMDB_LANGUAGE").ok(),

            timeout: Duration::from_secs(
                env::var("TMDB_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .context("Invalid TMDB_TIMEOUT_SECS")?,
            ),

            max_retries: env::var("TMDB_MAX_RETRIES")
                .unwrap_or_else(|_| "2".to_string())
                .parse()
                .context("Invalid TMDB_MAX_RETRIES")?,
        };

        Ok(Self {
            layout,
            catalog,
            use_catalog_ids: env_flag("USE_TMDB_IDS", true),
        })
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(default)
}
