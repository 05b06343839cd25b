//! Path builder for the media library
//!
//! Maps a category and its attributes onto the library layout:
//! - Movies: `Movies/Title (Year)/Title (Year) {tmdb-N}.ext`
//! - Series: `Series/Title (Year)/Season N/Title - s01e01 - Episode {tmdb-N}.ext`
//! - Anime films go below `Anime/Film` (or the configured anime movie folder)
//! - Anime series go below `Anime/Serie`, unless the anime folder already means series
//!
//! Building a path never touches the disk. The one existence check (the optional
//! anime movie folder) happens when the builder is created.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::text_utils::collapse_whitespace;
use crate::config::LibraryLayout;
use crate::media::{FileAttributes, MediaCategory};

static UNSAFE_TITLE_CHARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s()]").expect("title character pattern is valid"));

static TRAILING_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\((?:19|20)\d{2}\)\s*$").expect("trailing year pattern is valid"));

/// Computes canonical destination paths
#[derive(Debug, Clone)]
pub struct PathBuilder {
    movie_root: PathBuf,
    series_root: PathBuf,
    anime_movie_root: PathBuf,
    anime_series_root: PathBuf,
    use_catalog_ids: bool,
}

impl PathBuilder {
    pub fn new(layout: &LibraryLayout, use_catalog_ids: bool) -> Self {
        let anime_movie_root = layout
            .anime_movie_folder
            .as_ref()
            .map(|folder| layout.root_path.join(folder))
            .filter(|dir| dir.is_dir())
            .unwrap_or_else(|| layout.anime_root().join("Film"));

        // Avoid "Anime/Serie/Serie"
        let anime_series_root = if layout.anime_folder_implies_series() {
            layout.anime_root()
        } else {
            layout.anime_root().join("Serie")
        };

        Self {
            movie_root: layout.movie_root(),
            series_root: layout.series_root(),
            anime_movie_root,
            anime_series_root,
            use_catalog_ids,
        }
    }

    /// Category folder every path of `category` is built below
    pub fn category_root(&self, category: MediaCategory) -> &Path {
        match category {
            MediaCategory::Movie => &self.movie_root,
            MediaCategory::Series => &self.series_root,
            MediaCategory::AnimeMovie => &self.anime_movie_root,
            MediaCategory::AnimeSeries => &self.anime_series_root,
        }
    }

    /// Canonical destination for a file.
    ///
    /// Returns `original` unchanged when no safe name can be built: an empty
    /// title, or a series file without an episode number.
    pub fn build_path(
        &self,
        original: &Path,
        attributes: &FileAttributes,
        category: MediaCategory,
    ) -> PathBuf {
        let title = display_title(attributes);
        if title.is_empty() {
            debug!(path = %original.display(), "No usable title, keeping original path");
            return original.to_path_buf();
        }

        let ext = original
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let tag = self.catalog_tag(attributes);
        let root = self.category_root(category);

        if category.is_series() {
            let Some(episode) = attributes.episode else {
                debug!(path = %original.display(), "Series file without episode number, keeping original path");
                return original.to_path_buf();
            };
            let season = attributes.season.unwrap_or(1);

            let show_folder = with_year(&title, attributes.year.as_deref());
            let episode_title = attributes
                .episode_title
                .as_deref()
                .map(|t| collapse_whitespace(&sanitize_filename::sanitize(t)))
                .filter(|t| !t.is_empty())
                .map(|t| format!(" - {}", t))
                .unwrap_or_default();

            let filename = format!(
                "{} - s{:02}e{:02}{}{}{}",
                title, season, episode, episode_title, tag, ext
            );

            root.join(show_folder)
                .join(format!("Season {}", season))
                .join(filename)
        } else {
            let movie_name = with_year(&title, attributes.year.as_deref());
            let filename = format!("{}{}{}", movie_name, tag, ext);
            root.join(&movie_name).join(filename)
        }
    }

    fn catalog_tag(&self, attributes: &FileAttributes) -> String {
        match attributes.catalog_id {
            Some(id) if self.use_catalog_ids => format!(" {{tmdb-{}}}", id),
            _ => String::new(),
        }
    }
}

/// Title as it appears in folder and file names.
///
/// The detected language is removed both as a suffix token and as a
/// parenthesised tag, then anything but word characters, spaces and
/// parentheses becomes a space.
pub fn display_title(attributes: &FileAttributes) -> String {
    let mut title = attributes.title_or_empty().to_string();

    if let Some(language) = attributes.language.as_deref().filter(|l| !l.is_empty()) {
        let lang = regex::escape(language);
        let patterns = [
            format!(r"(?i)[-_.\s]{}(?:[-_.\s]|$)", lang),
            format!(r"(?i)\([^)]*{}[^)]*\)", lang),
        ];
        for pattern in patterns {
            if let Ok(re) = Regex::new(&pattern) {
                title = re.replace_all(&title, " ").into_owned();
            }
        }
    }

    let title = title.replace(['_', '-'], " ");
    let mut title = collapse_whitespace(&UNSAFE_TITLE_CHARS_RE.replace_all(&title, " "));

    // The year is appended separately, never twice
    if attributes.year.is_some() {
        title = TRAILING_YEAR_RE.replace(&title, "").trim().to_string();
    }
    title
}

fn with_year(title: &str, year: Option<&str>) -> String {
    match year {
        Some(year) => format!("{} ({})", title, year),
        None => title.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn builder() -> PathBuilder {
        PathBuilder::new(&LibraryLayout::new("/media"), true)
    }

    fn attrs(title: &str) -> FileAttributes {
        FileAttributes {
            title: Some(title.to_string()),
            ..FileAttributes::default()
        }
    }

    #[test]
    fn test_movie_path() {
        let mut movie = attrs("Avatar");
        movie.year = Some("2009".to_string());

        let path = builder().build_path(Path::new("/media/Movies/Avatar_2009.mp4"), &movie, MediaCategory::Movie);
        assert_eq!(path, PathBuf::from("/media/Movies/Avatar (2009)/Avatar (2009).mp4"));

        movie.catalog_id = Some(19995);
        let path = builder().build_path(Path::new("/media/Movies/Avatar_2009.mp4"), &movie, MediaCategory::Movie);
        assert_eq!(
            path,
            PathBuf::from("/media/Movies/Avatar (2009)/Avatar (2009) {tmdb-19995}.mp4")
        );
    }

    #[test]
    fn test_catalog_tag_disabled() {
        let mut movie = attrs("Avatar");
        movie.catalog_id = Some(19995);
        let builder = PathBuilder::new(&LibraryLayout::new("/media"), false);

        let path = builder.build_path(Path::new("/x/Avatar.mkv"), &movie, MediaCategory::Movie);
        assert_eq!(path, PathBuf::from("/media/Movies/Avatar/Avatar.mkv"));
    }

    #[test]
    fn test_series_path() {
        let mut episode = attrs("Breaking Bad");
        episode.season = Some(1);
        episode.episode = Some(1);
        episode.language = Some("ita".to_string());

        let path = builder().build_path(
            Path::new("/media/Series/Breaking Bad/Breaking.Bad.S01E01.ita.mp4"),
            &episode,
            MediaCategory::Series,
        );
        assert_eq!(
            path,
            PathBuf::from("/media/Series/Breaking Bad/Season 1/Breaking Bad - s01e01.mp4")
        );
    }

    #[test]
    fn test_series_with_episode_title_and_year() {
        let mut episode = attrs("Breaking Bad");
        episode.year = Some("2008".to_string());
        episode.season = Some(2);
        episode.episode = Some(13);
        episode.episode_title = Some("ABQ / Finale".to_string());
        episode.catalog_id = Some(1396);

        let path = builder().build_path(Path::new("/d/x.mkv"), &episode, MediaCategory::Series);
        assert_eq!(
            path,
            PathBuf::from(
                "/media/Series/Breaking Bad (2008)/Season 2/Breaking Bad - s02e13 - ABQ Finale {tmdb-1396}.mkv"
            )
        );
    }

    #[test]
    fn test_anime_series_root() {
        let mut episode = attrs("One Piece");
        episode.season = Some(1);
        episode.episode = Some(1001);

        let path = builder().build_path(Path::new("/d/One.Piece.E1001.mp4"), &episode, MediaCategory::AnimeSeries);
        assert_eq!(
            path,
            PathBuf::from("/media/Anime/Serie/One Piece/Season 1/One Piece - s01e1001.mp4")
        );

        let mut layout = LibraryLayout::new("/media");
        layout.anime_folder = "Anime/Serie".to_string();
        let path = PathBuilder::new(&layout, true).build_path(
            Path::new("/d/One.Piece.E1001.mp4"),
            &episode,
            MediaCategory::AnimeSeries,
        );
        assert_eq!(
            path,
            PathBuf::from("/media/Anime/Serie/One Piece/Season 1/One Piece - s01e1001.mp4")
        );
    }

    #[test]
    fn test_anime_movie_folder_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let mut layout = LibraryLayout::new(dir.path());
        layout.anime_movie_folder = Some("AnimeMovies".to_string());

        let movie = attrs("Akira");
        let fallback = PathBuilder::new(&layout, true);
        assert_eq!(
            fallback.category_root(MediaCategory::AnimeMovie).to_path_buf(),
            dir.path().join("Anime/Film")
        );

        std::fs::create_dir(dir.path().join("AnimeMovies")).unwrap();
        let path = PathBuilder::new(&layout, true).build_path(
            Path::new("/d/Akira.mkv"),
            &movie,
            MediaCategory::AnimeMovie,
        );
        assert_eq!(path, dir.path().join("AnimeMovies/Akira/Akira.mkv"));
    }

    #[test]
    fn test_unsafe_names_keep_original() {
        let original = Path::new("/d/file.mkv");
        let no_episode = attrs("Dark");
        assert_eq!(
            builder().build_path(original, &no_episode, MediaCategory::Series),
            original.to_path_buf()
        );
        assert_eq!(
            builder().build_path(original, &FileAttributes::default(), MediaCategory::Movie),
            original.to_path_buf()
        );
    }

    #[test]
    fn test_display_title() {
        let mut a = attrs("Demon-Slayer-ita (ITA) : Kimetsu");
        a.language = Some("ita".to_string());
        assert_eq!(display_title(&a), "Demon Slayer Kimetsu");

        let mut b = attrs("Avatar (2009)");
        b.year = Some("2009".to_string());
        assert_eq!(display_title(&b), "Avatar");
    }
}
