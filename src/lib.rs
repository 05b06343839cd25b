//! Plex-style naming for completed media downloads
//!
//! Given the path of a finished download, works out whether it is a movie, a
//! series episode, an anime film or an anime episode, reads title, year,
//! season, episode and language from the path, optionally reconciles them with
//! TMDB, and moves the file to its canonical place in the library.

pub mod cli;
pub mod config;
pub mod error;
pub mod media;
pub mod services;

pub use config::{CatalogConfig, Config, LibraryLayout};
pub use error::RelocationError;
pub use media::{
    Classification, ClassificationSource, FileAttributes, MediaCategory, UNDETERMINED_FALLBACK,
};
pub use services::{PostProcessor, ProcessingEvent, ProcessingPlan};
