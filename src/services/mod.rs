//! Pipeline stages and the catalog integration

pub mod catalog;
pub mod classifier;
pub mod filename_parser;
pub mod filesystem;
pub mod logging;
pub mod metadata;
pub mod organizer;
pub mod post_processor;
pub mod rate_limiter;
pub mod text_utils;
pub mod tmdb;

pub use catalog::{
    Catalog, CatalogError, CatalogResult, EpisodeDetail, MovieDetail, MovieHit, SeriesDetail,
    SeriesHit,
};
pub use classifier::MediaClassifier;
pub use filename_parser::AttributeExtractor;
pub use filesystem::Relocator;
pub use logging::init_tracing;
pub use metadata::{EnrichmentOutcome, MetadataEnricher, MovieStrategy};
pub use organizer::PathBuilder;
pub use post_processor::{PostProcessor, ProcessingEvent, ProcessingPlan};
pub use tmdb::TmdbClient;
