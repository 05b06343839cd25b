//! Post-processing pipeline for completed downloads
//!
//! classify -> extract -> enrich -> build path -> relocate
//!
//! [`PostProcessor::process`] never fails: whatever goes wrong, the caller gets
//! a valid path back (the original one when the file could not be moved).
//! Progress is logged and also published as [`ProcessingEvent`]s to any
//! subscriber.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use super::catalog::Catalog;
use super::classifier::MediaClassifier;
use super::filename_parser::AttributeExtractor;
use super::filesystem::Relocator;
use super::metadata::MetadataEnricher;
use super::organizer::PathBuilder;
use super::tmdb::TmdbClient;
use crate::config::Config;
use crate::media::{Classification, ClassificationSource, FileAttributes, MediaCategory};

/// Something that happened while processing one file
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProcessingEvent {
    Classified {
        run_id: Uuid,
        path: PathBuf,
        category: MediaCategory,
        source: ClassificationSource,
        catalog_id: Option<u64>,
    },
    Enriched {
        run_id: Uuid,
        catalog_id: Option<u64>,
        applied: bool,
    },
    Relocated {
        run_id: Uuid,
        from: PathBuf,
        to: PathBuf,
    },
    /// No move was needed or no safe destination could be built
    Unchanged { run_id: Uuid, path: PathBuf },
    Failed {
        run_id: Uuid,
        path: PathBuf,
        error: String,
    },
}

/// Everything decided for a file before it is moved
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingPlan {
    pub run_id: Uuid,
    pub original: PathBuf,
    pub classification: Classification,
    pub attributes: FileAttributes,
    pub enriched: bool,
    pub destination: PathBuf,
}

impl ProcessingPlan {
    pub fn is_noop(&self) -> bool {
        self.original == self.destination
    }
}

/// Runs the whole pipeline for one file at a time
pub struct PostProcessor {
    classifier: MediaClassifier,
    extractor: AttributeExtractor,
    enricher: Option<MetadataEnricher>,
    builder: PathBuilder,
    relocator: Relocator,
    use_catalog_ids: bool,
    event_sender: broadcast::Sender<ProcessingEvent>,
}

impl PostProcessor {
    /// Build the pipeline with an explicit catalog (or none).
    pub fn new(config: &Config, catalog: Option<Arc<dyn Catalog>>) -> Self {
        let (event_sender, _) = broadcast::channel(64);
        let layout = &config.layout;

        Self {
            classifier: MediaClassifier::new(layout.clone(), catalog.clone()),
            extractor: AttributeExtractor::new(layout),
            enricher: catalog.map(MetadataEnricher::new),
            builder: PathBuilder::new(layout, config.use_catalog_ids),
            relocator: Relocator::new(layout.clone()),
            use_catalog_ids: config.use_catalog_ids,
            event_sender,
        }
    }

    /// Build the pipeline with the TMDB client when an API key is configured.
    pub fn from_config(config: &Config) -> Self {
        let catalog: Option<Arc<dyn Catalog>> = match config.catalog.api_key {
            Some(_) => match TmdbClient::new(&config.catalog) {
                Ok(client) => Some(Arc::new(client)),
                Err(e) => {
                    warn!(error = %e, "TMDB client unavailable, continuing without catalog");
                    None
                }
            },
            None => {
                info!("No TMDB API key configured, catalog lookups disabled");
                None
            }
        };
        Self::new(config, catalog)
    }

    /// Subscribe to processing events
    pub fn subscribe(&self) -> broadcast::Receiver<ProcessingEvent> {
        self.event_sender.subscribe()
    }

    fn emit(&self, event: ProcessingEvent) {
        // No subscribers is fine
        let _ = self.event_sender.send(event);
    }

    /// Decide category, attributes and destination without touching the disk.
    pub async fn plan(&self, path: &Path) -> ProcessingPlan {
        self.plan_run(Uuid::new_v4(), path).await
    }

    async fn plan_run(&self, run_id: Uuid, path: &Path) -> ProcessingPlan {
        let mut classification = self.classifier.classify(path).await;
        if !self.use_catalog_ids {
            classification.catalog_id = None;
        }
        self.emit(ProcessingEvent::Classified {
            run_id,
            path: path.to_path_buf(),
            category: classification.category,
            source: classification.source,
            catalog_id: classification.catalog_id,
        });

        let mut attributes = self.extractor.extract(path, &classification);
        if !classification.category.is_series() {
            attributes.clear_series_fields();
        }

        let mut enriched = false;
        match &self.enricher {
            Some(enricher) if self.use_catalog_ids => {
                let outcome = enricher.enrich(attributes, classification.category).await;
                attributes = outcome.attributes;
                enriched = outcome.applied;
                self.emit(ProcessingEvent::Enriched {
                    run_id,
                    catalog_id: attributes.catalog_id,
                    applied: enriched,
                });
            }
            _ => {
                if !self.use_catalog_ids {
                    attributes.catalog_id = None;
                }
                debug!("Catalog enrichment skipped");
            }
        }

        let destination = self
            .builder
            .build_path(path, &attributes, classification.category);

        ProcessingPlan {
            run_id,
            original: path.to_path_buf(),
            classification,
            attributes,
            enriched,
            destination,
        }
    }

    /// Process one completed download and return where the file ended up.
    pub async fn process(&self, path: &Path) -> PathBuf {
        let run_id = Uuid::new_v4();
        let span = info_span!("post_process", run_id = %run_id, path = %path.display());
        self.process_run(run_id, path).instrument(span).await
    }

    async fn process_run(&self, run_id: Uuid, path: &Path) -> PathBuf {
        let plan = self.plan_run(run_id, path).await;
        info!(
            category = %plan.classification.category,
            destination = %plan.destination.display(),
            "Planned destination"
        );

        if plan.is_noop() {
            self.emit(ProcessingEvent::Unchanged {
                run_id,
                path: path.to_path_buf(),
            });
            return plan.original;
        }

        match self.relocator.relocate(&plan.original, &plan.destination).await {
            Ok(final_path) => {
                self.emit(ProcessingEvent::Relocated {
                    run_id,
                    from: plan.original,
                    to: final_path.clone(),
                });
                final_path
            }
            Err(e) => {
                error!(error = %e, "Relocation failed, keeping original path");
                self.emit(ProcessingEvent::Failed {
                    run_id,
                    path: plan.original.clone(),
                    error: e.to_string(),
                });
                plan.original
            }
        }
    }
}
