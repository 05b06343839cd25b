//! Tracing subscriber setup
//!
//! Console output goes through `tracing_subscriber::fmt`, either human readable
//! or as JSON lines. `RUST_LOG` overrides the default filter.

use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "plex_naming=info";

/// Build the env filter, falling back to [`DEFAULT_FILTER`]
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into())
}

/// Install the global subscriber. Logs go to stderr so stdout stays free for results.
pub fn init_tracing(json: bool) -> Result<()> {
    let json_layer = json.then(|| fmt::layer().json().with_writer(std::io::stderr));
    let text_layer = (!json).then(|| fmt::layer().with_target(false).with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter())
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialise tracing: {}", e))
}
