//! plex-naming - move completed downloads into a Plex-style library
//!
//! Each path given on the command line goes through the post-processing
//! pipeline once; the final path of every file is printed on stdout.

use anyhow::Context;

use plex_naming::cli::{CliOptions, USAGE};
use plex_naming::config::Config;
use plex_naming::services::{PostProcessor, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let options = CliOptions::from_args();

    if options.show_help {
        println!("{}", USAGE);
        return Ok(());
    }

    init_tracing(options.json_logs)?;

    let mut config = Config::from_env()?;
    if let Some(root) = &options.root {
        config.layout.root_path = root.clone();
    }
    if options.no_catalog {
        config.catalog.api_key = None;
    }
    config.layout.root_path = std::path::absolute(&config.layout.root_path)
        .context("Failed to resolve library root")?;

    tracing::info!(
        root = %config.layout.root_path.display(),
        catalog = config.catalog.api_key.is_some(),
        use_catalog_ids = config.use_catalog_ids,
        "Configuration loaded"
    );

    if options.paths.is_empty() {
        eprintln!("{}", USAGE);
        anyhow::bail!("No input files given");
    }

    let processor = PostProcessor::from_config(&config);

    for path in &options.paths {
        let path = std::path::absolute(path)
            .with_context(|| format!("Failed to resolve {}", path.display()))?;

        if options.dry_run {
            let plan = processor.plan(&path).await;
            println!("{}", serde_json::to_string_pretty(&plan)?);
        } else {
            let final_path = processor.process(&path).await;
            println!("{}", final_path.display());
        }
    }

    Ok(())
}
