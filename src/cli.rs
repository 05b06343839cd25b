//! Minimal CLI parsing for one-shot post-processing runs.

use std::env;
use std::path::PathBuf;

pub const USAGE: &str = "\
Usage: plex-naming [OPTIONS] <FILE>...

Options:
  --root <DIR>    Library root (overrides MEDIA_ROOT)
  --dry-run       Print the planned destination as JSON without moving anything
  --no-catalog    Skip TMDB lookups even when TMDB_API_KEY is set
  --json          Emit logs as JSON lines
  -h, --help      Show this help";

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CliOptions {
    pub root: Option<PathBuf>,
    pub dry_run: bool,
    pub no_catalog: bool,
    pub json_logs: bool,
    pub show_help: bool,
    pub paths: Vec<PathBuf>,
}

impl CliOptions {
    pub fn from_args() -> Self {
        Self::parse(env::args().skip(1))
    }

    pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Self {
        let mut options = CliOptions::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--dry-run" => options.dry_run = true,
                "--no-catalog" => options.no_catalog = true,
                "--json" => options.json_logs = true,
                "-h" | "--help" => options.show_help = true,
                "--root" => {
                    if let Some(value) = args.next() {
                        options.root = Some(PathBuf::from(value));
                    }
                }
                _ if arg.starts_with("--root=") => {
                    if let Some(value) = arg.split_once('=').map(|(_, v)| v) {
                        options.root = Some(PathBuf::from(value));
                    }
                }
                "--" => options.paths.extend(args.by_ref().map(PathBuf::from)),
                _ => options.paths.push(PathBuf::from(arg)),
            }
        }
        options
    }
}
