mod catalog;
mod index;
mod reconcile;

use std::collections::HashSet;
use std::io::Write;
use std::path::PathBuf;

use tracing::info;

pub use catalog::{load_catalog, save_catalog, RecordError};
pub use common::{Catalog, Record};
pub use index::TreeIndexer;
pub use reconcile::{reconcile, Comparison, Reconciliation, SortMode};

pub const DEFAULT_OUTPUT_PATH: &str = "music-data.csv";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexConfig {
    pub directory: PathBuf,
    pub output_path: PathBuf,
    pub input_path: Option<PathBuf>,
    pub sort_mode: SortMode,
    pub follow_links: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            input_path: None,
            sort_mode: SortMode::None,
            follow_links: true,
        }
    }
}

/// `artists` counts distinct artists in the written catalog, so artist
/// folders without any album folder are not included.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub artists: usize,
    pub albums: usize,
    pub new: Option<usize>,
    pub missing: Option<usize>,
}

/// Loads the previous catalog (if any), indexes the tree, writes the fresh
/// catalog and prints the new/missing report. The output file is only
/// touched once everything before it has succeeded.
pub fn run<W: Write>(config: &IndexConfig, report: &mut W) -> Result<RunSummary, CatalogError> {
    let previous = match &config.input_path {
        Some(path) => Some(load_catalog(path)?),
        None => None,
    };

    let current = TreeIndexer::new()
        .follow_links(config.follow_links)
        .index(&config.directory)?;

    let reconciliation = reconcile(current, previous, config.sort_mode);
    save_catalog(&config.output_path, reconciliation.found())?;
    reconciliation.write_report(report)?;

    let artists: HashSet<&str> = reconciliation
        .found()
        .iter()
        .map(|record| record.artist())
        .collect();
    let summary = RunSummary {
        artists: artists.len(),
        albums: reconciliation.found().len(),
        new: reconciliation.comparison().map(|c| c.new.len()),
        missing: reconciliation.comparison().map(|c| c.missing.len()),
    };
    info!("Finished indexing {:?}", config.directory);
    Ok(summary)
}

#[derive(Debug)]
pub enum CatalogError {
    SourceUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },
    MalformedRecord {
        path: PathBuf,
        line: usize,
        reason: RecordError,
    },
    RootUnavailable {
        path: PathBuf,
        reason: String,
    },
    TreeUnreadable {
        path: PathBuf,
        reason: String,
    },
    DestinationUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },
    ConflictingSortOptions,
    Io(std::io::Error),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::SourceUnavailable { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            CatalogError::MalformedRecord { path, line, reason } => {
                write!(f, "malformed record in {} line {}: {}", path.display(), line, reason)
            }
            CatalogError::RootUnavailable { path, reason } => {
                write!(f, "cannot index {}: {}", path.display(), reason)
            }
            CatalogError::TreeUnreadable { path, reason } => {
                write!(f, "cannot read {} while indexing: {}", path.display(), reason)
            }
            CatalogError::DestinationUnavailable { path, source } => {
                write!(f, "failed to write {}: {}", path.display(), source)
            }
            CatalogError::ConflictingSortOptions => {
                write!(f, "--sort-artist and --sort-album cannot be used together")
            }
            CatalogError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for CatalogError {}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        CatalogError::Io(err)
    }
}
