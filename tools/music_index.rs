use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use library::{run, CatalogError, IndexConfig, RunSummary, SortMode, DEFAULT_OUTPUT_PATH};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Writes a CSV catalog of `<directory>/<artist>/<album>` folders and
/// optionally reports changes against a previous catalog.
#[derive(Parser, Debug)]
#[command(name = "music_index")]
#[command(about = "Music Directory Indexer")]
#[command(version)]
struct Args {
    /// The directory to index the folders of
    #[arg(env = "MUSIC_ROOT", default_value = ".")]
    directory: PathBuf,

    /// The file to place the data into
    #[arg(short, long, value_name = "OUTPUT CSV", default_value = DEFAULT_OUTPUT_PATH)]
    outfile: PathBuf,

    /// A CSV file to compare against when indexing the directory
    #[arg(short, long, value_name = "INPUT CSV")]
    infile: Option<PathBuf>,

    /// Sort entries by artist name
    #[arg(short = 'r', long)]
    sort_artist: bool,

    /// Sort entries by album name
    #[arg(short = 'l', long)]
    sort_album: bool,

    /// Skip symlinked artist and album folders
    #[arg(long)]
    no_follow_links: bool,
}

impl Args {
    fn into_config(self) -> Result<IndexConfig, CatalogError> {
        Ok(IndexConfig {
            sort_mode: SortMode::from_flags(self.sort_artist, self.sort_album)?,
            directory: self.directory,
            output_path: self.outfile,
            input_path: self.infile,
            follow_links: !self.no_follow_links,
        })
    }
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match execute(Args::parse()) {
        Ok(summary) => {
            info!(
                "Indexed: {} artists, {} albums",
                summary.artists, summary.albums
            );
            if let (Some(new), Some(missing)) = (summary.new, summary.missing) {
                info!("Changes: {} new, {} missing", new, missing);
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn execute(args: Args) -> Result<RunSummary, CatalogError> {
    let config = args.into_config()?;
    let stdout = io::stdout();
    let mut report = stdout.lock();
    run(&config, &mut report)
}
