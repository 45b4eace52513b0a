use std::ffi::OsStr;
use std::io;
use std::path::Path;

use common::{Catalog, Record};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::CatalogError;

const ARTIST_DEPTH: usize = 1;
const ALBUM_DEPTH: usize = 2;

/// Walks `root/<artist>/<album>` and emits one record per album directory.
#[derive(Clone, Debug)]
pub struct TreeIndexer {
    follow_links: bool,
}

impl Default for TreeIndexer {
    fn default() -> Self {
        Self { follow_links: true }
    }
}

impl TreeIndexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// When disabled, symlinked artist and album directories are skipped.
    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    pub fn index(&self, root: &Path) -> Result<Catalog, CatalogError> {
        if !root.exists() {
            return Err(CatalogError::RootUnavailable {
                path: root.to_path_buf(),
                reason: "directory does not exist".to_string(),
            });
        }
        if !root.is_dir() {
            return Err(CatalogError::RootUnavailable {
                path: root.to_path_buf(),
                reason: "not a directory".to_string(),
            });
        }

        let mut records = Vec::new();

        for entry in WalkDir::new(root)
            .follow_links(self.follow_links)
            .min_depth(ARTIST_DEPTH)
            .max_depth(ALBUM_DEPTH)
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if err.depth() == 0 => {
                    return Err(CatalogError::RootUnavailable {
                        path: root.to_path_buf(),
                        reason: err.to_string(),
                    })
                }
                Err(err) if is_dangling_link(&err) => {
                    debug!("Skipping dangling link {:?}", err.path());
                    continue;
                }
                Err(err) => {
                    return Err(CatalogError::TreeUnreadable {
                        path: err.path().unwrap_or(root).to_path_buf(),
                        reason: err.to_string(),
                    })
                }
            };

            if !entry.file_type().is_dir() {
                debug!("Skipping non-directory {:?}", entry.path());
                continue;
            }

            if entry.depth() == ARTIST_DEPTH {
                continue;
            }

            let album_path = entry.path();
            let Some(artist_name) = album_path.parent().and_then(Path::file_name) else {
                continue;
            };
            records.push(Record::new(
                name_string(artist_name, album_path),
                name_string(entry.file_name(), album_path),
            ));
        }

        info!("Indexed {} album folders in {:?}", records.len(), root);
        Ok(records)
    }
}

/// A link whose target is gone is not a directory, so it is skipped like a
/// stray file rather than failing the walk.
fn is_dangling_link(err: &walkdir::Error) -> bool {
    let target_missing = err
        .io_error()
        .map(|io_err| io_err.kind() == io::ErrorKind::NotFound)
        .unwrap_or(false);
    let is_link = err
        .path()
        .and_then(|path| path.symlink_metadata().ok())
        .map(|metadata| metadata.file_type().is_symlink())
        .unwrap_or(false);
    target_missing && is_link
}

fn name_string(name: &OsStr, path: &Path) -> String {
    match name.to_str() {
        Some(name) => name.to_string(),
        None => {
            warn!("Folder name in {:?} is not valid UTF-8; storing a lossy copy", path);
            name.to_string_lossy().into_owned()
        }
    }
}
