//! Temporary asset storage for downloaded backgrounds.
//!
//! Lifecycle: created before the fetch fan-out, removed only after the deck
//! file has been written. Every fetch writes to its own index-keyed file, so
//! the directory is the only shared resource and there is no contention.
//!
//! Without an explicit `asset_dir` the store lives in a [`TempDir`], which
//! also cleans up if the run fails or panics before [`AssetStore::teardown`].
//! An explicit directory is only removed on success.

use crate::config::DeckConfig;
use crate::error::DeckError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

pub struct AssetStore {
    dir: PathBuf,
    temp: Option<TempDir>,
}

/// Cheap, cloneable view of where each slide's asset goes. Handed to every
/// fetch task; the store itself stays with the pipeline.
#[derive(Debug, Clone)]
pub struct AssetLocations {
    dir: PathBuf,
}

impl AssetLocations {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Final location of slide `index`'s background.
    pub fn asset_path(&self, index: usize, extension: &str) -> PathBuf {
        self.dir.join(format!("img{index}.{extension}"))
    }

    /// Download target before the format is known.
    pub fn staging_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("img{index}.part"))
    }
}

impl AssetStore {
    /// Create the storage directory named by `config.asset_dir`, or a fresh
    /// temp directory.
    pub async fn create(config: &DeckConfig) -> Result<Self, DeckError> {
        match config.asset_dir {
            Some(ref dir) => {
                tokio::fs::create_dir_all(dir)
                    .await
                    .map_err(|e| DeckError::AssetStoreFailed {
                        path: dir.clone(),
                        source: e,
                    })?;
                debug!("Asset store at {}", dir.display());
                Ok(Self {
                    dir: dir.clone(),
                    temp: None,
                })
            }
            None => {
                let temp = tempfile::Builder::new()
                    .prefix("txt2deck-")
                    .tempdir()
                    .map_err(|e| DeckError::AssetStoreFailed {
                        path: std::env::temp_dir(),
                        source: e,
                    })?;
                debug!("Asset store at {}", temp.path().display());
                Ok(Self {
                    dir: temp.path().to_path_buf(),
                    temp: Some(temp),
                })
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn locations(&self) -> AssetLocations {
        AssetLocations::new(&self.dir)
    }

    /// Recursively remove the storage directory. A directory that is
    /// already gone is not an error.
    pub async fn teardown(self) -> Result<(), DeckError> {
        let dir = self.dir;
        let result = match self.temp {
            Some(temp) => tokio::task::spawn_blocking(move || temp.close())
                .await
                .map_err(|e| DeckError::Internal(format!("Teardown task panicked: {}", e)))?,
            None => tokio::fs::remove_dir_all(&dir).await,
        };
        match result {
            Ok(()) => {
                debug!("Removed asset store {}", dir.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DeckError::AssetStoreFailed {
                path: dir,
                source: e,
            }),
        }
    }
}
