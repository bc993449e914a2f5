pub mod error;
pub mod snapshot;

use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

pub use error::ExportError;
pub use snapshot::RepositorySnapshots;

pub const EXPORT_PREFIX: &str = "articles_";
const MAX_NAME_ATTEMPTS: usize = 100;

/// On-disk shape of an export. Articles stay loosely typed so that seeded
/// files and live buffer snapshots read back the same way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleExport {
    pub timestamp: String,
    pub total_articles: usize,
    pub articles: Vec<Value>,
}

impl ArticleExport {
    pub fn new(articles: Vec<Value>) -> Self {
        Self {
            timestamp: local_iso_timestamp(),
            total_articles: articles.len(),
            articles,
        }
    }
}

pub fn local_iso_timestamp() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

pub fn file_stamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// `attempt` > 0 adds a suffix that still sorts after the plain name.
fn export_file_name_for(stamp: &str, attempt: usize) -> String {
    if attempt == 0 {
        format!("{EXPORT_PREFIX}{stamp}.json")
    } else {
        format!("{EXPORT_PREFIX}{stamp}_{attempt:02}.json")
    }
}

pub struct ArticleExporter {
    dir: PathBuf,
    latest: Mutex<Option<PathBuf>>,
}

impl ArticleExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, ExportError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| ExportError::Io {
            path: dir.clone(),
            source,
        })?;
        info!("Initialized article exporter in {}", dir.display());

        Ok(Self {
            dir,
            latest: Mutex::new(None),
        })
    }

    /// Write a new export file. A name already taken in this second, by this
    /// or another process, gets a numbered suffix instead of being replaced.
    pub async fn save<T: Serialize>(&self, articles: &[T]) -> Result<PathBuf, ExportError> {
        let json_err = |source| ExportError::Json {
            path: self.dir.clone(),
            source,
        };
        let values = articles
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(json_err)?;
        let body = serde_json::to_vec_pretty(&ArticleExport::new(values)).map_err(json_err)?;

        let (path, mut file) = self.create_unique(&file_stamp()).await?;
        let written = async {
            file.write_all(&body).await?;
            file.flush().await
        }
        .await;
        written.map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;

        info!("Exported {} articles to {}", articles.len(), path.display());

        *self.latest.lock() = Some(path.clone());
        Ok(path)
    }

    async fn create_unique(&self, stamp: &str) -> Result<(PathBuf, tokio::fs::File), ExportError> {
        let mut attempt = 0;
        loop {
            let path = self.dir.join(export_file_name_for(stamp, attempt));
            let opened = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;

            match opened {
                Ok(file) => return Ok((path, file)),
                Err(e)
                    if e.kind() == io::ErrorKind::AlreadyExists
                        && attempt + 1 < MAX_NAME_ATTEMPTS =>
                {
                    attempt += 1;
                }
                Err(source) => return Err(ExportError::Io { path, source }),
            }
        }
    }

    /// Newest export in the directory, by file name.
    pub async fn latest_file(&self) -> Result<PathBuf, ExportError> {
        latest_export(&self.dir).await
    }

    /// Path written by the last `save` on this exporter, if any.
    pub fn last_saved(&self) -> Option<PathBuf> {
        self.latest.lock().clone()
    }

    /// Up to `limit` articles from the newest export; empty when there is
    /// none or it cannot be read.
    pub async fn latest(&self, limit: usize) -> Vec<Value> {
        let result = async {
            let path = self.latest_file().await?;
            read_export(&path).await
        }
        .await;

        match result {
            Ok(export) => export.articles.into_iter().take(limit).collect(),
            Err(ExportError::NoExports(_)) => Vec::new(),
            Err(e) => {
                error!("Error reading articles: {}", e);
                Vec::new()
            }
        }
    }
}

pub async fn latest_export(dir: &Path) -> Result<PathBuf, ExportError> {
    let io_err = |source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(io_err)?;
    let mut newest: Option<String> = None;

    while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(EXPORT_PREFIX)
            && name.ends_with(".json")
            && newest.as_ref().is_none_or(|current| &name > current)
        {
            newest = Some(name);
        }
    }

    newest
        .map(|name| dir.join(name))
        .ok_or_else(|| ExportError::NoExports(dir.to_path_buf()))
}

pub async fn read_export(path: &Path) -> Result<ArticleExport, ExportError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    serde_json::from_str(&raw).map_err(|source| ExportError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ExportError> {
    let body = serde_json::to_string_pretty(value).map_err(|source| ExportError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    tokio::fs::write(path, body)
        .await
        .map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })
}
