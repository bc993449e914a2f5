use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("I/O error on '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed export file '{path}'")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("No article exports found in '{0}'")]
    NoExports(PathBuf),

    #[error("Could not read articles from the store")]
    Store(#[from] StoreError),
}
