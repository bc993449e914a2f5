use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::export::ExportError;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Error calling Ollama: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Ollama API error: {0}")]
    Status(u16),

    #[error("Error reading article export")]
    Export(#[from] ExportError),

    #[error("No articles loaded from '{0}'")]
    NoArticles(PathBuf),

    #[error("Error updating latest analysis link '{path}'")]
    Link {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
