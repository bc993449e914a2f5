pub mod error;
pub mod prompt;

use std::io;
use std::path::{Path, PathBuf};

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info};

use crate::config::Config;
use crate::export::{self, local_iso_timestamp, ExportError};

pub use error::AnalysisError;
pub use prompt::prepare_prompt;

pub const LATEST_ANALYSIS_FILE: &str = "latest_analysis.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub timestamp: String,
    pub analysis: String,
    pub articles_analyzed: usize,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

/// Turns the newest article export into an LLM market analysis.
pub struct Analyzer {
    client: Client,
    ollama_url: String,
    model: String,
    export_dir: PathBuf,
    output_dir: PathBuf,
}

impl Analyzer {
    pub fn new(config: &Config) -> Result<Self, AnalysisError> {
        std::fs::create_dir_all(&config.analysis_dir).map_err(|source| {
            ExportError::Io {
                path: config.analysis_dir.clone(),
                source,
            }
        })?;
        info!(
            "Initialized analyzer with output directory: {}",
            config.analysis_dir.display()
        );

        Ok(Self {
            client: Client::new(),
            ollama_url: config.ollama_url.clone(),
            model: config.ollama_model.clone(),
            export_dir: config.export_dir.clone(),
            output_dir: config.analysis_dir.clone(),
        })
    }

    pub async fn load_articles(&self, path: &Path) -> Vec<Value> {
        match export::read_export(path).await {
            Ok(export) => {
                info!(
                    "Loaded {} articles from {}",
                    export.articles.len(),
                    path.display()
                );
                export.articles
            }
            Err(e) => {
                error!("Error loading articles from {}: {}", path.display(), e);
                Vec::new()
            }
        }
    }

    pub async fn analyze(&self, articles: &[Value]) -> Result<AnalysisResult, AnalysisError> {
        let prompt = prepare_prompt(articles);
        info!("Prepared prompt with {} articles", articles.len());

        let response = self
            .client
            .post(&self.ollama_url)
            .json(&json!({
                "model": self.model,
                "prompt": prompt,
                "stream": false,
            }))
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(AnalysisError::Status(status.as_u16()));
        }

        let body: OllamaResponse = response.json().await?;
        info!("Received analysis from Ollama");

        Ok(AnalysisResult {
            timestamp: local_iso_timestamp(),
            analysis: body.response,
            articles_analyzed: articles.len(),
        })
    }

    /// Write `analysis_{stamp}.json` and point `latest_analysis.json` at it.
    pub async fn save(
        &self,
        analysis: &AnalysisResult,
        stamp: &str,
    ) -> Result<PathBuf, AnalysisError> {
        let file_name = format!("analysis_{stamp}.json");
        let path = self.output_dir.join(&file_name);

        export::write_json(&path, analysis).await?;

        let latest = self.output_dir.join(LATEST_ANALYSIS_FILE);
        replace_latest(&latest, &file_name, &path)
            .await
            .map_err(|source| AnalysisError::Link {
                path: latest.clone(),
                source,
            })?;

        info!("Analysis saved to {}", path.display());
        Ok(path)
    }

    /// Analyze the newest export end to end.
    pub async fn run_latest(&self) -> Result<PathBuf, AnalysisError> {
        let path = export::latest_export(&self.export_dir).await?;
        info!("Processing latest articles file: {}", path.display());

        let articles = self.load_articles(&path).await;
        if articles.is_empty() {
            return Err(AnalysisError::NoArticles(path));
        }

        let analysis = self.analyze(&articles).await?;
        self.save(&analysis, &export::file_stamp()).await
    }
}

async fn replace_latest(latest: &Path, file_name: &str, target: &Path) -> io::Result<()> {
    match tokio::fs::remove_file(latest).await {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    #[cfg(unix)]
    {
        let _ = target;
        tokio::fs::symlink(file_name, latest).await
    }

    #[cfg(not(unix))]
    {
        let _ = file_name;
        tokio::fs::copy(target, latest).await.map(|_| ())
    }
}
