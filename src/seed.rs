use std::path::{Path, PathBuf};

use chrono::{Duration, Local};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::export::{ArticleExporter, ExportError};

struct Sample {
    title: &'static str,
    description: &'static str,
    categories: &'static [&'static str],
    source: &'static str,
}

const SAMPLES: [Sample; 5] = [
    Sample {
        title: "Bitcoin Surges Past $50,000 as Institutional Interest Grows",
        description: "Bitcoin has surpassed the $50,000 mark for the first time in 2024, driven by increased institutional adoption and the recent approval of spot Bitcoin ETFs.",
        categories: &["Cryptocurrency", "Bitcoin", "Markets", "ETF"],
        source: "https://ambcrypto.com/feed/",
    },
    Sample {
        title: "Ethereum Layer 2 Solutions See Record Growth in TVL",
        description: "Ethereum L2 scaling solutions have reached a new all-time high in Total Value Locked (TVL), with Arbitrum and Optimism leading the charge.",
        categories: &["Ethereum", "Layer 2", "DeFi", "Scaling"],
        source: "https://ambcrypto.com/feed/",
    },
    Sample {
        title: "SEC Commissioner Discusses Crypto Regulatory Framework",
        description: "A SEC Commissioner has outlined potential changes to cryptocurrency regulations, highlighting the need for clearer guidelines in the digital asset space.",
        categories: &["Regulation", "SEC", "Cryptocurrency", "Policy"],
        source: "https://ambcrypto.com/feed/",
    },
    Sample {
        title: "Solana DeFi Ecosystem Experiences Rapid Expansion",
        description: "The Solana blockchain's DeFi ecosystem has seen significant growth, with new protocols and increased user adoption driving SOL price higher.",
        categories: &["Solana", "DeFi", "Blockchain", "Trading"],
        source: "https://ambcrypto.com/feed/",
    },
    Sample {
        title: "Major Bank Announces Crypto Custody Services",
        description: "A leading financial institution has revealed plans to offer cryptocurrency custody services to institutional clients, marking another step in crypto adoption.",
        categories: &["Banking", "Custody", "Institutional", "Adoption"],
        source: "https://ambcrypto.com/feed/",
    },
];

/// Test article in the shape the analyzer reads.
#[derive(Debug, Clone, Serialize)]
pub struct SeedArticle {
    pub id: String,
    pub title: String,
    pub link: String,
    pub description: String,
    pub published: String,
    pub categories: Vec<String>,
    pub source: String,
    pub timestamp: String,
}

pub fn sample_articles(count: usize) -> Vec<SeedArticle> {
    let base = Local::now().naive_local();

    SAMPLES
        .iter()
        .cycle()
        .take(count)
        .enumerate()
        .map(|(i, sample)| {
            let at = (base - Duration::hours(i as i64))
                .format("%Y-%m-%dT%H:%M:%S%.6f")
                .to_string();
            SeedArticle {
                id: Uuid::new_v4().to_string(),
                title: sample.title.to_string(),
                link: format!("https://example.com/article/{i}"),
                description: sample.description.to_string(),
                published: at.clone(),
                categories: sample.categories.iter().map(|c| c.to_string()).collect(),
                source: sample.source.to_string(),
                timestamp: at,
            }
        })
        .collect()
}

/// Write `count` test articles as a new export in `dir`.
pub async fn generate(count: usize, dir: &Path) -> Result<PathBuf, ExportError> {
    let exporter = ArticleExporter::new(dir)?;
    let path = exporter.save(&sample_articles(count)).await?;
    info!("Generated {} test articles and saved to {}", count, path.display());
    Ok(path)
}
