use anyhow::Context;

use newswire::{analysis::Analyzer, config::Config, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    logging::init(&config.log_level, None);

    let analyzer = Analyzer::new(&config)?;
    let path = analyzer
        .run_latest()
        .await
        .context("Error in analysis process")?;

    println!("Analysis complete. Results saved to: {}", path.display());
    Ok(())
}
