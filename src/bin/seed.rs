use clap::Parser;

use newswire::{config::Config, export::read_export, logging, seed};

#[derive(Parser)]
#[command(name = "newswire-seed")]
#[command(about = "Write a file of sample articles for the analyzer")]
struct Args {
    #[arg(short, long, default_value = "15")]
    count: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::from_env()?;
    logging::init(&config.log_level, None);

    let path = seed::generate(args.count, &config.export_dir).await?;
    let export = read_export(&path).await?;

    let title = |i: usize| {
        export
            .articles
            .get(i)
            .and_then(|a| a["title"].as_str())
            .unwrap_or("-")
    };

    println!("\nVerification:");
    println!("Total articles: {}", export.total_articles);
    println!("First article title: {}", title(0));
    println!(
        "Last article title: {}",
        title(export.articles.len().saturating_sub(1))
    );

    Ok(())
}
