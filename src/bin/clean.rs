use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use newswire::cleaner;

/// Print the plain-text content of every `*:encoded` element as JSON.
#[derive(Parser)]
#[command(name = "newswire-clean")]
struct Args {
    /// XML file to read; stdin when omitted
    input: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let xml = match &args.input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    println!("{}", cleaner::process(&xml)?);
    Ok(())
}
