use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing::warn;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_FILE: &str = "newswire.log";

/// Install the global subscriber: console output always, plus an append-only
/// `newswire.log` under `log_dir` when one is given and can be opened.
/// `RUST_LOG` overrides `level`.
pub fn init(level: &str, log_dir: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("newswire={level},tower_http=info").into());

    let mut file_error = None;
    let file_layer = log_dir.and_then(|dir| {
        let path = dir.join(LOG_FILE);
        let opened = fs::create_dir_all(dir)
            .and_then(|_| OpenOptions::new().create(true).append(true).open(&path));
        match opened {
            Ok(file) => Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            ),
            Err(e) => {
                file_error = Some((path, e));
                None
            }
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .init();

    if let Some((path, e)) = file_error {
        warn!("Could not open log file {}: {}", path.display(), e);
    }
}
