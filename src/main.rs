use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use bgremove_batch::{Backends, BatchRemover, Config};

fn main() -> Result<()> {
    let config = Config::new();
    init_tracing(&config)?;

    let backends = Backends::probe(&config);
    let remover = BatchRemover::new(config, backends, ".");

    let report = remover.run().context("batch aborted")?;
    if !report.files.is_empty() {
        println!("{report}");
    }

    Ok(())
}

/// Diagnostics go to stderr; stdout carries the per-file notices.
fn init_tracing(config: &Config) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.log_filter())?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    Ok(())
}
