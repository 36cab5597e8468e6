// src/main.rs
use clap::Parser;
use tracing_subscriber::EnvFilter;

use holdwatch::cli::{self, Cli};

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let code = cli::run(Cli::parse())?;
    std::process::exit(code);
}
