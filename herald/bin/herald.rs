#![deny(clippy::pedantic, clippy::all, clippy::nursery)]
#![allow(clippy::must_use_candidate)]

#[cfg(not(any(target_os = "macos", unix)))]
compile_error!("Only macos and unix are currently supported");

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

#[derive(Debug, Parser)]
#[command(version, about = "Bulk campaign dispatcher")]
struct Args {
    /// Configuration file to use instead of the default search
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => path,
        None => herald::config_file::find()?,
    };
    let config_content = std::fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    let herald: herald::Herald = ron::from_str(&config_content)
        .with_context(|| format!("Failed to parse {}", config_path.display()))?;

    if args.check {
        herald.validate()?;
        println!("{}: configuration ok", config_path.display());
        return Ok(());
    }

    herald.run().await
}
