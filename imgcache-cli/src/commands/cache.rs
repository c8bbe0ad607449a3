//! Cache management CLI commands.

use clap::Subcommand;
use imgcache::CacheEngine;

use super::format_size;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Clear the disk cache, removing all cached images
    Clear,
    /// Show disk cache statistics
    Stats,
}

/// Run a cache subcommand.
pub fn run(runner: &CliRunner, action: CacheAction) -> Result<(), CliError> {
    let engine = runner.disk_engine();
    let options = runner.config().engine.clone();

    runner.block_on(async move {
        // Honour a directory override from the [engine] section.
        if let Err(e) = engine.init(&options).await {
            return Err(CliError::EngineUnavailable(format!(
                "{} ({})",
                engine.directory().display(),
                e
            )));
        }

        match action {
            CacheAction::Clear => {
                println!("Clearing disk cache at: {}", engine.directory().display());
                let removed = engine.clear().await.map_err(CliError::CacheClear)?;
                println!(
                    "Deleted {} files, freed {}",
                    removed.files,
                    format_size(removed.bytes)
                );
            }
            CacheAction::Stats => {
                let stats = engine.stats().await.map_err(CliError::CacheStats)?;
                println!("Disk cache: {}", engine.directory().display());
                println!("  Files: {}", stats.files);
                println!("  Size:  {}", format_size(stats.bytes));
            }
        }
        Ok::<(), CliError>(())
    })
}
