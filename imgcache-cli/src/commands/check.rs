//! Check command - report cache presence without downloading.

use imgcache::{GateOutcome, ImgCacheService};

use crate::error::CliError;
use crate::runner::CliRunner;

/// Run the check command.
pub fn run(runner: &CliRunner, urls: Vec<String>) -> Result<(), CliError> {
    let config = runner.app_config().with_manual_init(true);
    let engine = runner.disk_engine();
    let directory = config.cache_directory.display().to_string();

    runner.block_on(async move {
        let service = ImgCacheService::start(config, engine)?;
        if service.initialize().await == GateOutcome::Failed {
            return Err(CliError::EngineUnavailable(directory));
        }

        for url in &urls {
            let lookup = service.engine().is_cached(url).await;
            if lookup.found {
                println!("{}\tcached\t{}", url, lookup.path.display());
            } else {
                println!("{}\tmissing", url);
            }
        }
        Ok::<(), CliError>(())
    })
}
