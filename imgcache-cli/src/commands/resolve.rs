//! Resolve command - serve URLs from the cache, downloading on a miss.

use imgcache::{AppError, CacheRequest, GateFailurePolicy, ImageKind, ImgCacheService};

use super::describe_outcome;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the resolve command.
pub struct ResolveArgs {
    pub urls: Vec<String>,
    pub background: bool,
    pub max_attempts: Option<u32>,
    pub fallback_on_init_failure: bool,
}

/// Run the resolve command.
pub fn run(runner: &CliRunner, args: ResolveArgs) -> Result<(), CliError> {
    let mut config = runner.app_config();
    if let Some(max_attempts) = args.max_attempts {
        config = config.with_max_attempts(max_attempts);
    }
    if args.fallback_on_init_failure {
        config = config.with_gate_failure_policy(GateFailurePolicy::Fallback);
    }
    // The CLI always initializes; manual_init only matters to embedders.
    config = config.with_manual_init(false);

    let kind = if args.background {
        ImageKind::Background
    } else {
        ImageKind::Direct
    };

    let requests = args
        .urls
        .into_iter()
        .map(|url| CacheRequest::new(url, kind))
        .collect::<Result<Vec<_>, _>>()
        .map_err(AppError::from)?;

    let engine = runner.disk_engine();
    runner.block_on(async move {
        let service = ImgCacheService::start(config, engine)?;
        let resolutions = service.resolver().resolve_all(&requests).await;

        for resolution in &resolutions {
            println!(
                "{}\t{}\t({})",
                resolution.request.url(),
                resolution.rendered(),
                describe_outcome(&resolution.outcome)
            );
        }
        Ok::<(), CliError>(())
    })
}
