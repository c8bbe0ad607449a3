//! imgcache CLI - Command-line interface
//!
//! Resolves remote image URLs through the local disk cache, printing the
//! cached path or, when caching failed, the original URL.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::cache::CacheAction;
use commands::resolve::ResolveArgs;

#[derive(Debug, Parser)]
#[command(name = "imgcache", version, about = "Serve remote images from a local cache")]
struct Cli {
    /// Configuration file (default: ~/.imgcache/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Cache directory (overrides the configuration file)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Resolve URLs to cached paths, downloading them if needed
    Resolve {
        /// Image URLs to resolve
        #[arg(required = true)]
        urls: Vec<String>,

        /// Render results as background-image values (url(...))
        #[arg(long)]
        background: bool,

        /// Retries after the first failed download
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Use the original URL immediately if the cache cannot initialize
        #[arg(long)]
        fallback_on_init_failure: bool,
    },
    /// Report whether URLs are already cached, without downloading
    Check {
        /// Image URLs to check
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Manage the disk cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let runner = match runner::CliRunner::new(cli.config.as_deref(), cli.cache_dir, cli.verbose) {
        Ok(runner) => runner,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Resolve {
            urls,
            background,
            max_attempts,
            fallback_on_init_failure,
        } => commands::resolve::run(
            &runner,
            ResolveArgs {
                urls,
                background,
                max_attempts,
                fallback_on_init_failure,
            },
        ),
        Commands::Check { urls } => commands::check::run(&runner, urls),
        Commands::Cache { action } => commands::cache::run(&runner, action),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_resolve() {
        let cli = Cli::try_parse_from([
            "imgcache",
            "resolve",
            "--background",
            "--max-attempts",
            "4",
            "https://x/a.png",
            "https://x/b.png",
        ])
        .unwrap();

        match cli.command {
            Commands::Resolve {
                urls,
                background,
                max_attempts,
                fallback_on_init_failure,
            } => {
                assert_eq!(urls.len(), 2);
                assert!(background);
                assert_eq!(max_attempts, Some(4));
                assert!(!fallback_on_init_failure);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_resolve_requires_url() {
        assert!(Cli::try_parse_from(["imgcache", "resolve"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "imgcache",
            "cache",
            "stats",
            "--cache-dir",
            "/tmp/img",
            "-v",
        ])
        .unwrap();
        assert_eq!(cli.cache_dir, Some(PathBuf::from("/tmp/img")));
        assert!(cli.verbose);
    }
}
