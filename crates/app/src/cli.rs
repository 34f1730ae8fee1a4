//! Command-line arguments.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use uuid::Uuid;

/// Catalog and image-recognition client.
#[derive(Parser, Debug)]
#[command(name = "shelfscan")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Browse the product catalog and run image recognition", long_about = None)]
pub struct Cli {
    /// Config file; `shelfscan.toml` in the working directory is used when present
    #[arg(short, long, env = "SHELFSCAN_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// List catalog items
    Catalog {
        /// Page size (1-100); defaults to the configured page size
        #[arg(long)]
        limit: Option<u32>,

        /// Number of pages to load
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        pages: u32,

        /// Only print items that still need onboarding
        #[arg(long)]
        incomplete: bool,
    },

    /// List image-recognition tasks
    Tasks {
        /// Page size (1-100); defaults to the configured page size
        #[arg(long)]
        limit: Option<u32>,

        /// Number of pages to load
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        pages: u32,
    },

    /// Upload images to a task
    Submit {
        /// Task id
        task: Uuid,

        /// Image files (jpeg, png, webp, gif or bmp; at most 10 MiB each)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// URL the server calls when processing finishes
        #[arg(long)]
        callback: Option<String>,
    },

    /// List a task's results
    Results {
        /// Task id
        task: Uuid,

        /// Page size (1-100); defaults to the configured page size
        #[arg(long)]
        limit: Option<u32>,

        /// Only results created at or after this RFC 3339 time
        #[arg(long)]
        since: Option<DateTime<Utc>>,

        /// Only results created at or before this RFC 3339 time
        #[arg(long)]
        until: Option<DateTime<Utc>>,

        /// Keep refreshing while results are processing
        #[arg(long)]
        watch: bool,
    },

    /// Show one result
    #[command(name = "result")]
    SingleResult {
        /// Task id
        task: Uuid,

        /// Result id
        result: Uuid,

        /// Keep refreshing while the result is processing
        #[arg(long)]
        watch: bool,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    const TASK: &str = "123e4567-e89b-12d3-a456-426614174000";

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_catalog_defaults() {
        let cli = Cli::try_parse_from(["shelfscan", "catalog"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Catalog {
                limit: None,
                pages: 1,
                incomplete: false
            }
        );
    }

    #[test]
    fn test_parse_results_window() {
        let cli = Cli::try_parse_from([
            "shelfscan",
            "results",
            TASK,
            "--since",
            "2025-01-13T00:00:00Z",
            "--watch",
        ])
        .unwrap();
        let Command::Results {
            since, until, watch, ..
        } = cli.command
        else {
            panic!("expected results command");
        };
        assert_eq!(since.unwrap().to_rfc3339(), "2025-01-13T00:00:00+00:00");
        assert_eq!(until, None);
        assert!(watch);
    }

    #[test]
    fn test_submit_requires_files() {
        assert!(Cli::try_parse_from(["shelfscan", "submit", TASK]).is_err());
        assert!(Cli::try_parse_from(["shelfscan", "submit", "not-a-uuid", "a.png"]).is_err());
    }

    #[test]
    fn test_zero_pages_is_rejected() {
        assert!(Cli::try_parse_from(["shelfscan", "tasks", "--pages", "0"]).is_err());
    }

    #[test]
    fn test_single_result_subcommand_name() {
        let cli = Cli::try_parse_from(["shelfscan", "result", TASK, TASK]).unwrap();
        assert!(matches!(cli.command, Command::SingleResult { watch: false, .. }));
    }
}
