//! Command-line arguments.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::Parser;
use mailgraph_core::{PageLimit, RunOptions};

/// Retrieve mail from the Microsoft Graph API as JSON.
#[derive(Debug, Parser)]
#[command(name = "mailgraph", version, about)]
pub struct Cli {
    /// Configuration files; later files override earlier ones.
    #[arg(required = true, value_name = "CONFIG")]
    pub configs: Vec<PathBuf>,

    /// Write the JSON result to this file instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Maximum number of page requests, the first included.
    #[arg(short, long, value_name = "N", conflicts_with = "all")]
    pub limit: Option<NonZeroUsize>,

    /// Follow every continuation link.
    #[arg(long)]
    pub all: bool,

    /// Print the processed configuration, secrets masked, and exit.
    #[arg(long)]
    pub dump: bool,

    /// Emit records as received, without validation.
    #[arg(long)]
    pub raw: bool,

    /// Debug-level logging unless a filter is configured.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Pagination budget selected by `--limit` / `--all`.
    pub fn page_limit(&self) -> PageLimit {
        match (self.all, self.limit) {
            (true, _) => PageLimit::Unbounded,
            (false, Some(pages)) => PageLimit::Pages(pages),
            (false, None) => PageLimit::default(),
        }
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            limit: self.page_limit(),
            validate: !self.raw,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults_to_single_request() {
        let cli = Cli::try_parse_from(["mailgraph", "a.toml", "b.toml"]).unwrap();
        assert_eq!(cli.configs.len(), 2);
        assert_eq!(cli.page_limit(), PageLimit::default());
        assert!(cli.run_options().validate);
    }

    #[test]
    fn test_limit_and_all() {
        let cli = Cli::try_parse_from(["mailgraph", "a.toml", "--limit", "5"]).unwrap();
        assert_eq!(cli.page_limit(), PageLimit::from_count(5));

        let cli = Cli::try_parse_from(["mailgraph", "a.toml", "--all", "--raw"]).unwrap();
        assert_eq!(cli.page_limit(), PageLimit::Unbounded);
        assert!(!cli.run_options().validate);

        assert!(Cli::try_parse_from(["mailgraph", "a.toml", "--limit", "2", "--all"]).is_err());
        assert!(Cli::try_parse_from(["mailgraph", "a.toml", "--limit", "0"]).is_err());
    }

    #[test]
    fn test_config_required() {
        assert!(Cli::try_parse_from(["mailgraph", "--dump"]).is_err());
    }
}
