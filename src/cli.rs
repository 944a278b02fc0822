//! CLI argument parsing.
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::{
    Result, agent::orchestrator::ExecutionMode, config::AnvilConfig,
    error::AnvilError,
};

/// Global CLI arguments.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[arg(long, default_value_t = false, global = true)]
    /// Enable debug logging.
    pub debug: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Analysis overrides layered on top of the environment configuration.
#[derive(ClapArgs, Debug, Default, Clone)]
pub struct AnalysisArgs {
    #[arg(long, default_value_t = false)]
    /// Run the reviewers one at a time instead of concurrently.
    pub sequential: bool,

    #[arg(long)]
    /// Characters of changelog text sent to each reviewer.
    pub max_changelog_chars: Option<usize>,
}

impl AnalysisArgs {
    /// Apply the overrides to `config`.
    pub fn apply(&self, config: &mut AnvilConfig) -> Result<()> {
        if self.sequential {
            config.analysis.mode = ExecutionMode::Sequential;
        }

        if let Some(max) = self.max_changelog_chars {
            if max == 0 {
                return Err(AnvilError::InvalidArgs(
                    "--max-changelog-chars must be greater than zero".into(),
                ));
            }
            config.analysis.max_changelog_chars = max;
        }

        Ok(())
    }
}

/// Anvil subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the dependency dashboard for a project.
    Check {
        /// Project root.
        #[arg(default_value = ".")]
        path: PathBuf,

        #[arg(long, default_value_t = false, conflicts_with = "apply")]
        /// Only report, never install (the default).
        dry_run: bool,

        #[arg(long, default_value_t = false)]
        /// Run the interactive upgrade after reporting.
        apply: bool,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },

    /// Interactively upgrade selected dependencies.
    Upgrade {
        /// Project root.
        #[arg(default_value = ".")]
        path: PathBuf,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },

    /// Print the changelog between two versions of a package.
    Changelog {
        /// Package name on the registry.
        package: String,
        /// Currently installed version.
        from: String,
        /// Version being upgraded to.
        to: String,
    },
}
