use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, PartialEq)]
#[command(name = "prj")]
#[command(about = "Project management tool - keep your git checkouts registered and in sync")]
pub struct CliArgs {
    /// Directory holding checkouts as owner/name (overrides config)
    #[arg(long, global = true)]
    pub projects_dir: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Initialize the projects directory and registry file
    Init,

    /// Add a repository to the registry
    #[command(visible_alias = "a")]
    Add {
        /// Repository identifier, e.g. git@github.com:user/repo.git
        repo: String,
    },

    /// Show git status for all projects
    #[command(visible_alias = "s")]
    Status,

    /// List all projects without git status
    #[command(visible_alias = "l")]
    List,
}
