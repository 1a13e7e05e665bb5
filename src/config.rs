use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::cli::CliArgs;

/// Registry file name inside the projects directory
pub const REGISTRY_FILE_NAME: &str = ".current-projects";

#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(default)]
pub struct Config {
    pub version: u32,
    /// Checkouts live at `projects_dir/owner/name`
    pub projects_dir: PathBuf,
    /// Defaults to `projects_dir/.current-projects`
    pub registry_file: Option<PathBuf>,
    /// Repositories inspected at once; one per repository when unset
    pub jobs: Option<usize>,
    pub fetch_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: 1,
            projects_dir: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("Projects"),
            registry_file: None,
            jobs: None,
            fetch_timeout_secs: 30,
        }
    }
}

pub fn get_default_config_path() -> Result<PathBuf> {
    let proj_dirs =
        ProjectDirs::from("", "", "prj").context("Failed to determine project directories")?;

    let config_dir = proj_dirs.config_dir();
    Ok(config_dir.join("prj.toml"))
}

impl Config {
    /// Load the config file, falling back to defaults when it does not exist
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let path = match config_path {
            Some(p) => p,
            None => get_default_config_path()?,
        };

        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn from_cli_and_file(cli_args: &CliArgs) -> Result<Self> {
        let mut config = Self::load(cli_args.config.clone())?;

        // CLI args override config file
        if let Some(projects_dir) = &cli_args.projects_dir {
            config.projects_dir = projects_dir.clone();
        }

        Ok(config)
    }

    pub fn registry_path(&self) -> PathBuf {
        self.registry_file
            .clone()
            .unwrap_or_else(|| self.projects_dir.join(REGISTRY_FILE_NAME))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
