//! The registry file: one repository identifier per line.
//!
//! Blank lines and lines starting with `#` are ignored. New entries are only
//! ever appended, so the line order users see in `status` and `list` is the
//! order they added repositories in.

use crate::identifier::{ParseError, RepoIdentifier};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const REGISTRY_TEMPLATE: &str = "\
# Add your git repositories here, one per line
# Example:
# git@github.com:username/repo.git
";

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Projects directory not initialized. Please run 'prj init' first ({} is missing)", .path.display())]
    Unavailable { path: PathBuf },

    #[error("Failed to access registry file {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Identifier(#[from] ParseError),
}

/// Result of `Registry::add`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyPresent,
}

#[derive(Debug, Clone)]
pub struct Registry {
    path: PathBuf,
}

impl Registry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Create the registry (and its parent directory) with a commented
    /// template. Returns `false` without touching anything if it already exists.
    pub fn init(&self) -> Result<bool, RegistryError> {
        if self.exists() {
            return Ok(false);
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }
        fs::write(&self.path, REGISTRY_TEMPLATE).map_err(|source| self.io_error(source))?;
        info!("created registry at {}", self.path.display());
        Ok(true)
    }

    /// Raw identifiers in file order, comments and blank lines removed
    pub fn read(&self) -> Result<Vec<String>, RegistryError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(RegistryError::Unavailable {
                    path: self.path.clone(),
                });
            }
            Err(source) => return Err(self.io_error(source)),
        };

        Ok(parse_lines(&contents))
    }

    /// Append `raw` unless an equivalent identifier is already registered.
    ///
    /// Two identifiers are equivalent when they match ignoring case and a
    /// trailing `.git`.
    pub fn add(&self, raw: &str) -> Result<AddOutcome, RegistryError> {
        let raw = raw.trim();
        RepoIdentifier::parse(raw)?;

        let existing = self.read()?;
        if existing.iter().any(|line| same_identifier(line, raw)) {
            return Ok(AddOutcome::AlreadyPresent);
        }

        let contents = fs::read_to_string(&self.path).map_err(|source| self.io_error(source))?;
        let mut line = String::new();
        if !contents.is_empty() && !contents.ends_with('\n') {
            line.push('\n');
        }
        line.push_str(raw);
        line.push('\n');

        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|source| self.io_error(source))?;
        file.write_all(line.as_bytes())
            .map_err(|source| self.io_error(source))?;

        info!("added {raw} to {}", self.path.display());
        Ok(AddOutcome::Added)
    }

    fn io_error(&self, source: io::Error) -> RegistryError {
        RegistryError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

pub fn parse_lines(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

fn same_identifier(a: &str, b: &str) -> bool {
    fn normalize(s: &str) -> String {
        let lower = s.trim().to_lowercase();
        lower.strip_suffix(".git").unwrap_or(&lower).to_string()
    }
    normalize(a) == normalize(b)
}
