use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Errors produced while parsing a registry line into a repository identifier
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid git URL format: {raw}")]
    MalformedTransport { raw: String },

    #[error("invalid repository path: {raw}")]
    MalformedPath { raw: String },
}

/// A repository named by `transport:owner/name[.git]`, normalized to lowercase
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoIdentifier {
    pub owner: String,
    pub name: String,
}

impl RepoIdentifier {
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let (_transport, path) = match raw.split(':').collect::<Vec<_>>().as_slice() {
            [transport, path] => (*transport, *path),
            _ => {
                return Err(ParseError::MalformedTransport {
                    raw: raw.to_string(),
                })
            }
        };

        let path = path.strip_suffix(".git").unwrap_or(path);
        match path.split('/').collect::<Vec<_>>().as_slice() {
            [owner, name] if !owner.is_empty() && !name.is_empty() => Ok(Self {
                owner: owner.to_lowercase(),
                name: name.to_lowercase(),
            }),
            _ => Err(ParseError::MalformedPath {
                raw: raw.to_string(),
            }),
        }
    }

    /// `owner/name`, as shown in reports and listings
    pub fn display_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    pub fn location(&self, root: &Path) -> RepoLocation {
        RepoLocation(root.join(&self.owner).join(&self.name))
    }
}

impl FromStr for RepoIdentifier {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RepoIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Where a repository's checkout lives on disk: `root/owner/name`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoLocation(PathBuf);

impl RepoLocation {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Existence of the directory is the only "installed" signal
    pub fn exists(&self) -> bool {
        self.0.exists()
    }
}

impl fmt::Display for RepoLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}
