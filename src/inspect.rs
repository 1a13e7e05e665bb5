//! Repository inspection.
//!
//! Turns a checkout on disk into an [`InspectionResult`]: current branch,
//! divergence from upstream (or from the default branch when no upstream is
//! tracked) and the number of changed paths in the working tree.

use crate::git::VcsClient;
use crate::identifier::{RepoIdentifier, RepoLocation};
use thiserror::Error;
use tracing::{debug, instrument};

/// Branches tried, in order, when the current branch tracks nothing
pub const DEFAULT_BRANCHES: [&str; 2] = ["main", "master"];

#[derive(Error, Debug)]
pub enum InspectionError {
    #[error("error getting branch for {repo}: {source:#}")]
    BranchResolutionFailed { repo: String, source: anyhow::Error },

    #[error("error fetching {repo}: {source:#}")]
    FetchFailed { repo: String, source: anyhow::Error },
}

/// What the divergence counts were measured against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpstreamKind {
    /// No tracking ref; `ahead` is relative to the default branch and `behind` is always 0
    #[default]
    None,
    Tracked,
}

/// Snapshot of one repository's sync state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InspectionResult {
    pub owner: String,
    pub name: String,
    pub installed: bool,
    pub branch: String,
    pub upstream: UpstreamKind,
    pub behind: usize,
    pub ahead: usize,
    pub changed_files: usize,
}

impl InspectionResult {
    pub fn not_installed(id: &RepoIdentifier) -> Self {
        Self {
            owner: id.owner.clone(),
            name: id.name.clone(),
            ..Self::default()
        }
    }

    pub fn display_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    pub fn is_clean(&self) -> bool {
        match self.upstream {
            UpstreamKind::Tracked => self.behind == 0 && self.ahead == 0 && self.changed_files == 0,
            UpstreamKind::None => self.ahead == 0 && self.changed_files == 0,
        }
    }
}

/// Inspect the checkout of `id` at `location`.
///
/// A missing checkout is reported as not installed without touching git. Any
/// count that cannot be computed after a successful fetch is logged and left
/// at zero, so only branch resolution and the fetch itself can fail.
#[instrument(skip_all, fields(repo = %id), level = "debug")]
pub fn inspect<C: VcsClient + ?Sized>(
    client: &C,
    id: &RepoIdentifier,
    location: &RepoLocation,
) -> Result<InspectionResult, InspectionError> {
    if !location.exists() {
        return Ok(InspectionResult::not_installed(id));
    }
    let path = location.as_path();

    let branch = client
        .current_branch(path)
        .map_err(|source| InspectionError::BranchResolutionFailed {
            repo: id.display_name(),
            source,
        })?;

    client
        .fetch(path)
        .map_err(|source| InspectionError::FetchFailed {
            repo: id.display_name(),
            source,
        })?;

    let mut result = InspectionResult {
        owner: id.owner.clone(),
        name: id.name.clone(),
        installed: true,
        branch,
        ..InspectionResult::default()
    };

    let tracking = client.tracking_ref(path).unwrap_or_else(|e| {
        debug!("cannot read tracking ref: {e:#}");
        None
    });

    match tracking {
        Some(upstream) => {
            result.upstream = UpstreamKind::Tracked;
            result.behind = count_or_zero(client, path, "HEAD", &upstream);
            result.ahead = count_or_zero(client, path, &upstream, "HEAD");
        }
        None => {
            let default_branch = default_branch(client, path);
            result.ahead = count_or_zero(client, path, default_branch, "HEAD");
        }
    }

    result.changed_files = client.changed_files(path).unwrap_or_else(|e| {
        debug!("cannot list working tree changes: {e:#}");
        0
    });

    Ok(result)
}

fn default_branch<C: VcsClient + ?Sized>(client: &C, path: &std::path::Path) -> &'static str {
    let [preferred, fallback] = DEFAULT_BRANCHES;
    match client.branch_exists(path, preferred) {
        Ok(true) => preferred,
        _ => fallback,
    }
}

fn count_or_zero<C: VcsClient + ?Sized>(
    client: &C,
    path: &std::path::Path,
    from: &str,
    to: &str,
) -> usize {
    client.count_commits(path, from, to).unwrap_or_else(|e| {
        debug!("cannot count {from}..{to}: {e:#}");
        0
    })
}
