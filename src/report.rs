//! Batch status reporting.
//!
//! A report runs in three phases. The widths pass walks every identifier
//! and probes installed checkouts for their branch name. The inspection
//! pass fans out one unit of work per identifier on a rayon pool; the
//! indexed `collect` gives every unit its own slot at its original position,
//! so completion order never affects row order. The render pass then walks
//! the slots in order and formats the non-empty ones.

use crate::format::{BatchWidths, format_status};
use crate::git::VcsClient;
use crate::identifier::RepoIdentifier;
use crate::inspect::{InspectionResult, inspect};
use indicatif::ProgressBar;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Upper bound on worker threads when no explicit job count is configured
pub const MAX_DEFAULT_JOBS: usize = 64;

/// Parse every registry line, logging and blanking out the malformed ones
pub fn parse_all(identifiers: &[String]) -> Vec<Option<RepoIdentifier>> {
    identifiers
        .iter()
        .map(|raw| match RepoIdentifier::parse(raw) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("skipping registry entry: {e}");
                None
            }
        })
        .collect()
}

pub struct StatusReporter<C> {
    client: C,
    projects_dir: PathBuf,
    jobs: Option<usize>,
    progress: ProgressBar,
}

impl<C: VcsClient> StatusReporter<C> {
    pub fn new(client: C, projects_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            projects_dir: projects_dir.into(),
            jobs: None,
            progress: ProgressBar::hidden(),
        }
    }

    /// Bound the number of repositories inspected at once
    pub fn with_jobs(mut self, jobs: Option<usize>) -> Self {
        self.jobs = jobs;
        self
    }

    /// Advance `progress` once per finished inspection
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn projects_dir(&self) -> &Path {
        &self.projects_dir
    }

    /// Render the status of every identifier, in registry order.
    ///
    /// Malformed identifiers and repositories whose inspection failed are
    /// logged and left out; the rest keep their relative order.
    pub fn report(&self, identifiers: &[String]) -> Vec<String> {
        let ids = parse_all(identifiers);
        let widths = self.compute_widths(&ids);
        let slots = self.inspect_all(&ids);

        slots
            .iter()
            .flatten()
            .map(|result| format_status(result, &widths))
            .collect()
    }

    /// Longest display name over all parsed identifiers and longest branch
    /// over the installed ones. Never fetches.
    pub fn compute_widths(&self, ids: &[Option<RepoIdentifier>]) -> BatchWidths {
        let mut widths = BatchWidths::default();
        for id in ids.iter().flatten() {
            widths.observe_display_name(&id.display_name());

            let location = id.location(&self.projects_dir);
            if !location.exists() {
                continue;
            }
            match self.client.current_branch(location.as_path()) {
                Ok(branch) => widths.observe_branch(&branch),
                Err(e) => debug!(repo = %id, "no branch for width computation: {e:#}"),
            }
        }
        widths
    }

    /// Inspect every identifier concurrently; slot `i` holds the outcome for `ids[i]`
    pub fn inspect_all(&self, ids: &[Option<RepoIdentifier>]) -> Vec<Option<InspectionResult>> {
        self.progress.set_length(ids.len() as u64);

        let workers = self
            .jobs
            .unwrap_or_else(|| ids.len().min(MAX_DEFAULT_JOBS))
            .max(1);
        let slots = match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
            Ok(pool) => pool.install(|| self.fan_out(ids)),
            Err(e) => {
                warn!("cannot build worker pool, using the global one: {e}");
                self.fan_out(ids)
            }
        };

        self.progress.finish_and_clear();
        slots
    }

    fn fan_out(&self, ids: &[Option<RepoIdentifier>]) -> Vec<Option<InspectionResult>> {
        ids.par_iter()
            .map(|id| {
                let slot = id.as_ref().and_then(|id| self.inspect_one(id));
                self.progress.inc(1);
                slot
            })
            .collect()
    }

    fn inspect_one(&self, id: &RepoIdentifier) -> Option<InspectionResult> {
        let location = id.location(&self.projects_dir);
        match inspect(&self.client, id, &location) {
            Ok(result) => Some(result),
            Err(e) => {
                warn!("Error checking status for {id}: {e}");
                None
            }
        }
    }
}
