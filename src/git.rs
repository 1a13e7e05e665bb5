use anyhow::{Context, Result, bail};
use git2::{ErrorCode, Repository as GitRepository, StatusOptions};
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

/// Version-control queries the inspector needs from a checkout.
///
/// Implementations must be shareable across worker threads; every method
/// is called with the checkout path so one client can serve the whole batch.
pub trait VcsClient: Send + Sync {
    /// Short name of the checked out branch, `HEAD` when detached
    fn current_branch(&self, repo: &Path) -> Result<String>;

    /// Refresh remote-tracking refs from the configured remote (network)
    fn fetch(&self, repo: &Path) -> Result<()>;

    /// Tracking reference of the current branch, if one is configured and present
    fn tracking_ref(&self, repo: &Path) -> Result<Option<String>>;

    fn branch_exists(&self, repo: &Path, branch: &str) -> Result<bool>;

    /// Number of commits reachable from `to` but not from `from`
    fn count_commits(&self, repo: &Path, from: &str, to: &str) -> Result<usize>;

    /// One entry per modified, added, deleted or untracked path
    fn changed_files(&self, repo: &Path) -> Result<usize>;
}

/// `VcsClient` backed by libgit2 for local queries and the git binary for fetches
#[derive(Debug, Clone)]
pub struct Git2Client {
    fetch_timeout: Duration,
}

impl Git2Client {
    pub fn new(fetch_timeout: Duration) -> Self {
        Self { fetch_timeout }
    }

    fn open_repo(&self, repo: &Path) -> Result<GitRepository> {
        GitRepository::open(repo)
            .with_context(|| format!("Failed to open git repository at {}", repo.display()))
    }
}

impl Default for Git2Client {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl VcsClient for Git2Client {
    fn current_branch(&self, repo: &Path) -> Result<String> {
        let git_repo = self.open_repo(repo)?;
        let head = git_repo.head().context("Failed to resolve HEAD")?;
        let branch = head
            .shorthand()
            .context("HEAD is not valid UTF-8")?
            .to_string();
        Ok(branch)
    }

    fn fetch(&self, repo: &Path) -> Result<()> {
        debug!(repo = %repo.display(), "fetching");
        let mut command = Command::new("git");
        command
            .arg("-C")
            .arg(repo)
            .args(["fetch", "--quiet"])
            .env("GIT_TERMINAL_PROMPT", "0");
        run_with_deadline(command, self.fetch_timeout).context("git fetch failed")
    }

    fn tracking_ref(&self, repo: &Path) -> Result<Option<String>> {
        let git_repo = self.open_repo(repo)?;
        let head = git_repo.head().context("Failed to resolve HEAD")?;
        if !head.is_branch() {
            return Ok(None);
        }
        let Some(ref_name) = head.name() else {
            return Ok(None);
        };

        let upstream = match git_repo.branch_upstream_name(ref_name) {
            Ok(buf) => buf,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e).context("Failed to read upstream configuration"),
        };
        let Some(upstream) = upstream.as_str() else {
            return Ok(None);
        };

        // Configured but never fetched counts as no upstream
        if git_repo.refname_to_id(upstream).is_err() {
            return Ok(None);
        }

        Ok(Some(upstream.to_string()))
    }

    fn branch_exists(&self, repo: &Path, branch: &str) -> Result<bool> {
        let git_repo = self.open_repo(repo)?;
        Ok(git_repo.revparse_single(branch).is_ok())
    }

    fn count_commits(&self, repo: &Path, from: &str, to: &str) -> Result<usize> {
        let git_repo = self.open_repo(repo)?;
        let from_oid = git_repo
            .revparse_single(from)
            .and_then(|obj| obj.peel_to_commit())
            .with_context(|| format!("Failed to resolve {from}"))?
            .id();
        let to_oid = git_repo
            .revparse_single(to)
            .and_then(|obj| obj.peel_to_commit())
            .with_context(|| format!("Failed to resolve {to}"))?
            .id();

        let mut revwalk = git_repo.revwalk()?;
        revwalk.push(to_oid)?;
        revwalk.hide(from_oid)?;

        let mut count = 0;
        for oid in revwalk {
            oid?;
            count += 1;
        }
        Ok(count)
    }

    fn changed_files(&self, repo: &Path) -> Result<usize> {
        let git_repo = self.open_repo(repo)?;

        let mut status_options = StatusOptions::new();
        status_options.include_untracked(true);
        status_options.include_ignored(false);

        let statuses = git_repo
            .statuses(Some(&mut status_options))
            .context("Failed to get git status")?;

        Ok(statuses.len())
    }
}

/// Run `command` to completion, killing it once `timeout` elapses.
///
/// Stderr is drained on a separate thread while waiting so a chatty child
/// never stalls on a full pipe; its text ends up in the error on failure.
fn run_with_deadline(mut command: Command, timeout: Duration) -> Result<()> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .context("Failed to spawn child process")?;

    let stderr_reader = child.stderr.take().map(|mut pipe| {
        thread::spawn(move || {
            let mut stderr = String::new();
            let _ = pipe.read_to_string(&mut stderr);
            stderr
        })
    });

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait().context("Failed to wait for child process")? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            bail!("timed out after {}s", timeout.as_secs_f32());
        }
        thread::sleep(Duration::from_millis(20));
    };

    let stderr = stderr_reader
        .and_then(|reader| reader.join().ok())
        .unwrap_or_default();
    if !status.success() {
        bail!("exited with {status}: {}", stderr.trim());
    }

    Ok(())
}
