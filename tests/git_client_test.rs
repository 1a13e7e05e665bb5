use anyhow::Result;
use git2::{BranchType, Commit, Oid, Repository, RepositoryInitOptions, Signature};
use prj::git::{Git2Client, VcsClient};
use prj::inspect::{InspectionError, inspect};
use prj::{RepoIdentifier, StatusReporter, UpstreamKind};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

fn init_repo(path: &Path) -> Result<Repository> {
    fs::create_dir_all(path)?;
    let mut opts = RepositoryInitOptions::new();
    opts.initial_head("main");
    Ok(Repository::init_opts(path, &opts)?)
}

/// Commit the empty tree; moves `update_ref` when given
fn empty_commit(
    repo: &Repository,
    update_ref: Option<&str>,
    parents: &[&Commit],
    message: &str,
) -> Result<Oid> {
    let signature = Signature::now("Test User", "test@example.com")?;
    let tree_id = repo.treebuilder(None)?.write()?;
    let tree = repo.find_tree(tree_id)?;
    Ok(repo.commit(update_ref, &signature, &signature, message, &tree, parents)?)
}

/// Repository on `main` with `count` commits; returns their ids oldest first
fn repo_with_history(path: &Path, count: usize) -> Result<(Repository, Vec<Oid>)> {
    let repo = init_repo(path)?;
    let mut oids = Vec::new();
    for i in 0..count {
        let parent = match oids.last() {
            Some(oid) => Some(repo.find_commit(*oid)?),
            None => None,
        };
        let parents: Vec<&Commit> = parent.iter().collect();
        oids.push(empty_commit(&repo, Some("HEAD"), &parents, &format!("commit {i}"))?);
    }
    Ok((repo, oids))
}

fn track_origin_main(repo: &Repository, remote_tip: Oid) -> Result<()> {
    repo.remote("origin", "/nonexistent/remote.git")?;
    repo.reference("refs/remotes/origin/main", remote_tip, true, "test upstream")?;
    repo.find_branch("main", BranchType::Local)?
        .set_upstream(Some("origin/main"))?;
    Ok(())
}

fn client() -> Git2Client {
    Git2Client::new(Duration::from_secs(10))
}

#[test]
fn test_current_branch_on_main() -> Result<()> {
    let temp_dir = TempDir::new()?;
    repo_with_history(temp_dir.path(), 1)?;

    assert_eq!(client().current_branch(temp_dir.path())?, "main");
    Ok(())
}

#[test]
fn test_current_branch_detached_head() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let (repo, oids) = repo_with_history(temp_dir.path(), 1)?;
    repo.set_head_detached(oids[0])?;

    assert_eq!(client().current_branch(temp_dir.path())?, "HEAD");
    Ok(())
}

#[test]
fn test_current_branch_fails_without_commits() -> Result<()> {
    let temp_dir = TempDir::new()?;
    init_repo(temp_dir.path())?;

    assert!(client().current_branch(temp_dir.path()).is_err());
    Ok(())
}

#[test]
fn test_current_branch_fails_outside_repository() -> Result<()> {
    let temp_dir = TempDir::new()?;
    assert!(client().current_branch(temp_dir.path()).is_err());
    Ok(())
}

#[test]
fn test_no_tracking_ref_without_upstream() -> Result<()> {
    let temp_dir = TempDir::new()?;
    repo_with_history(temp_dir.path(), 1)?;

    assert_eq!(client().tracking_ref(temp_dir.path())?, None);
    Ok(())
}

#[test]
fn test_tracking_ref_and_behind_count() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let (repo, oids) = repo_with_history(temp_dir.path(), 3)?;
    track_origin_main(&repo, oids[2])?;
    // Local main falls two commits behind origin/main
    repo.reference("refs/heads/main", oids[0], true, "rewind")?;

    let client = client();
    let upstream = client
        .tracking_ref(temp_dir.path())?
        .expect("upstream should be tracked");
    assert_eq!(upstream, "refs/remotes/origin/main");

    assert_eq!(client.count_commits(temp_dir.path(), "HEAD", &upstream)?, 2);
    assert_eq!(client.count_commits(temp_dir.path(), &upstream, "HEAD")?, 0);
    Ok(())
}

#[test]
fn test_tracking_ref_missing_remote_branch_counts_as_none() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let (repo, oids) = repo_with_history(temp_dir.path(), 1)?;
    track_origin_main(&repo, oids[0])?;
    repo.find_reference("refs/remotes/origin/main")?.delete()?;

    assert_eq!(client().tracking_ref(temp_dir.path())?, None);
    Ok(())
}

#[test]
fn test_ahead_of_main_on_feature_branch() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let (repo, oids) = repo_with_history(temp_dir.path(), 1)?;

    let mut tip = oids[0];
    repo.branch("feature", &repo.find_commit(tip)?, false)?;
    for i in 0..3 {
        let parent = repo.find_commit(tip)?;
        tip = empty_commit(&repo, Some("refs/heads/feature"), &[&parent], &format!("feature {i}"))?;
    }
    repo.set_head("refs/heads/feature")?;

    let client = client();
    assert_eq!(client.current_branch(temp_dir.path())?, "feature");
    assert_eq!(client.tracking_ref(temp_dir.path())?, None);
    assert!(client.branch_exists(temp_dir.path(), "main")?);
    assert!(!client.branch_exists(temp_dir.path(), "master")?);
    assert_eq!(client.count_commits(temp_dir.path(), "main", "HEAD")?, 3);
    Ok(())
}

#[test]
fn test_count_commits_unknown_ref_is_an_error() -> Result<()> {
    let temp_dir = TempDir::new()?;
    repo_with_history(temp_dir.path(), 1)?;

    assert!(client().count_commits(temp_dir.path(), "master", "HEAD").is_err());
    Ok(())
}

#[test]
fn test_changed_files_counts_tracked_and_untracked() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let (repo, _) = repo_with_history(temp_dir.path(), 1)?;
    let client = client();

    assert_eq!(client.changed_files(temp_dir.path())?, 0);

    fs::write(temp_dir.path().join("untracked.txt"), "new")?;
    fs::write(temp_dir.path().join("staged.txt"), "staged")?;
    let mut index = repo.index()?;
    index.add_path(Path::new("staged.txt"))?;
    index.write()?;

    assert_eq!(client.changed_files(temp_dir.path())?, 2);
    Ok(())
}

#[test]
fn test_changed_files_ignores_gitignored_paths() -> Result<()> {
    let temp_dir = TempDir::new()?;
    repo_with_history(temp_dir.path(), 1)?;
    fs::write(temp_dir.path().join(".gitignore"), "*.log\n")?;
    fs::write(temp_dir.path().join("debug.log"), "noise")?;

    // Only the untracked .gitignore itself shows up
    assert_eq!(client().changed_files(temp_dir.path())?, 1);
    Ok(())
}

#[test]
fn test_fetch_from_unreachable_remote_fails() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let (repo, _) = repo_with_history(temp_dir.path(), 1)?;
    let missing = temp_dir.path().join("does-not-exist.git");
    repo.remote("origin", &missing.to_string_lossy())?;

    assert!(client().fetch(temp_dir.path()).is_err());
    Ok(())
}

#[test]
fn test_inspect_reports_fetch_failure() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let id = RepoIdentifier::parse("git@host:alice/repo.git")?;
    let location = id.location(temp_dir.path());

    let (repo, _) = repo_with_history(location.as_path(), 1)?;
    let missing = temp_dir.path().join("does-not-exist.git");
    repo.remote("origin", &missing.to_string_lossy())?;

    let err = inspect(&client(), &id, &location).unwrap_err();
    assert!(matches!(err, InspectionError::FetchFailed { .. }), "{err}");
    Ok(())
}

#[test]
fn test_inspect_missing_checkout_is_not_installed() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let id = RepoIdentifier::parse("git@host:Alice/Repo.git")?;

    let result = inspect(&client(), &id, &id.location(temp_dir.path()))?;
    assert!(!result.installed);
    assert_eq!(result.display_name(), "alice/repo");
    Ok(())
}

/// Clone `origin` into the checkout location of `raw` under `projects_dir`
fn clone_into(origin: &Path, projects_dir: &Path, raw: &str) -> Result<(RepoIdentifier, Repository)> {
    let id = RepoIdentifier::parse(raw)?;
    let location = id.location(projects_dir);
    fs::create_dir_all(location.as_path())?;
    let repo = Repository::clone(&origin.to_string_lossy(), location.as_path())?;
    Ok((id, repo))
}

#[test]
fn test_inspect_after_successful_fetch() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let origin_dir = temp_dir.path().join("origin");
    let projects_dir = temp_dir.path().join("projects");
    let (_origin, oids) = repo_with_history(&origin_dir, 3)?;

    // Tracking clone rewound two commits behind origin/main
    let (behind_id, behind_repo) = clone_into(&origin_dir, &projects_dir, "git@host:alice/repo.git")?;
    behind_repo.reference("refs/heads/main", oids[0], true, "rewind")?;

    // Clone working on a local-only branch three commits past main, one file untracked
    let (ahead_id, ahead_repo) = clone_into(&origin_dir, &projects_dir, "git@host:bob/local.git")?;
    let mut tip = oids[2];
    ahead_repo.branch("feature", &ahead_repo.find_commit(tip)?, false)?;
    for i in 0..3 {
        let parent = ahead_repo.find_commit(tip)?;
        tip = empty_commit(&ahead_repo, Some("refs/heads/feature"), &[&parent], &format!("feature {i}"))?;
    }
    ahead_repo.set_head("refs/heads/feature")?;
    fs::write(ahead_id.location(&projects_dir).as_path().join("notes.txt"), "wip")?;

    let client = client();
    let behind = inspect(&client, &behind_id, &behind_id.location(&projects_dir))?;
    assert_eq!(behind.branch, "main");
    assert_eq!(behind.upstream, UpstreamKind::Tracked);
    assert_eq!((behind.behind, behind.ahead, behind.changed_files), (2, 0, 0));

    let ahead = inspect(&client, &ahead_id, &ahead_id.location(&projects_dir))?;
    assert_eq!(ahead.branch, "feature");
    assert_eq!(ahead.upstream, UpstreamKind::None);
    assert_eq!((ahead.behind, ahead.ahead, ahead.changed_files), (0, 3, 1));

    colored::control::set_override(false);
    let reporter = StatusReporter::new(client, &projects_dir);
    let lines = reporter.report(&[
        "git@host:alice/repo.git".to_string(),
        "git@host:bob/local.git".to_string(),
        "git@host:zed/none.git".to_string(),
    ]);
    assert_eq!(
        lines,
        vec![
            "alice/repo git:(main)    [2↓]",
            "bob/local  git:(feature) [3↑] [1 changes]",
            "zed/none: Not installed",
        ]
    );
    Ok(())
}
