use crate::identifier::RepoIdentifier;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directories at `projects_dir/owner/name` that no registry entry maps to.
///
/// Hidden entries (names starting with `.`) are skipped at both levels.
/// Results are sorted by path.
pub fn find_unexpected_checkouts<P: AsRef<Path>>(
    projects_dir: P,
    registered: &[RepoIdentifier],
) -> Result<Vec<PathBuf>> {
    let projects_dir = projects_dir.as_ref();
    let expected: HashSet<PathBuf> = registered
        .iter()
        .map(|id| id.location(projects_dir).as_path().to_path_buf())
        .collect();

    let mut unexpected = Vec::new();
    for entry in WalkDir::new(projects_dir)
        .min_depth(2)
        .max_depth(2)
        .sort_by_file_name()
    {
        let entry = entry.context("Failed to read directory entry")?;
        if !entry.file_type().is_dir() || is_hidden(entry.path(), projects_dir) {
            continue;
        }
        if !expected.contains(entry.path()) {
            unexpected.push(entry.path().to_path_buf());
        }
    }

    Ok(unexpected)
}

/// `owner/name` relative to the projects directory, for display
pub fn relative_display(path: &Path, projects_dir: &Path) -> String {
    path.strip_prefix(projects_dir)
        .unwrap_or(path)
        .to_string_lossy()
        .to_string()
}

fn is_hidden(path: &Path, projects_dir: &Path) -> bool {
    path.strip_prefix(projects_dir)
        .unwrap_or(path)
        .components()
        .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
}
