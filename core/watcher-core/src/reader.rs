//! Read-only access for the UI: the session registry and transcripts.
//!
//! Both readers degrade to empty values (`"[]"`, `""`, an empty list) on any
//! failure. The registry file can be caught mid-replace or hand-corrupted, and a
//! transcript request can come from an untrusted renderer.
//!
//! # Transcript Path Safety
//!
//! Transcript paths are relative to the base directory and must stay inside
//! its `projects/` subtree. A request is rejected when it:
//! - is empty or absolute
//! - contains a `..` component
//! - does not start with exactly `projects/` (`projectsXYZ/evil` is refused)
//! - resolves (after following symlinks) outside the base directory

use std::path::{Component, Path, PathBuf};

use fs_err as fs;
use thiserror::Error;

use crate::registry::{SessionRecord, SessionRegistry};
use crate::storage::StorageConfig;

const PROJECTS_DIR: &str = "projects";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathRejection {
    #[error("empty path")]
    Empty,

    #[error("absolute path")]
    Absolute,

    #[error("parent directory traversal")]
    Traversal,

    #[error("outside the projects directory")]
    OutsideProjects,

    #[error("resolves outside the base directory")]
    Escape,

    #[error("cannot resolve: {0}")]
    Unresolvable(String),
}

/// Raw registry file contents, or `"[]"` if it cannot be read.
pub fn read_sessions_raw(storage: &StorageConfig) -> String {
    fs::read_to_string(storage.sessions_file()).unwrap_or_else(|_| "[]".to_string())
}

/// Registry entries still inside the expiry window at `now` (Unix seconds).
///
/// Rows the last writer did not get to prune yet are filtered out here too.
pub fn read_active_sessions(storage: &StorageConfig, now: i64) -> Vec<SessionRecord> {
    SessionRegistry::new(storage).active_sessions(now)
}

/// Contents of a transcript under `<base>/projects/`, or `""` if the path is
/// rejected or the file cannot be read.
pub fn read_transcript(storage: &StorageConfig, relative_path: &str) -> String {
    let path = match resolve_transcript_path(storage.root(), relative_path) {
        Ok(path) => path,
        Err(rejection) => {
            tracing::warn!(
                path = %relative_path,
                reason = %rejection,
                "Blocked transcript read"
            );
            return String::new();
        }
    };

    fs::read_to_string(&path).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "Transcript unreadable");
        String::new()
    })
}

/// Validates `relative_path` and returns the canonical file path inside `base`.
///
/// The file must exist: canonicalization is what catches symlink escapes.
pub fn resolve_transcript_path(
    base: &Path,
    relative_path: &str,
) -> Result<PathBuf, PathRejection> {
    let relative = check_relative_path(relative_path)?;

    let base = fs::canonicalize(base).map_err(|e| PathRejection::Unresolvable(e.to_string()))?;
    let resolved = fs::canonicalize(base.join(&relative))
        .map_err(|e| PathRejection::Unresolvable(e.to_string()))?;

    if !resolved.starts_with(&base) || resolved == base {
        return Err(PathRejection::Escape);
    }
    Ok(resolved)
}

/// Lexical checks only: no filesystem access.
fn check_relative_path(relative_path: &str) -> Result<PathBuf, PathRejection> {
    if relative_path.trim().is_empty() {
        return Err(PathRejection::Empty);
    }

    let mut normalized = PathBuf::new();
    for component in Path::new(relative_path).components() {
        match component {
            Component::Prefix(_) | Component::RootDir => return Err(PathRejection::Absolute),
            Component::ParentDir => return Err(PathRejection::Traversal),
            Component::CurDir => {}
            Component::Normal(part) => normalized.push(part),
        }
    }

    let mut parts = normalized.components();
    let starts_in_projects = parts
        .next()
        .is_some_and(|first| first.as_os_str() == PROJECTS_DIR);
    if !starts_in_projects || parts.next().is_none() {
        return Err(PathRejection::OutsideProjects);
    }

    Ok(normalized)
}
