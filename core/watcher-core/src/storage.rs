//! Storage configuration and path management for the session watcher.
//!
//! All files live under one base directory (default: `~/.claude`), shared with
//! the monitored tool:
//!
//! ```text
//! ~/.claude/
//! ├── events.jsonl            # append-only hook event log
//! ├── active-sessions.json    # session registry (rewritten on every update)
//! ├── active-sessions.lock    # exists only while a recorder holds the lock
//! ├── current-transcript.txt  # advisory pointer to the latest transcript
//! ├── settings.json           # host settings, edited by setup/uninstall
//! └── projects/               # host transcripts, readable via the transcript reader
//! ```
//!
//! Production code uses [`StorageConfig::from_env`]. Tests use
//! [`StorageConfig::with_root`] or [`StorageConfig::with_roots`] for isolation.

use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Result, WatcherError};

/// Overrides the base directory (normally `~/.claude`).
pub const BASE_DIR_ENV: &str = "WATCHER_CLAUDE_DIR";

const HOOK_BINARY_NAME: &str = "watcher-hook";

/// Central configuration for all watcher storage paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Base directory shared with the monitored tool (default: ~/.claude)
    root: PathBuf,
    /// Where the hook binary is installed (default: ~/.local/bin)
    bin_dir: PathBuf,
}

impl StorageConfig {
    /// Resolves paths from the environment.
    ///
    /// `WATCHER_CLAUDE_DIR` wins when set and non-empty; otherwise the base
    /// directory is `~/.claude`.
    pub fn from_env() -> Result<Self> {
        let home = dirs::home_dir().ok_or(WatcherError::HomeDirNotFound)?;
        let root = env::var_os(BASE_DIR_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join(".claude"));
        Ok(Self {
            root,
            bin_dir: home.join(".local/bin"),
        })
    }

    /// Creates a StorageConfig with a custom base directory.
    /// The hook binary directory becomes `<root>/bin`.
    pub fn with_root(root: PathBuf) -> Self {
        let bin_dir = root.join("bin");
        Self { root, bin_dir }
    }

    /// Creates a StorageConfig with both a custom base and binary directory.
    pub fn with_roots(root: PathBuf, bin_dir: PathBuf) -> Self {
        Self { root, bin_dir }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Recorder Files
    // ─────────────────────────────────────────────────────────────────────────────

    /// Path to events.jsonl (append-only event log).
    pub fn events_file(&self) -> PathBuf {
        self.root.join("events.jsonl")
    }

    /// Path to active-sessions.json (session registry).
    pub fn sessions_file(&self) -> PathBuf {
        self.root.join("active-sessions.json")
    }

    /// Path to active-sessions.lock (registry lock).
    pub fn lock_file(&self) -> PathBuf {
        self.root.join("active-sessions.lock")
    }

    /// Path to current-transcript.txt (advisory, unlocked).
    pub fn current_transcript_file(&self) -> PathBuf {
        self.root.join("current-transcript.txt")
    }

    /// Path to the hook binary's own log file.
    pub fn hook_log_file(&self) -> PathBuf {
        self.root.join("watcher-hook.log")
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Host Tool Paths
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn settings_file(&self) -> PathBuf {
        self.root.join("settings.json")
    }

    pub fn local_settings_file(&self) -> PathBuf {
        self.root.join("settings.local.json")
    }

    /// Transcripts live under here; the transcript reader refuses anything else.
    pub fn projects_dir(&self) -> PathBuf {
        self.root.join("projects")
    }

    pub fn hook_binary(&self) -> PathBuf {
        self.bin_dir.join(HOOK_BINARY_NAME)
    }
}
