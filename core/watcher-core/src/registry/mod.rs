//! Session Registry
//!
//! Tracks which sessions of the monitored tool are currently active.
//!
//! # Architecture
//!
//! ```text
//! Host tool → watcher-hook record → [lock → load → prune → upsert → persist] → registry file → UI
//!   (event)     (one process/event)          SessionRegistry::upsert              (storage)   (reader)
//! ```
//!
//! Every recorder is a separate, short-lived process, so the registry file is
//! the only coordination medium. [`SessionRegistry`] is the explicit handle to
//! it; [`SessionRegistry::upsert`] runs the whole read-modify-write cycle under
//! the [`RegistryLock`] so two overlapping recorders cannot lose each other's
//! update by interleaving reads and writes.
//!
//! # Module Structure
//!
//! - `lock`: create-if-absent lock file with scoped release
//! - `store`: in-memory [`Registry`] plus defensive load and atomic save
//! - `types`: [`SessionRecord`] and the expiry window

mod lock;
mod store;
mod types;

use std::path::{Path, PathBuf};

pub use lock::{RegistryLock, STALE_LOCK_SECS};
pub use store::Registry;
pub use types::{project_name_from_cwd, SessionRecord, EXPIRY_WINDOW_SECS};

use crate::error::Result;
use crate::outcome::Outcome;
use crate::storage::StorageConfig;

/// Handle to the registry file and its lock.
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    sessions_file: PathBuf,
    lock_file: PathBuf,
}

impl SessionRegistry {
    pub fn new(storage: &StorageConfig) -> Self {
        Self::at(storage.sessions_file(), storage.lock_file())
    }

    pub fn at(sessions_file: PathBuf, lock_file: PathBuf) -> Self {
        Self {
            sessions_file,
            lock_file,
        }
    }

    pub fn sessions_file(&self) -> &Path {
        &self.sessions_file
    }

    /// Records an event for `session_id` at `now` (Unix seconds).
    ///
    /// Never fails: lock contention and every I/O problem become
    /// [`Outcome::Skipped`], and the update is simply lost.
    pub fn upsert(
        &self,
        session_id: &str,
        transcript_path: &str,
        project_name: &str,
        now: i64,
    ) -> Outcome {
        let record = SessionRecord::new(session_id, transcript_path, project_name, now);
        let outcome = Outcome::from(self.try_upsert(record, now));
        if let Some(reason) = outcome.skip_reason() {
            tracing::debug!(session = %session_id, reason = ?reason, "Registry update skipped");
        }
        outcome
    }

    fn try_upsert(&self, record: SessionRecord, now: i64) -> Result<()> {
        // Released on every exit path, including errors below.
        let _lock = RegistryLock::try_acquire(&self.lock_file)?;

        let mut registry = Registry::load(&self.sessions_file);
        registry.prune_expired(now);
        registry.replace(record);
        registry.save(&self.sessions_file)
    }

    /// Unlocked snapshot of the file as stored, including not-yet-pruned rows.
    pub fn load(&self) -> Registry {
        Registry::load(&self.sessions_file)
    }

    /// Sessions a reader should show at `now`, re-filtered by the expiry rule.
    pub fn active_sessions(&self, now: i64) -> Vec<SessionRecord> {
        self.load().active(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::SkipReason;
    use tempfile::{tempdir, TempDir};

    fn setup() -> (TempDir, SessionRegistry) {
        let temp = tempdir().unwrap();
        let storage = StorageConfig::with_root(temp.path().to_path_buf());
        (temp, SessionRegistry::new(&storage))
    }

    fn ids(registry: &SessionRegistry) -> Vec<String> {
        registry
            .load()
            .sessions()
            .iter()
            .map(|r| r.id.clone())
            .collect()
    }

    #[test]
    fn test_upsert_creates_registry_file() {
        let (_temp, registry) = setup();

        let outcome = registry.upsert("s1", "/tmp/t1", "proj1", 1000);
        assert_eq!(outcome, Outcome::Applied);

        let content = std::fs::read_to_string(registry.sessions_file()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{"id": "s1", "path": "/tmp/t1", "name": "proj1", "lastSeen": 1000}])
        );
    }

    #[test]
    fn test_upsert_same_id_twice_keeps_latest() {
        let (_temp, registry) = setup();

        registry.upsert("s1", "/tmp/t1", "proj1", 1000);
        registry.upsert("s1", "/tmp/t1", "proj1", 1010);

        let loaded = registry.load();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.get("s1").unwrap().last_seen, 1010);
    }

    #[test]
    fn test_upsert_is_replace_not_merge() {
        let (_temp, registry) = setup();

        registry.upsert("s1", "/tmp/old", "old-name", 1000);
        registry.upsert("s1", "/tmp/new", "new-name", 1001);

        let record = registry.load().get("s1").cloned().unwrap();
        assert_eq!(record, SessionRecord::new("s1", "/tmp/new", "new-name", 1001));
    }

    #[test]
    fn test_upsert_prunes_expired_records() {
        let (_temp, registry) = setup();
        let now = 5_000;

        registry.upsert("gone", "/g", "g", now - 301);
        registry.upsert("kept", "/k", "k", now - 299);
        registry.upsert("current", "/c", "c", now);

        assert_eq!(ids(&registry), vec!["kept", "current"]);
    }

    #[test]
    fn test_scenario_three_sessions() {
        let (_temp, registry) = setup();

        registry.upsert("s1", "/tmp/t1", "proj1", 1000);
        assert_eq!(ids(&registry), vec!["s1"]);

        registry.upsert("s2", "/tmp/t2", "proj2", 1200);
        assert_eq!(ids(&registry), vec!["s1", "s2"]);

        // cutoff = 1100 removes s1 (lastSeen 1000)
        registry.upsert("s3", "/tmp/t3", "proj3", 1400);
        assert_eq!(ids(&registry), vec!["s2", "s3"]);
    }

    #[test]
    fn test_upsert_recovers_from_corrupt_registry() {
        let (_temp, registry) = setup();
        std::fs::write(registry.sessions_file(), "{ not json ]").unwrap();

        assert!(registry.upsert("s1", "/tmp/t1", "proj1", 1000).is_applied());
        assert_eq!(ids(&registry), vec!["s1"]);
    }

    #[test]
    fn test_upsert_skips_when_lock_held() {
        let (temp, registry) = setup();
        registry.upsert("s1", "/tmp/t1", "proj1", 1000);
        let before = std::fs::read_to_string(registry.sessions_file()).unwrap();

        let _held = RegistryLock::try_acquire(&temp.path().join("active-sessions.lock")).unwrap();
        let outcome = registry.upsert("s2", "/tmp/t2", "proj2", 1001);

        assert_eq!(outcome, Outcome::Skipped(SkipReason::LockContended));
        let after = std::fs::read_to_string(registry.sessions_file()).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_upsert_releases_lock_after_success() {
        let (temp, registry) = setup();
        registry.upsert("s1", "/tmp/t1", "proj1", 1000);
        assert!(!temp.path().join("active-sessions.lock").exists());
    }

    #[test]
    fn test_upsert_releases_lock_after_failed_write() {
        let (temp, registry) = setup();
        // A directory at the registry path makes the final rename fail.
        std::fs::create_dir(registry.sessions_file()).unwrap();

        let outcome = registry.upsert("s1", "/tmp/t1", "proj1", 1000);
        assert!(matches!(
            outcome,
            Outcome::Skipped(SkipReason::Storage(_))
        ));
        assert!(!temp.path().join("active-sessions.lock").exists());
    }

    #[test]
    fn test_upsert_in_missing_directory_is_skipped() {
        let temp = tempdir().unwrap();
        let storage = StorageConfig::with_root(temp.path().join("does-not-exist"));
        let registry = SessionRegistry::new(&storage);

        let outcome = registry.upsert("s1", "/tmp/t1", "proj1", 1000);
        assert!(matches!(outcome, Outcome::Skipped(SkipReason::Storage(_))));
    }

    #[test]
    fn test_active_sessions_refilters_stale_rows() {
        let (_temp, registry) = setup();
        registry.upsert("s1", "/tmp/t1", "proj1", 1000);

        assert_eq!(registry.active_sessions(1299).len(), 1);
        assert!(registry.active_sessions(1300).is_empty());
    }
}
