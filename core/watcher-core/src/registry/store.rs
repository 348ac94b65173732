//! In-memory registry snapshot and its on-disk form.
//!
//! # Defensive Loading
//!
//! The file is written by many short-lived recorder processes and read by a
//! polling UI, so loading never fails:
//! - Missing or empty file → empty registry
//! - Corrupt JSON or a non-array document → empty registry
//! - Individual array entries that are not valid records → dropped
//!
//! # Atomic Writes
//!
//! Uses temp file + rename so a reader never observes a half-written file.

use std::io::Write;
use std::path::Path;

use fs_err as fs;
use serde_json::Value;
use tempfile::NamedTempFile;

use crate::error::{Result, WatcherError};

use super::types::SessionRecord;

/// Ordered set of session records, unique by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    sessions: Vec<SessionRecord>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses registry file contents, keeping every entry that is a valid record.
    pub fn from_json(content: &str) -> Self {
        if content.trim().is_empty() {
            return Self::new();
        }

        let entries = match serde_json::from_str::<Value>(content) {
            Ok(Value::Array(entries)) => entries,
            Ok(_) => {
                tracing::debug!("Registry file is not a JSON array, starting empty");
                return Self::new();
            }
            Err(e) => {
                tracing::debug!(error = %e, "Registry file unparsable, starting empty");
                return Self::new();
            }
        };

        let mut registry = Self::new();
        for entry in entries {
            match serde_json::from_value::<SessionRecord>(entry) {
                // Duplicate ids from a hand-edited file: keep the last one.
                Ok(record) => registry.replace(record),
                Err(e) => tracing::debug!(error = %e, "Dropping malformed registry entry"),
            }
        }
        registry
    }

    /// Loads the registry file. Absent or unreadable files yield an empty registry.
    pub fn load(file_path: &Path) -> Self {
        match fs::read_to_string(file_path) {
            Ok(content) => Self::from_json(&content),
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::debug!(error = %e, "Registry file unreadable, starting empty");
                }
                Self::new()
            }
        }
    }

    /// Pretty-printed (2-space indent) JSON array.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.sessions)
            .map_err(|e| WatcherError::json("serialize registry", e))
    }

    /// Overwrites `file_path` atomically with the full registry.
    pub fn save(&self, file_path: &Path) -> Result<()> {
        let content = self.to_json()?;

        let parent_dir = file_path.parent().ok_or_else(|| {
            WatcherError::io(
                "registry path has no parent directory",
                std::io::Error::from(std::io::ErrorKind::InvalidInput),
            )
        })?;
        let mut temp_file = NamedTempFile::new_in(parent_dir)
            .map_err(|e| WatcherError::io("create temp registry file", e))?;
        temp_file
            .write_all(content.as_bytes())
            .map_err(|e| WatcherError::io("write temp registry file", e))?;
        temp_file
            .flush()
            .map_err(|e| WatcherError::io("flush temp registry file", e))?;
        temp_file
            .persist(file_path)
            .map_err(|e| WatcherError::io("persist registry file", e.error))?;

        Ok(())
    }

    /// Drops every record with `lastSeen <= now - EXPIRY_WINDOW_SECS`.
    pub fn prune_expired(&mut self, now: i64) {
        self.sessions.retain(|record| !record.is_expired(now));
    }

    /// Replace-by-id: removes any record with the same id, then appends this one.
    pub fn replace(&mut self, record: SessionRecord) {
        self.sessions.retain(|existing| existing.id != record.id);
        self.sessions.push(record);
    }

    /// Records a reader should display at `now`.
    pub fn active(&self, now: i64) -> Vec<SessionRecord> {
        self.sessions
            .iter()
            .filter(|record| !record.is_expired(now))
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<&SessionRecord> {
        self.sessions.iter().find(|record| record.id == id)
    }

    pub fn sessions(&self) -> &[SessionRecord] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn ids(registry: &Registry) -> Vec<&str> {
        registry.sessions().iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_empty_registry_has_no_sessions() {
        let registry = Registry::new();
        assert!(registry.is_empty());
        assert!(registry.get("abc").is_none());
    }

    #[test]
    fn test_replace_keeps_one_record_per_id() {
        let mut registry = Registry::new();
        registry.replace(SessionRecord::new("s1", "/t1", "p", 100));
        registry.replace(SessionRecord::new("s1", "/t1", "p", 200));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("s1").unwrap().last_seen, 200);
    }

    #[test]
    fn test_replace_moves_record_to_end() {
        let mut registry = Registry::new();
        registry.replace(SessionRecord::new("a", "/a", "a", 100));
        registry.replace(SessionRecord::new("b", "/b", "b", 100));
        registry.replace(SessionRecord::new("a", "/a", "a", 150));
        assert_eq!(ids(&registry), vec!["b", "a"]);
    }

    #[test]
    fn test_prune_expired_uses_inclusive_cutoff() {
        let now = 1_000;
        let mut registry = Registry::new();
        registry.replace(SessionRecord::new("old", "/o", "o", now - 301));
        registry.replace(SessionRecord::new("edge", "/e", "e", now - 300));
        registry.replace(SessionRecord::new("fresh", "/f", "f", now - 299));

        registry.prune_expired(now);
        assert_eq!(ids(&registry), vec!["fresh"]);
    }

    #[test]
    fn test_active_filters_without_mutating() {
        let mut registry = Registry::new();
        registry.replace(SessionRecord::new("old", "/o", "o", 100));
        registry.replace(SessionRecord::new("new", "/n", "n", 900));

        let active = registry.active(1_000);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "new");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_from_json_corrupt_returns_empty() {
        assert!(Registry::from_json("{invalid json}").is_empty());
        assert!(Registry::from_json("").is_empty());
        assert!(Registry::from_json(r#"{"id":"s1"}"#).is_empty());
    }

    #[test]
    fn test_from_json_drops_malformed_entries() {
        let content = r#"[
            {"id": "good", "path": "/t", "name": "p", "lastSeen": 10},
            {"id": "no-last-seen", "path": "/t", "name": "p"},
            42
        ]"#;
        let registry = Registry::from_json(content);
        assert_eq!(ids(&registry), vec!["good"]);
    }

    #[test]
    fn test_to_json_is_pretty_printed_with_two_spaces() {
        let mut registry = Registry::new();
        registry.replace(SessionRecord::new("s1", "/tmp/t1", "proj1", 1000));
        let json = registry.to_json().unwrap();
        assert!(json.starts_with("[\n  {\n    \"id\": \"s1\""));
    }

    #[test]
    fn test_persistence_round_trip() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("active-sessions.json");

        let mut registry = Registry::new();
        registry.replace(SessionRecord::new("s1", "/tmp/t1", "proj1", 1000));
        registry.save(&file).unwrap();

        assert_eq!(Registry::load(&file), registry);
    }

    #[test]
    fn test_save_overwrites_existing_file() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("active-sessions.json");
        std::fs::write(&file, "garbage that is longer than the registry").unwrap();

        Registry::new().save(&file).unwrap();
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "[]");
    }

    #[test]
    fn test_load_nonexistent_file_returns_empty() {
        let temp = tempdir().unwrap();
        assert!(Registry::load(&temp.path().join("nope.json")).is_empty());
    }
}
