//! Serialized registry types.
//!
//! On disk the registry is a plain JSON array, read directly by the UI:
//!
//! ```json
//! [
//!   { "id": "s1", "path": "/tmp/t1", "name": "proj1", "lastSeen": 1000 }
//! ]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Sessions without an event for this long are considered ended.
pub const EXPIRY_WINDOW_SECS: i64 = 300; // 5 minutes

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    #[serde(rename = "path")]
    pub transcript_path: String,
    #[serde(rename = "name")]
    pub project_name: String,
    /// Unix timestamp (seconds) of the most recent event.
    #[serde(rename = "lastSeen")]
    pub last_seen: i64,
}

impl SessionRecord {
    pub fn new(
        id: impl Into<String>,
        transcript_path: impl Into<String>,
        project_name: impl Into<String>,
        last_seen: i64,
    ) -> Self {
        Self {
            id: id.into(),
            transcript_path: transcript_path.into(),
            project_name: project_name.into(),
            last_seen,
        }
    }

    /// Expired once `lastSeen <= now - EXPIRY_WINDOW_SECS`.
    pub fn is_expired(&self, now: i64) -> bool {
        self.last_seen <= now - EXPIRY_WINDOW_SECS
    }
}

/// Display label for a session: the last path component of its working directory.
///
/// Falls back to the input itself when there is no final component (`/`, `""`).
pub fn project_name_from_cwd(cwd: &str) -> String {
    Path::new(cwd)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| cwd.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_with_registry_field_names() {
        let record = SessionRecord::new("s1", "/tmp/t1", "proj1", 1000);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": "s1", "path": "/tmp/t1", "name": "proj1", "lastSeen": 1000})
        );
    }

    #[test]
    fn test_is_expired_boundary() {
        let now = 10_000;
        assert!(SessionRecord::new("a", "p", "n", now - 301).is_expired(now));
        assert!(SessionRecord::new("a", "p", "n", now - 300).is_expired(now));
        assert!(!SessionRecord::new("a", "p", "n", now - 299).is_expired(now));
    }

    #[test]
    fn test_project_name_is_basename() {
        assert_eq!(project_name_from_cwd("/Users/pete/Code/my-project"), "my-project");
        assert_eq!(project_name_from_cwd("/Users/pete/Code/my-project/"), "my-project");
        assert_eq!(project_name_from_cwd("unknown"), "unknown");
    }

    #[test]
    fn test_project_name_for_root_falls_back() {
        assert_eq!(project_name_from_cwd("/"), "/");
    }
}
