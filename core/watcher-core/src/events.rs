//! Hook payloads and the append-only event log.
//!
//! Every hook invocation appends one line to `events.jsonl`:
//!
//! ```json
//! {"ts":1718000000000,"event":"pre_tool","session":"abc","tool":"Bash","data":{...}}
//! ```
//!
//! `data` is the payload exactly as received. Lines are never rewritten and the
//! log is never rotated.

use std::io::Write;
use std::path::Path;

use fs_err::OpenOptions;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, WatcherError};

/// Placeholder for any identifier the payload or invocation did not provide.
pub const UNKNOWN: &str = "unknown";

/// The fields the recorder reads from a hook payload. Everything else is only logged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookPayload {
    pub session_id: Option<String>,
    pub tool_name: Option<String>,
    pub transcript_path: Option<String>,
    pub cwd: Option<String>,
}

impl HookPayload {
    /// Extracts known fields. Missing, empty, or non-string values count as absent.
    /// `tool_name` falls back to the older `tool` field.
    pub fn from_value(value: &Value) -> Self {
        let field = |name: &str| {
            value
                .get(name)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Self {
            session_id: field("session_id"),
            tool_name: field("tool_name").or_else(|| field("tool")),
            transcript_path: field("transcript_path"),
            cwd: field("cwd"),
        }
    }

    pub fn session_or_unknown(&self) -> &str {
        self.session_id.as_deref().unwrap_or(UNKNOWN)
    }

    pub fn tool_or_unknown(&self) -> &str {
        self.tool_name.as_deref().unwrap_or(UNKNOWN)
    }

    /// Session id and transcript path, when this event should touch the registry.
    pub fn tracked_session(&self) -> Option<(&str, &str)> {
        let session_id = self.session_id.as_deref().filter(|id| *id != UNKNOWN)?;
        let transcript_path = self.transcript_path.as_deref()?;
        Some((session_id, transcript_path))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLogEntry {
    /// Unix timestamp in milliseconds.
    pub ts: i64,
    pub event: String,
    pub session: String,
    pub tool: String,
    pub data: Value,
}

impl EventLogEntry {
    pub fn new(ts: i64, event: &str, payload: &HookPayload, data: Value) -> Self {
        Self {
            ts,
            event: event.to_string(),
            session: payload.session_or_unknown().to_string(),
            tool: payload.tool_or_unknown().to_string(),
            data,
        }
    }
}

/// Appends one entry as a single JSON line.
///
/// The line goes out in one `write_all` on an `O_APPEND` handle, so lines from
/// concurrent recorders do not interleave.
pub fn append_event(log_file: &Path, entry: &EventLogEntry) -> Result<()> {
    let mut line =
        serde_json::to_string(entry).map_err(|e| WatcherError::json("serialize event", e))?;
    line.push('\n');

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .map_err(|e| WatcherError::io("open event log", e))?;
    file.write_all(line.as_bytes())
        .map_err(|e| WatcherError::io("append event log", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_payload_reads_known_fields() {
        let payload = HookPayload::from_value(&json!({
            "session_id": "abc",
            "tool_name": "Bash",
            "transcript_path": "/t.jsonl",
            "cwd": "/project",
            "extra": 1
        }));
        assert_eq!(payload.session_id.as_deref(), Some("abc"));
        assert_eq!(payload.tool_name.as_deref(), Some("Bash"));
        assert_eq!(payload.transcript_path.as_deref(), Some("/t.jsonl"));
        assert_eq!(payload.cwd.as_deref(), Some("/project"));
    }

    #[test]
    fn test_payload_tool_falls_back_to_tool_field() {
        let payload = HookPayload::from_value(&json!({"tool": "Edit"}));
        assert_eq!(payload.tool_or_unknown(), "Edit");
    }

    #[test]
    fn test_payload_non_string_fields_are_absent() {
        let payload = HookPayload::from_value(&json!({"session_id": 42, "cwd": null}));
        assert_eq!(payload, HookPayload::default());
        assert_eq!(payload.session_or_unknown(), UNKNOWN);
    }

    #[test]
    fn test_payload_non_object_has_no_fields() {
        assert_eq!(HookPayload::from_value(&json!([1, 2])), HookPayload::default());
    }

    #[test]
    fn test_tracked_session_requires_id_and_transcript() {
        let both = HookPayload::from_value(&json!({"session_id": "s", "transcript_path": "/t"}));
        assert_eq!(both.tracked_session(), Some(("s", "/t")));

        let no_path = HookPayload::from_value(&json!({"session_id": "s"}));
        assert_eq!(no_path.tracked_session(), None);

        let empty_id = HookPayload::from_value(&json!({"session_id": "", "transcript_path": "/t"}));
        assert_eq!(empty_id.tracked_session(), None);

        let unknown_id =
            HookPayload::from_value(&json!({"session_id": "unknown", "transcript_path": "/t"}));
        assert_eq!(unknown_id.tracked_session(), None);
    }

    #[test]
    fn test_append_event_writes_one_line_per_entry() {
        let temp = tempdir().unwrap();
        let log = temp.path().join("events.jsonl");
        let data = json!({"session_id": "s1", "tool_name": "Bash"});
        let payload = HookPayload::from_value(&data);

        append_event(&log, &EventLogEntry::new(1, "pre_tool", &payload, data.clone())).unwrap();
        append_event(&log, &EventLogEntry::new(2, "post_tool", &payload, data.clone())).unwrap();

        let content = std::fs::read_to_string(&log).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: EventLogEntry = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.ts, 1);
        assert_eq!(first.event, "pre_tool");
        assert_eq!(first.session, "s1");
        assert_eq!(first.tool, "Bash");
        assert_eq!(first.data, data);
    }

    #[test]
    fn test_append_event_fails_in_missing_directory() {
        let temp = tempdir().unwrap();
        let log = temp.path().join("missing").join("events.jsonl");
        let entry = EventLogEntry::new(1, "stop", &HookPayload::default(), json!({}));
        assert!(append_event(&log, &entry).is_err());
    }
}
