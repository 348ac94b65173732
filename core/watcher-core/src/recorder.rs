//! Event recorder for Claude Code hooks.
//!
//! One recorder runs per hook event, in its own process. Given the event tag
//! from the command line and the JSON payload from stdin it:
//!
//! 1. Appends the event to `events.jsonl`
//! 2. For events with a session id and transcript path:
//!    - overwrites `current-transcript.txt` (advisory, unlocked)
//!    - upserts the session into the registry (locked)
//!
//! Each effect is independent and best-effort. The result is a [`RecordReport`]
//! with one [`Outcome`] per effect; nothing here returns an error.

use chrono::{DateTime, Utc};
use fs_err as fs;
use serde::Serialize;
use serde_json::Value;

use crate::error::WatcherError;
use crate::events::{append_event, EventLogEntry, HookPayload, UNKNOWN};
use crate::outcome::{Outcome, SkipReason};
use crate::registry::{project_name_from_cwd, SessionRegistry};
use crate::storage::StorageConfig;

/// What happened to each effect of one recorded event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordReport {
    pub event_log: Outcome,
    pub transcript_pointer: Outcome,
    pub registry: Outcome,
}

impl RecordReport {
    fn skipped_all(reason: SkipReason) -> Self {
        Self {
            event_log: Outcome::Skipped(reason.clone()),
            transcript_pointer: Outcome::Skipped(reason.clone()),
            registry: Outcome::Skipped(reason),
        }
    }
}

pub struct Recorder {
    storage: StorageConfig,
    registry: SessionRegistry,
}

impl Recorder {
    pub fn new(storage: StorageConfig) -> Self {
        let registry = SessionRegistry::new(&storage);
        Self { storage, registry }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Records one hook event.
    ///
    /// `event_tag` comes from the hook command line (`pre_tool`, `post_tool`,
    /// `stop`, ...) and defaults to `"unknown"`. A payload that is not JSON is
    /// dropped entirely.
    pub fn record(
        &self,
        event_tag: Option<&str>,
        raw_payload: &str,
        now: DateTime<Utc>,
    ) -> RecordReport {
        let data: Value = match serde_json::from_str(raw_payload) {
            Ok(value) => value,
            Err(e) => {
                let reason = SkipReason::from(WatcherError::MalformedPayload(e));
                tracing::debug!(reason = ?reason, "Dropping hook event");
                return RecordReport::skipped_all(reason);
            }
        };

        let event = event_tag.filter(|tag| !tag.is_empty()).unwrap_or(UNKNOWN);
        let payload = HookPayload::from_value(&data);

        let entry = EventLogEntry::new(now.timestamp_millis(), event, &payload, data);
        let event_log = Outcome::from(append_event(&self.storage.events_file(), &entry));
        if let Some(reason) = event_log.skip_reason() {
            tracing::warn!(event = %event, reason = ?reason, "Event not logged");
        }

        let Some((session_id, transcript_path)) = payload.tracked_session() else {
            tracing::debug!(event = %event, "Event carries no trackable session");
            return RecordReport {
                event_log,
                transcript_pointer: Outcome::Skipped(SkipReason::NotTracked),
                registry: Outcome::Skipped(SkipReason::NotTracked),
            };
        };

        let transcript_pointer = Outcome::from(
            fs::write(self.storage.current_transcript_file(), transcript_path)
                .map_err(|e| WatcherError::io("write current transcript pointer", e)),
        );

        let project_name = project_name_from_cwd(payload.cwd.as_deref().unwrap_or(UNKNOWN));
        let registry = self.registry.upsert(
            session_id,
            transcript_path,
            &project_name,
            now.timestamp(),
        );

        tracing::debug!(
            event = %event,
            session = %session_id,
            project = %project_name,
            registry = ?registry,
            "Recorded hook event"
        );

        RecordReport {
            event_log,
            transcript_pointer,
            registry,
        }
    }
}
