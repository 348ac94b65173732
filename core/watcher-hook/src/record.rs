//! `watcher-hook record [EVENT]`: the hook entry point.
//!
//! Called by Claude Code for every configured hook event with the payload on
//! stdin. Runs in the host tool's critical path, so it never prints, never
//! exits non-zero, and gives up on anything that goes wrong.

use std::io::{self, Read};

use chrono::Utc;
use watcher_core::{RecordReport, Recorder, StorageConfig};

pub fn run(storage: StorageConfig, event: Option<&str>) {
    let mut input = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut input) {
        tracing::debug!(error = %e, "Failed to read hook payload from stdin");
        return;
    }

    let report = record(storage, event, &input);
    tracing::debug!(report = ?report, "Hook event handled");
}

fn record(storage: StorageConfig, event: Option<&str>, input: &str) -> RecordReport {
    Recorder::new(storage).record(event, input, Utc::now())
}
