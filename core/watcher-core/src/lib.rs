//! # watcher-core
//!
//! Core library for the session watcher: records Claude Code hook events and
//! keeps a small registry of active sessions that a desktop UI polls.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime. Every operation is a short, bounded
//!   sequence of file operations.
//! - **Process-per-event**: Concurrency only exists between recorder processes,
//!   coordinated through a lock file (see [`registry`]).
//! - **Fail-silent recording**: The recorder never errors; each effect reports
//!   an [`Outcome`] instead.
//! - **Graceful degradation**: Missing or corrupt files read as empty values.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use watcher_core::{Recorder, StorageConfig};
//!
//! let recorder = Recorder::new(StorageConfig::from_env()?);
//! let report = recorder.record(Some("pre_tool"), &stdin_json, chrono::Utc::now());
//! ```

pub mod error;
pub mod events;
pub mod outcome;
pub mod reader;
pub mod recorder;
pub mod registry;
pub mod setup;
pub mod storage;

// Re-export commonly used items at crate root
pub use error::{Result, WatcherError};
pub use events::{EventLogEntry, HookPayload};
pub use outcome::{Outcome, SkipReason};
pub use reader::{read_active_sessions, read_sessions_raw, read_transcript, PathRejection};
pub use recorder::{RecordReport, Recorder};
pub use registry::{SessionRecord, SessionRegistry, EXPIRY_WINDOW_SECS};
pub use setup::{HookPresence, InstallResult, SetupChecker, SetupStatus};
pub use storage::StorageConfig;
