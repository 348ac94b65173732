//! Explicit results for fail-silent effects.
//!
//! The recorder runs inside the host tool's critical path, so none of its
//! effects may fail loudly. Instead of swallowing errors with a catch-all, each
//! effect reports an [`Outcome`]: either it was applied, or it was skipped for a
//! [`SkipReason`] derived from the underlying [`WatcherError`].

use serde::Serialize;

use crate::error::WatcherError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum Outcome {
    Applied,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// Payload could not be parsed.
    MalformedInput,
    /// Event carries no usable session id or transcript path.
    NotTracked,
    /// Another recorder holds the registry lock.
    LockContended,
    /// Filesystem or serialization failure.
    Storage(String),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }

    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match self {
            Outcome::Applied => None,
            Outcome::Skipped(reason) => Some(reason),
        }
    }
}

impl From<crate::Result<()>> for Outcome {
    fn from(result: crate::Result<()>) -> Self {
        match result {
            Ok(()) => Outcome::Applied,
            Err(err) => Outcome::Skipped(SkipReason::from(err)),
        }
    }
}

impl From<WatcherError> for SkipReason {
    fn from(err: WatcherError) -> Self {
        match err {
            WatcherError::MalformedPayload(_) => SkipReason::MalformedInput,
            WatcherError::LockContended(_) => SkipReason::LockContended,
            other => SkipReason::Storage(other.to_string()),
        }
    }
}
