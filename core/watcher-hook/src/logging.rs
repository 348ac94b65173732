//! File-only logging for the hook binary.
//!
//! The host tool captures a hook's stdout and stderr, so nothing is ever
//! written there. Logs go to `<base>/watcher-hook.log` through a non-blocking
//! writer. If that file cannot be opened, logging is simply off.
//!
//! Level: `WATCHER_DEBUG_LOG=1` forces `debug`, otherwise `RUST_LOG`,
//! otherwise `warn`.

use std::env;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

const DEBUG_ENV: &str = "WATCHER_DEBUG_LOG";

/// Installs the global subscriber. Keep the guard alive until exit so buffered
/// lines are flushed.
pub fn init(log_file: &Path) -> Option<WorkerGuard> {
    let dir = log_file.parent()?;
    let file_name = log_file.file_name()?.to_str()?;
    if !dir.is_dir() {
        return None;
    }

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(dir)
        .ok()?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .ok()?;

    Some(guard)
}

fn env_filter() -> EnvFilter {
    if debug_enabled(env::var(DEBUG_ENV).ok().as_deref()) {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    }
}

fn debug_enabled(value: Option<&str>) -> bool {
    matches!(value, Some("1" | "true" | "TRUE" | "yes" | "YES"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_enabled_values() {
        assert!(debug_enabled(Some("1")));
        assert!(debug_enabled(Some("yes")));
        assert!(!debug_enabled(Some("0")));
        assert!(!debug_enabled(None));
    }

    #[test]
    fn test_init_without_directory_disables_logging() {
        let temp = tempfile::tempdir().unwrap();
        assert!(init(&temp.path().join("missing").join("watcher-hook.log")).is_none());
    }
}
