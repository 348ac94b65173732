//! Hook installation, status checks and uninstall.
//!
//! This module handles:
//! - Checking whether the recorder hooks are registered in `settings.json`
//! - Registering them (merging with whatever the user already has)
//! - Removing them again, plus the files the recorder leaves behind
//! - Checking for policy flags that would block hooks
//!
//! ## Design
//!
//! Setup only ever touches our own hook commands. Other hooks, matchers and
//! settings keys are preserved. Settings writes are atomic (temp + rename), and
//! a corrupt `settings.json` is reported instead of being overwritten.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use fs_err as fs;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{Result, WatcherError};
use crate::storage::StorageConfig;

/// Host hook event → event tag passed to `watcher-hook record`.
/// All three use the `*` matcher so they fire for every tool.
const WATCHER_HOOK_EVENTS: [(&str, &str); 3] = [
    ("PreToolUse", "pre_tool"),
    ("PostToolUse", "post_tool"),
    ("Stop", "stop"),
];

const WILDCARD_MATCHER: &str = "*";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HookPresence {
    pub pre_tool_use: bool,
    pub post_tool_use: bool,
    pub stop: bool,
}

impl HookPresence {
    pub fn all(&self) -> bool {
        self.pre_tool_use && self.post_tool_use && self.stop
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SetupStatus {
    pub base_dir_exists: bool,
    pub binary_installed: bool,
    pub hooks_configured: bool,
    pub hooks: HookPresence,
    pub policy_blocked: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct InstallResult {
    pub success: bool,
    pub steps: Vec<String>,
    pub error: Option<String>,
}

impl InstallResult {
    fn finish(mut self, outcome: Result<()>) -> Self {
        match outcome {
            Ok(()) => self.success = true,
            Err(e) => self.error = Some(e.to_string()),
        }
        self
    }
}

pub struct SetupChecker {
    storage: StorageConfig,
}

impl SetupChecker {
    pub fn new(storage: StorageConfig) -> Self {
        Self { storage }
    }

    pub fn check_setup_status(&self) -> SetupStatus {
        let base_dir_exists = self.storage.root().is_dir();
        let binary_installed = self.storage.hook_binary().exists();
        let policy_blocked = self.check_policy_blocks();

        let (hooks, error) = match self.hook_presence() {
            Ok(hooks) => (hooks, None),
            Err(e) => (HookPresence::default(), Some(e.to_string())),
        };

        SetupStatus {
            base_dir_exists,
            binary_installed,
            hooks_configured: hooks.all(),
            hooks,
            policy_blocked,
            error,
        }
    }

    fn hook_presence(&self) -> Result<HookPresence> {
        let Some(settings) = self.load_settings()? else {
            return Ok(HookPresence::default());
        };
        let Some(hooks) = settings.hooks.as_ref() else {
            return Ok(HookPresence::default());
        };

        let has = |event: &str| {
            hooks.get(event).is_some_and(|configs| {
                configs.iter().any(|config| {
                    config
                        .hooks
                        .iter()
                        .flatten()
                        .any(|hook| is_watcher_hook_command(hook.command.as_deref()))
                })
            })
        };

        Ok(HookPresence {
            pre_tool_use: has("PreToolUse"),
            post_tool_use: has("PostToolUse"),
            stop: has("Stop"),
        })
    }

    fn check_policy_blocks(&self) -> Option<String> {
        for path in [
            self.storage.settings_file(),
            self.storage.local_settings_file(),
        ] {
            let Ok(content) = fs::read_to_string(&path) else {
                continue;
            };
            let Ok(settings) = serde_json::from_str::<serde_json::Value>(&content) else {
                continue;
            };
            if settings.get("disableAllHooks") == Some(&serde_json::Value::Bool(true)) {
                return Some("Hooks disabled by disableAllHooks setting".to_string());
            }
            if settings.get("allowManagedHooksOnly") == Some(&serde_json::Value::Bool(true)) {
                return Some(
                    "Only managed hooks allowed by allowManagedHooksOnly setting".to_string(),
                );
            }
        }
        None
    }

    /// Registers the recorder for every watched event.
    ///
    /// Re-running is safe: existing watcher commands are replaced, not duplicated.
    pub fn install_hooks(&self) -> InstallResult {
        let mut result = InstallResult::default();
        let outcome = self.install_hooks_inner(&mut result.steps);
        result.finish(outcome)
    }

    fn install_hooks_inner(&self, steps: &mut Vec<String>) -> Result<()> {
        if let Some(reason) = self.check_policy_blocks() {
            return Err(WatcherError::PolicyBlocked(reason));
        }

        let root = self.storage.root();
        if !root.exists() {
            fs::create_dir_all(root).map_err(|e| WatcherError::io("create base directory", e))?;
            steps.push(format!("Created {}", root.display()));
        }

        let mut settings = self.load_settings()?.unwrap_or_default();
        let hooks = settings.hooks.get_or_insert_with(BTreeMap::new);
        let binary = self.storage.hook_binary();

        for (event, tag) in WATCHER_HOOK_EVENTS {
            let configs = hooks.entry(event.to_string()).or_default();

            let index = match configs
                .iter()
                .position(|c| c.matcher.as_deref().map(str::trim) == Some(WILDCARD_MATCHER))
            {
                Some(index) => index,
                None => {
                    configs.push(HookConfig::wildcard());
                    configs.len() - 1
                }
            };

            let inner = configs[index].hooks.get_or_insert_with(Vec::new);
            inner.retain(|hook| !is_watcher_hook_command(hook.command.as_deref()));
            inner.push(InnerHook::command(hook_command(&binary, tag)));
        }

        self.save_settings(&settings)?;
        steps.push(format!(
            "Configured hooks in {}",
            self.storage.settings_file().display()
        ));
        Ok(())
    }

    /// Removes our hooks, the installed binary link and the session registry.
    pub fn uninstall(&self) -> InstallResult {
        let mut result = InstallResult::default();
        let outcome = self.uninstall_inner(&mut result.steps);
        result.finish(outcome)
    }

    fn uninstall_inner(&self, steps: &mut Vec<String>) -> Result<()> {
        if let Some(mut settings) = self.load_settings()? {
            if let Some(hooks) = settings.hooks.as_mut() {
                for (event, _) in WATCHER_HOOK_EVENTS {
                    let Some(configs) = hooks.get_mut(event) else {
                        continue;
                    };
                    for config in configs.iter_mut() {
                        if let Some(inner) = config.hooks.as_mut() {
                            inner.retain(|hook| !is_watcher_hook_command(hook.command.as_deref()));
                        }
                    }
                    configs.retain(|config| config.hooks.as_ref().is_some_and(|h| !h.is_empty()));
                    if configs.is_empty() {
                        hooks.remove(event);
                    }
                }
                if hooks.is_empty() {
                    settings.hooks = None;
                }
            }

            self.save_settings(&settings)?;
            steps.push(format!(
                "Removed hooks from {}",
                self.storage.settings_file().display()
            ));
        }

        let binary = self.storage.hook_binary();
        if binary.exists() || binary.is_symlink() {
            fs::remove_file(&binary).map_err(|e| WatcherError::io("remove hook binary", e))?;
            steps.push(format!("Deleted {}", binary.display()));
        }

        let sessions = self.storage.sessions_file();
        if sessions.exists() {
            fs::remove_file(&sessions)
                .map_err(|e| WatcherError::io("remove session registry", e))?;
            steps.push(format!("Deleted {}", sessions.display()));
        }

        Ok(())
    }

    /// Symlinks the hook binary from `source_path` into the hook bin directory.
    ///
    /// A symlink keeps pointing at the freshly built binary, and breaks
    /// visibly if the source moves.
    #[cfg(unix)]
    pub fn install_binary_from_path(&self, source_path: &Path) -> InstallResult {
        let mut result = InstallResult::default();
        let outcome = self.install_binary_inner(source_path, &mut result.steps);
        result.finish(outcome)
    }

    #[cfg(not(unix))]
    pub fn install_binary_from_path(&self, _source_path: &Path) -> InstallResult {
        InstallResult::default().finish(Err(WatcherError::UnsupportedPlatform(
            "binary symlink install".to_string(),
        )))
    }

    #[cfg(unix)]
    fn install_binary_inner(&self, source_path: &Path, steps: &mut Vec<String>) -> Result<()> {
        use std::os::unix::fs::symlink;

        let source = fs::canonicalize(source_path)
            .map_err(|e| WatcherError::io("resolve hook binary source", e))?;
        let dest = self.storage.hook_binary();

        if dest.is_symlink() && fs::read_link(&dest).ok().as_deref() == Some(source.as_path()) {
            steps.push("Hook binary symlink already correct".to_string());
            return Ok(());
        }

        fs::create_dir_all(self.storage.bin_dir())
            .map_err(|e| WatcherError::io("create hook bin directory", e))?;
        if dest.exists() || dest.is_symlink() {
            fs::remove_file(&dest)
                .map_err(|e| WatcherError::io("remove existing hook binary", e))?;
        }
        symlink(&source, &dest).map_err(|e| WatcherError::io("symlink hook binary", e))?;

        steps.push(format!(
            "Hook binary symlinked: {} -> {}",
            dest.display(),
            source.display()
        ));
        Ok(())
    }

    /// `Ok(None)` when the settings file does not exist yet.
    fn load_settings(&self) -> Result<Option<SettingsFile>> {
        let path = self.storage.settings_file();
        if !path.exists() {
            return Ok(None);
        }
        let content =
            fs::read_to_string(&path).map_err(|e| WatcherError::io("read settings", e))?;
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| WatcherError::SettingsMalformed {
                path,
                details: e.to_string(),
            })
    }

    fn save_settings(&self, settings: &SettingsFile) -> Result<()> {
        let path = self.storage.settings_file();
        let content = serde_json::to_string_pretty(settings)
            .map_err(|e| WatcherError::json("serialize settings", e))?;

        let mut temp = NamedTempFile::new_in(self.storage.root())
            .map_err(|e| WatcherError::io("create temp settings file", e))?;
        temp.write_all(content.as_bytes())
            .map_err(|e| WatcherError::io("write settings", e))?;
        temp.flush()
            .map_err(|e| WatcherError::io("flush settings", e))?;
        temp.persist(&path)
            .map_err(|e| WatcherError::io("persist settings", e.error))?;
        Ok(())
    }
}

/// Command the host tool runs for `tag`. Quoted so paths with spaces survive the shell.
fn hook_command(binary: &Path, tag: &str) -> String {
    format!("\"{}\" record {}", binary.display(), tag)
}

fn is_watcher_hook_command(cmd: Option<&str>) -> bool {
    cmd.is_some_and(|c| c.contains("watcher-hook"))
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    hooks: Option<BTreeMap<String, Vec<HookConfig>>>,
    #[serde(flatten)]
    other: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HookConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    matcher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hooks: Option<Vec<InnerHook>>,
    #[serde(flatten)]
    other: BTreeMap<String, serde_json::Value>,
}

impl HookConfig {
    fn wildcard() -> Self {
        Self {
            matcher: Some(WILDCARD_MATCHER.to_string()),
            hooks: Some(Vec::new()),
            other: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct InnerHook {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    hook_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    command: Option<String>,
    #[serde(flatten)]
    other: BTreeMap<String, serde_json::Value>,
}

impl InnerHook {
    fn command(command: String) -> Self {
        Self {
            hook_type: Some("command".to_string()),
            command: Some(command),
            other: BTreeMap::new(),
        }
    }
}
