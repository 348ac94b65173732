//! watcher-hook: CLI hook handler for session watching.
//!
//! Records Claude Code hook events and maintains the active-session registry.
//! Called directly by the hooks configured in ~/.claude/settings.json, and by
//! the desktop UI for reads and setup.
//!
//! ## Subcommands
//!
//! - `record`: Hook handler, reads JSON from stdin (always exits 0, prints nothing)
//! - `sessions`: Prints the active-session registry
//! - `transcript`: Prints a transcript under ~/.claude/projects/
//! - `status` / `setup` / `uninstall`: Hook installation flows

mod logging;
mod record;

use std::io::{self, Write};

use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;
use watcher_core::{reader, SetupChecker, StorageConfig};

#[derive(Parser)]
#[command(name = "watcher-hook")]
#[command(about = "Claude Code session watcher")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a hook event (reads JSON from stdin)
    Record {
        /// Event tag, e.g. pre_tool, post_tool, stop
        #[arg(value_name = "EVENT")]
        event: Option<String>,
    },

    /// Print active sessions as JSON
    Sessions {
        /// Print the registry file as stored, without expiry filtering
        #[arg(long)]
        raw: bool,
    },

    /// Print a transcript file (path relative to the base directory)
    Transcript {
        #[arg(value_name = "RELATIVE_PATH")]
        path: String,
    },

    /// Report whether hooks are installed
    Status,

    /// Install the hook binary and register hooks
    Setup,

    /// Remove hooks and recorder files
    Uninstall,
}

fn main() {
    // Anything that goes wrong while recording must stay invisible to the host
    // tool, including argument parsing.
    let is_record = std::env::args().nth(1).as_deref() == Some("record");
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(_) if is_record => return,
        Err(e) => e.exit(),
    };

    let storage = match StorageConfig::from_env() {
        Ok(storage) => storage,
        Err(e) => {
            if !is_record {
                eprintln!("watcher-hook: {}", e);
                std::process::exit(1);
            }
            return;
        }
    };
    let _logging_guard = logging::init(&storage.hook_log_file());

    match cli.command {
        Commands::Record { event } => record::run(storage, event.as_deref()),
        Commands::Sessions { raw } => {
            if raw {
                print_raw(&reader::read_sessions_raw(&storage));
            } else {
                print_json(&reader::read_active_sessions(&storage, Utc::now().timestamp()));
            }
        }
        Commands::Transcript { path } => print_raw(&reader::read_transcript(&storage, &path)),
        Commands::Status => print_json(&SetupChecker::new(storage).check_setup_status()),
        Commands::Setup => {
            let checker = SetupChecker::new(storage);
            let mut result = match std::env::current_exe() {
                Ok(exe) => checker.install_binary_from_path(&exe),
                Err(e) => {
                    tracing::warn!(error = %e, "Cannot locate own binary, skipping symlink");
                    Default::default()
                }
            };
            if result.error.is_none() {
                let hooks = checker.install_hooks();
                result.steps.extend(hooks.steps);
                result.success = hooks.success;
                result.error = hooks.error;
            }
            exit_with(&result, result.success);
        }
        Commands::Uninstall => {
            let result = SetupChecker::new(storage).uninstall();
            exit_with(&result, result.success);
        }
    }
}

fn print_raw(content: &str) {
    let mut stdout = io::stdout().lock();
    let _ = stdout.write_all(content.as_bytes());
    let _ = stdout.flush();
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("watcher-hook: failed to serialize output: {}", e);
            std::process::exit(1);
        }
    }
}

fn exit_with<T: Serialize>(value: &T, success: bool) {
    print_json(value);
    if !success {
        std::process::exit(1);
    }
}
