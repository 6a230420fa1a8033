//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "sorter", version, about = "Marble sorter CLI")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/sorter.toml")]
    pub config: PathBuf,

    /// Emit events and results as JSON lines instead of text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Memory locking mode for real-time operation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum RtLock {
    /// Do not lock memory
    None,
    /// Lock currently resident pages
    Current,
    /// Lock current and future pages
    All,
}

impl RtLock {
    #[inline]
    pub fn os_default() -> Self {
        if cfg!(target_os = "linux") {
            RtLock::Current
        } else {
            RtLock::None
        }
    }
}

#[derive(clap::Args, Debug, Clone)]
pub struct RunArgs {
    /// Marbles loaded into the simulated hopper
    #[arg(long, value_name = "N", default_value_t = 20)]
    pub marbles: usize,
    /// Stop after this many milliseconds (runs until Ctrl-C or `q` otherwise)
    #[arg(long, value_name = "MS")]
    pub duration_ms: Option<u64>,
    /// Press start/stop once right after launch
    #[arg(long, action = ArgAction::SetTrue)]
    pub autostart: bool,
    /// Enable real-time mode (SCHED_FIFO, mlockall)
    #[arg(
        long,
        action = ArgAction::SetTrue,
        long_help = "Enable real-time mode on Linux: SCHED_FIFO priority for the process and mlockall to keep it resident. Needs CAP_SYS_NICE / CAP_IPC_LOCK (or root); failures are logged and the run continues without them."
    )]
    pub rt: bool,
    /// SCHED_FIFO priority when --rt is enabled (Linux only)
    #[arg(long, value_name = "PRIO")]
    pub rt_prio: Option<i32>,
    /// Memory locking mode for --rt: none, current, or all
    #[arg(long, value_enum, value_name = "MODE")]
    pub rt_lock: Option<RtLock>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the sorter (simulated hopper unless built with `hardware`).
    ///
    /// Operator keys on stdin, one per line or several at once:
    /// `s` press start/stop, `S` hold start/stop, `r` press reset,
    /// `R` hold reset, `q` quit.
    Run(RunArgs),
    /// Show the persisted statistics
    Recall,
    /// Zero the persisted statistics
    Reset,
    /// Quick health check (config, store, devices)
    SelfCheck,
}
