//! CLI argument parsing
//!
//! Uses clap derive macros. The bare `aura` invocation starts the daemon
//! (IPC server + rollout watcher + HUD); subcommands cover the hook adapter,
//! the set-name stub, and the hooks-block printer.

use clap::{ArgAction, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;

/// Get default socket path, preferring XDG_RUNTIME_DIR on Linux
fn default_socket_path() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(runtime_dir).join("aura.sock");
    }
    // Fall back to /tmp (macOS and fallback)
    PathBuf::from("/tmp/aura.sock")
}

/// Ambient HUD for concurrent AI coding agent sessions
#[derive(Parser, Debug)]
#[command(name = "aura")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace; default warn)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Socket path for agent events
    #[arg(
        long,
        env = "AURA_SOCKET",
        default_value_os_t = default_socket_path(),
        global = true
    )]
    pub socket: PathBuf,

    /// Codex home directory holding `sessions/` (default: ~/.codex)
    #[arg(long, env = "CODEX_HOME", global = true)]
    pub codex_home: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process one agent hook JSON object from stdin
    ///
    /// Invoked by the agent CLI on every lifecycle hook; parses stdin,
    /// forwards the resulting events to the daemon socket, and exits 0 even
    /// when the daemon is down.
    Hook {
        /// Which agent's hook format stdin carries
        #[arg(long, value_enum, default_value_t = HookAgent::ClaudeCode)]
        agent: HookAgent,

        /// Disable desktop notifications for attention events
        #[arg(long, default_value_t = false)]
        no_notify: bool,
    },

    /// Name the current session (picked up from the Bash hook, not here)
    SetName {
        /// Display name for the session
        name: String,
    },

    /// Print the hooks config block for the agent's settings file
    HookInstall,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookAgent {
    ClaudeCode,
}

/// Map the -v count to a tracing level directive
pub fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Generate shell completions and print to stdout
pub fn print_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "aura", &mut io::stdout());
}
