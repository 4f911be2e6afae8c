//! CLI argument definitions and shared statics.

use clap::{ArgAction, ArgGroup, Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured output and errors).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

pub fn json_mode() -> bool {
    JSON_MODE.get().copied().unwrap_or(false)
}

#[derive(Parser, Debug)]
#[command(name = "chronoshade", version, about = "Time-based cover position control")]
pub struct Cli {
    /// Path to config TOML
    #[arg(long, value_name = "FILE", default_value = "etc/chronoshade.toml")]
    pub config: PathBuf,

    /// Print snapshots, logs and errors as JSON lines
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); RUST_LOG takes precedence
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct CoverArg {
    /// Cover id as configured under [covers.<id>] (case and separators are normalized)
    pub cover: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the cover fully open
    Open(CoverArg),
    /// Run the cover fully closed
    Close(CoverArg),
    /// Move the cover to a position (0 = closed, 100 = open)
    SetPosition {
        #[command(flatten)]
        target: CoverArg,
        position: u8,
    },
    /// Run the slats fully open
    OpenTilt(CoverArg),
    /// Run the slats fully closed
    CloseTilt(CoverArg),
    /// Move the slats to a tilt (0 = closed, 100 = open)
    SetTilt {
        #[command(flatten)]
        target: CoverArg,
        tilt: u8,
    },
    /// Stop the cover and store its current estimate
    Stop(CoverArg),
    /// Overwrite the stored estimate without moving
    #[command(group(ArgGroup::new("known").required(true).multiple(true).args(["position", "tilt"])))]
    Calibrate {
        #[command(flatten)]
        target: CoverArg,
        /// Actual position of the cover
        #[arg(long)]
        position: Option<u8>,
        /// Actual tilt of the slats
        #[arg(long)]
        tilt: Option<u8>,
    },
    /// Print the stored estimate of a cover
    Status(CoverArg),
    /// Validate the config and every cover's time maps
    CheckConfig,
}

impl Commands {
    /// Cover targeted by the command; `None` for whole-config commands.
    pub fn cover(&self) -> Option<&str> {
        match self {
            Commands::Open(c)
            | Commands::Close(c)
            | Commands::OpenTilt(c)
            | Commands::CloseTilt(c)
            | Commands::Stop(c)
            | Commands::Status(c) => Some(&c.cover),
            Commands::SetPosition { target, .. }
            | Commands::SetTilt { target, .. }
            | Commands::Calibrate { target, .. } => Some(&target.cover),
            Commands::CheckConfig => None,
        }
    }
}
