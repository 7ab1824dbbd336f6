//! promptbridge - run interactive command-line tools without a terminal
//!
//! Spawns a tool (through its interpreter) with piped stdio, streams its
//! output to a display with color codes stripped, and whenever the output
//! ends in a question, asks a human and writes the answer to the tool's
//! stdin.
//!
//! ## Module Organization
//!
//! - [`supervisor`] - Precondition checks, one notification per run
//! - [`session`] - Subprocess lifecycle, streams, environment, signals, events
//! - [`prompt`] - Prompt classification rules
//! - [`collector`] - Turning a prompt into an answer (console or scripted)
//! - [`display`] - Output surfaces and notifications
//! - [`ansi`] - Output sanitization and incremental UTF-8 decoding
//! - [`config`] - Configuration loading and validation
//! - [`models`] - Session records
//! - [`mod@error`] - Error types and Result aliases
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use promptbridge::{ConsoleDisplay, ConsoleResponder, Invocation, OutputChannel, Supervisor};
//!
//! # async fn run() -> promptbridge::Result<()> {
//! let config = promptbridge::load_config(None)?;
//! let display = OutputChannel::open("tool", Arc::new(ConsoleDisplay::new()));
//! let supervisor = Supervisor::new(display, Arc::new(ConsoleResponder::stdio()), config)?;
//!
//! let invocation = Invocation::new("/opt/tool/bin/tool", "/usr/bin/python3", ["status"])
//!     .in_directory("/srv/project");
//! let report = supervisor.invoke(invocation).await?;
//! println!("{}", report.stdout);
//! # Ok(())
//! # }
//! ```

#[macro_use]
extern crate tracing;

pub mod ansi;
pub mod collector;
pub mod config;
pub mod display;
pub mod error;
pub mod models;
pub mod prompt;
pub mod session;
pub mod supervisor;

// Re-exports for core functionality
pub use collector::{Answer, AnswerCollector, ConsoleResponder, PromptResponder, ScriptedResponder};
pub use config::{ConfigLoader, RunnerConfig};
pub use display::{ConsoleDisplay, DisplaySink, MemoryDisplay, OutputChannel};
pub use error::{Error, Result};
pub use prompt::{PromptCandidate, PromptClassifier, PromptKind};
pub use session::{Session, SessionEventBus, SessionOutcome};
pub use supervisor::{Invocation, InvocationReport, Supervisor};

/// The current version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The application name from Cargo.toml
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Load configuration from `path`, or from the default locations.
///
/// An explicit path must exist and parse. Without one, a broken file in a
/// default location is logged and replaced by defaults.
pub fn load_config(path: Option<&std::path::Path>) -> Result<RunnerConfig> {
    match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            ConfigLoader::load_from_path(path)
        }
        None => match ConfigLoader::load() {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!("Failed to load configuration: {}. Using defaults", e);
                Ok(RunnerConfig::default())
            }
        },
    }
}

/// Human-readable error report with hints, for the CLI
pub fn describe_error(error: &Error) -> String {
    match error {
        Error::PreconditionMissing { .. } => error.to_string(),
        Error::ConfigLoadFailed { .. }
        | Error::ConfigParseFailed { .. }
        | Error::ConfigValidationFailed { .. }
        | Error::InvalidPromptRule { .. } => format!(
            "Configuration Error: {}\n\nTry:\n• Check configuration file syntax\n• Remove the file to use defaults",
            error
        ),
        Error::SpawnFailed { .. } => format!(
            "{}\n\nTry:\n• Check that the interpreter is executable\n• Run with --debug for details",
            error
        ),
        _ => error.to_string(),
    }
}
