//! Error types and Result aliases for promptbridge

use std::fmt;
use std::path::PathBuf;

/// Result type alias for promptbridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Which pre-flight check failed before a session could be spawned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// No workspace / working directory was supplied, or it does not exist
    WorkingDirectory,
    /// The interpreter binary is missing on disk
    Interpreter,
    /// The target executable is missing on disk
    Executable,
}

impl Precondition {
    /// Short human label
    pub fn label(&self) -> &'static str {
        match self {
            Precondition::WorkingDirectory => "working directory",
            Precondition::Interpreter => "interpreter",
            Precondition::Executable => "executable",
        }
    }
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Main error type for promptbridge
#[derive(Debug)]
pub enum Error {
    // === Invocation errors ===
    /// A pre-flight check failed; nothing was spawned
    PreconditionMissing {
        precondition: Precondition,
        path: Option<PathBuf>,
        suggestion: String,
    },

    /// The subprocess could not be started
    SpawnFailed {
        command: String,
        reason: String,
    },

    /// The subprocess exited with a nonzero code
    NonZeroExit {
        command: String,
        code: i32,
    },

    /// The operator dismissed a prompt and the session was killed
    PromptCancelled {
        question: String,
    },

    // === Session I/O errors ===
    /// Failed to write an answer to the subprocess stdin
    StdinWriteFailed {
        reason: String,
    },

    /// Failed to deliver a signal to the subprocess
    SignalSendFailed {
        signal: String,
        reason: String,
    },

    /// Session was asked to do something it cannot do in its current state
    InvalidSessionState {
        state: String,
        operation: String,
    },

    // === Configuration errors ===
    /// Failed to read a configuration file
    ConfigLoadFailed {
        path: PathBuf,
        reason: String,
    },

    /// Failed to parse configuration
    ConfigParseFailed {
        format: String,
        reason: String,
    },

    /// Failed to serialize configuration
    ConfigSerializationFailed {
        format: String,
        reason: String,
    },

    /// Configuration values are out of range or inconsistent
    ConfigValidationFailed {
        reason: String,
    },

    /// A prompt classification rule does not compile
    InvalidPromptRule {
        pattern: String,
        reason: String,
    },

    // === I/O and serialization errors ===
    /// I/O errors
    Io(std::io::Error),

    /// Serialization errors
    Serde(serde_json::Error),

    /// TOML parsing errors
    Toml(toml::de::Error),

    /// Regex compilation errors
    Regex(regex::Error),

    // === Generic fallback (use sparingly) ===
    /// Generic errors
    Other(String),
}

impl Error {
    /// Exit code carried by a `NonZeroExit`
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Error::NonZeroExit { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether this error was raised before any process was spawned
    pub fn is_precondition(&self) -> bool {
        matches!(self, Error::PreconditionMissing { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Invocation errors
            Error::PreconditionMissing {
                precondition,
                path,
                suggestion,
            } => match path {
                Some(path) => write!(
                    f,
                    "The {} '{}' does not exist. {}",
                    precondition,
                    path.display(),
                    suggestion
                ),
                None => write!(f, "No {} is available. {}", precondition, suggestion),
            },
            Error::SpawnFailed { command, reason } => {
                write!(f, "Failed to spawn '{}': {}", command, reason)
            }
            Error::NonZeroExit { command, code } => {
                write!(f, "'{}' exited with code {}", command, code)
            }
            Error::PromptCancelled { question } => {
                write!(f, "Prompt '{}' was dismissed; process killed", question)
            }

            // Session I/O errors
            Error::StdinWriteFailed { reason } => {
                write!(f, "Failed to write to process stdin: {}", reason)
            }
            Error::SignalSendFailed { signal, reason } => {
                write!(f, "Failed to send signal '{}': {}", signal, reason)
            }
            Error::InvalidSessionState { state, operation } => {
                write!(f, "Cannot {} a session in state {}", operation, state)
            }

            // Configuration errors
            Error::ConfigLoadFailed { path, reason } => {
                write!(f, "Failed to load config from '{}': {}", path.display(), reason)
            }
            Error::ConfigParseFailed { format, reason } => {
                write!(f, "Failed to parse {} config: {}", format, reason)
            }
            Error::ConfigSerializationFailed { format, reason } => {
                write!(f, "Failed to serialize config as {}: {}", format, reason)
            }
            Error::ConfigValidationFailed { reason } => {
                write!(f, "Configuration validation failed: {}", reason)
            }
            Error::InvalidPromptRule { pattern, reason } => {
                write!(f, "Invalid prompt rule '{}': {}", pattern, reason)
            }

            // I/O and serialization errors
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Serde(err) => write!(f, "Serialization error: {}", err),
            Error::Toml(err) => write!(f, "TOML parsing error: {}", err),
            Error::Regex(err) => write!(f, "Regex compilation error: {}", err),

            // Generic fallback
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Serde(err) => Some(err),
            Error::Toml(err) => Some(err),
            Error::Regex(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serde(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Toml(err)
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::Regex(err)
    }
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Error::Other(err)
    }
}

impl From<&str> for Error {
    fn from(err: &str) -> Self {
        Error::Other(err.to_string())
    }
}
