//! Invocation Supervisor
//!
//! Entry point for callers: validates preconditions, runs one session and
//! turns its outcome into exactly one notification plus a `Result`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::collector::{AnswerCollector, PromptResponder};
use crate::config::RunnerConfig;
use crate::display::{DisplaySink, OutputChannel};
use crate::error::{Error, Precondition, Result};
use crate::prompt::PromptClassifier;
use crate::session::{EnvironmentSpec, Session, SessionEventBus, SessionOutcome, SessionSpec};

const WORKING_DIRECTORY_HINT: &str = "Open a workspace folder or pass a working directory.";
const INTERPRETER_HINT: &str = "Check the interpreter path in your configuration.";
const EXECUTABLE_HINT: &str = "Check the executable path in your configuration.";

/// One request to run the tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Tool entry point, handed to the interpreter as its first argument
    pub executable: PathBuf,
    /// Program that is actually spawned
    pub interpreter: PathBuf,
    pub args: Vec<String>,
    pub working_directory: Option<PathBuf>,
    /// Externally discovered SSH agent socket
    pub agent_socket: Option<PathBuf>,
}

impl Invocation {
    pub fn new(
        executable: impl Into<PathBuf>,
        interpreter: impl Into<PathBuf>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            executable: executable.into(),
            interpreter: interpreter.into(),
            args: args.into_iter().map(Into::into).collect(),
            working_directory: None,
            agent_socket: None,
        }
    }

    pub fn in_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    pub fn with_agent_socket(mut self, socket: impl Into<PathBuf>) -> Self {
        self.agent_socket = Some(socket.into());
        self
    }

    /// First argument, or the executable's file name when there are none
    pub fn subcommand(&self) -> String {
        self.args.first().cloned().unwrap_or_else(|| {
            self.executable
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.executable.display().to_string())
        })
    }

    /// Argument vector of the spawned interpreter
    pub fn interpreter_args(&self) -> Vec<String> {
        std::iter::once(self.executable.display().to_string())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

/// Summary of a successful invocation
#[derive(Debug, Clone, Serialize)]
pub struct InvocationReport {
    pub session_id: String,
    pub subcommand: String,
    pub exit_code: i32,
    /// Sanitized stdout
    pub stdout: String,
    /// Sanitized stderr
    pub stderr: String,
    pub duration: Option<Duration>,
    pub prompts_answered: usize,
}

/// Runs invocations against a shared display and responder
pub struct Supervisor {
    display: OutputChannel,
    responder: Arc<dyn PromptResponder>,
    classifier: Arc<PromptClassifier>,
    config: RunnerConfig,
    events: Option<SessionEventBus>,
}

impl Supervisor {
    /// Build from configuration; fails when the prompt rules do not compile
    pub fn new(
        display: OutputChannel,
        responder: Arc<dyn PromptResponder>,
        config: RunnerConfig,
    ) -> Result<Self> {
        let classifier = config.prompts.build_classifier()?;
        Ok(Self {
            display,
            responder,
            classifier: Arc::new(classifier),
            config,
            events: None,
        })
    }

    /// Forward every session's lifecycle events to `bus`
    pub fn with_event_bus(mut self, bus: SessionEventBus) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn display(&self) -> &OutputChannel {
        &self.display
    }

    /// Run one invocation to completion.
    ///
    /// Each call raises exactly one notification on the display.
    pub async fn invoke(&self, invocation: Invocation) -> Result<InvocationReport> {
        let subcommand = invocation.subcommand();

        let working_directory = match check_preconditions(&invocation) {
            Ok(dir) => dir,
            Err(e) => {
                warn!("Not running '{}': {}", subcommand, e);
                self.display.error(e.to_string());
                return Err(e);
            }
        };

        let environment = EnvironmentSpec::from_current_process(
            &self.config.environment,
            invocation.agent_socket.as_deref(),
        );
        let spec = SessionSpec {
            program: invocation.interpreter.clone(),
            args: invocation.interpreter_args(),
            working_directory,
            environment,
        };
        let collector = AnswerCollector::new(Arc::clone(&self.responder))
            .with_title(self.config.session.choice_title.clone());

        let mut session = Session::new(
            spec,
            Arc::new(self.display.clone()),
            Arc::clone(&self.classifier),
            collector,
            self.config.session.clone(),
        );
        if let Some(bus) = &self.events {
            session = session.with_event_bus(bus.clone());
        }

        self.display.reveal();
        let outcome = match session.run().await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Session for '{}' failed: {}", subcommand, e);
                self.display.error(format!("{} failed: {}", subcommand, e));
                return Err(e);
            }
        };

        let record = session.record();
        match outcome {
            SessionOutcome::Succeeded => {
                self.display
                    .info(format!("{} completed successfully", subcommand));
                Ok(InvocationReport {
                    session_id: record.id.clone(),
                    subcommand,
                    exit_code: 0,
                    stdout: session.stdout().to_string(),
                    stderr: session.stderr().to_string(),
                    duration: record.execution_duration(),
                    prompts_answered: record.prompts_answered,
                })
            }
            SessionOutcome::Failed { code } => {
                self.display
                    .error(format!("{} failed with exit code {}", subcommand, code));
                Err(Error::NonZeroExit {
                    command: subcommand,
                    code,
                })
            }
            SessionOutcome::SpawnFailed { reason } => {
                self.display
                    .error(format!("Could not start {}: {}", subcommand, reason));
                Err(Error::SpawnFailed {
                    command: record.command_line(),
                    reason,
                })
            }
            SessionOutcome::Cancelled { question } => {
                self.display.error(format!("{} was cancelled", subcommand));
                Err(Error::PromptCancelled { question })
            }
        }
    }
}

/// Check, in order, the working directory, the interpreter and the
/// executable. Returns the working directory on success.
pub fn check_preconditions(invocation: &Invocation) -> Result<PathBuf> {
    let working_directory = match &invocation.working_directory {
        Some(dir) if dir.is_dir() => dir.clone(),
        other => {
            return Err(Error::PreconditionMissing {
                precondition: Precondition::WorkingDirectory,
                path: other.clone(),
                suggestion: WORKING_DIRECTORY_HINT.to_string(),
            })
        }
    };

    require_file(&invocation.interpreter, Precondition::Interpreter, INTERPRETER_HINT)?;
    require_file(&invocation.executable, Precondition::Executable, EXECUTABLE_HINT)?;

    Ok(working_directory)
}

fn require_file(path: &Path, precondition: Precondition, hint: &str) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(Error::PreconditionMissing {
            precondition,
            path: Some(path.to_path_buf()),
            suggestion: hint.to_string(),
        })
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("display", &self.display.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
