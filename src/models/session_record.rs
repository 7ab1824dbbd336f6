//! Session Record Model
//!
//! Bookkeeping for one subprocess invocation: what was run, where, and how
//! it ended. The live process handle is owned by
//! [`Session`](crate::session::Session); this record is plain data that can
//! be cloned into reports and events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SessionState {
    /// Built but not spawned yet
    #[default]
    Created,
    /// Subprocess is running
    Running,
    /// Exited with code 0
    Succeeded,
    /// Exited with a nonzero code
    Failed,
    /// Could not start, or was killed after a dismissed prompt
    Killed,
}

impl SessionState {
    /// Whether no further transition is possible
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Succeeded | SessionState::Failed | SessionState::Killed
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Created => "Created",
            SessionState::Running => "Running",
            SessionState::Succeeded => "Succeeded",
            SessionState::Failed => "Failed",
            SessionState::Killed => "Killed",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata of one subprocess invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Unique session identifier
    pub id: String,

    /// Program that was spawned
    pub program: PathBuf,

    /// Arguments passed to the program
    pub args: Vec<String>,

    /// Working directory of the subprocess
    pub working_directory: PathBuf,

    /// Current state
    pub state: SessionState,

    /// OS process identifier
    pub pid: Option<u32>,

    pub start_time: Option<DateTime<Utc>>,

    pub end_time: Option<DateTime<Utc>>,

    /// Exit code once the process exited on its own
    pub exit_code: Option<i32>,

    /// Prompts answered during the session
    pub prompts_answered: usize,
}

impl SessionRecord {
    /// Create a record in the Created state
    pub fn new(program: PathBuf, args: Vec<String>, working_directory: PathBuf) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            program,
            args,
            working_directory,
            state: SessionState::Created,
            pid: None,
            start_time: None,
            end_time: None,
            exit_code: None,
            prompts_answered: 0,
        }
    }

    /// Created -> Running
    pub fn mark_started(&mut self, pid: Option<u32>) {
        self.pid = pid;
        self.state = SessionState::Running;
        self.start_time = Some(Utc::now());
    }

    /// Running -> Succeeded / Failed, depending on the code
    pub fn mark_exited(&mut self, exit_code: i32) {
        self.exit_code = Some(exit_code);
        self.state = if exit_code == 0 {
            SessionState::Succeeded
        } else {
            SessionState::Failed
        };
        self.end_time = Some(Utc::now());
    }

    /// Any state -> Killed
    pub fn mark_killed(&mut self) {
        self.state = SessionState::Killed;
        self.end_time = Some(Utc::now());
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    /// Wall time between start and end
    pub fn execution_duration(&self) -> Option<std::time::Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => {
                Some(end.signed_duration_since(start).to_std().unwrap_or_default())
            }
            _ => None,
        }
    }

    /// Command line as typed, for logs and messages
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    /// Get a display string for the session
    pub fn display_string(&self) -> String {
        let pid_str = self.pid.map_or("N/A".to_string(), |pid| pid.to_string());

        format!(
            "{} [{}] - {}{}",
            self.command_line(),
            pid_str,
            self.state,
            self.exit_code
                .map_or(String::new(), |code| format!(" (exit: {})", code))
        )
    }
}

impl std::fmt::Display for SessionRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_string())
    }
}
