//! Process Session
//!
//! One subprocess run from spawn to exit. Output from both pipes is
//! sanitized and shown as it arrives; stdout is also accumulated into a
//! pending buffer that is classified after every chunk. When a prompt is
//! recognized the operator is asked, the answer is written to stdin and the
//! buffer starts over. A dismissed prompt kills the process.

pub mod environment;
pub mod events;
pub mod process;
pub mod signals;
pub mod streams;

use std::path::PathBuf;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Child;

use crate::ansi::{ChunkDecoder, StreamSanitizer};
use crate::collector::AnswerCollector;
use crate::config::SessionConfig;
use crate::display::DisplaySink;
use crate::error::{Error, Result};
use crate::models::{SessionRecord, SessionState};
use crate::prompt::{PromptCandidate, PromptClassifier};

pub use environment::EnvironmentSpec;
pub use events::{SessionEvent, SessionEventBus, SessionEventSubscription};
pub use streams::{OutputChunk, SessionStreams, StreamKind};

/// What a session should run
#[derive(Debug, Clone)]
pub struct SessionSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_directory: PathBuf,
    pub environment: EnvironmentSpec,
}

/// Terminal outcome of [`Session::run`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Exit code 0
    Succeeded,
    /// Exited on its own with a nonzero code
    Failed { code: i32 },
    /// The program never started
    SpawnFailed { reason: String },
    /// A prompt was dismissed and the process was killed
    Cancelled { question: String },
}

impl SessionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SessionOutcome::Succeeded)
    }
}

/// A single interactive subprocess run
pub struct Session {
    record: SessionRecord,
    environment: EnvironmentSpec,
    display: Arc<dyn DisplaySink>,
    classifier: Arc<PromptClassifier>,
    collector: AnswerCollector,
    config: SessionConfig,
    events: Option<SessionEventBus>,
    stdout_text: String,
    stderr_text: String,
    pending: String,
}

impl Session {
    /// Create a session in the Created state
    pub fn new(
        spec: SessionSpec,
        display: Arc<dyn DisplaySink>,
        classifier: Arc<PromptClassifier>,
        collector: AnswerCollector,
        config: SessionConfig,
    ) -> Self {
        Self {
            record: SessionRecord::new(spec.program, spec.args, spec.working_directory),
            environment: spec.environment,
            display,
            classifier,
            collector,
            config,
            events: None,
            stdout_text: String::new(),
            stderr_text: String::new(),
            pending: String::new(),
        }
    }

    /// Publish lifecycle events to `bus`
    pub fn with_event_bus(mut self, bus: SessionEventBus) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn state(&self) -> SessionState {
        self.record.state
    }

    pub fn record(&self) -> &SessionRecord {
        &self.record
    }

    /// Sanitized stdout seen so far
    pub fn stdout(&self) -> &str {
        &self.stdout_text
    }

    /// Sanitized stderr seen so far
    pub fn stderr(&self) -> &str {
        &self.stderr_text
    }

    /// Stdout not yet consumed by a prompt
    pub fn pending(&self) -> &str {
        &self.pending
    }

    pub fn environment(&self) -> &EnvironmentSpec {
        &self.environment
    }

    /// Spawn the subprocess and drive it to a terminal state.
    ///
    /// Only I/O failures while waiting on the child are returned as `Err`;
    /// every other ending is a [`SessionOutcome`].
    pub async fn run(&mut self) -> Result<SessionOutcome> {
        if self.record.state != SessionState::Created {
            return Err(Error::InvalidSessionState {
                state: self.record.state.to_string(),
                operation: "run".to_string(),
            });
        }

        let launched = process::spawn(process::LaunchSpec {
            program: &self.record.program,
            args: &self.record.args,
            working_directory: &self.record.working_directory,
            environment: &self.environment,
            read_buffer_size: self.config.read_buffer_size,
        });

        let (mut child, mut streams) = match launched {
            Ok(parts) => parts,
            Err(e) => {
                let reason = match &e {
                    Error::SpawnFailed { reason, .. } => reason.clone(),
                    other => other.to_string(),
                };
                error!("{}", e);
                self.display.append(&format!("{}\n", e));
                self.record.mark_killed();
                self.publish_exit();
                return Ok(SessionOutcome::SpawnFailed { reason });
            }
        };

        self.record.mark_started(child.id());
        info!("Session {} started: {}", self.record.id, self.record.command_line());
        self.publish(SessionEvent::Started {
            session_id: self.record.id.clone(),
            pid: self.record.pid,
        });

        let mut stdout = PipeText::default();
        let mut stderr = PipeText::default();

        while let Some(chunk) = streams.next_chunk().await {
            match chunk.stream {
                StreamKind::Stderr => {
                    let text = stderr.feed(&chunk.data);
                    self.handle_stderr(text);
                }
                StreamKind::Stdout => {
                    let text = stdout.feed(&chunk.data);
                    if let Some(question) = self.handle_stdout(text, &mut streams).await {
                        self.kill(&mut child, &mut streams).await?;
                        return Ok(SessionOutcome::Cancelled { question });
                    }
                }
            }
        }

        // Pipes are closed; flush whatever was held back
        if let Some(question) = self.handle_stdout(stdout.finish(), &mut streams).await {
            self.kill(&mut child, &mut streams).await?;
            return Ok(SessionOutcome::Cancelled { question });
        }
        self.handle_stderr(stderr.finish());

        streams.close_stdin();
        let status = child.wait().await?;
        let code = exit_code(status);
        self.record.mark_exited(code);
        info!(
            "Session {} exited with code {} after {:?}",
            self.record.id,
            code,
            self.record.execution_duration().unwrap_or_default()
        );
        self.publish_exit();

        Ok(if code == 0 {
            SessionOutcome::Succeeded
        } else {
            SessionOutcome::Failed { code }
        })
    }

    fn handle_stderr(&mut self, text: String) {
        if text.is_empty() {
            return;
        }
        self.display.append(&text);
        self.stderr_text.push_str(&text);
        self.publish(SessionEvent::Output {
            session_id: self.record.id.clone(),
            stream: StreamKind::Stderr,
            text,
        });
    }

    /// Returns the question when the operator dismissed the prompt
    async fn handle_stdout(&mut self, text: String, streams: &mut SessionStreams) -> Option<String> {
        if text.is_empty() {
            return None;
        }
        self.display.append(&text);
        self.stdout_text.push_str(&text);
        self.pending.push_str(&text);
        self.cap_pending();
        self.publish(SessionEvent::Output {
            session_id: self.record.id.clone(),
            stream: StreamKind::Stdout,
            text,
        });

        let candidate = self.classifier.classify(&self.pending);
        if !candidate.is_prompt() {
            return None;
        }
        self.answer(candidate, streams).await
    }

    async fn answer(
        &mut self,
        candidate: PromptCandidate,
        streams: &mut SessionStreams,
    ) -> Option<String> {
        info!("Prompt detected ({}): {}", candidate.kind, candidate.question);
        self.publish(SessionEvent::PromptDetected {
            session_id: self.record.id.clone(),
            candidate: candidate.clone(),
        });
        self.display.reveal();

        let answer = self.collector.collect(&candidate).await;

        if let Some(text) = &answer.text {
            match streams.write(text.as_bytes()).await {
                Ok(()) => {
                    debug!("Wrote {} byte answer to stdin", text.len());
                    if !answer.cancelled {
                        self.record.prompts_answered += 1;
                    }
                }
                Err(e) if answer.cancelled => warn!("{}", e),
                Err(e) => {
                    warn!("Answer to '{}' not delivered: {}", candidate.question, e);
                    self.display
                        .append(&format!("Answer not delivered: {}\n", e));
                }
            }
        }
        self.pending.clear();
        self.publish(SessionEvent::Answered {
            session_id: self.record.id.clone(),
            cancelled: answer.cancelled,
        });

        answer.cancelled.then_some(candidate.question)
    }

    /// Keep only the newest `max_pending_bytes` of the pending buffer
    fn cap_pending(&mut self) {
        let max = self.config.max_pending_bytes;
        if self.pending.len() <= max {
            return;
        }
        let mut cut = self.pending.len() - max;
        while !self.pending.is_char_boundary(cut) {
            cut += 1;
        }
        self.pending.drain(..cut);
    }

    async fn kill(&mut self, child: &mut Child, streams: &mut SessionStreams) -> Result<()> {
        info!("Killing session {} after dismissed prompt", self.record.id);
        let grace = Duration::from_millis(self.config.kill_grace_ms);
        let status = signals::terminate(child, grace).await?;
        debug!("Session {} terminated: {}", self.record.id, status);
        // Grandchildren may still hold the pipes open
        streams.stop_readers().await;
        self.record.mark_killed();
        self.publish_exit();
        Ok(())
    }

    fn publish_exit(&self) {
        self.publish(SessionEvent::Exited {
            session_id: self.record.id.clone(),
            state: self.record.state,
            exit_code: self.record.exit_code,
        });
    }

    fn publish(&self, event: SessionEvent) {
        if let Some(bus) = &self.events {
            bus.publish(event);
        }
    }
}

/// Exit code of a finished child; death by signal N reports `128 + N`
/// like a shell does, or -1 where there is no signal number.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

/// Decoding and sanitizing state of one pipe
#[derive(Debug, Default)]
struct PipeText {
    decoder: ChunkDecoder,
    sanitizer: StreamSanitizer,
}

impl PipeText {
    fn feed(&mut self, data: &[u8]) -> String {
        let text = self.decoder.decode(data);
        self.sanitizer.feed(&text)
    }

    fn finish(&mut self) -> String {
        let tail = self.decoder.finish();
        let mut text = self.sanitizer.feed(&tail);
        text.push_str(&self.sanitizer.finish());
        text
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("record", &self.record)
            .field("pending_len", &self.pending.len())
            .finish_non_exhaustive()
    }
}
