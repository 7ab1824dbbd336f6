//! Display surface for subprocess output
//!
//! Sessions append sanitized text to a [`DisplaySink`]; they never read it
//! back. The host creates one [`OutputChannel`] at startup, hands clones of
//! it to the supervisor, and closes it at shutdown. Sessions running at the
//! same time share the channel and their text may interleave.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Severity of a summary notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Error,
}

/// A one-line summary of a finished invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

/// Append-only text surface
pub trait DisplaySink: Send + Sync {
    /// Append a fragment of text
    fn append(&self, text: &str);

    /// Ask the surface to become visible
    fn reveal(&self) {}

    /// Show a summary notification
    fn notify(&self, notification: Notification);
}

/// Writes output to stdout and notifications to stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleDisplay;

impl ConsoleDisplay {
    pub fn new() -> Self {
        Self
    }
}

impl DisplaySink for ConsoleDisplay {
    fn append(&self, text: &str) {
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = stdout.write_all(text.as_bytes()).and_then(|_| stdout.flush()) {
            debug!("Console display write failed: {}", e);
        }
    }

    fn notify(&self, notification: Notification) {
        let marker = match notification.level {
            NotificationLevel::Info => "✔",
            NotificationLevel::Error => "✘",
        };
        eprintln!("{} {}", marker, notification.message);
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    transcript: String,
    notifications: Vec<Notification>,
    reveal_requests: usize,
}

/// In-memory surface; clones share the same transcript
#[derive(Debug, Clone, Default)]
pub struct MemoryDisplay {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Everything appended so far
    pub fn transcript(&self) -> String {
        self.state().transcript.clone()
    }

    /// Notifications in the order they were raised
    pub fn notifications(&self) -> Vec<Notification> {
        self.state().notifications.clone()
    }

    /// How many times the surface was asked to show itself
    pub fn reveal_requests(&self) -> usize {
        self.state().reveal_requests
    }
}

impl DisplaySink for MemoryDisplay {
    fn append(&self, text: &str) {
        self.state().transcript.push_str(text);
    }

    fn reveal(&self) {
        self.state().reveal_requests += 1;
    }

    fn notify(&self, notification: Notification) {
        self.state().notifications.push(notification);
    }
}

/// Shared handle to the host's display surface
#[derive(Clone)]
pub struct OutputChannel {
    name: Arc<str>,
    sink: Arc<dyn DisplaySink>,
    closed: Arc<AtomicBool>,
}

impl OutputChannel {
    /// Open the channel; call once when the host starts
    pub fn open(name: impl Into<String>, sink: Arc<dyn DisplaySink>) -> Self {
        let name: String = name.into();
        debug!("Opening output channel '{}'", name);
        Self {
            name: name.into(),
            sink,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Close the channel for every clone; later writes are dropped
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!("Closed output channel '{}'", self.name);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Raise a notification
    pub fn info(&self, message: impl Into<String>) {
        self.notify(Notification {
            level: NotificationLevel::Info,
            message: message.into(),
        });
    }

    /// Raise an error notification
    pub fn error(&self, message: impl Into<String>) {
        self.notify(Notification {
            level: NotificationLevel::Error,
            message: message.into(),
        });
    }
}

impl DisplaySink for OutputChannel {
    fn append(&self, text: &str) {
        if self.is_closed() {
            trace!("Dropping {} bytes for closed channel '{}'", text.len(), self.name);
            return;
        }
        self.sink.append(text);
    }

    fn reveal(&self) {
        if !self.is_closed() {
            self.sink.reveal();
        }
    }

    fn notify(&self, notification: Notification) {
        if self.is_closed() {
            warn!(
                "Notification after channel '{}' closed: {}",
                self.name, notification.message
            );
            return;
        }
        self.sink.notify(notification);
    }
}

impl std::fmt::Debug for OutputChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputChannel")
            .field("name", &self.name)
            .field("closed", &self.is_closed())
            .finish()
    }
}
