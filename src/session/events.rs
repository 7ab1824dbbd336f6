//! Session Event System
//!
//! Broadcasts lifecycle events of running sessions so observers (logs,
//! tests, embedding front-ends) can follow along without touching the
//! session itself.

use tokio::sync::broadcast;

use super::streams::StreamKind;
use crate::models::SessionState;
use crate::prompt::PromptCandidate;

/// Events emitted while a session runs
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The subprocess was spawned
    Started {
        session_id: String,
        /// Process ID
        pid: Option<u32>,
    },
    /// Sanitized text from one of the pipes
    Output {
        session_id: String,
        stream: StreamKind,
        text: String,
    },
    /// The pending output was classified as a prompt
    PromptDetected {
        session_id: String,
        candidate: PromptCandidate,
    },
    /// An answer was collected; `cancelled` when the operator dismissed it
    Answered { session_id: String, cancelled: bool },
    /// The session reached a terminal state
    Exited {
        session_id: String,
        state: SessionState,
        exit_code: Option<i32>,
    },
}

impl SessionEvent {
    pub fn session_id(&self) -> &str {
        match self {
            SessionEvent::Started { session_id, .. }
            | SessionEvent::Output { session_id, .. }
            | SessionEvent::PromptDetected { session_id, .. }
            | SessionEvent::Answered { session_id, .. }
            | SessionEvent::Exited { session_id, .. } => session_id,
        }
    }
}

/// Subscription handle for receiving session events
pub struct SessionEventSubscription {
    receiver: broadcast::Receiver<SessionEvent>,
}

impl SessionEventSubscription {
    /// Receive the next event, waiting if necessary
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!("Session event subscriber lagged by {} events", count);
                }
            }
        }
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Option<SessionEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(count)) => {
                    warn!("Session event subscriber lagged by {} events", count);
                }
                Err(_) => return None,
            }
        }
    }

    /// Drain everything currently buffered
    pub fn drain(&mut self) -> Vec<SessionEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

/// Event bus for publishing and subscribing to session events
#[derive(Clone)]
pub struct SessionEventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl SessionEventBus {
    /// Create a new event bus with the specified capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> SessionEventSubscription {
        SessionEventSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: SessionEvent) {
        // No receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for SessionEventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl std::fmt::Debug for SessionEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionEventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
