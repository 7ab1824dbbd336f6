//! Answer Collection
//!
//! Turns a detected [`PromptCandidate`] into the bytes written back to the
//! subprocess, by asking a [`PromptResponder`] (the operator, a script, a UI)
//! for a choice or a line of text.

pub mod console;
pub mod scripted;

use std::sync::Arc;

use crate::prompt::{PromptCandidate, PromptKind};

pub use console::{ConsoleResponder, CLEAR_VALUE};
pub use scripted::{ScriptedReply, ScriptedResponder};

/// Label of the affirmative choice
pub const YES_LABEL: &str = "Yes";
/// Label of the negative choice
pub const NO_LABEL: &str = "No";
/// Title shown on choice interactions unless overridden
pub const DEFAULT_TITLE: &str = "Confirm";

/// A two-way choice presented to the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceRequest {
    pub title: String,
    pub prompt: String,
    pub options: Vec<String>,
}

/// A single-line text entry presented to the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRequest {
    pub prompt: String,
    /// Pre-filled value
    pub value: String,
    pub placeholder: String,
}

/// Source of operator answers.
///
/// `None` from either method means the interaction was dismissed without a
/// value, which is distinct from submitting an empty string.
#[async_trait::async_trait]
pub trait PromptResponder: Send + Sync {
    /// Ask the operator to pick one of `request.options`
    async fn choose(&self, request: &ChoiceRequest) -> Option<String>;

    /// Ask the operator for a line of text
    async fn enter_text(&self, request: &TextRequest) -> Option<String>;
}

/// What to do with the subprocess after a prompt was handled
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Answer {
    /// Bytes to write to stdin, newline included
    pub text: Option<String>,
    /// Operator dismissed the prompt; the session must be killed
    pub cancelled: bool,
}

impl Answer {
    /// A normal reply
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            cancelled: false,
        }
    }

    /// Cancelled, nothing to write
    pub fn cancelled() -> Self {
        Self {
            text: None,
            cancelled: true,
        }
    }

    /// Cancelled, but still write `text` before the kill
    pub fn cancelled_after(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            cancelled: true,
        }
    }
}

/// Collects answers for prompt candidates from a responder
#[derive(Clone)]
pub struct AnswerCollector {
    responder: Arc<dyn PromptResponder>,
    title: String,
}

impl AnswerCollector {
    /// Create a collector around a responder
    pub fn new(responder: Arc<dyn PromptResponder>) -> Self {
        Self {
            responder,
            title: DEFAULT_TITLE.to_string(),
        }
    }

    /// Use a custom title for choice interactions
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Ask for an answer; waits for as long as the responder takes
    pub async fn collect(&self, candidate: &PromptCandidate) -> Answer {
        match candidate.kind {
            PromptKind::NoPrompt => Answer::default(),
            PromptKind::Binary => self.collect_choice(candidate).await,
            PromptKind::FreeText => self.collect_text(candidate).await,
        }
    }

    async fn collect_choice(&self, candidate: &PromptCandidate) -> Answer {
        let request = ChoiceRequest {
            title: self.title.clone(),
            prompt: candidate.question.clone(),
            options: vec![YES_LABEL.to_string(), NO_LABEL.to_string()],
        };

        match self.responder.choose(&request).await {
            Some(selected) => Answer::reply(format!("{}\n", selected.to_lowercase())),
            // Dismissal both answers "no" and cancels. Probably accidental,
            // but the subprocess observes the "no" before it is killed.
            None => {
                debug!("Choice dismissed for {:?}", candidate.question);
                Answer::cancelled_after("no\n")
            }
        }
    }

    async fn collect_text(&self, candidate: &PromptCandidate) -> Answer {
        let seed = candidate.default_value.clone().unwrap_or_default();
        let request = TextRequest {
            prompt: candidate.question.clone(),
            value: seed.clone(),
            placeholder: seed,
        };

        match self.responder.enter_text(&request).await {
            Some(text) => Answer::reply(format!("{}\n", text)),
            None => {
                debug!("Text entry dismissed for {:?}", candidate.question);
                Answer::cancelled()
            }
        }
    }
}

impl std::fmt::Debug for AnswerCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerCollector")
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}
