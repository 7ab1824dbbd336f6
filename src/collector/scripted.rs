//! Pre-recorded responder for automation and tests

use std::collections::VecDeque;
use std::sync::Mutex;

use super::{ChoiceRequest, PromptResponder, TextRequest};

/// One pre-recorded reaction to a prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedReply {
    /// Select the option with this label
    Choice(String),
    /// Submit this text (may be empty)
    Text(String),
    /// Accept the pre-filled value of a text entry
    AcceptDefault,
    /// Close the interaction without a value
    Dismiss,
}

impl ScriptedReply {
    pub fn choice(label: impl Into<String>) -> Self {
        ScriptedReply::Choice(label.into())
    }

    pub fn text(text: impl Into<String>) -> Self {
        ScriptedReply::Text(text.into())
    }
}

/// Answers prompts from a queue; an exhausted queue dismisses everything
#[derive(Debug, Default)]
pub struct ScriptedResponder {
    replies: Mutex<VecDeque<ScriptedReply>>,
    choices_seen: Mutex<Vec<ChoiceRequest>>,
    texts_seen: Mutex<Vec<TextRequest>>,
}

impl ScriptedResponder {
    pub fn new(replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Queue another reply
    pub fn push(&self, reply: ScriptedReply) {
        lock(&self.replies).push_back(reply);
    }

    /// Replies not consumed yet
    pub fn remaining(&self) -> usize {
        lock(&self.replies).len()
    }

    /// Every choice request received so far
    pub fn choice_requests(&self) -> Vec<ChoiceRequest> {
        lock(&self.choices_seen).clone()
    }

    /// Every text request received so far
    pub fn text_requests(&self) -> Vec<TextRequest> {
        lock(&self.texts_seen).clone()
    }

    fn next_reply(&self) -> ScriptedReply {
        lock(&self.replies)
            .pop_front()
            .unwrap_or(ScriptedReply::Dismiss)
    }
}

// A poisoned queue is still usable: replies are plain data
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait::async_trait]
impl PromptResponder for ScriptedResponder {
    async fn choose(&self, request: &ChoiceRequest) -> Option<String> {
        lock(&self.choices_seen).push(request.clone());
        match self.next_reply() {
            ScriptedReply::Choice(label) => Some(label),
            ScriptedReply::Text(text) => {
                warn!("Scripted text reply {:?} used for a choice prompt", text);
                Some(text)
            }
            ScriptedReply::AcceptDefault => request.options.first().cloned(),
            ScriptedReply::Dismiss => None,
        }
    }

    async fn enter_text(&self, request: &TextRequest) -> Option<String> {
        lock(&self.texts_seen).push(request.clone());
        match self.next_reply() {
            ScriptedReply::Text(text) => Some(text),
            ScriptedReply::Choice(label) => Some(label),
            ScriptedReply::AcceptDefault => Some(request.value.clone()),
            ScriptedReply::Dismiss => None,
        }
    }
}
