//! Terminal responder used by the command-line runner
//!
//! Questions go to stderr so they never mix with the subprocess output on
//! stdout. End of input (Ctrl-D) dismisses the interaction.

use std::io::Write;
use std::sync::Mutex;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use super::{ChoiceRequest, PromptResponder, TextRequest};

/// Typed alone, submits an empty answer even when a default is offered
pub const CLEAR_VALUE: &str = "-";

type Input = Box<dyn AsyncBufRead + Send + Unpin>;
type Output = Box<dyn Write + Send>;

/// Asks the operator on a terminal
pub struct ConsoleResponder {
    input: tokio::sync::Mutex<Input>,
    output: Mutex<Output>,
}

impl ConsoleResponder {
    /// Read answers from stdin, ask on stderr
    pub fn stdio() -> Self {
        Self::from_io(
            Box::new(BufReader::new(tokio::io::stdin())),
            Box::new(std::io::stderr()),
        )
    }

    /// Use arbitrary streams (tests, embedding)
    pub fn from_io(input: Input, output: Output) -> Self {
        Self {
            input: tokio::sync::Mutex::new(input),
            output: Mutex::new(output),
        }
    }

    fn ask(&self, text: &str) {
        let mut out = self.output.lock().unwrap_or_else(|p| p.into_inner());
        if let Err(e) = write!(out, "{}", text).and_then(|_| out.flush()) {
            warn!("Failed to write prompt to console: {}", e);
        }
    }

    /// One line without its terminator; `None` at end of input
    async fn read_line(&self) -> Option<String> {
        let mut input = self.input.lock().await;
        let mut line = String::new();
        match input.read_line(&mut line).await {
            Ok(0) => None,
            Ok(_) => Some(line.trim_end_matches(['\n', '\r']).to_string()),
            Err(e) => {
                warn!("Failed to read answer from console: {}", e);
                None
            }
        }
    }
}

/// Map typed input onto one of the offered labels
fn match_option(typed: &str, options: &[String]) -> Option<String> {
    let typed = typed.trim().to_lowercase();
    if typed.is_empty() {
        return None;
    }
    options
        .iter()
        .find(|option| {
            let option = option.to_lowercase();
            option == typed || option.starts_with(&typed)
        })
        .cloned()
}

#[async_trait::async_trait]
impl PromptResponder for ConsoleResponder {
    async fn choose(&self, request: &ChoiceRequest) -> Option<String> {
        let options = request.options.join("/");
        loop {
            self.ask(&format!("{}: {} [{}] ", request.title, request.prompt, options));
            let line = self.read_line().await?;
            if let Some(selected) = match_option(&line, &request.options) {
                return Some(selected);
            }
            self.ask(&format!("Please answer one of: {}\n", options));
        }
    }

    async fn enter_text(&self, request: &TextRequest) -> Option<String> {
        if request.placeholder.is_empty() {
            self.ask(&format!("{} ", request.prompt));
        } else {
            self.ask(&format!(
                "{} [{}, '{}' for none] ",
                request.prompt, request.placeholder, CLEAR_VALUE
            ));
        }

        // An empty line keeps the pre-filled value, as an untouched input box would
        let line = self.read_line().await?;
        if line.is_empty() {
            Some(request.value.clone())
        } else if line.trim() == CLEAR_VALUE {
            Some(String::new())
        } else {
            Some(line)
        }
    }
}

impl std::fmt::Debug for ConsoleResponder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleResponder").finish_non_exhaustive()
    }
}
