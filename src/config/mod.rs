//! Configuration management for promptbridge
//!
//! Tuning for sessions, the environment overlay handed to subprocesses, and
//! the prompt rule set. Everything has a default; a config file only needs
//! the keys it changes.

pub mod loader;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::prompt::{
    PromptClassifier, PromptRuleSpec, BINARY_MARKER_PATTERN, DEFAULT_VALUE_PATTERN,
};

pub use loader::ConfigLoader;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub session: SessionConfig,
    pub environment: EnvironmentConfig,
    pub prompts: PromptConfig,
}

impl RunnerConfig {
    /// Validate every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.session.validate()?;
        self.environment.validate()?;
        self.prompts.validate()?;
        Ok(())
    }
}

/// Session-level tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Bytes per pipe read
    pub read_buffer_size: usize,

    /// Time between SIGTERM and SIGKILL when killing a subprocess
    pub kill_grace_ms: u64,

    /// Upper bound on the pending prompt buffer; older text is dropped
    pub max_pending_bytes: usize,

    /// Title used on yes/no interactions
    pub choice_title: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: 4096,
            kill_grace_ms: 2000,
            max_pending_bytes: 64 * 1024,
            choice_title: crate::collector::DEFAULT_TITLE.to_string(),
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.read_buffer_size == 0 {
            return Err(ConfigError::ZeroSize("session.read_buffer_size"));
        }
        if self.max_pending_bytes == 0 {
            return Err(ConfigError::ZeroSize("session.max_pending_bytes"));
        }
        Ok(())
    }
}

/// A `NAME=value` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

impl EnvVar {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Environment overlay applied to every subprocess
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Start from the caller's environment
    pub inherit: bool,

    /// Tells the tool nobody is at a real terminal
    pub non_interactive: EnvVar,

    /// Stops helpers (credential prompts and the like) from opening the tty
    pub prompt_suppression: EnvVar,

    /// Passed through from the caller when set there
    pub signing_tty_var: String,

    /// Set from the externally discovered agent socket
    pub agent_socket_var: String,

    /// Additional fixed variables
    pub extra: BTreeMap<String, String>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        let mut extra = BTreeMap::new();
        // Interpreter-hosted tools must flush their prompts through a pipe
        extra.insert("PYTHONUNBUFFERED".to_string(), "1".to_string());

        Self {
            inherit: true,
            non_interactive: EnvVar::new("NONINTERACTIVE", "1"),
            prompt_suppression: EnvVar::new("GIT_TERMINAL_PROMPT", "0"),
            signing_tty_var: "GPG_TTY".to_string(),
            agent_socket_var: "SSH_AUTH_SOCK".to_string(),
            extra,
        }
    }
}

impl EnvironmentConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let names = [
            self.non_interactive.name.as_str(),
            self.prompt_suppression.name.as_str(),
            self.signing_tty_var.as_str(),
            self.agent_socket_var.as_str(),
        ];
        for name in names.into_iter().chain(self.extra.keys().map(String::as_str)) {
            if name.is_empty() || name.contains('=') || name.contains('\0') {
                return Err(ConfigError::InvalidVariableName(name.to_string()));
            }
        }
        Ok(())
    }
}

/// Prompt detection rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Ordered rules; empty means the built-in set
    pub rules: Vec<PromptRuleSpec>,

    /// Regex whose first group is the default value of a free-text prompt
    pub default_pattern: String,

    /// Regex removed from the end of binary questions
    pub binary_marker_pattern: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            default_pattern: DEFAULT_VALUE_PATTERN.to_string(),
            binary_marker_pattern: BINARY_MARKER_PATTERN.to_string(),
        }
    }
}

impl PromptConfig {
    /// Rules in effect
    pub fn effective_rules(&self) -> Vec<PromptRuleSpec> {
        if self.rules.is_empty() {
            PromptClassifier::default_rule_specs()
        } else {
            self.rules.clone()
        }
    }

    /// Build the classifier described by this section
    pub fn build_classifier(&self) -> crate::Result<PromptClassifier> {
        PromptClassifier::with_patterns(
            &self.effective_rules(),
            &self.default_pattern,
            &self.binary_marker_pattern,
        )
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.build_classifier()
            .map(|_| ())
            .map_err(|e| ConfigError::InvalidPrompts(e.to_string()))
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    ZeroSize(&'static str),
    #[error("Invalid environment variable name: '{0}'")]
    InvalidVariableName(String),
    #[error("Invalid prompt configuration: {0}")]
    InvalidPrompts(String),
}

impl From<ConfigError> for crate::Error {
    fn from(err: ConfigError) -> Self {
        crate::Error::ConfigValidationFailed {
            reason: err.to_string(),
        }
    }
}
