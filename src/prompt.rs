//! Prompt Classification
//!
//! Decides whether the pending (not yet answered) subprocess output ends in
//! an interactive prompt. Detection is a list of regex rules, each tagged
//! with the kind of prompt it indicates, so the wrapped tool's phrasing can
//! be extended from configuration without touching the session loop.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Built-in rules, in evaluation order
pub const DEFAULT_RULES: &[(PromptKind, &str)] = &[
    (PromptKind::Binary, r"(?i)\[y/n\]"),
    (PromptKind::Binary, r"(?i)\(yes/no\)"),
    (PromptKind::FreeText, r"\?\s*\z"),
    (PromptKind::FreeText, r"(?m)^\s*Default:[ \t]*\S"),
    (PromptKind::FreeText, r"(?i)continue\?"),
    (PromptKind::FreeText, r"(?i)proceed\?"),
    (PromptKind::FreeText, r"(?i)do you want"),
];

/// Captures the default value offered by a free-text prompt
pub const DEFAULT_VALUE_PATTERN: &str = r"(?m)Default:\s*(.+)$";

/// Trailing yes/no marker removed from binary questions before display
pub const BINARY_MARKER_PATTERN: &str = r"(?i)\??\s*(?:\[y/n\]|\(yes/no\))\s*:?\s*$";

/// Classification tag of a detection attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    /// Nothing to answer yet
    #[default]
    #[serde(rename = "none")]
    NoPrompt,
    /// Yes/no question
    Binary,
    /// Arbitrary single-line input
    FreeText,
}

impl PromptKind {
    /// Binary beats free-text: every binary prompt also ends in `?`.
    fn precedence(self) -> u8 {
        match self {
            PromptKind::NoPrompt => 0,
            PromptKind::FreeText => 1,
            PromptKind::Binary => 2,
        }
    }
}

impl std::fmt::Display for PromptKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PromptKind::NoPrompt => "none",
            PromptKind::Binary => "binary",
            PromptKind::FreeText => "free_text",
        })
    }
}

/// Result of classifying the pending buffer
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PromptCandidate {
    pub kind: PromptKind,
    /// Question shown to the operator
    pub question: String,
    /// Value offered by a `Default: <value>` line
    pub default_value: Option<String>,
}

impl PromptCandidate {
    /// A "no prompt pending" candidate
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether this candidate needs an answer
    pub fn is_prompt(&self) -> bool {
        self.kind != PromptKind::NoPrompt
    }
}

/// Serializable form of a rule, as found in configuration files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptRuleSpec {
    pub kind: PromptKind,
    pub pattern: String,
}

impl PromptRuleSpec {
    pub fn new(kind: PromptKind, pattern: impl Into<String>) -> Self {
        Self {
            kind,
            pattern: pattern.into(),
        }
    }
}

/// A compiled classification rule
#[derive(Debug, Clone)]
pub struct PromptRule {
    kind: PromptKind,
    pattern: Regex,
}

impl PromptRule {
    /// Compile a rule from its spec
    pub fn compile(spec: &PromptRuleSpec) -> Result<Self> {
        if spec.kind == PromptKind::NoPrompt {
            return Err(Error::InvalidPromptRule {
                pattern: spec.pattern.clone(),
                reason: "a rule must detect a binary or free_text prompt".to_string(),
            });
        }
        let pattern = compile_pattern(&spec.pattern)?;
        Ok(Self {
            kind: spec.kind,
            pattern,
        })
    }

    pub fn kind(&self) -> PromptKind {
        self.kind
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

fn compile_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::InvalidPromptRule {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// Classifies accumulated subprocess output into prompt candidates
#[derive(Debug, Clone)]
pub struct PromptClassifier {
    rules: Vec<PromptRule>,
    default_value: Regex,
    binary_marker: Regex,
}

impl PromptClassifier {
    /// Create a classifier with the built-in rule set
    pub fn new() -> Self {
        let specs = Self::default_rule_specs();
        // The built-in patterns are constants covered by tests
        Self::with_patterns(&specs, DEFAULT_VALUE_PATTERN, BINARY_MARKER_PATTERN)
            .unwrap_or_else(|e| unreachable!("built-in prompt rules must compile: {}", e))
    }

    /// Built-in rules in their serializable form
    pub fn default_rule_specs() -> Vec<PromptRuleSpec> {
        DEFAULT_RULES
            .iter()
            .map(|(kind, pattern)| PromptRuleSpec::new(*kind, *pattern))
            .collect()
    }

    /// Create a classifier from custom rules and extraction patterns
    pub fn with_patterns(
        rules: &[PromptRuleSpec],
        default_value_pattern: &str,
        binary_marker_pattern: &str,
    ) -> Result<Self> {
        let rules = rules
            .iter()
            .map(PromptRule::compile)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            rules,
            default_value: compile_pattern(default_value_pattern)?,
            binary_marker: compile_pattern(binary_marker_pattern)?,
        })
    }

    /// Create a classifier from custom rules, keeping the built-in extraction patterns
    pub fn with_rules(rules: &[PromptRuleSpec]) -> Result<Self> {
        Self::with_patterns(rules, DEFAULT_VALUE_PATTERN, BINARY_MARKER_PATTERN)
    }

    /// Append one more rule
    pub fn add_rule(&mut self, spec: &PromptRuleSpec) -> Result<()> {
        self.rules.push(PromptRule::compile(spec)?);
        Ok(())
    }

    /// Active rules in evaluation order
    pub fn rules(&self) -> &[PromptRule] {
        &self.rules
    }

    /// Classify the full pending buffer (already sanitized)
    pub fn classify(&self, text: &str) -> PromptCandidate {
        let kind = self
            .rules
            .iter()
            .filter(|rule| rule.is_match(text))
            .map(|rule| rule.kind)
            .max_by_key(|kind| kind.precedence())
            .unwrap_or(PromptKind::NoPrompt);

        match kind {
            PromptKind::NoPrompt => PromptCandidate::none(),
            PromptKind::Binary => {
                let question = self.clean_binary_question(&extract_question(text));
                trace!("Binary prompt detected: {:?}", question);
                PromptCandidate {
                    kind,
                    question,
                    default_value: self.extract_default(text),
                }
            }
            PromptKind::FreeText => {
                let question = extract_question(text);
                trace!("Free-text prompt detected: {:?}", question);
                PromptCandidate {
                    kind,
                    question,
                    default_value: self.extract_default(text),
                }
            }
        }
    }

    /// Capture group of the first `Default: <value>` line, trimmed
    pub fn extract_default(&self, text: &str) -> Option<String> {
        self.default_value
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|value| !value.is_empty())
    }

    /// Strip a trailing `[y/n]` / `(yes/no)` marker from a question
    pub fn clean_binary_question(&self, question: &str) -> String {
        self.binary_marker.replace(question, "").trim().to_string()
    }
}

impl Default for PromptClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// The last non-empty line containing `?`, else the last non-empty line,
/// else the whole text.
pub fn extract_question(text: &str) -> String {
    let mut last_non_empty = None;
    for line in text.lines().rev() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.contains('?') {
            return trimmed.to_string();
        }
        if last_non_empty.is_none() {
            last_non_empty = Some(trimmed);
        }
    }

    match last_non_empty {
        Some(line) => line.to_string(),
        None => text.to_string(),
    }
}
