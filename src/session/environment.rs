//! Subprocess environment assembly
//!
//! The caller's environment overlaid with the fixed variables from
//! [`EnvironmentConfig`]. Built once per session and never changed after.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::EnvironmentConfig;

/// Variables that name the current user, in lookup order
const USER_VARS: &[&str] = &["USER", "USERNAME", "LOGNAME"];

/// Immutable `NAME -> value` mapping handed to the subprocess
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentSpec {
    vars: BTreeMap<String, String>,
}

impl EnvironmentSpec {
    /// Overlay the configured variables on an inherited environment
    pub fn build<I>(inherited: I, config: &EnvironmentConfig, agent_socket: Option<&Path>) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let inherited: BTreeMap<String, String> = inherited.into_iter().collect();
        let mut vars = if config.inherit {
            inherited.clone()
        } else {
            BTreeMap::new()
        };

        if let Some(home) = resolve_home(&inherited) {
            vars.insert("HOME".to_string(), home.to_string_lossy().into_owned());
        }
        if let Some(user) = resolve_user(&inherited) {
            vars.insert("USER".to_string(), user);
        }

        vars.insert(
            config.non_interactive.name.clone(),
            config.non_interactive.value.clone(),
        );
        vars.insert(
            config.prompt_suppression.name.clone(),
            config.prompt_suppression.value.clone(),
        );
        for (name, value) in &config.extra {
            vars.insert(name.clone(), value.clone());
        }

        // Pass-through even when the rest of the caller environment is not inherited
        if let Some(tty) = inherited.get(&config.signing_tty_var) {
            vars.insert(config.signing_tty_var.clone(), tty.clone());
        }
        if let Some(socket) = agent_socket {
            vars.insert(
                config.agent_socket_var.clone(),
                socket.to_string_lossy().into_owned(),
            );
        }

        Self { vars }
    }

    /// Overlay on this process's own environment
    pub fn from_current_process(config: &EnvironmentConfig, agent_socket: Option<&Path>) -> Self {
        Self::build(std::env::vars(), config, agent_socket)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn resolve_home(inherited: &BTreeMap<String, String>) -> Option<PathBuf> {
    inherited
        .get("HOME")
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
}

fn resolve_user(inherited: &BTreeMap<String, String>) -> Option<String> {
    USER_VARS
        .iter()
        .filter_map(|name| inherited.get(*name))
        .find(|value| !value.is_empty())
        .cloned()
}
