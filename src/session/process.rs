//! Subprocess spawning
//!
//! Starts the program with all three standard streams piped and hands back
//! the child plus its wired-up [`SessionStreams`].

use std::path::Path;
use std::process::Stdio;

use tokio::process::{Child, Command};

use super::environment::EnvironmentSpec;
use super::streams::{output_channel, pump, SessionStreams, StreamKind};
use crate::error::{Error, Result};

/// What to launch
#[derive(Debug, Clone)]
pub struct LaunchSpec<'a> {
    pub program: &'a Path,
    pub args: &'a [String],
    pub working_directory: &'a Path,
    pub environment: &'a EnvironmentSpec,
    pub read_buffer_size: usize,
}

/// Spawn and start pumping stdout and stderr
pub fn spawn(spec: LaunchSpec<'_>) -> Result<(Child, SessionStreams)> {
    let mut command = Command::new(spec.program);
    command
        .args(spec.args)
        .current_dir(spec.working_directory)
        .env_clear()
        .envs(spec.environment.iter())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|e| Error::SpawnFailed {
        command: command_line(spec.program, spec.args),
        reason: e.to_string(),
    })?;

    let (tx, rx) = output_channel();
    let mut readers = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(pump(stdout, StreamKind::Stdout, spec.read_buffer_size, tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(pump(stderr, StreamKind::Stderr, spec.read_buffer_size, tx));
    }

    let stdin = child
        .stdin
        .take()
        .map(|s| Box::new(s) as Box<dyn tokio::io::AsyncWrite + Send + Unpin>);

    debug!(
        "Spawned {} (pid {:?}) in {}",
        command_line(spec.program, spec.args),
        child.id(),
        spec.working_directory.display()
    );

    Ok((child, SessionStreams::from_parts(rx, stdin).with_readers(readers)))
}

pub(crate) fn command_line(program: &Path, args: &[String]) -> String {
    std::iter::once(program.display().to_string())
        .chain(args.iter().cloned())
        .collect::<Vec<_>>()
        .join(" ")
}
