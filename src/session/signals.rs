//! Subprocess termination
//!
//! Polite first: SIGTERM, a grace period, then a hard kill. On platforms
//! without signals the hard kill is all there is.

use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::Child;

use crate::error::{Error, Result};

/// Ask the process to stop
#[cfg(unix)]
pub fn send_terminate(pid: u32) -> Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    kill(Pid::from_raw(pid as i32), Signal::SIGTERM).map_err(|e| Error::SignalSendFailed {
        signal: "SIGTERM".to_string(),
        reason: e.to_string(),
    })
}

#[cfg(not(unix))]
pub fn send_terminate(_pid: u32) -> Result<()> {
    Err(Error::SignalSendFailed {
        signal: "SIGTERM".to_string(),
        reason: "not supported on this platform".to_string(),
    })
}

/// Terminate `child` and reap it
pub async fn terminate(child: &mut Child, grace: Duration) -> Result<ExitStatus> {
    if let Ok(Some(status)) = child.try_wait() {
        return Ok(status);
    }

    if let Some(pid) = child.id() {
        match send_terminate(pid) {
            Ok(()) => {
                debug!("Sent SIGTERM to {}", pid);
                if let Ok(waited) = tokio::time::timeout(grace, child.wait()).await {
                    return Ok(waited?);
                }
                warn!("Process {} ignored SIGTERM for {:?}, killing", pid, grace);
            }
            Err(e) => debug!("{}", e),
        }
    }

    child.kill().await?;
    Ok(child.wait().await?)
}
