//! Session Streams
//!
//! Bridges the child's stdout/stderr pipes into one ordered channel of
//! output chunks, and owns the stdin half used for answers.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::error::{Error, Result};

/// Which pipe a chunk came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// Raw bytes read from one pipe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
    pub stream: StreamKind,
    pub data: Vec<u8>,
}

type StdinWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Output receiver plus stdin writer of one subprocess.
///
/// Reader tasks attached with [`SessionStreams::with_readers`] are aborted
/// when the streams are stopped or dropped, so a grandchild still holding a
/// pipe open cannot keep them alive.
pub struct SessionStreams {
    output_rx: UnboundedReceiver<OutputChunk>,
    stdin: Option<StdinWriter>,
    readers: Vec<JoinHandle<()>>,
}

impl SessionStreams {
    /// Wrap an already connected receiver and writer
    pub fn from_parts(output_rx: UnboundedReceiver<OutputChunk>, stdin: Option<StdinWriter>) -> Self {
        Self {
            output_rx,
            stdin,
            readers: Vec::new(),
        }
    }

    /// Take ownership of the tasks feeding the output channel
    pub fn with_readers(mut self, readers: impl IntoIterator<Item = JoinHandle<()>>) -> Self {
        self.readers.extend(readers);
        self
    }

    /// Abort the reader tasks and wait until they are gone
    pub async fn stop_readers(&mut self) {
        for reader in self.readers.drain(..) {
            reader.abort();
            if let Err(e) = reader.await {
                if !e.is_cancelled() {
                    warn!("Output reader ended abnormally: {}", e);
                }
            }
        }
    }

    /// Reader tasks not yet finished
    pub fn active_readers(&self) -> usize {
        self.readers.iter().filter(|r| !r.is_finished()).count()
    }

    /// Next chunk in arrival order; `None` once every pipe reached EOF
    pub async fn next_chunk(&mut self) -> Option<OutputChunk> {
        self.output_rx.recv().await
    }

    /// Write and flush bytes to stdin
    pub async fn write(&mut self, data: &[u8]) -> Result<()> {
        let stdin = self.stdin.as_mut().ok_or_else(|| Error::StdinWriteFailed {
            reason: "stdin is closed".to_string(),
        })?;

        stdin
            .write_all(data)
            .await
            .map_err(|e| Error::StdinWriteFailed {
                reason: e.to_string(),
            })?;
        stdin.flush().await.map_err(|e| Error::StdinWriteFailed {
            reason: e.to_string(),
        })
    }

    /// Drop the stdin half so the child sees EOF
    pub fn close_stdin(&mut self) {
        self.stdin = None;
    }

    pub fn has_stdin(&self) -> bool {
        self.stdin.is_some()
    }
}

/// Create the shared output channel
pub fn output_channel() -> (UnboundedSender<OutputChunk>, UnboundedReceiver<OutputChunk>) {
    unbounded_channel()
}

/// Copy a pipe into the output channel until EOF or a read error
pub fn pump<R>(
    mut reader: R,
    stream: StreamKind,
    buffer_size: usize,
    tx: UnboundedSender<OutputChunk>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; buffer_size.max(1)];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => {
                    trace!("{:?} reached EOF", stream);
                    break;
                }
                Ok(n) => {
                    let chunk = OutputChunk {
                        stream,
                        data: buf[..n].to_vec(),
                    };
                    if tx.send(chunk).is_err() {
                        debug!("{:?} receiver dropped, stopping reader", stream);
                        break;
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("{:?} read error: {}", stream, e);
                    break;
                }
            }
        }
    })
}

impl Drop for SessionStreams {
    fn drop(&mut self) {
        for reader in &self.readers {
            reader.abort();
        }
    }
}

impl std::fmt::Debug for SessionStreams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStreams")
            .field("has_stdin", &self.has_stdin())
            .field("readers", &self.readers.len())
            .finish_non_exhaustive()
    }
}
