//! FFmpeg execution adapter
//!
//! Launches the transcoder with Tokio and exposes its stderr as a stream of
//! progress/diagnostic lines.

use std::io;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStderr, Command};

use crate::error::{ParcaError, ParcaResult};
use crate::ports::{ProcessHandle, ProcessInvocation, ProcessSpawner};

const READ_CHUNK: usize = 4096;

/// Locate an executable by name or path
pub fn resolve_tool(name: &str) -> ParcaResult<PathBuf> {
    which::which(name).map_err(|_| ParcaError::ToolNotFound {
        tool: name.to_string(),
    })
}

/// Spawns real processes
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegSpawner;

impl FfmpegSpawner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessSpawner for FfmpegSpawner {
    async fn spawn(&self, invocation: &ProcessInvocation) -> io::Result<Box<dyn ProcessHandle>> {
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // A terminal Ctrl-C must reach only parca; the runner ends the children
        #[cfg(unix)]
        command.process_group(0);
        let mut child = command.spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "stderr was not captured"))?;

        Ok(Box::new(FfmpegProcess {
            child,
            lines: LineSplitter::new(stderr),
        }))
    }
}

struct FfmpegProcess {
    child: Child,
    lines: LineSplitter<ChildStderr>,
}

#[async_trait]
impl ProcessHandle for FfmpegProcess {
    async fn next_line(&mut self) -> io::Result<Option<String>> {
        self.lines.next_line().await
    }

    async fn wait(&mut self) -> io::Result<Option<i32>> {
        let status = self.child.wait().await?;
        Ok(status.code())
    }

    async fn kill(&mut self) -> io::Result<()> {
        self.child.kill().await
    }
}

/// Splits a byte stream on `\r` as well as `\n`.
///
/// FFmpeg rewrites its status line with carriage returns, so a plain
/// `lines()` reader would only see progress once the job has finished.
pub(crate) struct LineSplitter<R> {
    reader: R,
    pending: Vec<u8>,
    eof: bool,
}

impl<R: AsyncRead + Unpin + Send> LineSplitter<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            reader,
            pending: Vec::new(),
            eof: false,
        }
    }

    /// Next non-empty line, lossily decoded; `None` at end of stream
    pub(crate) async fn next_line(&mut self) -> io::Result<Option<String>> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(end) = self.pending.iter().position(|b| *b == b'\r' || *b == b'\n') {
                let raw: Vec<u8> = self.pending.drain(..=end).collect();
                let line = String::from_utf8_lossy(&raw[..end]).trim_end().to_string();
                if line.is_empty() {
                    continue;
                }
                return Ok(Some(line));
            }

            if self.eof {
                if self.pending.is_empty() {
                    return Ok(None);
                }
                let raw = std::mem::take(&mut self.pending);
                let line = String::from_utf8_lossy(&raw).trim_end().to_string();
                return Ok(if line.is_empty() { None } else { Some(line) });
            }

            let read = self.reader.read(&mut chunk).await?;
            if read == 0 {
                self.eof = true;
            } else {
                self.pending.extend_from_slice(&chunk[..read]);
            }
        }
    }
}
