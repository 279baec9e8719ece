// Ports - Interface definitions (contracts) for external collaborators

use std::fmt;
use std::io;
use std::path::Path;

use async_trait::async_trait;

use crate::domain::model::TimeSpec;
use crate::error::ParcaResult;

/// Port for determining a source video's duration
#[async_trait]
pub trait ProbePort: Send + Sync {
    /// Probe the total duration of the media file
    async fn probe_duration(&self, path: &Path) -> ParcaResult<TimeSpec>;
}

/// A concrete external-process invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInvocation {
    pub program: String,
    pub args: Vec<String>,
}

impl ProcessInvocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Render as a copy-pasteable shell command line
    pub fn to_shell_string(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(shell_quote)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for ProcessInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_shell_string())
    }
}

fn shell_quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=+,@%".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// Port for launching the transcoder
#[async_trait]
pub trait ProcessSpawner: Send + Sync {
    /// Start the process; an error means it could not be launched at all
    async fn spawn(&self, invocation: &ProcessInvocation) -> io::Result<Box<dyn ProcessHandle>>;
}

/// A running process with a readable diagnostic stream
#[async_trait]
pub trait ProcessHandle: Send {
    /// Next line of diagnostic output; `\r` also ends a line. `None` at EOF.
    async fn next_line(&mut self) -> io::Result<Option<String>>;

    /// Wait for exit; `None` when the process was ended by a signal
    async fn wait(&mut self) -> io::Result<Option<i32>>;

    /// Terminate the process
    async fn kill(&mut self) -> io::Result<()>;
}
