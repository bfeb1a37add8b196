use crate::READY_MARKER;
use crate::error::lifecycle::LifecycleError;

use common::ErrorLocation;

use std::collections::VecDeque;
use std::panic::Location;
use std::sync::OnceLock;

use log::{debug, trace};
use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child as TokioChild;
use tokio::spawn as TokioSpawn;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const OUTPUT_CHANNEL_CAPACITY: usize = 256;
/// Lines kept for the startup failure message.
pub(crate) const OUTPUT_TAIL_LINES: usize = 20;

static READY_REGEX: OnceLock<Regex> = OnceLock::new();

pub(crate) fn default_ready_regex() -> &'static Regex {
    READY_REGEX.get_or_init(|| {
        Regex::new(&regex::escape(READY_MARKER)).expect("valid regex pattern")
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutputSource {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OutputLine {
    pub(crate) source: OutputSource,
    pub(crate) text: String,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Readiness {
    Ready(String),
    StreamClosed,
}

/// Take the child's stdout and stderr and merge them, line by line, into one channel.
///
/// Each pipe is read on its own task so a chatty stderr can never fill up and
/// block the child while we wait on stdout. The channel closes once both pipes
/// reach end of stream.
#[track_caller]
pub(crate) fn merge_output(
    child: &mut TokioChild,
) -> Result<mpsc::Receiver<OutputLine>, LifecycleError> {
    let stdout = child.stdout.take().ok_or_else(|| LifecycleError::StartupFailed {
        message: "Child process has no stdout".to_string(),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let stderr = child.stderr.take().ok_or_else(|| LifecycleError::StartupFailed {
        message: "Child process has no stderr".to_string(),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let (tx, rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
    forward_lines(stdout, OutputSource::Stdout, tx.clone());
    forward_lines(stderr, OutputSource::Stderr, tx);

    Ok(rx)
}

fn forward_lines<R>(pipe: R, source: OutputSource, tx: mpsc::Sender<OutputLine>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    TokioSpawn(async move {
        let mut lines = BufReader::new(pipe).lines();

        loop {
            match lines.next_line().await {
                Ok(Some(text)) => {
                    if tx.send(OutputLine { source, text }).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    debug!("Stopped reading server {source:?}: {e}");
                    break;
                }
            }
        }
    });
}

/// Read merged output until a line matches `pattern` or every pipe is closed.
///
/// Only the last [`OUTPUT_TAIL_LINES`] non-matching lines are kept, in `tail`,
/// so a long-running log never accumulates in memory.
pub(crate) async fn scan_for_marker(
    output: &mut mpsc::Receiver<OutputLine>,
    pattern: &Regex,
    tail: &mut VecDeque<String>,
) -> Readiness {
    while let Some(line) = output.recv().await {
        trace!("Server {:?}: {}", line.source, line.text);

        if pattern.is_match(&line.text) {
            return Readiness::Ready(line.text);
        }

        if tail.len() == OUTPUT_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line.text);
    }

    Readiness::StreamClosed
}

/// Keep reading output after readiness so the child never blocks on a full pipe.
pub(crate) fn drain_output(mut output: mpsc::Receiver<OutputLine>, port: u16) -> JoinHandle<()> {
    TokioSpawn(async move {
        while let Some(line) = output.recv().await {
            trace!("Server :{port} {:?}: {}", line.source, line.text);
        }
        debug!("Server output on port {port} closed");
    })
}

pub(crate) fn format_tail(tail: &VecDeque<String>) -> String {
    if tail.is_empty() {
        String::from("<no output>")
    } else {
        tail.iter().cloned().collect::<Vec<_>>().join(" | ")
    }
}
