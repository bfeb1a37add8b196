// Unit tests for the readiness scan, driven through a plain channel

use crate::READY_MARKER;
use crate::lifecycle::readiness::{
    OUTPUT_TAIL_LINES, OutputLine, OutputSource, Readiness, default_ready_regex, format_tail,
    scan_for_marker,
};

use std::collections::VecDeque;

use regex::Regex;
use tokio::sync::mpsc;

fn line(source: OutputSource, text: &str) -> OutputLine {
    OutputLine {
        source,
        text: text.to_string(),
    }
}

/// **VALUE**: Verifies the default pattern matches a real redis 2.8 readiness line.
///
/// **WHY THIS MATTERS**: This is the only signal that the server is listening. If the
/// pattern stops matching, every `start()` runs into the startup timeout.
///
/// **BUG THIS CATCHES**: Would catch anchoring the pattern (`^...$`) or escaping it wrongly.
#[test]
fn given_redis_log_line_when_default_regex_applied_then_matches() {
    // GIVEN: A line as redis-server 2.8 prints it
    let log_line =
        "[1234] 01 Jan 12:00:00.000 * The server is now ready to accept connections on port 6379";

    // WHEN/THEN: The default pattern matches
    assert!(default_ready_regex().is_match(log_line));
    assert!(default_ready_regex().is_match(READY_MARKER));
}

/// **VALUE**: Verifies matching is case-sensitive.
///
/// **WHY THIS MATTERS**: The marker is a verbatim string from the server's log format;
/// loosening it risks matching unrelated lines.
#[test]
fn given_differently_cased_line_when_default_regex_applied_then_does_not_match() {
    let shouted = READY_MARKER.to_uppercase();
    assert!(!default_ready_regex().is_match(&shouted));
    assert!(!default_ready_regex().is_match("Ready to accept connections"));
}

/// **VALUE**: Verifies the scan stops at the first matching line and returns it.
///
/// **WHY THIS MATTERS**: `start()` must resolve as soon as readiness is printed, not when
/// output ends (which for a healthy server is never).
#[tokio::test]
async fn given_marker_after_noise_when_scanned_then_returns_ready_with_line() {
    // GIVEN: A few log lines then the marker, sender kept alive
    let (tx, mut rx) = mpsc::channel(16);
    tx.send(line(OutputSource::Stdout, "# Server started")).await.unwrap();
    tx.send(line(OutputSource::Stderr, "# WARNING overcommit_memory"))
        .await
        .unwrap();
    tx.send(line(
        OutputSource::Stdout,
        "* The server is now ready to accept connections on port 7000",
    ))
    .await
    .unwrap();

    // WHEN: Scanning
    let mut tail = VecDeque::new();
    let result = scan_for_marker(&mut rx, default_ready_regex(), &mut tail).await;

    // THEN: Ready, with the preceding lines in the tail
    assert_eq!(
        result,
        Readiness::Ready("* The server is now ready to accept connections on port 7000".into())
    );
    assert_eq!(tail.len(), 2);
    drop(tx);
}

/// **VALUE**: Verifies a marker arriving on stderr is accepted.
///
/// **WHY THIS MATTERS**: stdout and stderr form one combined stream; servers that log to
/// stderr must still be detected.
#[tokio::test]
async fn given_marker_on_stderr_when_scanned_then_returns_ready() {
    let (tx, mut rx) = mpsc::channel(4);
    tx.send(line(
        OutputSource::Stderr,
        "The server is now ready to accept connections on port 7001",
    ))
    .await
    .unwrap();

    let mut tail = VecDeque::new();
    let result = scan_for_marker(&mut rx, default_ready_regex(), &mut tail).await;

    assert!(matches!(result, Readiness::Ready(_)));
}

/// **VALUE**: Verifies end of stream without a marker yields `StreamClosed`.
///
/// **WHY THIS MATTERS**: A crashing server closes its pipes. Treating that as anything
/// but a failure would report a dead server as active.
#[tokio::test]
async fn given_stream_closed_without_marker_when_scanned_then_returns_stream_closed() {
    // GIVEN: Only an error line, then the senders are dropped
    let (tx, mut rx) = mpsc::channel(4);
    tx.send(line(OutputSource::Stderr, "# Fatal error, can't open config file"))
        .await
        .unwrap();
    drop(tx);

    // WHEN: Scanning
    let mut tail = VecDeque::new();
    let result = scan_for_marker(&mut rx, default_ready_regex(), &mut tail).await;

    // THEN: StreamClosed, and the error line is kept for the message
    assert_eq!(result, Readiness::StreamClosed);
    assert_eq!(format_tail(&tail), "# Fatal error, can't open config file");
}

/// **VALUE**: Verifies the tail stays bounded no matter how much output precedes failure.
///
/// **WHY THIS MATTERS**: Server logs can be arbitrarily long; buffering all of it while
/// waiting for readiness would grow without bound.
#[tokio::test]
async fn given_many_lines_when_scanned_then_tail_keeps_only_the_last_lines() {
    // GIVEN: Far more lines than the tail holds
    let total = OUTPUT_TAIL_LINES * 5;
    let (tx, mut rx) = mpsc::channel(total);
    for i in 0..total {
        tx.send(line(OutputSource::Stdout, &format!("line {i}")))
            .await
            .unwrap();
    }
    drop(tx);

    // WHEN: Scanning to the end
    let mut tail = VecDeque::new();
    scan_for_marker(&mut rx, default_ready_regex(), &mut tail).await;

    // THEN: Only the newest lines are kept
    assert_eq!(tail.len(), OUTPUT_TAIL_LINES);
    assert_eq!(tail.back().map(String::as_str), Some(&*format!("line {}", total - 1)));
    assert_eq!(
        tail.front().map(String::as_str),
        Some(&*format!("line {}", total - OUTPUT_TAIL_LINES))
    );
}

/// **VALUE**: Verifies a custom pattern replaces the default marker.
///
/// **WHY THIS MATTERS**: Newer server releases print "Ready to accept connections";
/// the configurable pattern is how those are supported.
#[tokio::test]
async fn given_custom_pattern_when_scanned_then_matches_new_marker() {
    let pattern = Regex::new(r"Ready to accept connections").unwrap();
    let (tx, mut rx) = mpsc::channel(4);
    tx.send(line(OutputSource::Stdout, "1:M * Ready to accept connections tcp"))
        .await
        .unwrap();

    let mut tail = VecDeque::new();
    let result = scan_for_marker(&mut rx, &pattern, &mut tail).await;

    assert!(matches!(result, Readiness::Ready(_)));
}

#[test]
fn given_empty_tail_when_formatted_then_says_no_output() {
    assert_eq!(format_tail(&VecDeque::new()), "<no output>");
}
