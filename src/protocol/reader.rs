//! Response framing for `tr64c` output.
//!
//! A response is zero or more JSON fragment lines closed by one blank line.
//! A line starting with `Error:` replaces the rest of the response; no blank
//! line follows it. At raised verbosity `tr64c` interleaves `Warning:`,
//! `Info:` and `Debug:` lines, which are logged and never part of a payload.
//!
//! | Line                             | Meaning                                  |
//! |----------------------------------|------------------------------------------|
//! | blank (after trim)               | [`ResponseLine::Terminator`]             |
//! | `Error:…`                        | [`ResponseLine::Error`], aborts the read |
//! | `Warning:…`, `Info:…`, `Debug:…` | [`ResponseLine::Diagnostic`], logged     |
//! | anything else                    | [`ResponseLine::Payload`], accumulated   |
//!
//! [`read_response`] is the single framing primitive shared by the one-shot
//! operations and the interactive session. They differ only in what the end
//! of the stream means, see [`EndOfStream`].

use futures_util::{Stream, StreamExt};
use tracing::{debug, warn};

use crate::{AppError, Result};

/// Prefix of the error sentinel line.
pub const ERROR_SENTINEL: &str = "Error:";

/// Prefixes of diagnostic lines printed at raised verbosity.
pub const DIAGNOSTIC_PREFIXES: [&str; 3] = ["Warning:", "Info:", "Debug:"];

/// One line of child output, classified for framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseLine {
    /// Blank line closing a response.
    Terminator,
    /// Error sentinel carrying the verbatim (trimmed) line.
    Error(String),
    /// `Warning:`, `Info:` or `Debug:` message (trimmed).
    Diagnostic(String),
    /// JSON fragment.
    Payload(String),
}

impl ResponseLine {
    /// Classify a raw line. Surrounding whitespace, including any stray
    /// `\r`, is stripped first.
    #[must_use]
    pub fn classify(raw: &str) -> Self {
        let line = raw.trim();
        if line.is_empty() {
            Self::Terminator
        } else if line.starts_with(ERROR_SENTINEL) {
            Self::Error(line.to_owned())
        } else if DIAGNOSTIC_PREFIXES.iter().any(|p| line.starts_with(p)) {
            Self::Diagnostic(line.to_owned())
        } else {
            Self::Payload(line.to_owned())
        }
    }
}

/// How to treat the output stream closing before a terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndOfStream {
    /// One-shot child that exits after its single response.
    ///
    /// Closing without having printed any payload (diagnostics aside) is a
    /// normal exit with an empty response. Closing after payload but before
    /// the blank line is a truncated response ([`AppError::Protocol`]).
    ExitAfterResponse,
    /// Interactive child that must stay alive between commands.
    ///
    /// Any close is [`AppError::Io`].
    Unexpected,
}

/// Read one framed response from `lines` and return its payload lines
/// concatenated without separator.
///
/// # Errors
///
/// - [`AppError::Remote`] with the sentinel line when the child reports an error.
/// - [`AppError::Protocol`] for a truncated one-shot response.
/// - [`AppError::Io`] when an interactive child closes its output, or the
///   stream itself fails.
pub async fn read_response<S>(lines: &mut S, at_eof: EndOfStream) -> Result<String>
where
    S: Stream<Item = Result<String>> + Unpin,
{
    let mut payload = String::new();

    loop {
        let Some(item) = lines.next().await else {
            return end_of_stream(payload, at_eof);
        };

        match ResponseLine::classify(&item?) {
            ResponseLine::Terminator => {
                debug!(payload_bytes = payload.len(), "response complete");
                return Ok(payload);
            }
            ResponseLine::Error(line) => {
                debug!(error = line.as_str(), "error sentinel received");
                return Err(AppError::Remote(line));
            }
            ResponseLine::Diagnostic(line) => {
                if line.starts_with(DIAGNOSTIC_PREFIXES[0]) {
                    warn!(message = line.as_str(), "tr64c warning");
                } else {
                    debug!(message = line.as_str(), "tr64c diagnostic");
                }
            }
            ResponseLine::Payload(line) => payload.push_str(&line),
        }
    }
}

fn end_of_stream(payload: String, at_eof: EndOfStream) -> Result<String> {
    match at_eof {
        EndOfStream::ExitAfterResponse if payload.is_empty() => {
            debug!("child exited without output");
            Ok(payload)
        }
        EndOfStream::ExitAfterResponse => Err(AppError::Protocol(format!(
            "truncated response: output closed after {} payload bytes without terminator",
            payload.len()
        ))),
        EndOfStream::Unexpected => Err(AppError::Io(
            "tr64c closed its output before the response terminator".into(),
        )),
    }
}
