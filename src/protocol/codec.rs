//! Line codec for `tr64c` output streams.
//!
//! Wraps [`tokio_util::codec::LinesCodec`] with a maximum line length so a
//! misbehaving child cannot make the client buffer an unterminated line
//! without bound. `LinesCodec` already drops a trailing `\r`, which covers
//! the CRLF line endings the Windows build of `tr64c` prints.
//!
//! # Usage
//!
//! Use [`LineCodec`] as the codec parameter for
//! [`tokio_util::codec::FramedRead`] over the child's output pipe. Commands
//! travel the other way as plain `write_all` calls, so there is no encoder.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, LinesCodec, LinesCodecError};

use crate::{AppError, Result};

// ── Codec ────────────────────────────────────────────────────────────────────

/// Maximum accepted line length: 4 MiB.
///
/// `tr64c` prints a whole `list` response for a large device as a handful of
/// long JSON lines, so the limit is generous.
pub const MAX_LINE_BYTES: usize = 4 * 1_048_576;

/// Newline framing for the child's merged output.
///
/// Delegates to [`LinesCodec`] with a fixed [`MAX_LINE_BYTES`] limit. Each
/// `\n`-terminated UTF-8 string is one line of `tr64c` output: a JSON
/// fragment, a blank terminator, or an `Error:`/diagnostic message.
///
/// # Decoder
///
/// Lines longer than [`MAX_LINE_BYTES`] return
/// [`AppError::Protocol`]`("line too long: …")` rather than allocating.
/// I/O errors are mapped to [`AppError::Io`]. At end of stream a final
/// unterminated line is still yielded.
///
/// # Examples
///
/// ```rust,ignore
/// use tokio_util::codec::FramedRead;
/// use tr64c_session::protocol::codec::LineCodec;
///
/// let lines = FramedRead::new(child_output, LineCodec::new());
/// ```
#[derive(Debug)]
pub struct LineCodec(LinesCodec);

impl LineCodec {
    /// Create a codec with the default [`MAX_LINE_BYTES`] limit.
    #[must_use]
    pub fn new() -> Self {
        Self(LinesCodec::new_with_max_length(MAX_LINE_BYTES))
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = AppError;

    /// Returns `Ok(None)` while `src` holds no complete line.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        self.0.decode(src).map_err(map_codec_error)
    }

    /// Yields a final unterminated line when the stream closes, so the
    /// single unterminated `--version` line is still delivered.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        self.0.decode_eof(src).map_err(map_codec_error)
    }
}

// ── Private helper ───────────────────────────────────────────────────────────

fn map_codec_error(e: LinesCodecError) -> AppError {
    match e {
        LinesCodecError::MaxLineLengthExceeded => {
            AppError::Protocol(format!("line too long: exceeded {MAX_LINE_BYTES} bytes"))
        }
        LinesCodecError::Io(io_err) => AppError::Io(io_err.to_string()),
    }
}
