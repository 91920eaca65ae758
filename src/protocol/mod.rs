//! `tr64c` line protocol.
//!
//! - `quote`: escaping of argument values for the interactive command language.
//! - `codec`: [`LinesCodec`](tokio_util::codec::LinesCodec)-based framing of raw output bytes.
//! - `reader`: blank-line / `Error:` response framing over a line stream.
//! - `decoder`: JSON decoding of the accumulated payload.
//! - `version`: `--version` line parsing.

pub mod codec;
pub mod decoder;
pub mod quote;
pub mod reader;
pub mod version;
