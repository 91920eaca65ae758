//! Error types shared across the crate.

use std::fmt::{Display, Formatter};

/// Shared crate result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Error enumeration covering every failure mode of the session client.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// The `tr64c` executable could not be started.
    Spawn(String),
    /// Pipe failure or unexpected child exit during an exchange.
    Io(String),
    /// The child reported failure with an `Error:` line (verbatim).
    Remote(String),
    /// The output stream violated the response framing.
    Protocol(String),
    /// The response payload is not valid JSON.
    Decode {
        /// Diagnostic from the JSON parser.
        message: String,
        /// Raw payload text that failed to parse.
        raw: String,
    },
    /// The version line does not match the expected pattern.
    Parse(String),
    /// Operation attempted on a terminated session.
    SessionClosed,
    /// No complete response arrived within the configured read timeout.
    Timeout(String),
    /// The caller cancelled the exchange.
    Cancelled,
    /// The request cannot be expressed in the command language.
    InvalidRequest(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Spawn(msg) => write!(f, "spawn: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
            Self::Remote(msg) => write!(f, "remote: {msg}"),
            Self::Protocol(msg) => write!(f, "protocol: {msg}"),
            Self::Decode { message, raw } => write!(f, "decode: {message} (payload: {raw})"),
            Self::Parse(msg) => write!(f, "parse: {msg}"),
            Self::SessionClosed => write!(f, "session closed"),
            Self::Timeout(msg) => write!(f, "timeout: {msg}"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::InvalidRequest(msg) => write!(f, "invalid request: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
