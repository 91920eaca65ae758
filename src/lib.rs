#![forbid(unsafe_code)]

//! Session protocol client for the `tr64c` TR-064 command-line tool.
//!
//! `tr64c` does the TR-064 work itself; this crate launches it, speaks its
//! line-oriented command protocol over stdio, and returns decoded JSON.
//!
//! - [`ops::scan`] / [`ops::version`]: one-shot invocations.
//! - [`Session`]: a persistent `tr64c -i` child serving `list` and `query`.

pub mod command;
pub mod config;
pub mod errors;
pub mod ops;
pub mod process;
pub mod protocol;
pub mod session;

pub use config::{ClientConfig, SessionConfig};
pub use errors::{AppError, Result};
pub use session::{Session, SessionState};
