//! One-shot operations: each launches a short-lived `tr64c`, drains one
//! response, and reaps the process.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info_span, warn, Instrument};

use crate::command::CommandLine;
use crate::process::ChildHandle;
use crate::protocol::decoder::decode_response;
use crate::protocol::reader::{read_response, EndOfStream};
use crate::protocol::version::{parse_version_line, VersionInfo};
use crate::{AppError, Result};

/// One device found by a discovery scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Device name as announced by the device.
    #[serde(rename = "Device")]
    pub device: String,
    /// Device description URL, usable as a session host.
    #[serde(rename = "URL")]
    pub url: String,
    /// Any further device-specific fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Run a discovery scan on the local interface `interface` and return the
/// decoded response.
///
/// # Errors
///
/// - `AppError::Spawn` if `tr64c` cannot be started.
/// - `AppError::Remote` if `tr64c` reports an error.
/// - `AppError::Protocol` if the output ends mid-response.
/// - `AppError::Decode` if the payload is not JSON.
pub async fn scan(executable: &Path, interface: &str, timeout_ms: u64) -> Result<Value> {
    let command = CommandLine::scan(executable, interface, timeout_ms);
    let span = info_span!("scan", interface, timeout_ms);
    run_once(&command).instrument(span).await
}

/// [`scan`] deserialized into device records.
///
/// An empty response yields an empty list.
///
/// # Errors
///
/// As [`scan`], plus `AppError::Decode` if an entry lacks `Device` or `URL`.
pub async fn scan_devices(
    executable: &Path,
    interface: &str,
    timeout_ms: u64,
) -> Result<Vec<DeviceRecord>> {
    let value = scan(executable, interface, timeout_ms).await?;
    match value {
        Value::Object(ref map) if map.is_empty() => Ok(Vec::new()),
        other => Vec::<DeviceRecord>::deserialize(&other).map_err(|e| AppError::Decode {
            message: format!("scan result: {e}"),
            raw: other.to_string(),
        }),
    }
}

/// Query the `tr64c` version.
///
/// Output that does not match the version pattern yields `Ok(None)` and a
/// warning, so newer version formats never break callers.
///
/// # Errors
///
/// Returns `AppError::Spawn` if `tr64c` cannot be started, or `AppError::Io`
/// on a pipe failure.
pub async fn version(executable: &Path) -> Result<Option<VersionInfo>> {
    let command = CommandLine::version(executable);
    let mut child = ChildHandle::spawn(&command)?;

    let line = child.read_line().await;
    child.terminate();
    reap(&mut child).await;

    let Some(line) = line? else {
        warn!("tr64c printed no version line");
        return Ok(None);
    };

    match parse_version_line(&line) {
        Ok(info) => {
            debug!(version = %info.version, backend = %info.backend, "tr64c version");
            Ok(Some(info))
        }
        Err(err) => {
            warn!(%err, "ignoring unrecognised tr64c version output");
            Ok(None)
        }
    }
}

async fn run_once(command: &CommandLine) -> Result<Value> {
    let mut child = ChildHandle::spawn(command)?;
    let payload = read_response(child.output(), EndOfStream::ExitAfterResponse).await;
    if payload.is_err() {
        child.terminate();
    }
    reap(&mut child).await;
    decode_response(&payload?)
}

/// Wait for a one-shot child, force-killing it if the wait fails.
async fn reap(child: &mut ChildHandle) {
    match child.wait().await {
        Ok(status) => debug!(?status, "tr64c exited"),
        Err(err) => {
            warn!(%err, "failed to reap tr64c, killing");
            if let Err(err) = child.kill().await {
                warn!(%err, "failed to kill tr64c");
            }
        }
    }
}
