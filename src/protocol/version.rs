//! Parsing of the `tr64c --version` line.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{AppError, Result};

/// `MAJOR.MINOR.PATCH [TOKEN] YYYY-MM-DD REST`.
///
/// Release builds print `1.1.0 2018-08-17 POSIX`; the optional token covers
/// builds that insert an identifier before the date.
#[allow(clippy::expect_used)]
static VERSION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<version>(?P<major>[0-9]+)\.(?P<minor>[0-9]+)\.(?P<patch>[0-9]+))(?: (?P<token>[^ ]+))? (?P<date>[0-9]{4}-[0-9]{2}-[0-9]{2}) (?P<backend>.+)$",
    )
    .expect("version regex is valid")
});

/// Version record reported by `tr64c --version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VersionInfo {
    /// Full `MAJOR.MINOR.PATCH` string.
    pub version: String,
    /// Major version.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
    /// Patch version.
    pub patch: u32,
    /// Release date.
    pub date: NaiveDate,
    /// Backend description, e.g. `POSIX` or `WinSocks`.
    pub backend: String,
}

/// Parse a version line.
///
/// # Errors
///
/// Returns [`AppError::Parse`] when the line does not match the version
/// pattern or a component is out of range.
pub fn parse_version_line(line: &str) -> Result<VersionInfo> {
    let line = line.trim();
    let caps = VERSION_REGEX
        .captures(line)
        .ok_or_else(|| AppError::Parse(format!("unrecognised version line: {line:?}")))?;

    let number = |name: &str| -> Result<u32> {
        caps[name]
            .parse()
            .map_err(|e| AppError::Parse(format!("version {name} component: {e}")))
    };

    let date = NaiveDate::parse_from_str(&caps["date"], "%Y-%m-%d")
        .map_err(|e| AppError::Parse(format!("version date {:?}: {e}", &caps["date"])))?;

    Ok(VersionInfo {
        version: caps["version"].to_owned(),
        major: number("major")?,
        minor: number("minor")?,
        patch: number("patch")?,
        date,
        backend: caps["backend"].to_owned(),
    })
}
