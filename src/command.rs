//! Argument vectors for the `tr64c` executable.
//!
//! | Flag          | Meaning                           |
//! |---------------|-----------------------------------|
//! | `-o <value>`  | target host or local interface    |
//! | `-t <ms>`     | network timeout in milliseconds   |
//! | `-u` / `-p`   | credentials                       |
//! | `-c <path>`   | action description cache file     |
//! | `-f JSON`     | response format                   |
//! | `--utf8`      | UTF-8 console mode                |
//! | `-s`          | discovery scan                    |
//! | `-i`          | interactive mode                  |
//! | `-v`          | raise verbosity                   |
//! | `--version`   | print version and exit            |

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::config::SessionConfig;

const FORMAT_JSON: [&str; 2] = ["-f", "JSON"];
const UTF8: &str = "--utf8";

/// Executable plus ordered arguments for one `tr64c` launch.
#[derive(Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandLine {
    /// Start a command line for `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Discovery scan on a local interface:
    /// `-o <interface> -t <ms> --utf8 -f JSON -s`.
    #[must_use]
    pub fn scan(program: impl Into<PathBuf>, interface: &str, timeout_ms: u64) -> Self {
        Self::new(program)
            .arg("-o")
            .arg(interface)
            .arg("-t")
            .arg(timeout_ms.to_string())
            .arg(UTF8)
            .arg(FORMAT_JSON[0])
            .arg(FORMAT_JSON[1])
            .arg("-s")
    }

    /// Version query: `--utf8 --version`.
    #[must_use]
    pub fn version(program: impl Into<PathBuf>) -> Self {
        Self::new(program).arg(UTF8).arg("--version")
    }

    /// Interactive session:
    /// `-o <host> -t <ms> [-u user] [-p pass] [-c cache] [-v…] -f JSON --utf8 -i`.
    #[must_use]
    pub fn interactive(config: &SessionConfig) -> Self {
        let mut cmd = Self::new(&config.executable)
            .arg("-o")
            .arg(&config.host)
            .arg("-t")
            .arg(config.timeout_ms.to_string());

        if let Some(user) = &config.user {
            cmd = cmd.arg("-u").arg(user);
        }
        if let Some(password) = &config.password {
            cmd = cmd.arg("-p").arg(password);
        }
        if let Some(cache) = &config.cache {
            cmd = cmd.arg("-c").arg(cache.to_string_lossy());
        }
        for _ in 0..config.verbose {
            cmd = cmd.arg("-v");
        }

        cmd.arg(FORMAT_JSON[0])
            .arg(FORMAT_JSON[1])
            .arg(UTF8)
            .arg("-i")
    }

    /// Executable path.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments in order.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub(crate) fn os_args(&self) -> impl Iterator<Item = &OsStr> {
        self.args.iter().map(OsStr::new)
    }

    /// Render for logs with the `-p` value masked.
    #[must_use]
    pub fn redacted(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        let mut mask_next = false;
        for arg in &self.args {
            if mask_next {
                parts.push("****".into());
                mask_next = false;
            } else {
                mask_next = arg == "-p";
                parts.push(arg.clone());
            }
        }
        parts.join(" ")
    }
}

impl std::fmt::Debug for CommandLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("CommandLine").field(&self.redacted()).finish()
    }
}
