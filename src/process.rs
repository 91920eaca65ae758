//! `tr64c` child process handle.
//!
//! Spawns the executable with:
//! - `stdin` piped for commands.
//! - `stdout` and `stderr` sharing one OS pipe. `tr64c` prints JSON to
//!   `stdout` and `Error:`/`Warning:` lines to `stderr`; a single pipe keeps
//!   the order in which the child wrote them, so an error line can never
//!   overtake the terminator of the response before it.
//! - `kill_on_drop(true)` so a dropped handle never leaks a process.
//!
//! On platforms without Unix pipes the two streams are framed separately
//! and interleaved as lines arrive; ordering across them is then best effort.

use std::pin::Pin;
use std::process::{ExitStatus, Stdio};

use futures_util::{Stream, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tokio_util::codec::FramedRead;
use tracing::{debug, info, warn};

use crate::command::CommandLine;
use crate::protocol::codec::LineCodec;
use crate::{AppError, Result};

// ── Output stream ────────────────────────────────────────────────────────────

/// Merged, line-framed `stdout` + `stderr` of a child.
///
/// Each item is one line with the trailing `\n` (and `\r`) removed. The
/// stream ends once every write end of the output pipe is closed, which in
/// practice means the child exited.
///
/// # Errors
///
/// Items are `AppError::Io` on a pipe failure, or `AppError::Protocol` for a
/// line longer than [`MAX_LINE_BYTES`](crate::protocol::codec::MAX_LINE_BYTES).
pub type OutputLines = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

// ── Child handle ─────────────────────────────────────────────────────────────

/// Exclusive owner of a running `tr64c` process and its pipes.
///
/// The handle is the only path to the child:
/// - commands go in through [`write_line`](Self::write_line);
/// - output comes back through [`output`](Self::output) or
///   [`read_line`](Self::read_line);
/// - [`terminate`](Self::terminate), [`wait`](Self::wait) and
///   [`kill`](Self::kill) end it.
///
/// Dropping the handle kills the process.
///
/// # Examples
///
/// ```rust,ignore
/// use tr64c_session::command::CommandLine;
/// use tr64c_session::process::ChildHandle;
///
/// let mut child = ChildHandle::spawn(&CommandLine::version("tr64c"))?;
/// let line = child.read_line().await?;
/// child.wait().await?;
/// ```
pub struct ChildHandle {
    child: Child,
    stdin: Option<ChildStdin>,
    output: OutputLines,
    terminated: bool,
}

impl ChildHandle {
    /// Launch `command`.
    ///
    /// Must be called from within a tokio runtime; the output pipe is
    /// registered with its reactor.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Spawn` if the executable is missing, not runnable,
    /// or its pipes cannot be created or captured.
    pub fn spawn(command: &CommandLine) -> Result<Self> {
        let (mut child, output) = {
            let mut cmd = Command::new(command.program());
            cmd.args(command.os_args())
                .stdin(Stdio::piped())
                .kill_on_drop(true);
            let output = attach_output(&mut cmd)?;

            let mut child = cmd.spawn().map_err(|err| {
                AppError::Spawn(format!(
                    "failed to spawn {}: {err}",
                    command.program().display()
                ))
            })?;
            let output = output.finish(&mut child)?;
            // `cmd` drops here, releasing the parent's copies of the write end.
            (child, output)
        };

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| AppError::Spawn("failed to capture tr64c stdin".into()))?;

        info!(
            pid = child.id().unwrap_or(0),
            command = %command.redacted(),
            "tr64c process spawned"
        );

        Ok(Self {
            child,
            stdin: Some(stdin),
            output,
            terminated: false,
        })
    }

    /// OS process id, `None` once the child has been reaped.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Merged output stream, for use with
    /// [`read_response`](crate::protocol::reader::read_response).
    pub fn output(&mut self) -> &mut OutputLines {
        &mut self.output
    }

    /// Next output line, `None` once the output pipe is closed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` on a pipe failure, or `AppError::Protocol` for
    /// an over-long line.
    pub async fn read_line(&mut self) -> Result<Option<String>> {
        self.output.next().await.transpose()
    }

    /// Write `line` followed by `\n` to the child's `stdin` and flush.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if `stdin` was closed or the write fails
    /// (e.g. the child has exited).
    pub async fn write_line(&mut self, line: &str) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| AppError::Io("tr64c stdin already closed".into()))?;

        let mut bytes = Vec::with_capacity(line.len() + 1);
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\n');

        stdin.write_all(&bytes).await.map_err(|e| {
            warn!(error = %e, "write to tr64c stdin failed");
            AppError::Io(format!("write failed: {e}"))
        })?;
        stdin
            .flush()
            .await
            .map_err(|e| AppError::Io(format!("flush failed: {e}")))
    }

    /// Close the child's `stdin`; `tr64c` leaves interactive mode on EOF.
    pub fn close_stdin(&mut self) {
        self.stdin.take();
    }

    /// Ask the child to stop: close its `stdin` and send `SIGTERM` (force
    /// kill where signals are unavailable).
    ///
    /// Safe to call repeatedly and after the child has exited.
    pub fn terminate(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;
        self.close_stdin();

        match self.child.try_wait() {
            Ok(Some(status)) => {
                debug!(?status, "tr64c already exited");
                return;
            }
            Ok(None) => {}
            Err(err) => warn!(%err, "failed to poll tr64c status"),
        }

        if let Some(pid) = self.child.id() {
            if send_sigterm(pid) {
                debug!(pid, "sent SIGTERM to tr64c");
                return;
            }
        }

        if let Err(err) = self.child.start_kill() {
            debug!(%err, "tr64c kill skipped");
        }
    }

    /// Close `stdin` and reap the child.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if waiting on the process fails.
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        self.close_stdin();
        self.child
            .wait()
            .await
            .map_err(|e| AppError::Io(format!("failed to reap tr64c: {e}")))
    }

    /// Force-kill and reap the child.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the kill or the wait fails.
    pub async fn kill(&mut self) -> Result<()> {
        self.terminated = true;
        self.close_stdin();
        self.child
            .kill()
            .await
            .map_err(|e| AppError::Io(format!("failed to kill tr64c: {e}")))
    }
}

impl std::fmt::Debug for ChildHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChildHandle")
            .field("pid", &self.child.id())
            .field("stdin_open", &self.stdin.is_some())
            .field("terminated", &self.terminated)
            .finish_non_exhaustive()
    }
}

// ── Output wiring ────────────────────────────────────────────────────────────

/// Output side of a command being spawned.
///
/// On Unix the reader already exists before the spawn; elsewhere the child's
/// own pipes are picked up afterwards.
enum PendingOutput {
    #[cfg(unix)]
    Shared(OutputLines),
    #[cfg(not(unix))]
    Separate,
}

impl PendingOutput {
    #[cfg_attr(unix, allow(clippy::unnecessary_wraps))]
    fn finish(self, child: &mut Child) -> Result<OutputLines> {
        match self {
            #[cfg(unix)]
            Self::Shared(lines) => {
                let _ = child;
                Ok(lines)
            }
            #[cfg(not(unix))]
            Self::Separate => {
                let stdout = child
                    .stdout
                    .take()
                    .ok_or_else(|| AppError::Spawn("failed to capture tr64c stdout".into()))?;
                let stderr = child
                    .stderr
                    .take()
                    .ok_or_else(|| AppError::Spawn("failed to capture tr64c stderr".into()))?;
                Ok(futures_util::stream::select(
                    FramedRead::new(stdout, LineCodec::new()),
                    FramedRead::new(stderr, LineCodec::new()),
                )
                .boxed())
            }
        }
    }
}

/// Point the child's `stdout` and `stderr` at one shared pipe and frame its
/// read end.
#[cfg(unix)]
fn attach_output(cmd: &mut Command) -> Result<PendingOutput> {
    use tokio::net::unix::pipe::Receiver;

    let (read_end, write_end) = cloexec_pipe()
        .map_err(|err| AppError::Spawn(format!("failed to create output pipe: {err}")))?;
    let stderr_end = write_end
        .try_clone()
        .map_err(|err| AppError::Spawn(format!("failed to duplicate output pipe: {err}")))?;
    let receiver = Receiver::from_owned_fd(read_end)
        .map_err(|err| AppError::Spawn(format!("failed to register output pipe: {err}")))?;

    cmd.stdout(Stdio::from(write_end))
        .stderr(Stdio::from(stderr_end));

    Ok(PendingOutput::Shared(
        FramedRead::new(receiver, LineCodec::new()).boxed(),
    ))
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
fn attach_output(cmd: &mut Command) -> Result<PendingOutput> {
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    Ok(PendingOutput::Separate)
}

/// Anonymous pipe whose ends are not inherited by unrelated children.
#[cfg(any(target_os = "linux", target_os = "android"))]
fn cloexec_pipe() -> nix::Result<(std::os::fd::OwnedFd, std::os::fd::OwnedFd)> {
    nix::unistd::pipe2(nix::fcntl::OFlag::O_CLOEXEC)
}

#[cfg(all(unix, not(any(target_os = "linux", target_os = "android"))))]
fn cloexec_pipe() -> nix::Result<(std::os::fd::OwnedFd, std::os::fd::OwnedFd)> {
    use std::os::fd::AsRawFd;

    use nix::fcntl::{fcntl, FcntlArg, FdFlag};

    let (read_end, write_end) = nix::unistd::pipe()?;
    for fd in [&read_end, &write_end] {
        fcntl(fd.as_raw_fd(), FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))?;
    }
    Ok((read_end, write_end))
}

// ── Signals ──────────────────────────────────────────────────────────────────

#[cfg(unix)]
fn send_sigterm(pid: u32) -> bool {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    match kill(Pid::from_raw(raw), Signal::SIGTERM) {
        Ok(()) => true,
        Err(err) => {
            debug!(pid, %err, "SIGTERM delivery failed");
            false
        }
    }
}

#[cfg(not(unix))]
fn send_sigterm(_pid: u32) -> bool {
    false
}
