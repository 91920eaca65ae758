//! Interactive `tr64c` session.
//!
//! A [`Session`] owns one `tr64c -i` child for its whole lifetime and runs
//! strictly sequential request/response exchanges over its pipes:
//!
//! ```text
//! open ──► Ready ──list/query──► Busy ──response / Error: line──► Ready
//!            │                    │
//!            │                    └─ pipe failure, EOF, timeout, cancel ─┐
//!            └──── terminate / close / drop ─────────────────────────────┴─► Terminated
//! ```
//!
//! `list` and `query` take `&mut self`, so a single session can never have two
//! exchanges in flight. Independent sessions own independent children and can
//! be driven from separate tasks.

use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::command::CommandLine;
use crate::config::SessionConfig;
use crate::process::ChildHandle;
use crate::protocol::decoder::{decode_response, unwrap_single_entry};
use crate::protocol::quote::quote;
use crate::protocol::reader::{read_response, EndOfStream};
use crate::{AppError, Result};

/// Lifecycle state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Idle; the next command may be sent.
    Ready,
    /// A command was sent and its response has not been fully read.
    Busy,
    /// The child was stopped or lost; every operation fails.
    Terminated,
}

/// Long-lived interactive connection to one device through `tr64c`.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    host: String,
    child: ChildHandle,
    state: SessionState,
    read_timeout: Option<Duration>,
    close_grace: Duration,
    cancel: CancellationToken,
}

impl Session {
    /// Start `tr64c` in interactive mode for `config.host`.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Spawn` if the executable cannot be started.
    pub fn open(config: &SessionConfig) -> Result<Self> {
        let id = Uuid::new_v4();
        let command = CommandLine::interactive(config);
        let child = ChildHandle::spawn(&command)?;

        info!(
            session_id = %id,
            host = %config.host,
            pid = child.pid().unwrap_or(0),
            "tr64c session opened"
        );

        Ok(Self {
            id,
            host: config.host.clone(),
            child,
            state: SessionState::Ready,
            read_timeout: config.read_timeout,
            close_grace: config.close_grace,
            cancel: CancellationToken::new(),
        })
    }

    /// Abort in-flight exchanges when `token` is cancelled.
    ///
    /// A cancelled exchange terminates the session, because the rest of the
    /// response is still in the pipe.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Session identifier used in log events.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Device host this session talks to.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// List the services and actions the device offers.
    ///
    /// # Errors
    ///
    /// - `AppError::SessionClosed` after termination.
    /// - `AppError::Remote` if `tr64c` reports an error (session stays usable).
    /// - `AppError::Decode` if the payload is not JSON (session stays usable).
    /// - `AppError::Io`, `AppError::Timeout`, `AppError::Cancelled` or
    ///   `AppError::Protocol` when the exchange is lost; the session is
    ///   terminated.
    pub async fn list(&mut self) -> Result<Value> {
        self.exchange("list", "list").await
    }

    /// Invoke `action` (`[device/]service/action`) with `args`, each usually
    /// of the form `Variable=value`, and return the result of the single
    /// device entry in the response.
    ///
    /// ```rust,ignore
    /// let hosts = session.query("Hosts/GetHostNumberOfEntries", &[] as &[&str]).await?;
    /// let count = hosts["HostNumberOfEntries"].as_u64();
    /// ```
    ///
    /// # Errors
    ///
    /// As [`list`](Self::list), plus `AppError::InvalidRequest` for an empty
    /// action name or one containing whitespace, and `AppError::Protocol` if
    /// the response mapping does not hold exactly one entry.
    pub async fn query<S: AsRef<str>>(&mut self, action: &str, args: &[S]) -> Result<Value> {
        self.ensure_open()?;
        validate_action(action)?;

        let mut line = format!("query {action}");
        for arg in args {
            line.push(' ');
            line.push_str(&quote(arg.as_ref()));
        }

        let value = self.exchange(action, &line).await?;
        unwrap_single_entry(value)
    }

    /// Stop the child. Idempotent; also invoked on drop.
    pub fn terminate(&mut self) {
        if self.state == SessionState::Terminated {
            return;
        }
        self.state = SessionState::Terminated;
        self.child.terminate();
        info!(session_id = %self.id, "tr64c session terminated");
    }

    /// Leave interactive mode with `exit`, wait for the child to finish, and
    /// force-kill it after the grace period.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the force-kill fails.
    pub async fn close(&mut self) -> Result<()> {
        if self.state == SessionState::Terminated {
            return Ok(());
        }
        self.state = SessionState::Terminated;

        if let Err(err) = self.child.write_line("exit").await {
            debug!(session_id = %self.id, %err, "exit command not delivered");
        }

        match tokio::time::timeout(self.close_grace, self.child.wait()).await {
            Ok(Ok(status)) => {
                info!(session_id = %self.id, ?status, "tr64c session closed");
            }
            Ok(Err(err)) => {
                warn!(session_id = %self.id, %err, "error waiting for tr64c");
            }
            Err(_) => {
                warn!(
                    session_id = %self.id,
                    "tr64c did not exit within grace period, forcing kill"
                );
                self.child.kill().await?;
            }
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state == SessionState::Terminated {
            Err(AppError::SessionClosed)
        } else {
            Ok(())
        }
    }

    async fn exchange(&mut self, label: &str, line: &str) -> Result<Value> {
        match self.state {
            SessionState::Terminated => return Err(AppError::SessionClosed),
            SessionState::Busy => {
                // A previous exchange was dropped mid-response.
                warn!(session_id = %self.id, "session interrupted mid-exchange, terminating");
                self.terminate();
                return Err(AppError::Protocol(
                    "previous exchange was interrupted; response framing lost".into(),
                ));
            }
            SessionState::Ready => {}
        }

        self.state = SessionState::Busy;
        let span = info_span!("exchange", session_id = %self.id, command = label);
        let result = self.transact(line).instrument(span).await;

        match &result {
            Ok(_) | Err(AppError::Remote(_) | AppError::Decode { .. }) => {
                self.state = SessionState::Ready;
            }
            Err(err) => {
                warn!(session_id = %self.id, %err, "exchange failed, terminating session");
                self.terminate();
            }
        }
        result
    }

    async fn transact(&mut self, line: &str) -> Result<Value> {
        let cancel = self.cancel.clone();
        let read_timeout = self.read_timeout;
        let child = &mut self.child;

        let bounded = async {
            child.write_line(line).await?;
            let reading = read_response(child.output(), EndOfStream::Unexpected);
            match read_timeout {
                Some(limit) => tokio::time::timeout(limit, reading)
                    .await
                    .map_err(|_| AppError::Timeout(format!("no response within {limit:?}")))?,
                None => reading.await,
            }
        };

        let payload = tokio::select! {
            biased;

            () = cancel.cancelled() => return Err(AppError::Cancelled),
            payload = bounded => payload?,
        };

        decode_response(&payload)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.terminate();
    }
}

fn validate_action(action: &str) -> Result<()> {
    if action.is_empty() {
        return Err(AppError::InvalidRequest("action name must not be empty".into()));
    }
    if action.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(AppError::InvalidRequest(format!(
            "action name must not contain whitespace: {action:?}"
        )));
    }
    Ok(())
}
