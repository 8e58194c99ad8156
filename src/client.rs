//! Control client: sends one command to the running daemon and reads its
//! answer, or reads the status property.

use std::time::Duration;

use thiserror::Error;
use tracing::debug;
use x_session::{SessionError, XSession};

use crate::lock::{Command, Reply};
use crate::protocol::{decode_reply, encode_command, mode_atoms};
use crate::status::{decode, Status, StatusMode};

/// How long to wait for the daemon's answer.
pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("xlockd did not answer within {0:?}")]
    NoResponse(Duration),

    #[error("the status property is unset or malformed")]
    NoStatus,
}

pub struct Client {
    session: XSession,
}

impl Client {
    pub fn connect(display: Option<&str>) -> Result<Self, ClientError> {
        Ok(Self {
            session: XSession::connect(display)?,
        })
    }

    /// Deliver `command` and wait for the reply.
    pub fn send(&self, command: Command, timeout: Duration) -> Result<Reply, ClientError> {
        let daemon = self
            .session
            .find_daemon()?
            .ok_or_else(|| SessionError::NoDaemon(self.session.display_name().to_string()))?;
        debug!(window = daemon.window, version = %daemon.version, id = %daemon.id, "Found daemon");

        let (kind, arg) = encode_command(self.session.atoms(), command);
        self.session.send_command(daemon.window, kind, arg)?;
        let text = self
            .session
            .await_response(daemon.window, timeout)?
            .ok_or(ClientError::NoResponse(timeout))?;
        Ok(decode_reply(&text))
    }

    pub fn status(&self) -> Result<Status, ClientError> {
        let values = self.session.read_status()?;
        decode(&mode_atoms(self.session.atoms()), &values).ok_or(ClientError::NoStatus)
    }
}

/// One line for `--time`.
pub fn describe_status(status: &Status, now_unix: u32) -> String {
    let what = match status.mode {
        StatusMode::Unblanked => "non-blanked",
        StatusMode::Blanked => "blanked",
        StatusMode::Locked => "locked",
    };
    let ago = now_unix.saturating_sub(status.since);
    format!("screen {} since {} ({}s ago)", what, status.since, ago)
}
