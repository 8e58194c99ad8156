use thiserror::Error;
use x11rb::errors::{ConnectError, ConnectionError, ReplyError, ReplyOrIdError};

/// Errors raised while talking to the X server.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot open display '{display}': {source}")]
    Connect {
        display: String,
        #[source]
        source: ConnectError,
    },

    #[error("X connection failed: {0}")]
    Connection(#[from] ConnectionError),

    #[error("X request failed: {0}")]
    Reply(#[from] ReplyError),

    #[error("X resource allocation failed: {0}")]
    Id(#[from] ReplyOrIdError),

    #[error("the X server does not support {0}")]
    MissingExtension(&'static str),

    #[error("no daemon is running on display '{0}'")]
    NoDaemon(String),
}

impl SessionError {
    /// True when the connection itself is gone. Protocol errors on a live
    /// connection are recoverable and must not end the process.
    pub fn is_connection_lost(&self) -> bool {
        match self {
            SessionError::Connect { .. } | SessionError::Connection(_) => true,
            SessionError::Reply(ReplyError::ConnectionError(_)) => true,
            SessionError::Id(ReplyOrIdError::ConnectionError(_)) => true,
            _ => false,
        }
    }
}
