use std::io;
use std::sync::Arc;

use crate::transport::MAX_LINE;

#[derive(Debug, thiserror::Error)]
#[error("cannot connect to {addr}: {source}")]
pub struct ConnectError {
    pub addr: String,
    #[source]
    pub source: io::Error,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,
    #[error("line exceeds {} bytes", MAX_LINE)]
    LineTooLong,
    #[error(transparent)]
    Io(Arc<io::Error>),
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        TransportError::Io(Arc::new(err))
    }
}

/// Why a session ended. The first cause raised wins.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    #[error("server closed the connection")]
    Eof,
    #[error("read failed: {0}")]
    Read(#[source] TransportError),
    #[error("write failed: {0}")]
    Write(#[source] TransportError),
    #[error("session stopped")]
    Stopped,
    #[error("session task failed: {0}")]
    Task(String),
}
