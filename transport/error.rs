// Transport errors: OS-level pipe failures and per-client connection failures
use ledsrv_core::ClientId;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TransportError>;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to {op} {path:?}: {source}")]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0:?} exists and is not a named pipe")]
    NotAPipe(PathBuf),

    #[error("{0:?} is already closed")]
    Closed(PathBuf),

    #[error("peer closed the pipe before sending anything")]
    PeerClosed,

    #[error("cannot connect to client {client}: {source}")]
    Connection {
        client: ClientId,
        #[source]
        source: Box<TransportError>,
    },
}

impl TransportError {
    pub(crate) fn io(op: &'static str, path: &Path, source: io::Error) -> Self {
        TransportError::Io {
            op,
            path: path.to_path_buf(),
            source,
        }
    }

    /// True when a blocking call was cut short by a signal
    pub fn is_interrupted(&self) -> bool {
        match self {
            TransportError::Io { source, .. } => source.kind() == io::ErrorKind::Interrupted,
            TransportError::Connection { source, .. } => source.is_interrupted(),
            _ => false,
        }
    }
}
