use crate::addr::ServerAddr;

/// Errors that can occur in server transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to connect to the specified address.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: ServerAddr,
        source: std::io::Error,
    },

    /// The address could not be resolved to a socket address.
    #[error("cannot resolve server address {0}")]
    Resolve(String),

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The transport has been shut down.
    #[error("transport shut down")]
    Shutdown,
}

pub type Result<T> = std::result::Result<T, TransportError>;
