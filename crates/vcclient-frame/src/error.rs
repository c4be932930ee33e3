/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload does not fit the 4-hex-digit length field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The endpoint id cannot be written into the 8-character id field.
    #[error("invalid endpoint id '{0}'")]
    InvalidEndpointId(String),

    /// The header does not have the `kind:endpointId:lengthHex:` shape.
    #[error("malformed frame header '{0}'")]
    MalformedHeader(String),

    /// The header length token is not a valid hex length.
    #[error("invalid frame length token '{0}'")]
    InvalidLength(String),

    /// The stream ended part-way through a header.
    #[error("stream ended inside frame header after {0} bytes")]
    IncompleteHeader(usize),

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

impl FrameError {
    /// True for errors caused by bytes that violate the framing contract,
    /// as opposed to socket-level failures.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            FrameError::MalformedHeader(_)
                | FrameError::InvalidLength(_)
                | FrameError::IncompleteHeader(_)
                | FrameError::PayloadTooLarge { .. }
                | FrameError::InvalidEndpointId(_)
        )
    }

    /// True when a blocking read gave up because of a socket read timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            FrameError::Io(err)
                if err.kind() == std::io::ErrorKind::WouldBlock
                    || err.kind() == std::io::ErrorKind::TimedOut
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
