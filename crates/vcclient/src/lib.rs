//! Client library for telephony-test servers.
//!
//! A client opens one authenticated command connection per server, sends
//! framed commands over it and decodes the replies, while a background
//! reader delivers the server's asynchronous events to registered sinks.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP streams and server addresses
//! - [`frame`]: hex length-prefixed command and reply framing
//! - [`decode`]: brace-grammar parser and per-command decode table
//! - [`session`]: handshake, connections, events and the connection directory
//!
//! ```no_run
//! use vcclient::frame::{frame_bytes, FrameKind};
//! use vcclient::{connect, ConnectionConfig, DirectoryGuard};
//!
//! # fn main() -> vcclient::Result<()> {
//! let _guard = DirectoryGuard::new();
//! let addr: vcclient::ServerAddr = "10.0.0.5:5000"
//!     .parse()
//!     .map_err(vcclient::ClientError::from)?;
//! let conn = connect(&addr, "5.2.0.0.0.0", &ConnectionConfig::with_credential("secret"))?;
//!
//! let body = frame_bytes(FrameKind::Command, Some("1"), b"getcalls@")
//!     .map_err(vcclient::ClientError::from)?;
//! let calls = conn.call("getcalls", &body, true)?;
//! println!("{calls:?}");
//! # Ok(())
//! # }
//! ```

/// Re-export transport types.
pub mod transport {
    pub use vcclient_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use vcclient_frame::*;
}

/// Re-export decode types.
pub mod decode {
    pub use vcclient_decode::*;
}

/// Re-export session types.
pub mod session {
    pub use vcclient_session::*;
}

pub use vcclient_decode::{DecodedValue, OutputFormat};
pub use vcclient_frame::Acknowledgement;
pub use vcclient_session::{
    close_all, connect, lookup, ClientError, ConnectionConfig, DirectoryGuard, ErrorClass, Event,
    Result, TransportConnection,
};
pub use vcclient_transport::ServerAddr;
