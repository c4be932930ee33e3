//! Sessions with a telephony-test server.
//!
//! [`directory::connect`] performs the versioned handshake, opens the event
//! channel and negotiates the reply format, keeping one
//! [`TransportConnection`] per server address for the whole process.
//! Commands go through [`TransportConnection::execute`] (or
//! [`TransportConnection::call`] to also decode the reply); events reach the
//! sinks registered with [`TransportConnection::register_event_sink`].

pub mod config;
pub mod connection;
pub mod directory;
pub mod error;
pub mod event;
pub mod handshake;

pub use config::ConnectionConfig;
pub use connection::TransportConnection;
pub use directory::{addresses, close_all, connect, contains, lookup, DirectoryGuard};
pub use error::{ClientError, ErrorClass, Result};
pub use event::{classify, Event, EventChannel, EventSink, EventSinks, WILDCARD_ENDPOINT};
pub use handshake::{
    handshake_client, negotiate_output_format, parse_version, supports_json, HandshakeResult,
    VERSION_COMPONENTS,
};
