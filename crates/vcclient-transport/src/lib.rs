//! TCP transport to a telephony-test server.
//!
//! This is the lowest layer of vcclient. It knows nothing about framing; it
//! hands out connected [`ServerStream`]s keyed by a [`ServerAddr`] and a
//! [`ShutdownHandle`] that can unblock a reader parked on another thread.

pub mod addr;
pub mod error;
pub mod stream;

pub use addr::ServerAddr;
pub use error::{Result, TransportError};
pub use stream::{ServerStream, ShutdownHandle};
