//! Process-wide directory of live connections, keyed by server address.
//!
//! The directory has its own lock, separate from every connection's command
//! lock, and never holds it across network I/O: creating a connection to
//! one server does not block commands on another. Connections are never
//! dropped while the lock is held, since dropping one may join its event
//! reader.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use tracing::{debug, info};
use vcclient_transport::ServerAddr;

use crate::config::ConnectionConfig;
use crate::connection::TransportConnection;
use crate::error::Result;

type Directory = HashMap<ServerAddr, Arc<TransportConnection>>;

static DIRECTORY: OnceLock<Mutex<Directory>> = OnceLock::new();

fn directory() -> MutexGuard<'static, Directory> {
    DIRECTORY
        .get_or_init(Mutex::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Connection to `addr`, creating it if none is listed.
///
/// A new connection is listed before its event reader starts, so the first
/// event can always be routed. When two callers race to create the same
/// connection, the loser's connection is closed and both get the winner.
pub fn connect(
    addr: &ServerAddr,
    client_version: &str,
    config: &ConnectionConfig,
) -> Result<Arc<TransportConnection>> {
    if let Some(existing) = lookup(addr) {
        debug!(server = %addr, "reusing connection");
        return Ok(existing);
    }

    let (connection, event_stream) =
        TransportConnection::open(addr, client_version, config.clone())?;
    let connection = Arc::new(connection);

    let existing = {
        let mut dir = directory();
        match dir.get(addr) {
            Some(existing) => Some(Arc::clone(existing)),
            None => {
                dir.insert(addr.clone(), Arc::clone(&connection));
                None
            }
        }
    };
    if let Some(existing) = existing {
        debug!(server = %addr, "lost connection race; closing duplicate");
        let _ = connection.close();
        return Ok(existing);
    }

    if let Err(err) = connection.start_events(event_stream) {
        let _ = connection.close();
        return Err(err);
    }
    Ok(connection)
}

/// Listed connection for `addr`, if any.
pub fn lookup(addr: &ServerAddr) -> Option<Arc<TransportConnection>> {
    directory().get(addr).cloned()
}

pub fn contains(addr: &ServerAddr) -> bool {
    directory().contains_key(addr)
}

/// Addresses of all listed connections, sorted.
pub fn addresses() -> Vec<ServerAddr> {
    let mut out: Vec<_> = directory().keys().cloned().collect();
    out.sort();
    out
}

/// Listed connection for `addr` if it is still instance `id`.
pub(crate) fn lookup_instance(addr: &ServerAddr, id: u64) -> Option<Arc<TransportConnection>> {
    directory()
        .get(addr)
        .filter(|connection| connection.id() == id)
        .cloned()
}

/// Unlist instance `id`; the caller drops the returned handle.
pub(crate) fn remove_instance(addr: &ServerAddr, id: u64) -> Option<Arc<TransportConnection>> {
    let mut dir = directory();
    if dir.get(addr).is_some_and(|connection| connection.id() == id) {
        dir.remove(addr)
    } else {
        None
    }
}

/// Close every listed connection. Returns how many were closed.
pub fn close_all() -> usize {
    let connections: Vec<_> = directory().drain().map(|(_, connection)| connection).collect();
    let count = connections.len();
    for connection in connections {
        if let Err(err) = connection.close() {
            debug!(server = %connection.addr(), error = %err, "close failed");
        }
    }
    if count > 0 {
        info!(count, "closed all connections");
    }
    count
}

/// Closes every listed connection when dropped.
///
/// Hold one in `main` to tear down connections at process exit.
#[derive(Debug, Default)]
#[must_use = "connections are closed when the guard is dropped"]
pub struct DirectoryGuard {
    _private: (),
}

impl DirectoryGuard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Drop for DirectoryGuard {
    fn drop(&mut self) {
        close_all();
    }
}
