use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::thread;

use tracing::{debug, info, warn};
use vcclient_decode::{decode, DecodedValue, OutputFormat};
use vcclient_frame::{read_frame, read_line, Acknowledgement, FrameWriter, MAX_PAYLOAD};
use vcclient_transport::{ServerAddr, ServerStream, ShutdownHandle};

use crate::config::ConnectionConfig;
use crate::directory;
use crate::error::{ClientError, Result};
use crate::event::{Event, EventChannel, EventSink, EventSinks};
use crate::handshake::{handshake_client, negotiate_output_format, supports_json};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Command socket halves, guarded together by the command lock.
struct CommandChannel {
    reader: ServerStream,
    writer: FrameWriter<ServerStream>,
}

/// One authenticated command channel to a server plus its event channel.
///
/// Commands are single-flight: the protocol has no request ids, so callers
/// queue on an internal lock and each holds it for a full round trip. The
/// command socket has no read timeout; a server that never replies blocks
/// the caller until [`TransportConnection::close`] is called from elsewhere.
///
/// Obtained from [`crate::directory::connect`], which keeps one connection
/// per server address.
pub struct TransportConnection {
    id: u64,
    addr: ServerAddr,
    version: String,
    event_port: u16,
    output_format: OutputFormat,
    config: ConnectionConfig,
    command: Mutex<CommandChannel>,
    command_shutdown: ShutdownHandle,
    events: OnceLock<EventChannel>,
    sinks: EventSinks,
    stopped: AtomicBool,
}

impl TransportConnection {
    /// Connect, handshake, open the event socket and negotiate the format.
    ///
    /// Returns the connection and the event socket; the event reader is
    /// started separately once the connection is reachable through the
    /// directory.
    pub(crate) fn open(
        addr: &ServerAddr,
        client_version: &str,
        config: ConnectionConfig,
    ) -> Result<(Self, ServerStream)> {
        if config.credential.is_empty() {
            return Err(ClientError::MissingCredential);
        }

        info!(server = %addr, version = client_version, "connecting");
        let stream = ServerStream::connect(addr, config.connect_timeout)?;
        let mut reader = stream.try_clone()?;
        let mut writer = FrameWriter::new(stream);

        let handshake =
            handshake_client(&mut reader, &mut writer, client_version, &config.credential)?;

        let event_addr = addr.with_port(handshake.event_port);
        let event_stream = ServerStream::connect(&event_addr, config.connect_timeout)?;
        event_stream.set_read_timeout(Some(config.event_read_timeout))?;

        let output_format = if config.negotiate_json
            && supports_json(&handshake.version, &config.json_min_version)
        {
            negotiate_output_format(&mut reader, &mut writer)?
        } else {
            OutputFormat::Legacy
        };

        let command_shutdown = reader.shutdown_handle()?;
        let id = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
        info!(
            server = %addr,
            id,
            version = %handshake.version,
            event_port = handshake.event_port,
            format = %output_format,
            "connected"
        );

        let connection = Self {
            id,
            addr: addr.clone(),
            version: handshake.version,
            event_port: handshake.event_port,
            output_format,
            config,
            command: Mutex::new(CommandChannel { reader, writer }),
            command_shutdown,
            events: OnceLock::new(),
            sinks: EventSinks::default(),
            stopped: AtomicBool::new(false),
        };
        Ok((connection, event_stream))
    }

    /// Start the event reader on `stream`.
    ///
    /// Events are routed back to this connection through the directory by
    /// address and instance id; an event arriving for a connection that is
    /// no longer listed is dropped.
    pub(crate) fn start_events(&self, stream: ServerStream) -> Result<()> {
        if self.is_closed() {
            return Err(ClientError::Closed);
        }

        let (addr, id) = (self.addr.clone(), self.id);
        let on_event = {
            let addr = addr.clone();
            move |event: Event| match directory::lookup_instance(&addr, id) {
                Some(connection) => {
                    connection.dispatch(event);
                }
                None => debug!(server = %addr, "event dropped: connection not listed"),
            }
        };
        let on_closed = move || {
            if let Some(connection) = directory::lookup_instance(&addr, id) {
                if let Err(err) = connection.close() {
                    warn!(server = %addr, error = %err, "close after event channel loss failed");
                }
            }
        };

        let channel = EventChannel::start(stream, self.addr.clone(), on_event, on_closed)?;
        if self.events.set(channel).is_err() {
            return Err(ClientError::Handshake(
                "event channel already started".to_string(),
            ));
        }
        // A close that raced the start saw no channel to stop.
        if self.is_closed() {
            if let Some(events) = self.events.get() {
                events.stop();
            }
        }
        Ok(())
    }

    /// Send one pre-encoded command and return the server's acknowledgement.
    ///
    /// `body` already carries its framing and `@` terminator. Endpoint
    /// addressed commands are read back as one reply frame on the command
    /// socket and never retried. Generic commands go over a fresh socket and
    /// are retried per [`ConnectionConfig::generic_attempts`]. A rejected
    /// command is an `Ok` acknowledgement that is not accepted.
    ///
    /// A read or write failure on the command socket, including a malformed
    /// reply header, closes the connection before the error is returned;
    /// later calls fail with [`ClientError::Closed`].
    pub fn execute(&self, command: &str, body: &[u8], addressed: bool) -> Result<Acknowledgement> {
        if self.is_closed() {
            return Err(ClientError::Closed);
        }

        let mut channel = self.command.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_closed() {
            return Err(ClientError::Closed);
        }

        if !addressed {
            return self.execute_generic(command, body);
        }

        debug!(server = %self.addr, command, len = body.len(), "executing command");
        let result = channel
            .writer
            .write_raw(body)
            .and_then(|()| read_frame(&mut channel.reader));
        match result {
            Ok(frame) => {
                let ack = Acknowledgement::from_frame(&frame);
                debug!(
                    server = %self.addr,
                    command,
                    ack = %ack.ack,
                    endpoint = %ack.endpoint_id,
                    len = ack.message.len(),
                    "command acknowledged"
                );
                Ok(ack)
            }
            Err(_) if self.is_closed() => Err(ClientError::Closed),
            Err(err) => {
                // The reply stream position is unknown; nothing after this can be trusted.
                warn!(server = %self.addr, command, error = %err, "command channel failed");
                if let Err(close_err) = self.close() {
                    warn!(server = %self.addr, error = %close_err, "close after command failure");
                }
                Err(err.into())
            }
        }
    }

    /// [`execute`](Self::execute) followed by decoding in the negotiated
    /// output format.
    pub fn call(&self, command: &str, body: &[u8], addressed: bool) -> Result<DecodedValue> {
        let ack = self.execute(command, body, addressed)?;
        Ok(decode(command, ack, self.output_format)?)
    }

    /// Caller holds the command lock.
    fn execute_generic(&self, command: &str, body: &[u8]) -> Result<Acknowledgement> {
        let attempts = self.config.generic_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.generic_once(body) {
                Ok(reply) => {
                    debug!(server = %self.addr, command, attempt, "generic command answered");
                    return Ok(Acknowledgement::generic(reply));
                }
                Err(err) if attempt < attempts => {
                    warn!(
                        server = %self.addr,
                        command,
                        attempt,
                        error = %err,
                        "generic command failed, retrying"
                    );
                    thread::sleep(self.config.generic_backoff * attempt);
                    attempt += 1;
                }
                Err(err) => {
                    return Err(ClientError::RetriesExhausted {
                        attempts,
                        source: Box::new(err),
                    });
                }
            }
        }
    }

    fn generic_once(&self, body: &[u8]) -> Result<String> {
        let mut stream = ServerStream::connect(&self.addr, self.config.connect_timeout)?;
        FrameWriter::new(stream.try_clone()?).write_raw(body)?;
        Ok(read_line(&mut stream, MAX_PAYLOAD)?)
    }

    /// Receive events for `endpoint_id` (or [`crate::WILDCARD_ENDPOINT`]).
    pub fn register_event_sink<F>(&self, endpoint_id: &str, sink: F)
    where
        F: Fn(Event) + Send + Sync + 'static,
    {
        self.sinks.register(endpoint_id, Arc::new(sink) as EventSink);
    }

    /// Remove the sink for `endpoint_id`. Returns whether one existed.
    pub fn unregister_event_sink(&self, endpoint_id: &str) -> bool {
        self.sinks.unregister(endpoint_id)
    }

    pub(crate) fn dispatch(&self, event: Event) -> bool {
        if self.is_closed() {
            return false;
        }
        self.sinks.dispatch(event)
    }

    /// Stop the connection: unblock in-flight commands, stop and join the
    /// event reader, and drop out of the directory. Idempotent.
    ///
    /// Returns once the event reader thread has exited, unless called from
    /// that thread.
    pub fn close(&self) -> Result<()> {
        let first = !self.stopped.swap(true, Ordering::AcqRel);
        let mut result = Ok(());
        if first {
            info!(server = %self.addr, id = self.id, "closing connection");
            result = self.command_shutdown.shutdown().map_err(ClientError::from);
        }

        if let Some(events) = self.events.get() {
            events.stop();
        }

        if first {
            // Dropped here, outside the directory lock.
            let _removed = directory::remove_instance(&self.addr, self.id);
        }
        result
    }

    pub fn is_closed(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    pub fn addr(&self) -> &ServerAddr {
        &self.addr
    }

    /// Client version the server accepted.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn event_port(&self) -> u16 {
        self.event_port
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Process-unique instance id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// True while the event reader thread is alive.
    pub fn events_running(&self) -> bool {
        self.events.get().is_some_and(EventChannel::is_running)
    }
}

impl Drop for TransportConnection {
    fn drop(&mut self) {
        if !self.is_closed() {
            let _ = self.close();
        }
    }
}

impl std::fmt::Debug for TransportConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportConnection")
            .field("id", &self.id)
            .field("addr", &self.addr)
            .field("version", &self.version)
            .field("event_port", &self.event_port)
            .field("output_format", &self.output_format)
            .field("closed", &self.is_closed())
            .field("sinks", &self.sinks)
            .finish_non_exhaustive()
    }
}
