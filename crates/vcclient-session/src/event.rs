//! Event channel: a second socket drained by a dedicated reader thread.
//!
//! The reader polls with a short read timeout so that a stop request is
//! noticed even when the server is silent. [`FrameReader`] keeps partial
//! frames across those timeouts.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};

use tracing::{debug, info, trace, warn};
use vcclient_frame::{normalize_endpoint_id, FrameError, FrameReader};
use vcclient_transport::{ServerAddr, ServerStream, ShutdownHandle, TransportError};

use crate::error::Result;

/// Raw event types reported as `info` events with the raw type as subtype.
pub const INFO_SUBTYPES: &[&str] = &[
    "state",
    "calls",
    "primarycm",
    "backupcm",
    "bcgready",
    "lostconn",
];

/// Raw event types whose second token is the subtype.
pub const SUBTYPED_EVENTS: &[&str] = &["station", "callevent"];

/// Event type given to every [`INFO_SUBTYPES`] event.
pub const INFO_EVENT: &str = "info";

/// One inbound event. Built per frame, handed to a sink, then discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub server: ServerAddr,
    pub endpoint_id: String,
    pub event_type: String,
    pub event_subtype: Option<String>,
    pub message: String,
}

/// Callback receiving events for one endpoint (or the wildcard).
pub type EventSink = Arc<dyn Fn(Event) + Send + Sync>;

/// Classify an event payload by its leading whitespace tokens.
pub fn classify(server: &ServerAddr, endpoint_id: &str, payload: &str) -> Event {
    let mut tokens = payload.split_whitespace();
    let raw_type = tokens.next().unwrap_or_default();

    let (event_type, event_subtype) = if INFO_SUBTYPES.contains(&raw_type) {
        (INFO_EVENT.to_string(), Some(raw_type.to_string()))
    } else if SUBTYPED_EVENTS.contains(&raw_type) {
        (raw_type.to_string(), tokens.next().map(str::to_string))
    } else {
        (raw_type.to_string(), None)
    };

    Event {
        server: server.clone(),
        endpoint_id: endpoint_id.to_string(),
        event_type,
        event_subtype,
        message: tokens.collect::<Vec<_>>().join(" "),
    }
}

/// Endpoint id that matches events with no dedicated sink.
pub const WILDCARD_ENDPOINT: &str = "*";

/// Sinks keyed by normalized endpoint id.
#[derive(Default)]
pub struct EventSinks {
    sinks: Mutex<HashMap<String, EventSink>>,
}

impl EventSinks {
    /// Install `sink` for `endpoint_id`, replacing any previous one.
    pub fn register(&self, endpoint_id: &str, sink: EventSink) {
        let key = sink_key(endpoint_id);
        debug!(endpoint = %key, "event sink registered");
        self.lock().insert(key, sink);
    }

    /// Remove the sink for `endpoint_id`. Returns whether one existed.
    pub fn unregister(&self, endpoint_id: &str) -> bool {
        self.lock().remove(&sink_key(endpoint_id)).is_some()
    }

    /// Sink for `endpoint_id`, falling back to the wildcard.
    pub fn resolve(&self, endpoint_id: &str) -> Option<EventSink> {
        let sinks = self.lock();
        sinks
            .get(&sink_key(endpoint_id))
            .or_else(|| sinks.get(WILDCARD_ENDPOINT))
            .cloned()
    }

    /// Deliver `event` to its sink. Returns false when no sink matched.
    ///
    /// The sink runs without the registry lock held, so it may register or
    /// unregister sinks itself.
    pub fn dispatch(&self, event: Event) -> bool {
        match self.resolve(&event.endpoint_id) {
            Some(sink) => {
                sink(event);
                true
            }
            None => {
                trace!(endpoint = %event.endpoint_id, "event dropped: no sink");
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, EventSink>> {
        self.sinks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for EventSinks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<_> = self.lock().keys().cloned().collect();
        keys.sort();
        f.debug_struct("EventSinks").field("endpoints", &keys).finish()
    }
}

/// `1` and `00000001` name the same endpoint.
fn sink_key(endpoint_id: &str) -> String {
    if endpoint_id == WILDCARD_ENDPOINT {
        return endpoint_id.to_string();
    }
    normalize_endpoint_id(Some(endpoint_id)).unwrap_or_else(|_| endpoint_id.to_string())
}

/// Handle to a running event reader thread.
///
/// The thread exits on [`EventChannel::stop`], on end of stream or on a
/// socket error. In the last two cases `on_closed` runs on the reader thread.
pub struct EventChannel {
    stop: Arc<AtomicBool>,
    shutdown: ShutdownHandle,
    handle: Mutex<Option<JoinHandle<()>>>,
    thread_id: ThreadId,
}

impl EventChannel {
    /// Spawn the reader thread on `stream`; events are stamped with `server`.
    ///
    /// The stream's read timeout bounds how long a stop request can go
    /// unnoticed; the caller sets it.
    pub fn start<F, C>(
        stream: ServerStream,
        server: ServerAddr,
        on_event: F,
        on_closed: C,
    ) -> Result<Self>
    where
        F: Fn(Event) + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        let shutdown = stream.shutdown_handle()?;
        let stop = Arc::new(AtomicBool::new(false));

        let handle = thread::Builder::new()
            .name(format!("vcclient-events-{server}"))
            .spawn({
                let stop = Arc::clone(&stop);
                move || run(FrameReader::new(stream), server, stop, on_event, on_closed)
            })
            .map_err(TransportError::Io)?;

        let thread_id = handle.thread().id();
        Ok(Self {
            stop,
            shutdown,
            handle: Mutex::new(Some(handle)),
            thread_id,
        })
    }

    /// Stop the reader and wait for it to exit. Idempotent.
    ///
    /// Called from the reader thread itself (from a sink or `on_closed`),
    /// this only requests the stop; the thread exits once the callback
    /// returns.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
        if let Err(err) = self.shutdown.shutdown() {
            debug!(error = %err, "event socket shutdown failed");
        }

        if self.thread_id == thread::current().id() {
            return;
        }

        // Held across the join so a concurrent stop() also waits for exit.
        let mut handle = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = handle.take() {
            if handle.join().is_err() {
                warn!("event reader thread panicked");
            }
        }
    }

    /// True once a stop has been requested.
    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// True while the reader thread has not exited.
    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for EventChannel {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for EventChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventChannel")
            .field("stopped", &self.is_stopped())
            .finish_non_exhaustive()
    }
}

fn run<F, C>(
    mut reader: FrameReader<ServerStream>,
    server: ServerAddr,
    stop: Arc<AtomicBool>,
    on_event: F,
    on_closed: C,
) where
    F: Fn(Event),
    C: FnOnce(),
{
    debug!(server = %server, "event reader started");
    loop {
        if stop.load(Ordering::Acquire) {
            debug!(server = %server, "event reader stopped");
            return;
        }

        match reader.read_frame() {
            Ok(frame) => {
                let event = classify(&server, &frame.header.endpoint_id, &frame.payload_text());
                trace!(
                    server = %server,
                    endpoint = %event.endpoint_id,
                    event_type = %event.event_type,
                    "event received"
                );
                on_event(event);
            }
            Err(err) if err.is_timeout() => continue,
            Err(err) => {
                if stop.load(Ordering::Acquire) {
                    debug!(server = %server, "event reader stopped");
                    return;
                }
                match err {
                    FrameError::ConnectionClosed => {
                        info!(server = %server, "event channel closed by server");
                    }
                    err => warn!(server = %server, error = %err, "event channel failed"),
                }
                stop.store(true, Ordering::Release);
                on_closed();
                return;
            }
        }
    }
}
