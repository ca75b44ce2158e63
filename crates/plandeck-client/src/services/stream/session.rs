// Stream Session
// Feature: Streaming Chat (031-streaming-chat)
//
// Owns the lifecycle of one streaming request:
// - issues the POST and returns a cancellation handle immediately
// - reads the byte stream, feeds the chunk parser, and dispatches every
//   event to the observer synchronously, in arrival order
// - guarantees exactly one of on_complete/on_error fires, exactly once,
//   for every outcome including cancellation
//
// A `SessionRegistry` keeps at most one live session per conversation:
// starting a new send cancels any prior in-flight session for the same key
// before the new one opens (last-write-wins).

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::ClientError;
use crate::models::chat::StreamRequest;
use crate::services::stream::events::StreamEvent;
use crate::services::stream::parser::{ChunkParser, WireFormat};

/// How long a session may go without receiving data before it errors out.
/// The backend can stall arbitrarily; without this a stuck stream would hold
/// its placeholder message open forever.
const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// How the session ended when it did not error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The stream finished (done payload or end of body)
    Done,
    /// The caller cancelled; partial output already dispatched stands
    Cancelled,
}

/// Receives the session's events and its single terminal notification
pub trait SessionObserver: Send + 'static {
    fn on_event(&mut self, event: StreamEvent);
    fn on_complete(&mut self, outcome: SessionOutcome);
    fn on_error(&mut self, error: ClientError);
}

/// Cancellation handle for one session
///
/// Owned by the session, returned to the caller; no shared mutable state
/// beyond the channel. `cancel` is idempotent: the first call aborts the
/// transfer, later calls are no-ops.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: String,
    cancel_tx: mpsc::Sender<()>,
}

impl SessionHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Request cancellation; further events stop, the completion path still
    /// runs (cancellation is not reported as an error)
    pub fn cancel(&self) {
        let _ = self.cancel_tx.try_send(());
    }
}

/// One cancellable streaming exchange
pub struct StreamSession;

impl StreamSession {
    /// Issue the request and start dispatching in the background.
    /// Returns the cancellation handle immediately.
    pub fn open<O: SessionObserver>(
        http: &reqwest::Client,
        url: String,
        request: &StreamRequest,
        format: WireFormat,
        mut observer: O,
    ) -> SessionHandle {
        let (cancel_tx, mut cancel_rx) = mpsc::channel(1);
        let id = format!("stream_{}", Uuid::new_v4().simple());
        let handle = SessionHandle { id, cancel_tx };
        // The session keeps its own clone so the cancel channel only closes
        // when the session itself ends; dropping the caller's handle must not
        // read as a cancellation.
        let guard = handle.clone();
        let pending = http.post(&url).json(request);

        tokio::spawn(async move {
            let session_id = guard.id.clone();
            log::debug!("[{}] opening stream to {}", session_id, url);

            let response = tokio::select! {
                _ = cancel_rx.recv() => {
                    log::info!("[{}] cancelled before the request completed", session_id);
                    observer.on_complete(SessionOutcome::Cancelled);
                    return;
                }
                result = pending.send() => match result {
                    Ok(response) => response,
                    Err(err) => {
                        observer.on_error(err.into());
                        return;
                    }
                },
            };

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                log::error!("[{}] stream request failed: {} {}", session_id, status, body);
                observer.on_error(ClientError::Network {
                    status: status.as_u16(),
                    body,
                });
                return;
            }

            let chunks = decode_chunks(response.bytes_stream());
            drive(Box::pin(chunks), format, &mut observer, &mut cancel_rx, IDLE_TIMEOUT).await;
            log::debug!("[{}] stream finished", session_id);
        });

        handle
    }
}

/// Terminal state of the drive loop; absorbing, decided exactly once
enum Terminal {
    Done,
    Cancelled,
    Errored(ClientError),
}

/// Core dispatch loop, transport-agnostic for testability.
///
/// Reads chunks, feeds the parser, and forwards events until a terminal
/// condition: done payload, end of stream, stream error, idle timeout, or
/// cancellation. Exactly one terminal notification is delivered.
async fn drive<O: SessionObserver>(
    mut chunks: Pin<Box<dyn Stream<Item = Result<String, ClientError>> + Send>>,
    format: WireFormat,
    observer: &mut O,
    cancel_rx: &mut mpsc::Receiver<()>,
    idle_timeout: Duration,
) {
    let mut parser = ChunkParser::new(format);

    let terminal = loop {
        let next = tokio::select! {
            biased;
            _ = cancel_rx.recv() => break Terminal::Cancelled,
            next = tokio::time::timeout(idle_timeout, chunks.next()) => next,
        };
        match next {
            Err(_) => break Terminal::Errored(ClientError::Timeout),
            Ok(None) => {
                // End of body: flush any unterminated trailing record
                match dispatch(observer, parser.finish()) {
                    Some(terminal) => break terminal,
                    None => break Terminal::Done,
                }
            }
            Ok(Some(Err(err))) => break Terminal::Errored(err),
            Ok(Some(Ok(chunk))) => {
                if let Some(terminal) = dispatch(observer, parser.feed(&chunk)) {
                    break terminal;
                }
            }
        }
    };

    match terminal {
        Terminal::Done => observer.on_complete(SessionOutcome::Done),
        Terminal::Cancelled => observer.on_complete(SessionOutcome::Cancelled),
        Terminal::Errored(err) => observer.on_error(err),
    }
}

/// Run the drive loop over a scripted chunk stream - the live dispatch path
/// minus the network
#[cfg(test)]
pub(crate) async fn drive_for_tests<O: SessionObserver>(
    chunks: Pin<Box<dyn Stream<Item = Result<String, ClientError>> + Send>>,
    format: WireFormat,
    mut observer: O,
) {
    let (_cancel_tx, mut cancel_rx) = mpsc::channel(1);
    drive(
        chunks,
        format,
        &mut observer,
        &mut cancel_rx,
        Duration::from_secs(5),
    )
    .await;
}

/// Forward events in arrival order; stop at the first terminal event.
/// Events after a terminal payload are not dispatched.
fn dispatch<O: SessionObserver>(observer: &mut O, events: Vec<StreamEvent>) -> Option<Terminal> {
    for event in events {
        match event {
            StreamEvent::Done => return Some(Terminal::Done),
            StreamEvent::Error { message } => {
                return Some(Terminal::Errored(ClientError::Api(message)))
            }
            other => observer.on_event(other),
        }
    }
    None
}

/// Adapt a byte stream into UTF-8 text chunks.
/// Network chunks can split a multibyte character; the decoder holds the
/// incomplete suffix until the next chunk completes it.
fn decode_chunks<B, S>(bytes: S) -> impl Stream<Item = Result<String, ClientError>> + Send
where
    B: AsRef<[u8]> + Send,
    S: Stream<Item = Result<B, reqwest::Error>> + Send + 'static,
{
    async_stream::stream! {
        let mut decoder = Utf8Decoder::default();
        futures::pin_mut!(bytes);
        while let Some(item) = bytes.next().await {
            match item {
                Ok(chunk) => yield Ok(decoder.decode(chunk.as_ref())),
                Err(err) => yield Err(err.into()),
            }
        }
    }
}

/// Incremental UTF-8 decoder tolerant of chunk splits mid-character
#[derive(Debug, Default)]
struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(valid) => {
                    out.push_str(valid);
                    self.pending.clear();
                    break;
                }
                Err(err) => {
                    let valid_up_to = err.valid_up_to();
                    out.push_str(std::str::from_utf8(&self.pending[..valid_up_to]).unwrap_or(""));
                    match err.error_len() {
                        // Incomplete trailing sequence; keep it for the next chunk
                        None => {
                            self.pending.drain(..valid_up_to);
                            break;
                        }
                        // Truly invalid bytes; replace and continue
                        Some(len) => {
                            out.push('\u{FFFD}');
                            self.pending.drain(..valid_up_to + len);
                        }
                    }
                }
            }
        }
        out
    }
}

/// Tracks the live session per conversation key.
///
/// Registering a new session for a key cancels whatever was running there:
/// at most one session writes into a given conversation at a time.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, SessionHandle>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel and replace any live session for this key
    pub fn replace(&self, key: &str, handle: SessionHandle) {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = sessions.insert(key.to_string(), handle) {
            log::info!(
                "superseding in-flight session {} for conversation {}",
                previous.id(),
                key
            );
            previous.cancel();
        }
    }

    /// Cancel the live session for this key, if any
    pub fn cancel(&self, key: &str) -> bool {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        match sessions.remove(key) {
            Some(handle) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }

    /// Deregister a finished session. A newer session that already took the
    /// key stays registered.
    pub fn finish(&self, key: &str, session_id: &str) {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        if sessions.get(key).map(|h| h.id() == session_id).unwrap_or(false) {
            sessions.remove(key);
        }
    }

    pub fn active_count(&self) -> usize {
        self.sessions.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}
