// Stream event types
// Feature: Streaming Chat (031-streaming-chat)
//
// Intermediate representation between the chunk parser and the state
// reducers. Parsers output `StreamEvent`; the conversation reducer and the
// reconciliation engines consume it.

use serde::{Deserialize, Serialize};

use crate::models::issue::Issue;

/// Typed stream event
///
/// Immutable once created. Within a session, events are dispatched strictly
/// in arrival order because text and file deltas are positionally
/// significant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum StreamEvent {
    /// Incremental chat-message text
    Text { delta: String },
    /// Incremental document/issue-list content
    FileDelta { delta: String },
    /// Full replacement snapshot of the proposed issue set
    IssuesSnapshot { issues: Vec<Issue> },
    /// Server-reported error inside the stream (terminal)
    Error { message: String },
    /// End of the response (terminal)
    Done,
}

impl StreamEvent {
    /// Whether this event ends the session
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done | StreamEvent::Error { .. })
    }
}

/// One payload object as the backend sends it
///
/// Every field is optional; a payload carrying none of them is the server's
/// done signal.
#[derive(Debug, Deserialize)]
pub struct ChunkPayload {
    pub message: Option<String>,
    pub file: Option<String>,
    pub issues: Option<Vec<Issue>>,
    pub error: Option<String>,
}

impl ChunkPayload {
    /// Map this payload to zero or more events, field order preserved
    pub fn into_events(self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if let Some(delta) = self.message {
            events.push(StreamEvent::Text { delta });
        }
        if let Some(delta) = self.file {
            events.push(StreamEvent::FileDelta { delta });
        }
        if let Some(issues) = self.issues {
            events.push(StreamEvent::IssuesSnapshot { issues });
        }
        if let Some(message) = self.error {
            events.push(StreamEvent::Error { message });
        }
        if events.is_empty() {
            events.push(StreamEvent::Done);
        }
        events
    }
}
