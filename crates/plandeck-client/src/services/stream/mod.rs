// Streaming protocol layer
// Feature: Streaming Chat (031-streaming-chat)
//
// Raw response bytes flow through here:
//
//   byte stream -> [ChunkParser] -> StreamEvent -> [SessionObserver]
//
// `events` defines the typed event union, `parser` turns arbitrarily
// fragmented chunks into events, and `session` owns the cancellable request
// lifecycle and the per-conversation registry.

pub mod events;
pub mod parser;
pub mod session;

pub use events::StreamEvent;
pub use parser::{ChunkParser, WireFormat};
pub use session::{
    SessionHandle, SessionObserver, SessionOutcome, SessionRegistry, StreamSession,
};
