// Plandeck client library
//
// Client for the Plandeck AI-assisted project-planning service: streaming
// chat sessions over the backend's mixed text/JSON chunk protocol, a
// conversation message reducer, and the accept/reject reconciliation of
// AI-proposed document and issue changes.
//
// The streaming pipeline:
//
//   ChatController::send
//     -> StreamSession (cancellable POST, per-conversation last-write-wins)
//     -> ChunkParser (split-invariant SSE / JSON-stream framing)
//     -> StreamEvent
//     -> ConversationState (chat history + streaming placeholder)
//      + DocumentReconciler / IssueReconciler (pending change vs. baseline)

pub mod error;
pub mod models;
pub mod services;

pub use error::{ClientError, ClientResult};
pub use models::chat::{ChatKind, Conversation, HistoryEntry, Message, MessageSender};
pub use models::document::{Document, DocumentKind};
pub use models::issue::{Comment, Issue, IssuePriority, IssueSource, IssueStatus};
pub use services::backend::{BackendClient, DocumentStore, DocumentsApi, IssueStore, IssuesApi};
pub use services::board::IssueBoard;
pub use services::chat::ChatController;
pub use services::conversation::ConversationState;
pub use services::reconcile::{
    diff_words, DiffKind, DiffSegment, DocumentProposal, DocumentReconciler, IssueReconciler,
};
pub use services::stream::{
    ChunkParser, SessionHandle, SessionObserver, SessionOutcome, SessionRegistry, StreamEvent,
    StreamSession, WireFormat,
};
