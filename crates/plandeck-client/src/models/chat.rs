// Chat data models
// Feature: Streaming Chat (031-streaming-chat)

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use crate::models::issue::IssueSource;

/// Message author
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageSender {
    User,
    Ai,
}

impl MessageSender {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageSender::User => "user",
            MessageSender::Ai => "ai",
        }
    }
}

impl std::fmt::Display for MessageSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message entity - individual message within a conversation
///
/// `streaming` marks the single trailing placeholder that is still receiving
/// deltas from an in-flight session. It flips to `false` exactly once, on the
/// session's terminal event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub content: String,
    pub sender: MessageSender,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub streaming: bool,
}

impl Message {
    /// Create a completed user message
    pub fn user(content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content,
            sender: MessageSender::User,
            timestamp: Utc::now(),
            streaming: false,
        }
    }

    /// Create an empty AI placeholder that will receive streamed deltas
    pub fn ai_placeholder() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: String::new(),
            sender: MessageSender::Ai,
            timestamp: Utc::now(),
            streaming: true,
        }
    }
}

/// Chat flavor - selects the streaming endpoint and how file deltas are
/// reconciled (document proposal vs. issue proposal)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatKind {
    /// Project plan document chat
    Plan,
    /// Technical specifications document chat
    TechSpec,
    /// Issue-list chat (emits `+`/`-` tagged lines or issue snapshots)
    Issue,
    /// Single-issue content chat
    IssueContent {
        issue_id: String,
        source: IssueSource,
    },
}

impl ChatKind {
    /// Streaming endpoint path for this chat flavor
    pub fn endpoint_path(&self) -> String {
        match self {
            ChatKind::Plan => "/chat/plan/stream".to_string(),
            ChatKind::TechSpec => "/chat/tech-spec/stream".to_string(),
            ChatKind::Issue => "/chat/issue/stream".to_string(),
            ChatKind::IssueContent { issue_id, source } => match source {
                IssueSource::Local => format!("/chat/issue-content/{}/stream", issue_id),
                IssueSource::GitHub => format!("/chat/issue-content/github/{}/stream", issue_id),
            },
        }
    }

    /// Whether file deltas in this chat propose a document edit
    pub fn is_document(&self) -> bool {
        matches!(self, ChatKind::Plan | ChatKind::TechSpec)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ChatKind::Plan => "Project Plan",
            ChatKind::TechSpec => "Technical Specifications",
            ChatKind::Issue => "Issues",
            ChatKind::IssueContent { .. } => "Issue",
        }
    }
}

/// Conversation entity - one logical chat subject (a document or an issue)
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    pub id: String,
    pub project_id: String,
    pub kind: ChatKind,
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn new(project_id: String, kind: ChatKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            project_id,
            kind,
            messages: Vec::new(),
        }
    }
}

/// One completed exchange entry as the backend expects it: a single-key
/// object mapping the sender to the message content, e.g. `{"user": "hi"}`
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub sender: MessageSender,
    pub content: String,
}

impl Serialize for HistoryEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.sender.as_str(), &self.content)?;
        map.end()
    }
}

/// Request body for the streaming chat endpoints
#[derive(Debug, Clone, Serialize)]
pub struct StreamRequest {
    pub message: String,
    pub history: Vec<HistoryEntry>,
    pub project_id: String,
}
