// Conversation State Reducer
// Feature: Streaming Chat (031-streaming-chat)
//
// Owns the ordered message history for one conversation and applies
// incoming stream events to the in-flight placeholder. Appending the user
// message and the AI placeholder happens in one call so no observer ever
// sees only one of the two. Events address the placeholder by id: a
// superseded session finalizes its own placeholder and can never touch the
// one a newer session is streaming into.

use crate::models::chat::{ChatKind, Conversation, HistoryEntry, Message};
use crate::services::stream::events::StreamEvent;
use crate::services::stream::session::SessionOutcome;

/// Reducer over one conversation's message history
#[derive(Debug)]
pub struct ConversationState {
    conversation: Conversation,
}

impl ConversationState {
    /// Start an empty conversation (created lazily on first send)
    pub fn new(project_id: String, kind: ChatKind) -> Self {
        Self {
            conversation: Conversation::new(project_id, kind),
        }
    }

    /// Resume from an existing conversation
    pub fn from_conversation(conversation: Conversation) -> Self {
        Self { conversation }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn messages(&self) -> &[Message] {
        &self.conversation.messages
    }

    /// Append the user message and the streaming AI placeholder atomically.
    /// Returns the placeholder's message id.
    pub fn begin_exchange(&mut self, content: &str) -> String {
        let placeholder = Message::ai_placeholder();
        let placeholder_id = placeholder.id.clone();
        self.conversation
            .messages
            .push(Message::user(content.to_string()));
        self.conversation.messages.push(placeholder);
        placeholder_id
    }

    /// Apply one stream event to the addressed placeholder.
    ///
    /// Text deltas concatenate in arrival order; Done finalizes the
    /// placeholder; Error replaces its content with a visible error string.
    /// File/issue events belong to the reconciliation engine and are ignored
    /// here. Events for an already-finalized placeholder are dropped.
    pub fn apply(&mut self, placeholder_id: &str, event: &StreamEvent) {
        let Some(placeholder) = self.streaming_message_mut(placeholder_id) else {
            return;
        };
        match event {
            StreamEvent::Text { delta } => placeholder.content.push_str(delta),
            StreamEvent::Done => placeholder.streaming = false,
            StreamEvent::Error { message } => {
                placeholder.content = format!("Error receiving response: {}", message);
                placeholder.streaming = false;
            }
            StreamEvent::FileDelta { .. } | StreamEvent::IssuesSnapshot { .. } => {}
        }
    }

    /// Finalize the placeholder on session completion. A cancelled session
    /// keeps whatever partial content already arrived.
    pub fn finish_exchange(&mut self, placeholder_id: &str, outcome: SessionOutcome) {
        let _ = outcome;
        self.apply(placeholder_id, &StreamEvent::Done);
    }

    /// Turn the placeholder into a visible error on session failure
    pub fn fail_exchange(&mut self, placeholder_id: &str, message: &str) {
        self.apply(
            placeholder_id,
            &StreamEvent::Error {
                message: message.to_string(),
            },
        );
    }

    /// History as the backend expects it: completed messages only (any
    /// still-streaming placeholder is excluded), reduced to sender/content
    /// pairs in chronological order
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.conversation
            .messages
            .iter()
            .filter(|msg| !msg.streaming)
            .map(|msg| HistoryEntry {
                sender: msg.sender,
                content: msg.content.clone(),
            })
            .collect()
    }

    /// Whether a placeholder is still receiving deltas
    pub fn is_streaming(&self) -> bool {
        self.conversation.messages.iter().any(|msg| msg.streaming)
    }

    fn streaming_message_mut(&mut self, placeholder_id: &str) -> Option<&mut Message> {
        self.conversation
            .messages
            .iter_mut()
            .find(|msg| msg.id == placeholder_id && msg.streaming)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::MessageSender;

    fn state() -> ConversationState {
        ConversationState::new("p1".to_string(), ChatKind::Plan)
    }

    fn text(delta: &str) -> StreamEvent {
        StreamEvent::Text {
            delta: delta.to_string(),
        }
    }

    #[test]
    fn test_begin_exchange_appends_both_messages_atomically() {
        let mut state = state();
        let placeholder_id = state.begin_exchange("Add PayPal support");

        let messages = state.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sender, MessageSender::User);
        assert_eq!(messages[0].content, "Add PayPal support");
        assert!(!messages[0].streaming);
        assert_eq!(messages[1].id, placeholder_id);
        assert_eq!(messages[1].sender, MessageSender::Ai);
        assert!(messages[1].streaming);
    }

    #[test]
    fn test_text_deltas_concatenate_in_arrival_order() {
        let mut state = state();
        let id = state.begin_exchange("hi");
        state.apply(&id, &text("Hello "));
        state.apply(&id, &text("world"));
        assert_eq!(state.messages()[1].content, "Hello world");
        assert!(state.is_streaming());
    }

    #[test]
    fn test_done_finalizes_placeholder() {
        let mut state = state();
        let id = state.begin_exchange("hi");
        state.apply(&id, &text("answer"));
        state.finish_exchange(&id, SessionOutcome::Done);
        assert!(!state.is_streaming());
        assert_eq!(state.messages()[1].content, "answer");
    }

    #[test]
    fn test_error_replaces_placeholder_content() {
        let mut state = state();
        let id = state.begin_exchange("hi");
        state.apply(&id, &text("partial"));
        state.fail_exchange(&id, "connection reset");

        let placeholder = &state.messages()[1];
        assert!(!placeholder.streaming);
        assert_eq!(
            placeholder.content,
            "Error receiving response: connection reset"
        );
    }

    #[test]
    fn test_cancelled_session_keeps_partial_content() {
        let mut state = state();
        let id = state.begin_exchange("hi");
        state.apply(&id, &text("partial"));
        state.finish_exchange(&id, SessionOutcome::Cancelled);
        assert!(!state.is_streaming());
        assert_eq!(state.messages()[1].content, "partial");
    }

    #[test]
    fn test_events_for_finalized_placeholder_are_dropped() {
        let mut state = state();
        let id = state.begin_exchange("hi");
        state.apply(&id, &text("final"));
        state.finish_exchange(&id, SessionOutcome::Done);

        state.apply(&id, &text(" late"));
        assert_eq!(state.messages()[1].content, "final");
    }

    #[test]
    fn test_superseded_session_cannot_touch_newer_placeholder() {
        let mut state = state();
        let old_id = state.begin_exchange("first");
        state.apply(&old_id, &text("old partial"));

        // A new send supersedes the first session; the old session's
        // completion targets only its own placeholder
        let new_id = state.begin_exchange("second");
        state.finish_exchange(&old_id, SessionOutcome::Cancelled);
        state.apply(&new_id, &text("new answer"));

        let messages = state.messages();
        assert_eq!(messages[1].content, "old partial");
        assert!(!messages[1].streaming);
        assert_eq!(messages[3].content, "new answer");
        assert!(messages[3].streaming);
    }

    #[test]
    fn test_history_excludes_streaming_placeholder() {
        let mut state = state();
        let first = state.begin_exchange("first question");
        state.apply(&first, &text("first answer"));
        state.finish_exchange(&first, SessionOutcome::Done);

        // Second exchange in flight: its placeholder must not appear
        state.begin_exchange("second question");
        let history = state.history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].sender, MessageSender::User);
        assert_eq!(history[0].content, "first question");
        assert_eq!(history[1].sender, MessageSender::Ai);
        assert_eq!(history[1].content, "first answer");
        assert_eq!(history[2].content, "second question");
    }

    #[test]
    fn test_file_deltas_do_not_touch_the_placeholder() {
        let mut state = state();
        let id = state.begin_exchange("hi");
        state.apply(
            &id,
            &StreamEvent::FileDelta {
                delta: "# Plan\n".to_string(),
            },
        );
        assert_eq!(state.messages()[1].content, "");
    }
}
