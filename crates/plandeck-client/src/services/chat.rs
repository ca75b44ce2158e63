// Chat Orchestrator
// Feature: Streaming Chat (031-streaming-chat)
//
// Wires one conversation's session, parser, reducer, and reconciliation
// engine together. One controller per chat subject; the flavor is a plain
// enum (`ChatKind`) selecting the endpoint and the reconciliation target,
// not a type hierarchy. Starting a new send cancels any in-flight session
// for the conversation before the new one opens.

use std::sync::{Arc, Mutex, OnceLock};

use crate::error::{ClientError, ClientResult};
use crate::models::chat::{ChatKind, Message, StreamRequest};
use crate::models::document::DocumentKind;
use crate::models::issue::Issue;
use crate::services::backend::{BackendClient, DocumentStore, IssueStore};
use crate::services::conversation::ConversationState;
use crate::services::reconcile::{DocumentProposal, DocumentReconciler, IssueReconciler};
use crate::services::stream::events::StreamEvent;
use crate::services::stream::parser::WireFormat;
use crate::services::stream::session::{
    SessionHandle, SessionObserver, SessionOutcome, SessionRegistry, StreamSession,
};

/// State shared between the controller and its session observers.
/// Mutated only on the event-dispatch path and by explicit user actions.
struct ChatShared {
    conversation: ConversationState,
    document: Option<DocumentReconciler>,
    issues: Option<IssueReconciler>,
    snapshot: Option<Vec<Issue>>,
}

/// Orchestrates streaming chat for one conversation subject
pub struct ChatController {
    kind: ChatKind,
    project_id: String,
    backend: BackendClient,
    format: WireFormat,
    registry: Arc<SessionRegistry>,
    shared: Arc<Mutex<ChatShared>>,
}

impl ChatController {
    pub fn new(backend: BackendClient, project_id: String, kind: ChatKind) -> Self {
        Self::with_registry(backend, project_id, kind, Arc::new(SessionRegistry::new()))
    }

    /// Share a registry across controllers so last-write-wins holds per
    /// conversation even when several chat panels exist
    pub fn with_registry(
        backend: BackendClient,
        project_id: String,
        kind: ChatKind,
        registry: Arc<SessionRegistry>,
    ) -> Self {
        let document = document_kind(&kind)
            .map(|doc_kind| DocumentReconciler::new(doc_kind, project_id.clone(), String::new()));
        let issues = match kind {
            ChatKind::Issue | ChatKind::IssueContent { .. } => {
                Some(IssueReconciler::new(project_id.clone()))
            }
            _ => None,
        };
        let shared = ChatShared {
            conversation: ConversationState::new(project_id.clone(), kind.clone()),
            document,
            issues,
            snapshot: None,
        };
        Self {
            kind,
            project_id,
            backend,
            format: WireFormat::SseData,
            registry,
            shared: Arc::new(Mutex::new(shared)),
        }
    }

    pub fn kind(&self) -> &ChatKind {
        &self.kind
    }

    // ========================================================================
    // Sending and session lifecycle
    // ========================================================================

    /// Fetch the live document so the first file delta has its baseline.
    /// Only meaningful for the document chat flavors.
    pub async fn load_document(&self, store: &dyn DocumentStore) -> ClientResult<()> {
        let Some(doc_kind) = document_kind(&self.kind) else {
            return Ok(());
        };
        let document = store.fetch(doc_kind, &self.project_id).await?;
        if let Some(rec) = self.shared.lock().unwrap().document.as_mut() {
            rec.set_content(document.content);
        }
        Ok(())
    }

    /// Send a message: cancels any in-flight session for this conversation,
    /// appends the user message and AI placeholder, and opens the stream.
    /// Returns the new session's cancellation handle.
    pub fn send(&self, message: &str) -> SessionHandle {
        let key = self.conversation_key();
        // Last-write-wins: the superseded session finalizes its own
        // placeholder and nothing else
        self.registry.cancel(&key);

        let (history, placeholder_id) = {
            let mut shared = self.shared.lock().unwrap();
            let history = shared.conversation.history();
            let placeholder_id = shared.conversation.begin_exchange(message);
            (history, placeholder_id)
        };

        let request = StreamRequest {
            message: message.to_string(),
            history,
            project_id: self.project_id.clone(),
        };
        let observer = ChatObserver {
            shared: self.shared.clone(),
            registry: self.registry.clone(),
            key: key.clone(),
            placeholder_id,
            session_id: Arc::new(OnceLock::new()),
            is_document: self.kind.is_document(),
        };
        let session_id = observer.session_id.clone();

        let url = self.backend.url(&self.kind.endpoint_path());
        let handle = StreamSession::open(
            self.backend.http(),
            url,
            &request,
            self.format,
            observer,
        );
        let _ = session_id.set(handle.id().to_string());
        self.registry.replace(&key, handle.clone());
        handle
    }

    /// Cancel the in-flight session, if any
    pub fn cancel(&self) -> bool {
        self.registry.cancel(&self.conversation_key())
    }

    pub fn messages(&self) -> Vec<Message> {
        self.shared.lock().unwrap().conversation.messages().to_vec()
    }

    pub fn is_streaming(&self) -> bool {
        self.shared.lock().unwrap().conversation.is_streaming()
    }

    // ========================================================================
    // Document proposal
    // ========================================================================

    /// Current live document content (document flavors only)
    pub fn document_content(&self) -> Option<String> {
        let shared = self.shared.lock().unwrap();
        shared.document.as_ref().map(|rec| rec.content().to_string())
    }

    /// The pending document proposal, if a stream has produced one
    pub fn document_proposal(&self) -> Option<DocumentProposal> {
        let shared = self.shared.lock().unwrap();
        shared.document.as_ref().and_then(|rec| rec.proposal().cloned())
    }

    /// Persist the pending document proposal and make it live.
    /// On failure the proposal is preserved for retry.
    pub async fn accept_document(&self, store: &dyn DocumentStore) -> ClientResult<String> {
        let mut rec = self.take_document()?;
        let result = rec.accept(store).await;
        self.shared.lock().unwrap().document = Some(rec);
        result
    }

    /// Discard the pending document proposal; returns the restored content
    pub fn reject_document(&self) -> ClientResult<String> {
        let mut shared = self.shared.lock().unwrap();
        let rec = shared
            .document
            .as_mut()
            .ok_or_else(|| ClientError::InvalidInput("not a document chat".to_string()))?;
        Ok(rec.reject().to_string())
    }

    // ========================================================================
    // Issue proposal
    // ========================================================================

    /// Pending issue additions (proposed titles)
    pub fn pending_additions(&self) -> Vec<String> {
        let shared = self.shared.lock().unwrap();
        shared
            .issues
            .as_ref()
            .map(|rec| rec.additions())
            .unwrap_or_default()
    }

    /// Pending issue removals (issue ids)
    pub fn pending_removals(&self) -> Vec<String> {
        let shared = self.shared.lock().unwrap();
        shared
            .issues
            .as_ref()
            .map(|rec| rec.removals())
            .unwrap_or_default()
    }

    /// Accept one proposed addition; returns the created issue
    pub async fn accept_addition(
        &self,
        title: &str,
        store: &dyn IssueStore,
    ) -> ClientResult<Issue> {
        let mut rec = self.take_issues()?;
        let result = rec.accept_addition(title, store).await;
        self.shared.lock().unwrap().issues = Some(rec);
        result
    }

    /// Accept one proposed removal
    pub async fn accept_removal(
        &self,
        issue_id: &str,
        store: &dyn IssueStore,
    ) -> ClientResult<()> {
        let mut rec = self.take_issues()?;
        let result = rec.accept_removal(issue_id, store).await;
        self.shared.lock().unwrap().issues = Some(rec);
        result
    }

    /// Reject one proposed addition (client-side only)
    pub fn reject_addition(&self, title: &str) -> bool {
        let mut shared = self.shared.lock().unwrap();
        shared
            .issues
            .as_mut()
            .map(|rec| rec.reject_addition(title))
            .unwrap_or(false)
    }

    /// Reject one proposed removal (client-side only)
    pub fn reject_removal(&self, issue_id: &str) -> bool {
        let mut shared = self.shared.lock().unwrap();
        shared
            .issues
            .as_mut()
            .map(|rec| rec.reject_removal(issue_id))
            .unwrap_or(false)
    }

    /// Latest streamed issue snapshot, if any
    pub fn issue_snapshot(&self) -> Option<Vec<Issue>> {
        self.shared.lock().unwrap().snapshot.clone()
    }

    /// Leaving the conversation discards any open proposal - equivalent to
    /// reject, never an auto-commit
    pub fn discard_pending(&self) {
        let mut shared = self.shared.lock().unwrap();
        if let Some(rec) = shared.document.as_mut() {
            rec.discard();
        }
        if let Some(rec) = shared.issues.as_mut() {
            rec.discard();
        }
    }

    fn conversation_key(&self) -> String {
        self.shared
            .lock()
            .unwrap()
            .conversation
            .conversation()
            .id
            .clone()
    }

    fn take_document(&self) -> ClientResult<DocumentReconciler> {
        self.shared
            .lock()
            .unwrap()
            .document
            .take()
            .ok_or_else(|| ClientError::InvalidInput("not a document chat".to_string()))
    }

    fn take_issues(&self) -> ClientResult<IssueReconciler> {
        self.shared
            .lock()
            .unwrap()
            .issues
            .take()
            .ok_or_else(|| ClientError::InvalidInput("not an issue chat".to_string()))
    }
}

fn document_kind(kind: &ChatKind) -> Option<DocumentKind> {
    match kind {
        ChatKind::Plan => Some(DocumentKind::Plan),
        ChatKind::TechSpec => Some(DocumentKind::TechSpec),
        _ => None,
    }
}

/// Routes one session's events into the shared chat state
struct ChatObserver {
    shared: Arc<Mutex<ChatShared>>,
    registry: Arc<SessionRegistry>,
    key: String,
    placeholder_id: String,
    session_id: Arc<OnceLock<String>>,
    is_document: bool,
}

impl ChatObserver {
    fn deregister(&self) {
        if let Some(id) = self.session_id.get() {
            self.registry.finish(&self.key, id);
        }
    }
}

impl SessionObserver for ChatObserver {
    fn on_event(&mut self, event: StreamEvent) {
        let mut shared = self.shared.lock().unwrap();
        match &event {
            StreamEvent::Text { .. } => {
                shared.conversation.apply(&self.placeholder_id, &event);
            }
            StreamEvent::FileDelta { delta } => {
                if self.is_document {
                    if let Some(rec) = shared.document.as_mut() {
                        rec.apply_delta(delta);
                    }
                } else if let Some(rec) = shared.issues.as_mut() {
                    rec.apply_delta(delta);
                }
            }
            StreamEvent::IssuesSnapshot { issues } => {
                shared.snapshot = Some(issues.clone());
            }
            StreamEvent::Error { .. } | StreamEvent::Done => {}
        }
    }

    fn on_complete(&mut self, outcome: SessionOutcome) {
        self.shared
            .lock()
            .unwrap()
            .conversation
            .finish_exchange(&self.placeholder_id, outcome);
        self.deregister();
    }

    fn on_error(&mut self, error: ClientError) {
        log::error!("chat session for {} failed: {}", self.key, error);
        self.shared
            .lock()
            .unwrap()
            .conversation
            .fail_exchange(&self.placeholder_id, &error.to_string());
        self.deregister();
    }
}
