// Document Reconciliation
// Feature: Proposal Review (032-proposal-review)
//
// Accumulates streamed file deltas into one pending document proposal and
// applies or discards it on the user's decision. The baseline is the live
// content snapshotted at the first delta of a session and is never mutated
// afterwards; it backs both the diff display and the rollback on reject.

use crate::error::{ClientError, ClientResult};
use crate::models::document::DocumentKind;
use crate::services::backend::DocumentStore;
use crate::services::reconcile::diff::{diff_words, DiffSegment};

/// Pending AI-proposed edit awaiting accept or reject
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentProposal {
    baseline: String,
    proposed: String,
}

impl DocumentProposal {
    pub fn baseline(&self) -> &str {
        &self.baseline
    }

    pub fn proposed(&self) -> &str {
        &self.proposed
    }

    /// Word-level diff of the proposal against the frozen baseline
    pub fn diff(&self) -> Vec<DiffSegment> {
        diff_words(&self.baseline, &self.proposed)
    }
}

/// Reconciles streamed file deltas for one document
pub struct DocumentReconciler {
    kind: DocumentKind,
    project_id: String,
    current: String,
    proposal: Option<DocumentProposal>,
}

impl DocumentReconciler {
    pub fn new(kind: DocumentKind, project_id: String, current_content: String) -> Self {
        Self {
            kind,
            project_id,
            current: current_content,
            proposal: None,
        }
    }

    /// Live (authoritative) document content
    pub fn content(&self) -> &str {
        &self.current
    }

    /// Refresh the live content from outside (document reloaded).
    /// Ignored while a proposal is open: the baseline is frozen.
    pub fn set_content(&mut self, content: String) {
        if self.proposal.is_some() {
            log::warn!(
                "ignoring live-content update for {} while a proposal is pending",
                self.kind.display_name()
            );
            return;
        }
        self.current = content;
    }

    /// Apply one streamed file delta.
    ///
    /// The absence of a proposal marks the first delta of a session: it
    /// captures the baseline and seeds the proposed text. Every later delta
    /// appends, never replaces.
    pub fn apply_delta(&mut self, delta: &str) {
        match self.proposal.as_mut() {
            None => {
                self.proposal = Some(DocumentProposal {
                    baseline: self.current.clone(),
                    proposed: delta.to_string(),
                });
            }
            Some(proposal) => proposal.proposed.push_str(delta),
        }
    }

    pub fn proposal(&self) -> Option<&DocumentProposal> {
        self.proposal.as_ref()
    }

    pub fn has_pending(&self) -> bool {
        self.proposal.is_some()
    }

    /// Persist the proposal and make it the live content.
    ///
    /// On persistence failure the proposal stays pending so the user can
    /// retry instead of losing the AI-proposed edit.
    pub async fn accept(&mut self, store: &dyn DocumentStore) -> ClientResult<String> {
        let proposed = match self.proposal.as_ref() {
            Some(proposal) => proposal.proposed.clone(),
            None => {
                return Err(ClientError::InvalidInput(
                    "no pending document proposal to accept".to_string(),
                ))
            }
        };

        store
            .save(self.kind, &self.project_id, &proposed)
            .await
            .map_err(|err| ClientError::Persistence(err.to_string()))?;

        self.current = proposed.clone();
        self.proposal = None;
        Ok(proposed)
    }

    /// Discard the proposal; live content stays at its pre-session value
    pub fn reject(&mut self) -> &str {
        if self.proposal.take().is_some() {
            log::debug!(
                "rejected pending proposal for {}",
                self.kind.display_name()
            );
        }
        &self.current
    }

    /// Navigating away from an open proposal discards it (never auto-commit)
    pub fn discard(&mut self) {
        self.reject();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::document::Document;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// In-memory document store; optionally failing to test retry semantics
    #[derive(Default)]
    struct MemoryStore {
        saved: Mutex<Vec<(DocumentKind, String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl DocumentStore for MemoryStore {
        async fn fetch(&self, kind: DocumentKind, project_id: &str) -> ClientResult<Document> {
            let _ = kind;
            Ok(Document {
                project_id: project_id.to_string(),
                content: String::new(),
            })
        }

        async fn save(
            &self,
            kind: DocumentKind,
            project_id: &str,
            content: &str,
        ) -> ClientResult<()> {
            if self.fail {
                return Err(ClientError::Network {
                    status: 500,
                    body: "save failed".to_string(),
                });
            }
            self.saved.lock().unwrap().push((
                kind,
                project_id.to_string(),
                content.to_string(),
            ));
            Ok(())
        }
    }

    fn reconciler() -> DocumentReconciler {
        DocumentReconciler::new(
            DocumentKind::Plan,
            "p1".to_string(),
            "# Old Plan".to_string(),
        )
    }

    #[test]
    fn test_first_delta_captures_baseline_and_seeds_proposal() {
        let mut rec = reconciler();
        assert!(!rec.has_pending());

        rec.apply_delta("# Plan\n");
        let proposal = rec.proposal().unwrap();
        assert_eq!(proposal.baseline(), "# Old Plan");
        assert_eq!(proposal.proposed(), "# Plan\n");
    }

    #[test]
    fn test_subsequent_deltas_append_and_baseline_stays_frozen() {
        let mut rec = reconciler();
        rec.apply_delta("# Plan\n");
        rec.apply_delta("+ PayPal\n");
        rec.apply_delta("+ Stripe\n");

        let proposal = rec.proposal().unwrap();
        assert_eq!(proposal.proposed(), "# Plan\n+ PayPal\n+ Stripe\n");
        assert_eq!(proposal.baseline(), "# Old Plan");
    }

    #[test]
    fn test_reject_restores_pre_session_content() {
        let mut rec = reconciler();
        rec.apply_delta("completely new text");
        let restored = rec.reject().to_string();
        assert_eq!(restored, "# Old Plan");
        assert_eq!(rec.content(), "# Old Plan");
        assert!(!rec.has_pending());
    }

    #[tokio::test]
    async fn test_accept_persists_final_concatenation() {
        let store = MemoryStore::default();
        let mut rec = reconciler();
        rec.apply_delta("# Plan\n");
        rec.apply_delta("+ PayPal\n");

        let accepted = rec.accept(&store).await.unwrap();
        assert_eq!(accepted, "# Plan\n+ PayPal\n");
        assert_eq!(rec.content(), "# Plan\n+ PayPal\n");
        assert!(!rec.has_pending());

        let saved = store.saved.lock().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(
            saved[0],
            (
                DocumentKind::Plan,
                "p1".to_string(),
                "# Plan\n+ PayPal\n".to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_failed_accept_preserves_proposal_for_retry() {
        let store = MemoryStore {
            fail: true,
            ..Default::default()
        };
        let mut rec = reconciler();
        rec.apply_delta("proposed");

        let err = rec.accept(&store).await.unwrap_err();
        assert_eq!(err.code(), "PERSISTENCE_ERROR");
        // Proposal intact, live content untouched
        assert_eq!(rec.proposal().unwrap().proposed(), "proposed");
        assert_eq!(rec.content(), "# Old Plan");
    }

    #[tokio::test]
    async fn test_accept_without_proposal_is_invalid() {
        let store = MemoryStore::default();
        let mut rec = reconciler();
        let err = rec.accept(&store).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
    }

    #[test]
    fn test_set_content_is_frozen_while_proposal_pending() {
        let mut rec = reconciler();
        rec.apply_delta("proposed");
        rec.set_content("reloaded from elsewhere".to_string());
        assert_eq!(rec.proposal().unwrap().baseline(), "# Old Plan");
        assert_eq!(rec.content(), "# Old Plan");

        rec.reject();
        rec.set_content("reloaded from elsewhere".to_string());
        assert_eq!(rec.content(), "reloaded from elsewhere");
    }
}
