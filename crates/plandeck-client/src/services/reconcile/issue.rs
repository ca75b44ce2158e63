// Issue Reconciliation
// Feature: Proposal Review (032-proposal-review)
//
// Issue-list chats stream line-oriented tagged text: `+<title>` proposes a
// new ticket, `-<issue_id>` proposes a removal. The engine accumulates the
// raw text and re-derives the pending sets on every read; a line only leaves
// the pending text on an explicit per-item accept or reject, by exact line
// match so unrelated lines sharing a substring are never touched.

use crate::error::{ClientError, ClientResult};
use crate::models::issue::Issue;
use crate::services::backend::IssueStore;

/// Reconciles streamed issue proposals for one project
pub struct IssueReconciler {
    project_id: String,
    pending: String,
}

impl IssueReconciler {
    pub fn new(project_id: String) -> Self {
        Self {
            project_id,
            pending: String::new(),
        }
    }

    /// Append one streamed delta to the accumulated proposal text
    pub fn apply_delta(&mut self, delta: &str) {
        self.pending.push_str(delta);
    }

    /// Raw accumulated proposal text
    pub fn pending_text(&self) -> &str {
        &self.pending
    }

    /// Proposed new ticket titles, in stream order
    pub fn additions(&self) -> Vec<String> {
        self.pending
            .lines()
            .filter_map(|line| line.strip_prefix('+'))
            .map(str::to_string)
            .collect()
    }

    /// Proposed removals by issue id, in stream order
    pub fn removals(&self) -> Vec<String> {
        self.pending
            .lines()
            .filter_map(|line| line.strip_prefix('-'))
            .map(str::to_string)
            .collect()
    }

    pub fn has_pending(&self) -> bool {
        !self.additions().is_empty() || !self.removals().is_empty()
    }

    /// Accept one proposed addition: create the ticket server-side (status
    /// todo), then clear exactly that line. On persistence failure the line
    /// stays pending so the user can retry.
    pub async fn accept_addition(
        &mut self,
        title: &str,
        store: &dyn IssueStore,
    ) -> ClientResult<Issue> {
        let line = format!("+{}", title);
        if !self.contains_line(&line) {
            return Err(ClientError::InvalidInput(format!(
                "no pending addition titled {:?}",
                title
            )));
        }

        let proposed = Issue::proposed(self.project_id.clone(), title.to_string());
        let created = store
            .create(&proposed)
            .await
            .map_err(|err| ClientError::Persistence(err.to_string()))?;

        self.remove_line(&line);
        log::debug!("accepted proposed issue {:?} as {}", title, created.issue_id);
        Ok(created)
    }

    /// Accept one proposed removal: delete the ticket server-side, then
    /// clear exactly that line
    pub async fn accept_removal(
        &mut self,
        issue_id: &str,
        store: &dyn IssueStore,
    ) -> ClientResult<()> {
        let line = format!("-{}", issue_id);
        if !self.contains_line(&line) {
            return Err(ClientError::InvalidInput(format!(
                "no pending removal for issue {:?}",
                issue_id
            )));
        }

        store
            .delete(&self.project_id, issue_id)
            .await
            .map_err(|err| ClientError::Persistence(err.to_string()))?;

        self.remove_line(&line);
        log::debug!("accepted removal of issue {}", issue_id);
        Ok(())
    }

    /// Reject one proposed addition: clear the line, no server call
    pub fn reject_addition(&mut self, title: &str) -> bool {
        self.remove_line(&format!("+{}", title))
    }

    /// Reject one proposed removal: clear the line, no server call
    pub fn reject_removal(&mut self, issue_id: &str) -> bool {
        self.remove_line(&format!("-{}", issue_id))
    }

    /// Drop the whole proposal (navigation away / tab switch)
    pub fn discard(&mut self) {
        self.pending.clear();
    }

    fn contains_line(&self, line: &str) -> bool {
        self.pending.lines().any(|l| l == line)
    }

    /// Remove the first exact occurrence of `line`, leaving every other
    /// pending line untouched
    fn remove_line(&mut self, line: &str) -> bool {
        let mut removed = false;
        let mut kept: Vec<&str> = Vec::new();
        for candidate in self.pending.lines() {
            if !removed && candidate == line {
                removed = true;
            } else {
                kept.push(candidate);
            }
        }
        if removed {
            self.pending = kept.join("\n");
        }
        removed
    }
}
