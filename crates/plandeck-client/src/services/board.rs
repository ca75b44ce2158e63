// Issue Board Cache
// Feature: Issue Board (027-issue-board)
//
// Client-side cache of the canonical ticket list. Writes happen only on
// explicit accept or a confirmed status change; a status change is
// transactional: snapshot the old value, apply the new one optimistically,
// and restore the snapshot if the server write fails.

use std::collections::HashMap;

use crate::error::{ClientError, ClientResult};
use crate::models::issue::{Issue, IssueStatus};
use crate::services::backend::{with_status, IssueStore};

/// Cached ticket list for one project
pub struct IssueBoard {
    project_id: String,
    issues: Vec<Issue>,
}

impl IssueBoard {
    pub fn new(project_id: String) -> Self {
        Self {
            project_id,
            issues: Vec::new(),
        }
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn get(&self, issue_id: &str) -> Option<&Issue> {
        self.issues.iter().find(|issue| issue.issue_id == issue_id)
    }

    /// Reload the cache from the server
    pub async fn refresh(&mut self, store: &dyn IssueStore) -> ClientResult<()> {
        self.issues = store.list(&self.project_id).await?;
        Ok(())
    }

    /// Replace the cache with a streamed snapshot
    pub fn replace(&mut self, issues: Vec<Issue>) {
        self.issues = issues;
    }

    /// Insert a ticket created through an accepted proposal
    pub fn insert(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    /// Evict a ticket deleted through an accepted removal
    pub fn evict(&mut self, issue_id: &str) -> Option<Issue> {
        let position = self
            .issues
            .iter()
            .position(|issue| issue.issue_id == issue_id)?;
        Some(self.issues.remove(position))
    }

    /// Move a ticket to a new status.
    ///
    /// The cache is updated optimistically before the server write; if the
    /// write fails the snapshot is restored and the error propagated.
    pub async fn set_status(
        &mut self,
        issue_id: &str,
        status: IssueStatus,
        store: &dyn IssueStore,
    ) -> ClientResult<()> {
        let position = self
            .issues
            .iter()
            .position(|issue| issue.issue_id == issue_id)
            .ok_or_else(|| {
                ClientError::InvalidInput(format!("unknown issue {:?}", issue_id))
            })?;

        let snapshot = self.issues[position].clone();
        if snapshot.status == status {
            return Ok(());
        }

        let updated = with_status(&snapshot, status);
        self.issues[position] = updated.clone();

        if let Err(err) = store.update(&updated).await {
            log::warn!(
                "status update for issue {} failed, rolling back: {}",
                issue_id,
                err
            );
            self.issues[position] = snapshot;
            return Err(ClientError::Persistence(err.to_string()));
        }
        Ok(())
    }

    /// Tickets grouped by status, for column-style display
    pub fn by_status(&self) -> HashMap<IssueStatus, Vec<&Issue>> {
        let mut groups: HashMap<IssueStatus, Vec<&Issue>> = HashMap::new();
        for status in [
            IssueStatus::Todo,
            IssueStatus::InProgress,
            IssueStatus::Review,
            IssueStatus::Done,
        ] {
            groups.insert(status, Vec::new());
        }
        for issue in &self.issues {
            groups.entry(issue.status).or_default().push(issue);
        }
        groups
    }
}
