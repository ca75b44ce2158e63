// Issue persistence client
// Feature: Issue Board (027-issue-board)

use async_trait::async_trait;

use super::{ensure_success, BackendClient, IssueStore};
use crate::error::ClientResult;
use crate::models::issue::{Issue, IssueSource};

/// HTTP client for the issue endpoints, local or GitHub-mirrored
///
/// `GET /issues/{project_id}`, `POST /issues/`,
/// `PUT /issues/{project_id}/{issue_id}`,
/// `DELETE /issues/{project_id}/{issue_id}`; the GitHub mirror uses the same
/// shapes under `/github/issues/...`.
#[derive(Debug, Clone)]
pub struct IssuesApi {
    client: BackendClient,
    source: IssueSource,
}

impl IssuesApi {
    pub fn new(client: BackendClient) -> Self {
        Self {
            client,
            source: IssueSource::Local,
        }
    }

    pub fn with_source(client: BackendClient, source: IssueSource) -> Self {
        Self { client, source }
    }

    pub fn source(&self) -> IssueSource {
        self.source
    }

    fn root(&self) -> &'static str {
        match self.source {
            IssueSource::Local => "/issues",
            IssueSource::GitHub => "/github/issues",
        }
    }
}

#[async_trait]
impl IssueStore for IssuesApi {
    async fn list(&self, project_id: &str) -> ClientResult<Vec<Issue>> {
        let url = self.client.url(&format!("{}/{}", self.root(), project_id));
        let response = self.client.http().get(url).send().await?;
        let issues = ensure_success(response).await?.json::<Vec<Issue>>().await?;
        Ok(issues)
    }

    async fn create(&self, issue: &Issue) -> ClientResult<Issue> {
        let url = self.client.url(&format!("{}/", self.root()));
        let response = self.client.http().post(url).json(issue).send().await?;
        let created = ensure_success(response).await?.json::<Issue>().await?;
        log::debug!(
            "created issue {} in project {}",
            created.issue_id,
            created.project_id
        );
        Ok(created)
    }

    async fn update(&self, issue: &Issue) -> ClientResult<()> {
        let url = self.client.url(&format!(
            "{}/{}/{}",
            self.root(),
            issue.project_id,
            issue.issue_id
        ));
        let response = self.client.http().put(url).json(issue).send().await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn delete(&self, project_id: &str, issue_id: &str) -> ClientResult<()> {
        let url = self
            .client
            .url(&format!("{}/{}/{}", self.root(), project_id, issue_id));
        let response = self.client.http().delete(url).send().await?;
        ensure_success(response).await?;
        log::debug!("deleted issue {} from project {}", issue_id, project_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_roots_per_source() {
        let local = IssuesApi::new(BackendClient::new("http://localhost:8000"));
        assert_eq!(local.root(), "/issues");

        let github = IssuesApi::with_source(
            BackendClient::new("http://localhost:8000"),
            IssueSource::GitHub,
        );
        assert_eq!(github.root(), "/github/issues");
    }
}
