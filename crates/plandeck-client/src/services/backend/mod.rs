// Backend API clients
// Feature: Project Persistence (018-project-persistence)
//
// External collaborators of the streaming core: the document and issue
// persistence endpoints. Both are exposed behind traits so the
// reconciliation engine and the board cache can be exercised against
// in-memory stores in tests.

pub mod documents;
pub mod issues;

use async_trait::async_trait;

pub use documents::DocumentsApi;
pub use issues::IssuesApi;

use crate::error::{ClientError, ClientResult};
use crate::models::document::{Document, DocumentKind};
use crate::models::issue::{Issue, IssueStatus};

/// Document persistence collaborator
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn fetch(&self, kind: DocumentKind, project_id: &str) -> ClientResult<Document>;
    async fn save(&self, kind: DocumentKind, project_id: &str, content: &str) -> ClientResult<()>;
}

/// Issue persistence collaborator
#[async_trait]
pub trait IssueStore: Send + Sync {
    async fn list(&self, project_id: &str) -> ClientResult<Vec<Issue>>;
    async fn create(&self, issue: &Issue) -> ClientResult<Issue>;
    async fn update(&self, issue: &Issue) -> ClientResult<()>;
    async fn delete(&self, project_id: &str, issue_id: &str) -> ClientResult<()>;
}

/// Shared HTTP client + base URL for all backend endpoints
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Use an existing reqwest client (connection pooling, custom TLS)
    pub fn with_http(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{}{}", base, path)
    }
}

/// Pass a 2xx response through; otherwise surface status code and body text
pub(crate) async fn ensure_success(response: reqwest::Response) -> ClientResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(ClientError::Network {
            status: status.as_u16(),
            body,
        })
    }
}

/// Convenience for the board cache: issue with its status replaced
pub(crate) fn with_status(issue: &Issue, status: IssueStatus) -> Issue {
    Issue {
        status,
        ..issue.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining_trims_trailing_slash() {
        let client = BackendClient::new("http://localhost:8000/");
        assert_eq!(
            client.url("/chat/plan/stream"),
            "http://localhost:8000/chat/plan/stream"
        );
        let bare = BackendClient::new("http://localhost:8000");
        assert_eq!(bare.url("/issues/p1"), "http://localhost:8000/issues/p1");
    }
}
