// Document persistence client
// Feature: Project Persistence (018-project-persistence)

use async_trait::async_trait;

use super::{ensure_success, BackendClient, DocumentStore};
use crate::error::ClientResult;
use crate::models::document::{Document, DocumentKind};

/// HTTP client for the plan/tech-spec document endpoints
///
/// `GET /documents/{kind}/{project_id}` and
/// `POST /documents/{kind}/{project_id}` with body `{project_id, content}`.
#[derive(Debug, Clone)]
pub struct DocumentsApi {
    client: BackendClient,
}

impl DocumentsApi {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }

    fn url(&self, kind: DocumentKind, project_id: &str) -> String {
        self.client
            .url(&format!("{}/{}", kind.endpoint_root(), project_id))
    }
}

#[async_trait]
impl DocumentStore for DocumentsApi {
    async fn fetch(&self, kind: DocumentKind, project_id: &str) -> ClientResult<Document> {
        let response = self
            .client
            .http()
            .get(self.url(kind, project_id))
            .send()
            .await?;
        let document = ensure_success(response).await?.json::<Document>().await?;
        Ok(document)
    }

    async fn save(&self, kind: DocumentKind, project_id: &str, content: &str) -> ClientResult<()> {
        let body = Document {
            project_id: project_id.to_string(),
            content: content.to_string(),
        };
        let response = self
            .client
            .http()
            .post(self.url(kind, project_id))
            .json(&body)
            .send()
            .await?;
        ensure_success(response).await?;
        log::debug!(
            "saved {} for project {} ({} bytes)",
            kind.display_name(),
            project_id,
            content.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_urls() {
        let api = DocumentsApi::new(BackendClient::new("http://localhost:8000"));
        assert_eq!(
            api.url(DocumentKind::Plan, "p1"),
            "http://localhost:8000/documents/plan/p1"
        );
        assert_eq!(
            api.url(DocumentKind::TechSpec, "p1"),
            "http://localhost:8000/documents/tech-spec/p1"
        );
    }
}
