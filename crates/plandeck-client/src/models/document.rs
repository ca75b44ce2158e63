// Document data models
// Feature: Proposal Review (032-proposal-review)

use serde::{Deserialize, Serialize};

/// Planning document flavor
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentKind {
    Plan,
    TechSpec,
}

impl DocumentKind {
    /// Persistence endpoint root for this document flavor
    pub fn endpoint_root(&self) -> &'static str {
        match self {
            DocumentKind::Plan => "/documents/plan",
            DocumentKind::TechSpec => "/documents/tech-spec",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            DocumentKind::Plan => "Project Plan",
            DocumentKind::TechSpec => "Technical Specifications",
        }
    }
}

/// Document payload as the persistence endpoints exchange it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub project_id: String,
    pub content: String,
}
