// Issue data models
// Feature: Issue Board (027-issue-board)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issue workflow status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum IssueStatus {
    Todo,
    InProgress,
    Review,
    Done,
}

impl std::fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueStatus::Todo => write!(f, "todo"),
            IssueStatus::InProgress => write!(f, "in-progress"),
            IssueStatus::Review => write!(f, "review"),
            IssueStatus::Done => write!(f, "done"),
        }
    }
}

impl std::str::FromStr for IssueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "todo" => Ok(IssueStatus::Todo),
            "in-progress" => Ok(IssueStatus::InProgress),
            "review" => Ok(IssueStatus::Review),
            "done" => Ok(IssueStatus::Done),
            _ => Err(format!("Invalid issue status: {}", s)),
        }
    }
}

/// Issue priority
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IssuePriority {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for IssuePriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssuePriority::Low => write!(f, "low"),
            IssuePriority::Medium => write!(f, "medium"),
            IssuePriority::High => write!(f, "high"),
        }
    }
}

impl std::str::FromStr for IssuePriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(IssuePriority::Low),
            "medium" => Ok(IssuePriority::Medium),
            "high" => Ok(IssuePriority::High),
            _ => Err(format!("Invalid issue priority: {}", s)),
        }
    }
}

/// Where an issue set lives (project-local or mirrored from GitHub)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum IssueSource {
    #[default]
    Local,
    GitHub,
}

/// Comment on an issue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: String,
    pub content: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
}

impl Comment {
    pub fn new(author: String, content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content,
            author,
            timestamp: Utc::now(),
        }
    }
}

/// Issue entity - a single ticket in a project
///
/// An empty `issue_id` marks a proposed ticket that has not been created
/// server-side yet (it exists only inside a pending change until accepted).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Issue {
    pub project_id: String,
    pub issue_id: String,
    pub title: String,
    pub description: String,
    pub status: IssueStatus,
    pub priority: IssuePriority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Issue {
    /// Create a proposed issue that has not been persisted yet
    pub fn proposed(project_id: String, title: String) -> Self {
        Self {
            project_id,
            issue_id: String::new(),
            title,
            description: String::new(),
            status: IssueStatus::Todo,
            priority: IssuePriority::Medium,
            assignee: None,
            comments: Vec::new(),
        }
    }

    /// Whether this issue exists server-side
    pub fn is_persisted(&self) -> bool {
        !self.issue_id.is_empty()
    }
}
