// Reconciliation engine
// Feature: Proposal Review (032-proposal-review)

pub mod diff;
pub mod document;
pub mod issue;

pub use diff::{diff_words, DiffKind, DiffSegment};
pub use document::{DocumentProposal, DocumentReconciler};
pub use issue::IssueReconciler;
