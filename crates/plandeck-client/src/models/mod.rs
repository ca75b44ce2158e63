// Data models

pub mod chat;
pub mod document;
pub mod issue;
