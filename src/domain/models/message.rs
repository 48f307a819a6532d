//! Chat message model shared by the orchestrator and the generation gateway.

use serde::{Deserialize, Serialize};

/// Role of a message in an ordered conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions injected ahead of the conversation.
    System,
    /// End-user turn. The last user message identifies the query.
    User,
    /// Model turn.
    Assistant,
}

/// A single message in an ordered conversation.
///
/// Order is meaningful: retrieval scans from the end for the last
/// [`Role::User`] message, and a leading [`Role::System`] message is the
/// slot the retrieved context is installed into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who produced this message.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}
