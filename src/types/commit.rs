use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hash::{commit_digest, Hash};

/// an immutable, hash-identified snapshot event referencing one tree and
/// (optionally) a parent commit
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// content-derived identity
    pub id: Hash,
    /// root tree hash
    pub tree: Hash,
    /// parent commit (absent for a root commit)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Hash>,
    /// reserved for future multi-parent history; never populated today
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub other_parents: Vec<Hash>,
    pub author_name: String,
    pub author_email: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub committer_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub committer_email: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl Commit {
    /// assemble a commit and compute its identity.
    ///
    /// field validation (non-empty author, known parent) lives in
    /// `ops::commit::create_commit`; this is pure assembly.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tree: Hash,
        parent: Option<Hash>,
        author_name: impl Into<String>,
        author_email: impl Into<String>,
        committer_name: impl Into<String>,
        committer_email: impl Into<String>,
        timestamp: DateTime<Utc>,
        message: impl Into<String>,
    ) -> Self {
        let author_name = author_name.into();
        let author_email = author_email.into();
        let committer_name = committer_name.into();
        let committer_email = committer_email.into();
        let message = message.into();

        let id = commit_digest(
            &tree,
            parent.as_ref(),
            &author_name,
            &author_email,
            &committer_name,
            &committer_email,
            &timestamp,
            &message,
        );

        Self {
            id,
            tree,
            parent,
            other_parents: vec![],
            author_name,
            author_email,
            committer_name,
            committer_email,
            timestamp,
            message,
        }
    }

    /// is this a root commit (no parent)
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}
