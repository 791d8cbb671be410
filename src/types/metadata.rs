use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::types::Commit;

/// branch name used when a database is committed for the first time
pub const DEFAULT_BRANCH: &str = "master";

/// a mutable named pointer to the latest commit in a line of history
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchHead {
    pub name: String,
    pub commit: Hash,
    /// number of commits reachable from `commit` inclusive along this
    /// branch's lineage; increments by exactly one per appended commit
    pub commit_count: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// lightweight vs annotated tag
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagType {
    Simple,
    Annotated,
}

/// a named pointer to a commit with tagger bookkeeping
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub commit: Hash,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    pub tagger_name: String,
    pub tagger_email: String,
    pub tag_type: TagType,
}

/// a named, immutable snapshot marker.
///
/// `size` records the database file size at release time; it is never
/// re-derived from the object store afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub name: String,
    pub commit: Hash,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub releaser_name: String,
    pub releaser_email: String,
    pub size: u64,
}

/// the per-database aggregate persisted locally and remotely.
///
/// read and written as a whole unit so on-disk state stays internally
/// consistent. `active_branch` is a purely local pointer; `default_branch`
/// is the server-authoritative branch shown to other viewers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub active_branch: String,
    pub default_branch: String,
    pub branches: BTreeMap<String, BranchHead>,
    pub commits: BTreeMap<Hash, Commit>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, Tag>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub releases: BTreeMap<String, Release>,
}

impl Metadata {
    /// empty aggregate for a database that has no commits yet
    pub fn new() -> Self {
        Self {
            active_branch: DEFAULT_BRANCH.to_string(),
            default_branch: DEFAULT_BRANCH.to_string(),
            branches: BTreeMap::new(),
            commits: BTreeMap::new(),
            tags: BTreeMap::new(),
            releases: BTreeMap::new(),
        }
    }

    /// look up a branch head
    pub fn branch(&self, name: &str) -> Result<&BranchHead> {
        self.branches
            .get(name)
            .ok_or_else(|| Error::BranchNotFound(name.to_string()))
    }

    /// look up a commit by id
    pub fn commit(&self, id: &Hash) -> Result<&Commit> {
        self.commits.get(id).ok_or(Error::CommitNotFound(*id))
    }

    /// head commit of the active branch
    pub fn head_commit(&self) -> Result<&Commit> {
        let head = self.branch(&self.active_branch)?;
        self.commit(&head.commit)
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2019, 3, 15, 18, 1, 1).unwrap()
    }

    #[test]
    fn test_new_metadata_is_empty() {
        let meta = Metadata::new();
        assert_eq!(meta.active_branch, DEFAULT_BRANCH);
        assert_eq!(meta.default_branch, DEFAULT_BRANCH);
        assert!(meta.branches.is_empty());
        assert!(meta.commits.is_empty());
    }

    #[test]
    fn test_branch_lookup() {
        let mut meta = Metadata::new();
        meta.branches.insert(
            "master".to_string(),
            BranchHead {
                name: "master".to_string(),
                commit: Hash::digest(b"c"),
                commit_count: 1,
                description: String::new(),
            },
        );

        assert!(meta.branch("master").is_ok());
        assert!(matches!(
            meta.branch("missing"),
            Err(Error::BranchNotFound(_))
        ));
    }

    #[test]
    fn test_head_commit_requires_commits() {
        let meta = Metadata::new();
        assert!(meta.head_commit().is_err());
    }

    #[test]
    fn test_metadata_json_roundtrip() {
        let mut meta = Metadata::new();
        let commit = Commit::new(
            Hash::digest(b"tree"),
            None,
            "Author",
            "author@example.org",
            "",
            "",
            ts(),
            "first",
        );
        meta.branches.insert(
            "master".to_string(),
            BranchHead {
                name: "master".to_string(),
                commit: commit.id,
                commit_count: 1,
                description: "main line".to_string(),
            },
        );
        meta.commits.insert(commit.id, commit.clone());
        meta.tags.insert(
            "v1".to_string(),
            Tag {
                name: "v1".to_string(),
                commit: commit.id,
                date: ts(),
                message: "first tag".to_string(),
                tagger_name: "Author".to_string(),
                tagger_email: "author@example.org".to_string(),
                tag_type: TagType::Annotated,
            },
        );
        meta.releases.insert(
            "r1".to_string(),
            Release {
                name: "r1".to_string(),
                commit: commit.id,
                date: ts(),
                description: String::new(),
                releaser_name: "Author".to_string(),
                releaser_email: "author@example.org".to_string(),
                size: 19456,
            },
        );

        let json = serde_json::to_string_pretty(&meta).unwrap();
        let parsed: Metadata = serde_json::from_str(&json).unwrap();
        assert_eq!(meta, parsed);
    }

    #[test]
    fn test_metadata_json_deterministic() {
        // BTreeMap registries serialize in key order regardless of insertion order
        let mut m1 = Metadata::new();
        let mut m2 = Metadata::new();
        for name in ["b", "a", "c"] {
            m1.branches.insert(
                name.to_string(),
                BranchHead {
                    name: name.to_string(),
                    commit: Hash::ZERO,
                    commit_count: 1,
                    description: String::new(),
                },
            );
        }
        for name in ["c", "a", "b"] {
            m2.branches.insert(
                name.to_string(),
                BranchHead {
                    name: name.to_string(),
                    commit: Hash::ZERO,
                    commit_count: 1,
                    description: String::new(),
                },
            );
        }

        assert_eq!(
            serde_json::to_string(&m1).unwrap(),
            serde_json::to_string(&m2).unwrap()
        );
    }
}
