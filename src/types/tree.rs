use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::hash::{tree_digest, Hash};

/// kind of item recorded in a snapshot manifest
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    /// a database file
    Database,
    /// a nested tree
    SubTree,
    /// a licence text
    Licence,
}

impl EntryType {
    /// short tag used in the canonical tree serialization
    pub fn tag(&self) -> &'static str {
        match self {
            EntryType::Database => "db",
            EntryType::SubTree => "subtree",
            EntryType::Licence => "licence",
        }
    }
}

/// one item in a snapshot manifest
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub entry_type: EntryType,
    pub name: String,
    pub content_hash: Hash,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub licence_hash: Option<Hash>,
}

impl TreeEntry {
    /// describe a database file
    pub fn database(
        name: impl Into<String>,
        content_hash: Hash,
        size: u64,
        last_modified: DateTime<Utc>,
        licence_hash: Option<Hash>,
    ) -> Self {
        Self {
            entry_type: EntryType::Database,
            name: name.into(),
            content_hash,
            size,
            last_modified,
            licence_hash,
        }
    }

    /// describe a licence text
    pub fn licence(
        name: impl Into<String>,
        content_hash: Hash,
        size: u64,
        last_modified: DateTime<Utc>,
    ) -> Self {
        Self {
            entry_type: EntryType::Licence,
            name: name.into(),
            content_hash,
            size,
            last_modified,
            licence_hash: None,
        }
    }
}

/// a snapshot manifest: an ordered list of entries with a content-derived ID.
///
/// entry order is insertion order and is part of the identity; trees are
/// never edited in place; changing the contents means building a new tree
/// with a new ID.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    pub id: Hash,
    entries: Vec<TreeEntry>,
}

impl Tree {
    /// create a tree from entries, preserving their order
    pub fn new(entries: Vec<TreeEntry>) -> Result<Self> {
        for entry in &entries {
            validate_entry_name(&entry.name)?;
        }

        for (i, entry) in entries.iter().enumerate() {
            if entries[..i].iter().any(|e| e.name == entry.name) {
                return Err(Error::Validation(format!(
                    "duplicate tree entry name: {}",
                    entry.name
                )));
            }
        }

        let id = tree_digest(&entries);
        Ok(Self { id, entries })
    }

    /// build a new tree with one more entry appended (new ID)
    pub fn with_entry(&self, entry: TreeEntry) -> Result<Self> {
        let mut entries = self.entries.clone();
        entries.push(entry);
        Self::new(entries)
    }

    /// get entries slice
    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    /// look up entry by name
    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// is tree empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// validate an entry name
fn validate_entry_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::Validation("empty tree entry name".to_string()));
    }
    if name.contains('/') {
        return Err(Error::Validation(format!(
            "tree entry name contains '/': {}",
            name
        )));
    }
    if name.contains('\0') {
        return Err(Error::Validation(format!(
            "tree entry name contains null byte: {}",
            name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2019, 3, 15, 18, 1, 1).unwrap()
    }

    fn db_entry(name: &str) -> TreeEntry {
        TreeEntry::database(name, Hash::digest(name.as_bytes()), 100, ts(), None)
    }

    #[test]
    fn test_tree_preserves_insertion_order() {
        let tree = Tree::new(vec![db_entry("zebra"), db_entry("alpha"), db_entry("beta")]).unwrap();
        let names: Vec<_> = tree.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["zebra", "alpha", "beta"]);
    }

    #[test]
    fn test_tree_id_depends_on_order() {
        let t1 = Tree::new(vec![db_entry("a"), db_entry("b")]).unwrap();
        let t2 = Tree::new(vec![db_entry("b"), db_entry("a")]).unwrap();
        assert_ne!(t1.id, t2.id);
    }

    #[test]
    fn test_identical_entries_identical_id() {
        let t1 = Tree::new(vec![db_entry("a"), db_entry("b")]).unwrap();
        let t2 = Tree::new(vec![db_entry("a"), db_entry("b")]).unwrap();
        assert_eq!(t1.id, t2.id);
    }

    #[test]
    fn test_with_entry_yields_new_id() {
        let tree = Tree::new(vec![db_entry("a")]).unwrap();
        let grown = tree.with_entry(db_entry("b")).unwrap();
        assert_ne!(tree.id, grown.id);
        assert_eq!(tree.len(), 1);
        assert_eq!(grown.len(), 2);
    }

    #[test]
    fn test_tree_get() {
        let tree = Tree::new(vec![db_entry("a"), db_entry("b")]).unwrap();
        assert!(tree.get("a").is_some());
        assert!(tree.get("c").is_none());
    }

    #[test]
    fn test_tree_rejects_bad_names() {
        assert!(Tree::new(vec![db_entry("")]).is_err());
        assert!(Tree::new(vec![db_entry("foo/bar")]).is_err());
        assert!(Tree::new(vec![db_entry("foo\0bar")]).is_err());
    }

    #[test]
    fn test_tree_rejects_duplicates() {
        let result = Tree::new(vec![db_entry("same"), db_entry("same")]);
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_entry_type_tags() {
        assert_eq!(EntryType::Database.tag(), "db");
        assert_eq!(EntryType::SubTree.tag(), "subtree");
        assert_eq!(EntryType::Licence.tag(), "licence");
    }

    #[test]
    fn test_tree_json_roundtrip() {
        let mut entry = db_entry("main.db");
        entry.licence_hash = Some(Hash::digest(b""));
        let tree = Tree::new(vec![entry, db_entry("other.db")]).unwrap();

        let json = serde_json::to_string(&tree).unwrap();
        let parsed: Tree = serde_json::from_str(&json).unwrap();
        assert_eq!(tree, parsed);
    }
}
