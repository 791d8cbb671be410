use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::Identity;
use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::object::{write_commit, write_tree, ObjectStore};
use crate::ops::branch;
use crate::types::{BranchHead, Commit, Metadata, Tree, TreeEntry};

/// inputs for committing a database snapshot
#[derive(Clone, Debug)]
pub struct CommitRequest {
    /// branch to append to (created on first commit)
    pub branch: String,
    pub message: String,
    pub author: Identity,
    /// distinct committer, when committing on someone else's behalf
    pub committer: Option<Identity>,
    pub timestamp: DateTime<Utc>,
    /// file modification time recorded in the snapshot manifest
    pub last_modified: DateTime<Utc>,
    pub licence_hash: Option<Hash>,
}

impl CommitRequest {
    /// field validation that is safe to run before any state is touched
    pub fn validate(&self) -> Result<()> {
        if self.branch.is_empty() {
            return Err(Error::Validation("branch name is required".to_string()));
        }
        if self.message.is_empty() {
            return Err(Error::Validation("commit message is required".to_string()));
        }
        if self.author.name.is_empty() || self.author.email.is_empty() {
            return Err(Error::Validation(
                "commit author name and email are required".to_string(),
            ));
        }
        Ok(())
    }
}

/// create a commit: validate, compute the ID, store it as a blob, and add
/// it to the aggregate's commit map
#[allow(clippy::too_many_arguments)]
pub fn create_commit(
    objects: &impl ObjectStore,
    meta: &mut Metadata,
    parent: Option<Hash>,
    tree: Hash,
    author: &Identity,
    committer: Option<&Identity>,
    message: &str,
    timestamp: DateTime<Utc>,
) -> Result<Commit> {
    if author.name.is_empty() || author.email.is_empty() {
        return Err(Error::Validation(
            "commit author name and email are required".to_string(),
        ));
    }
    if message.is_empty() {
        return Err(Error::Validation("commit message is required".to_string()));
    }
    if let Some(parent) = parent {
        if !meta.commits.contains_key(&parent) {
            return Err(Error::Validation(format!(
                "parent commit not in local history: {}",
                parent
            )));
        }
    }

    let (committer_name, committer_email) = committer
        .map(|c| (c.name.as_str(), c.email.as_str()))
        .unwrap_or(("", ""));

    let commit = Commit::new(
        tree,
        parent,
        &author.name,
        &author.email,
        committer_name,
        committer_email,
        timestamp,
        message,
    );

    write_commit(objects, &commit)?;
    meta.commits.insert(commit.id, commit.clone());

    Ok(commit)
}

/// commit database bytes as a new snapshot on a branch.
///
/// stores the raw bytes and the snapshot manifest in the object store,
/// creates the commit, and moves the branch head forward. the branch is
/// created when this is its first commit.
pub fn commit_database(
    objects: &impl ObjectStore,
    meta: &mut Metadata,
    db_name: &str,
    bytes: &[u8],
    req: &CommitRequest,
) -> Result<Commit> {
    if db_name.is_empty() {
        return Err(Error::Validation("database name is required".to_string()));
    }
    req.validate()?;

    let content_hash = objects.put(bytes)?;
    let entry = TreeEntry::database(
        db_name,
        content_hash,
        bytes.len() as u64,
        req.last_modified,
        req.licence_hash,
    );
    let tree = Tree::new(vec![entry])?;
    write_tree(objects, &tree)?;

    let parent = meta.branches.get(&req.branch).map(|b| b.commit);
    let commit = create_commit(
        objects,
        meta,
        parent,
        tree.id,
        &req.author,
        req.committer.as_ref(),
        &req.message,
        req.timestamp,
    )?;

    if meta.branches.contains_key(&req.branch) {
        branch::append_commit(meta, &req.branch, commit.id)?;
    } else {
        meta.branches.insert(
            req.branch.clone(),
            BranchHead {
                name: req.branch.clone(),
                commit: commit.id,
                commit_count: 1,
                description: String::new(),
            },
        );
    }

    info!(db = db_name, branch = %req.branch, commit = %commit.id, "database committed");
    Ok(commit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::tests::MemStore;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2019, 3, 15, 18, 1, 1).unwrap()
    }

    fn request(branch: &str, message: &str) -> CommitRequest {
        CommitRequest {
            branch: branch.to_string(),
            message: message.to_string(),
            author: Identity::new("Default test user", "testdefault@dbhub.io"),
            committer: None,
            timestamp: ts(),
            last_modified: ts(),
            licence_hash: None,
        }
    }

    #[test]
    fn test_first_commit_creates_branch() {
        let store = MemStore::default();
        let mut meta = Metadata::new();
        let bytes = vec![0u8; 19456];

        let req = request("master", "The first commit in our test run");
        let commit = commit_database(&store, &mut meta, "test.db", &bytes, &req).unwrap();

        assert!(commit.is_root());
        let head = meta.branch("master").unwrap();
        assert_eq!(head.commit, commit.id);
        assert_eq!(head.commit_count, 1);

        // the stored blob's digest equals the SHA-256 of the input bytes
        let tree_entry_hash = Hash::digest(&bytes);
        assert!(store.contains(&tree_entry_hash));
    }

    #[test]
    fn test_first_commit_scenario() {
        // 19456-byte file, "Not specified" licence (the empty blob), fresh
        // master branch
        let store = MemStore::default();
        let mut meta = Metadata::new();
        let bytes = vec![0xABu8; 19456];

        let licence = Hash::from_hex(
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
        )
        .unwrap();
        let mut req = request("master", "The first commit in our test run");
        req.licence_hash = Some(licence);

        let commit = commit_database(&store, &mut meta, "test.db", &bytes, &req).unwrap();

        assert_eq!(commit.parent, None);
        let head = meta.branch("master").unwrap();
        assert_eq!(head.commit_count, 1);
        assert_eq!(head.commit, commit.id);

        // the stored blob is keyed by the SHA-256 of the 19456 input bytes
        let digest = Hash::digest(&bytes);
        assert_eq!(store.get(&digest).unwrap(), bytes);

        // the manifest records exactly what was committed
        let tree = crate::object::read_tree(&store, &commit.tree).unwrap();
        let entry = tree.get("test.db").unwrap();
        assert_eq!(entry.content_hash, digest);
        assert_eq!(entry.size, 19456);
        assert_eq!(entry.licence_hash, Some(licence));
    }

    #[test]
    fn test_second_commit_appends() {
        let store = MemStore::default();
        let mut meta = Metadata::new();

        let first =
            commit_database(&store, &mut meta, "test.db", b"v1", &request("master", "one")).unwrap();
        let second =
            commit_database(&store, &mut meta, "test.db", b"v2", &request("master", "two")).unwrap();

        assert_eq!(second.parent, Some(first.id));
        let head = meta.branch("master").unwrap();
        assert_eq!(head.commit, second.id);
        assert_eq!(head.commit_count, 2);
    }

    #[test]
    fn test_commit_is_deterministic() {
        let req = request("master", "same inputs");

        let s1 = MemStore::default();
        let mut m1 = Metadata::new();
        let c1 = commit_database(&s1, &mut m1, "test.db", b"bytes", &req).unwrap();

        let s2 = MemStore::default();
        let mut m2 = Metadata::new();
        let c2 = commit_database(&s2, &mut m2, "test.db", b"bytes", &req).unwrap();

        assert_eq!(c1.id, c2.id);
    }

    #[test]
    fn test_create_commit_requires_author() {
        let store = MemStore::default();
        let mut meta = Metadata::new();
        let author = Identity::new("", "");

        let result = create_commit(
            &store,
            &mut meta,
            None,
            Hash::digest(b"tree"),
            &author,
            None,
            "msg",
            ts(),
        );
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_create_commit_requires_message() {
        let store = MemStore::default();
        let mut meta = Metadata::new();
        let author = Identity::new("A", "a@x");

        let result = create_commit(
            &store,
            &mut meta,
            None,
            Hash::digest(b"tree"),
            &author,
            None,
            "",
            ts(),
        );
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_create_commit_requires_known_parent() {
        let store = MemStore::default();
        let mut meta = Metadata::new();
        let author = Identity::new("A", "a@x");

        let result = create_commit(
            &store,
            &mut meta,
            Some(Hash::digest(b"nowhere")),
            Hash::digest(b"tree"),
            &author,
            None,
            "msg",
            ts(),
        );
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_distinct_committer_changes_id() {
        let store = MemStore::default();
        let mut meta = Metadata::new();
        let mut req = request("master", "msg");
        let plain = commit_database(&store, &mut meta, "test.db", b"bytes", &req).unwrap();

        let store2 = MemStore::default();
        let mut meta2 = Metadata::new();
        req.committer = Some(Identity::new("Committer", "committer@dbhub.io"));
        let with_committer =
            commit_database(&store2, &mut meta2, "test.db", b"bytes", &req).unwrap();

        assert_ne!(plain.id, with_committer.id);
    }

    #[test]
    fn test_commit_to_new_branch_starts_new_lineage() {
        let store = MemStore::default();
        let mut meta = Metadata::new();

        commit_database(&store, &mut meta, "test.db", b"v1", &request("master", "one")).unwrap();
        let side =
            commit_database(&store, &mut meta, "test.db", b"v2", &request("dev", "side")).unwrap();

        assert!(side.is_root());
        assert_eq!(meta.branch("dev").unwrap().commit_count, 1);
        assert_eq!(meta.branch("master").unwrap().commit_count, 1);
    }
}
