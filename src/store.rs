use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use nix::fcntl::{Flock, FlockArg};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, IoResultExt, Result};
use crate::hash::{commit_digest, tree_digest, Hash};
use crate::object::{
    self, blob_exists_at, list_blobs_at, read_blob_at, read_file_blob_at, write_blob_at,
    write_keyed_at, ObjectStore,
};
use crate::types::{BranchHead, Commit, Metadata, Release, Tag, Tree, DEFAULT_BRANCH};

const BRANCH_HEADS_FILE: &str = "branchHeads";
const TAGS_FILE: &str = "tags";
const RELEASES_FILE: &str = "releases";
const DEFAULT_BRANCH_FILE: &str = "defaultBranch";
const LOCK_FILE: &str = ".lock";

/// the authoritative storage root.
///
/// layout:
///
/// ```text
/// <root>/files/<hex>                 blobs: raw database bytes, tree/commit JSON
/// <root>/meta/<db>/branchHeads       JSON map, branch name -> head
/// <root>/meta/<db>/tags              JSON map (absent == empty)
/// <root>/meta/<db>/releases          JSON map (absent == empty)
/// <root>/meta/<db>/defaultBranch     raw branch name text
/// <root>/tmp/                        staging for atomic writes
/// ```
pub struct Store {
    root: PathBuf,
}

impl Store {
    /// open a storage root, creating the skeleton if it is missing
    pub fn open(root: &Path) -> Result<Self> {
        fs::create_dir_all(root.join("files")).with_path(root)?;
        fs::create_dir_all(root.join("meta")).with_path(root)?;
        fs::create_dir_all(root.join("tmp")).with_path(root)?;

        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// storage root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// path to the blob directory
    pub fn files_path(&self) -> PathBuf {
        self.root.join("files")
    }

    /// path to the metadata directory
    pub fn meta_path(&self) -> PathBuf {
        self.root.join("meta")
    }

    /// path to one database's metadata directory
    pub fn db_meta_path(&self, db_name: &str) -> PathBuf {
        self.meta_path().join(db_name)
    }

    /// path to the staging directory for atomic writes
    pub fn tmp_path(&self) -> PathBuf {
        self.root.join("tmp")
    }

    /// create the metadata namespace for a database; idempotent, and the
    /// single place namespace creation happens
    pub fn ensure_namespace(&self, db_name: &str) -> Result<()> {
        validate_db_name(db_name)?;
        let dir = self.db_meta_path(db_name);
        fs::create_dir_all(&dir).with_path(&dir)?;
        Ok(())
    }

    /// does this database have a metadata namespace
    pub fn has_database(&self, db_name: &str) -> bool {
        self.db_meta_path(db_name).is_dir()
    }

    /// names of all databases known to this store, sorted
    pub fn list_databases(&self) -> Result<Vec<String>> {
        let meta = self.meta_path();
        let mut names = Vec::new();

        for entry in fs::read_dir(&meta).with_path(&meta)? {
            let entry = entry.with_path(&meta)?;
            if entry.file_type().with_path(&meta)?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }

        names.sort();
        Ok(names)
    }

    /// acquire the exclusive per-database lock, blocking until available.
    ///
    /// all read-modify-write cycles over one database's registries must run
    /// under this guard; writers of different databases never contend.
    pub fn lock_db(&self, db_name: &str) -> Result<DbLock> {
        self.ensure_namespace(db_name)?;
        let lock_path = self.db_meta_path(db_name).join(LOCK_FILE);
        let file = File::create(&lock_path).with_path(&lock_path)?;

        let flock = Flock::lock(file, FlockArg::LockExclusive).map_err(|(_, errno)| Error::Io {
            path: lock_path,
            source: std::io::Error::from_raw_os_error(errno as i32),
        })?;

        Ok(DbLock { _flock: flock })
    }

    /// run a function while holding the per-database lock
    pub fn with_db_lock<T, F>(&self, db_name: &str, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let _lock = self.lock_db(db_name)?;
        f()
    }

    // --- registries -------------------------------------------------------

    /// read the branch-head map; an absent file means no commits yet
    pub fn read_branch_heads(&self, db_name: &str) -> Result<BTreeMap<String, BranchHead>> {
        self.read_registry(db_name, BRANCH_HEADS_FILE)
    }

    pub fn write_branch_heads(
        &self,
        db_name: &str,
        heads: &BTreeMap<String, BranchHead>,
    ) -> Result<()> {
        self.write_registry(db_name, BRANCH_HEADS_FILE, heads)
    }

    pub fn read_tags(&self, db_name: &str) -> Result<BTreeMap<String, Tag>> {
        self.read_registry(db_name, TAGS_FILE)
    }

    pub fn write_tags(&self, db_name: &str, tags: &BTreeMap<String, Tag>) -> Result<()> {
        self.write_registry(db_name, TAGS_FILE, tags)
    }

    pub fn read_releases(&self, db_name: &str) -> Result<BTreeMap<String, Release>> {
        self.read_registry(db_name, RELEASES_FILE)
    }

    pub fn write_releases(&self, db_name: &str, releases: &BTreeMap<String, Release>) -> Result<()> {
        self.write_registry(db_name, RELEASES_FILE, releases)
    }

    /// branch shown by default to viewers of this database
    pub fn default_branch(&self, db_name: &str) -> Result<String> {
        if !self.has_database(db_name) {
            return Err(Error::DatabaseNotFound(db_name.to_string()));
        }

        let path = self.db_meta_path(db_name).join(DEFAULT_BRANCH_FILE);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(content.trim().to_string()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(DEFAULT_BRANCH.to_string())
            }
            Err(e) => Err(Error::Io { path, source: e }),
        }
    }

    /// set the default branch; the branch must exist
    pub fn set_default_branch(&self, db_name: &str, branch: &str) -> Result<()> {
        self.with_db_lock(db_name, || {
            let heads = self.read_branch_heads(db_name)?;
            if !heads.contains_key(branch) {
                return Err(Error::BranchNotFound(branch.to_string()));
            }

            let path = self.db_meta_path(db_name).join(DEFAULT_BRANCH_FILE);
            self.write_atomic(&path, branch.as_bytes())?;
            info!(db = db_name, branch, "default branch updated");
            Ok(())
        })
    }

    /// persist every server-side registry of an aggregate in one pass.
    ///
    /// must be called under the per-database lock. `active_branch` is a
    /// local-only concept and is not persisted here.
    pub fn persist_registries(&self, db_name: &str, meta: &Metadata) -> Result<()> {
        self.ensure_namespace(db_name)?;
        self.write_branch_heads(db_name, &meta.branches)?;
        self.write_tags(db_name, &meta.tags)?;
        self.write_releases(db_name, &meta.releases)?;
        let path = self.db_meta_path(db_name).join(DEFAULT_BRANCH_FILE);
        self.write_atomic(&path, meta.default_branch.as_bytes())?;
        debug!(db = db_name, branches = meta.branches.len(), "registries persisted");
        Ok(())
    }

    /// assemble the full metadata aggregate for a database.
    ///
    /// commits are collected by walking every branch, tag and release
    /// pointer back to its root. the served `active_branch` mirrors the
    /// default branch, since "active" only means something to a local
    /// working copy.
    pub fn metadata(&self, db_name: &str) -> Result<Metadata> {
        if !self.has_database(db_name) {
            return Err(Error::DatabaseNotFound(db_name.to_string()));
        }

        let branches = self.read_branch_heads(db_name)?;
        let tags = self.read_tags(db_name)?;
        let releases = self.read_releases(db_name)?;
        let default_branch = self.default_branch(db_name)?;

        let mut commits = BTreeMap::new();
        for head in branches.values() {
            self.collect_ancestry(&head.commit, &mut commits)?;
        }
        for tag in tags.values() {
            self.collect_ancestry(&tag.commit, &mut commits)?;
        }
        for release in releases.values() {
            self.collect_ancestry(&release.commit, &mut commits)?;
        }

        Ok(Metadata {
            active_branch: default_branch.clone(),
            default_branch,
            branches,
            commits,
            tags,
            releases,
        })
    }

    /// walk parent links from `start`, loading every commit not yet present
    fn collect_ancestry(&self, start: &Hash, commits: &mut BTreeMap<Hash, Commit>) -> Result<()> {
        let mut next = Some(*start);
        while let Some(id) = next {
            if commits.contains_key(&id) {
                break;
            }
            let commit = object::read_commit(self, &id)?;
            next = commit.parent;
            commits.insert(id, commit);
        }
        Ok(())
    }

    // --- licences ---------------------------------------------------------

    /// store a licence text; licences are ordinary content-addressed blobs
    pub fn put_licence(&self, text: &[u8]) -> Result<Hash> {
        self.put(text)
    }

    /// fetch a licence text, verified against its digest
    pub fn get_licence(&self, id: &Hash) -> Result<Vec<u8>> {
        read_file_blob_at(&self.files_path(), id)
    }

    // --- maintenance ------------------------------------------------------

    /// integrity sweep over the blob space.
    ///
    /// raw blobs are re-digested; tree/commit objects are re-identified from
    /// their parsed canonical form. returns the digests that no longer match
    /// their content.
    pub fn verify(&self) -> Result<Vec<Hash>> {
        let mut corrupt = Vec::new();

        for id in list_blobs_at(&self.files_path())? {
            let bytes = read_blob_at(&self.files_path(), &id)?;

            if Hash::digest(&bytes) == id {
                continue;
            }
            if let Ok(commit) = serde_json::from_slice::<Commit>(&bytes) {
                let recomputed = commit_digest(
                    &commit.tree,
                    commit.parent.as_ref(),
                    &commit.author_name,
                    &commit.author_email,
                    &commit.committer_name,
                    &commit.committer_email,
                    &commit.timestamp,
                    &commit.message,
                );
                if recomputed == id {
                    continue;
                }
            }
            if let Ok(tree) = serde_json::from_slice::<Tree>(&bytes) {
                if tree_digest(tree.entries()) == id {
                    continue;
                }
            }

            warn!(object = %id, "integrity sweep found corrupt object");
            corrupt.push(id);
        }

        Ok(corrupt)
    }

    // --- internals --------------------------------------------------------

    fn registry_path(&self, db_name: &str, file: &str) -> PathBuf {
        self.db_meta_path(db_name).join(file)
    }

    fn read_registry<T: DeserializeOwned>(
        &self,
        db_name: &str,
        file: &str,
    ) -> Result<BTreeMap<String, T>> {
        if !self.has_database(db_name) {
            return Err(Error::DatabaseNotFound(db_name.to_string()));
        }

        let path = self.registry_path(db_name, file);
        let content = match fs::read(&path) {
            Ok(content) => content,
            // absence of the file is equivalent to an empty map
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(Error::Io { path, source: e }),
        };

        serde_json::from_slice(&content).map_err(|_| Error::CorruptMetadata(path))
    }

    fn write_registry<T: Serialize>(
        &self,
        db_name: &str,
        file: &str,
        map: &BTreeMap<String, T>,
    ) -> Result<()> {
        self.ensure_namespace(db_name)?;
        let path = self.registry_path(db_name, file);
        let content = serde_json::to_vec_pretty(map)?;
        self.write_atomic(&path, &content)
    }

    /// atomic write: temp -> fsync -> rename
    fn write_atomic(&self, path: &Path, content: &[u8]) -> Result<()> {
        let tmp_path = self.tmp_path().join(uuid::Uuid::new_v4().to_string());
        {
            let mut tmp_file = File::create(&tmp_path).with_path(&tmp_path)?;
            tmp_file.write_all(content).with_path(&tmp_path)?;
            tmp_file.sync_all().with_path(&tmp_path)?;
        }
        fs::rename(&tmp_path, path).with_path(path)?;

        if let Some(parent) = path.parent() {
            let dir = File::open(parent).with_path(parent)?;
            dir.sync_all().with_path(parent)?;
        }

        Ok(())
    }
}

impl ObjectStore for Store {
    fn put(&self, bytes: &[u8]) -> Result<Hash> {
        write_blob_at(&self.files_path(), &self.tmp_path(), bytes)
    }

    fn put_keyed(&self, id: &Hash, bytes: &[u8]) -> Result<()> {
        write_keyed_at(&self.files_path(), &self.tmp_path(), id, bytes)
    }

    fn get(&self, id: &Hash) -> Result<Vec<u8>> {
        read_blob_at(&self.files_path(), id)
    }

    fn contains(&self, id: &Hash) -> bool {
        blob_exists_at(&self.files_path(), id)
    }
}

/// guard that holds a per-database lock until dropped
pub struct DbLock {
    _flock: Flock<File>,
}
// lock is released automatically when Flock is dropped

/// validate a database name before it becomes a directory component
fn validate_db_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::Validation("empty database name".to_string()));
    }
    if name.contains('/') || name.contains('\0') {
        return Err(Error::Validation(format!(
            "database name contains reserved characters: {}",
            name
        )));
    }
    if name == "." || name == ".." {
        return Err(Error::Validation(format!(
            "reserved database name: {}",
            name
        )));
    }
    Ok(())
}
