//! a `Remote` backed by a filesystem store, for same-host use and for
//! exercising the sync paths without any network

use tracing::info;

use crate::error::Result;
use crate::hash::Hash;
use crate::object::ObjectStore;
use crate::ops::commit::{commit_database, CommitRequest};
use crate::store::Store;
use crate::transport::Remote;
use crate::types::{Commit, Metadata};

/// the authoritative store reached directly on the local filesystem
pub struct LocalRemote<'a> {
    store: &'a Store,
}

impl<'a> LocalRemote<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }
}

impl Remote for LocalRemote<'_> {
    fn list_databases(&self) -> Result<Vec<String>> {
        self.store.list_databases()
    }

    fn metadata(&self, db_name: &str) -> Result<Metadata> {
        self.store.metadata(db_name)
    }

    fn default_branch(&self, db_name: &str) -> Result<String> {
        self.store.default_branch(db_name)
    }

    fn fetch_blob(&self, id: &Hash) -> Result<Vec<u8>> {
        self.store.get(id)
    }

    fn upload_database(&self, db_name: &str, bytes: &[u8], req: &CommitRequest) -> Result<Commit> {
        // reject malformed requests before creating any server-side state
        req.validate()?;

        // the whole read-modify-write cycle runs under the per-db lock, so
        // concurrent uploads to one database serialize instead of losing
        // branch-head updates
        self.store.with_db_lock(db_name, || {
            let mut meta = self.store.metadata(db_name)?;
            let first_commit = meta.branches.is_empty();

            let commit = commit_database(self.store, &mut meta, db_name, bytes, req)?;

            // the first upload decides what viewers see by default
            if first_commit {
                meta.default_branch = req.branch.clone();
            }

            self.store.persist_registries(db_name, &meta)?;
            info!(db = db_name, commit = %commit.id, "upload committed");
            Ok(commit)
        })
    }

    fn licence(&self, id: &Hash) -> Result<Vec<u8>> {
        self.store.get_licence(id)
    }

    fn add_licence(&self, text: &[u8]) -> Result<Hash> {
        self.store.put_licence(text)
    }
}
