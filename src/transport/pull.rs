//! pull: refresh the local cache from the authoritative store

use tracing::info;

use crate::cache::Cache;
use crate::error::{Error, Result};
use crate::object::ObjectStore;
use crate::transport::Remote;
use crate::types::{EntryType, Metadata, Tree};

/// replace the cached aggregate with the authoritative one.
///
/// local and remote history are never merged; the one purely-local field,
/// `active_branch`, is carried over when that branch still exists remotely.
/// all remote reads happen before any local write, so a failed pull leaves
/// the cache untouched.
pub fn pull(cache: &Cache, remote: &impl Remote, db_name: &str) -> Result<Metadata> {
    let mut meta = remote.metadata(db_name)?;

    if let Ok(local) = cache.load(db_name) {
        if meta.branches.contains_key(&local.active_branch) {
            meta.active_branch = local.active_branch;
        }
    }

    cache.save(db_name, &meta)?;
    info!(db = db_name, commits = meta.commits.len(), "pulled metadata");
    Ok(meta)
}

/// pull metadata and the database bytes at the active branch head.
///
/// the tree and the raw bytes land in the cache's object space, so change
/// detection and further local commits work offline afterwards.
pub fn pull_database(
    cache: &Cache,
    remote: &impl Remote,
    db_name: &str,
) -> Result<(Metadata, Vec<u8>)> {
    let meta = pull(cache, remote, db_name)?;

    let head = meta.head_commit()?;
    let tree_id = head.tree;
    let tree_bytes = remote.fetch_blob(&tree_id)?;
    let tree: Tree = serde_json::from_slice(&tree_bytes).map_err(Error::Json)?;
    if crate::hash::tree_digest(tree.entries()) != tree_id {
        return Err(Error::CorruptObject(tree_id));
    }

    let entry = tree
        .entries()
        .iter()
        .find(|e| e.entry_type == EntryType::Database && e.name == db_name)
        .ok_or_else(|| Error::DatabaseNotFound(db_name.to_string()))?;

    let bytes = remote.fetch_blob(&entry.content_hash)?;
    if crate::hash::Hash::digest(&bytes) != entry.content_hash {
        return Err(Error::CorruptObject(entry.content_hash));
    }

    let objects = cache.objects(db_name);
    objects.put_keyed(&tree_id, &tree_bytes)?;
    objects.put(&bytes)?;

    Ok((meta, bytes))
}
