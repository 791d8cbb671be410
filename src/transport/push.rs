//! push: publish a database snapshot to the authoritative store

use tracing::info;

use crate::cache::Cache;
use crate::error::Result;
use crate::object::ObjectStore;
use crate::ops::commit::CommitRequest;
use crate::transport::Remote;
use crate::types::Commit;

/// upload database bytes as a commit and refresh the local cache with the
/// authoritative aggregate.
///
/// commit IDs are pure functions of their inputs, so a snapshot that was
/// already committed locally with the same author, message, timestamp and
/// bytes re-derives the identical ID on the server; reconciliation needs
/// no merge step, the histories simply converge.
pub fn push(
    cache: &Cache,
    remote: &impl Remote,
    db_name: &str,
    bytes: &[u8],
    req: &CommitRequest,
) -> Result<Commit> {
    let commit = remote.upload_database(db_name, bytes, req)?;

    let mut meta = remote.metadata(db_name)?;
    if let Ok(local) = cache.load(db_name) {
        if meta.branches.contains_key(&local.active_branch) {
            meta.active_branch = local.active_branch;
        }
    }
    cache.save(db_name, &meta)?;

    // keep the pushed bytes cached for offline change detection
    cache.objects(db_name).put(bytes)?;

    info!(db = db_name, commit = %commit.id, "pushed database");
    Ok(commit)
}
