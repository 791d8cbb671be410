use crate::error::{Error, Result};
use crate::hash::{commit_digest, Hash};
use crate::object::ObjectStore;
use crate::types::Commit;

/// write a commit to an object store as JSON, keyed by its computed ID
pub fn write_commit(store: &impl ObjectStore, commit: &Commit) -> Result<Hash> {
    let bytes = serde_json::to_vec(commit)?;
    store.put_keyed(&commit.id, &bytes)?;
    Ok(commit.id)
}

/// read a commit back, recomputing its identity from the parsed fields
pub fn read_commit(store: &impl ObjectStore, id: &Hash) -> Result<Commit> {
    let bytes = store.get(id)?;
    let commit: Commit = serde_json::from_slice(&bytes)?;

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
    if commit.id != *id || recomputed != *id {
        return Err(Error::CorruptObject(*id));
    }

    Ok(commit)
}
