use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::object::{read_tree, ObjectStore};
use crate::types::{EntryType, Metadata};

/// has this database changed since its last commit on the active branch.
///
/// compares the SHA-256 of the live file bytes with the content hash
/// recorded for the database in the head commit's snapshot manifest.
pub fn has_changed(
    objects: &impl ObjectStore,
    meta: &Metadata,
    db_name: &str,
    live_bytes: &[u8],
) -> Result<bool> {
    // no branch head yet means nothing to compare against
    let head = meta.head_commit()?;
    let tree = read_tree(objects, &head.tree)?;

    let entry = tree
        .entries()
        .iter()
        .find(|e| e.entry_type == EntryType::Database && e.name == db_name)
        .ok_or_else(|| Error::DatabaseNotFound(db_name.to_string()))?;

    Ok(Hash::digest(live_bytes) != entry.content_hash)
}
