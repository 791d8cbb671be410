//! content-addressed object storage.
//!
//! raw database bytes are keyed by the SHA-256 of the bytes themselves;
//! serialized trees and commits share the same keyspace but are keyed by
//! their canonical identity (see `hash`), so every read path verifies the
//! identity it expects rather than trusting the file.

mod blob;
mod commit;
mod tree;

pub use blob::{
    blob_exists_at, blob_path_at, list_blobs_at, read_blob_at, read_file_blob_at, write_blob_at,
    write_keyed_at,
};
pub use commit::{read_commit, write_commit};
pub use tree::{read_tree, write_tree};

use crate::error::{Error, Result};
use crate::hash::Hash;

/// the storage seam shared by the authoritative store and the local cache
pub trait ObjectStore {
    /// store bytes under their own digest; idempotent, returns the digest
    fn put(&self, bytes: &[u8]) -> Result<Hash>;

    /// store bytes under an externally computed identity; idempotent
    fn put_keyed(&self, id: &Hash, bytes: &[u8]) -> Result<()>;

    /// fetch object bytes, `ObjectNotFound` if absent
    fn get(&self, id: &Hash) -> Result<Vec<u8>>;

    /// does an object with this identity exist
    fn contains(&self, id: &Hash) -> bool;
}

/// read raw file bytes through a store and verify them against their digest
pub fn read_file_blob(store: &impl ObjectStore, id: &Hash) -> Result<Vec<u8>> {
    let bytes = store.get(id)?;
    if Hash::digest(&bytes) != *id {
        return Err(Error::CorruptObject(*id));
    }
    Ok(bytes)
}
