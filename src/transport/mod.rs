//! the seam between the core engine and whatever carries it over the wire.
//!
//! the core exposes pure functions over the metadata aggregate and the blob
//! store; a `Remote` is how a local working copy reaches the authoritative
//! store. the crate ships a filesystem-backed implementation; an HTTP client
//! implements the same trait and maps transport failures to
//! `Error::Transport` (an Io-kind error, never a semantic NotFound) and
//! status codes through `Error::kind`.

pub mod local;
pub mod pull;
pub mod push;

pub use local::LocalRemote;
pub use pull::{pull, pull_database};
pub use push::push;

use crate::error::Result;
use crate::hash::Hash;
use crate::ops::commit::CommitRequest;
use crate::types::{Commit, Metadata};

/// client view of the authoritative store
pub trait Remote {
    /// names of all databases, sorted
    fn list_databases(&self) -> Result<Vec<String>>;

    /// full metadata aggregate for a database
    fn metadata(&self, db_name: &str) -> Result<Metadata>;

    /// the branch shown by default to viewers
    fn default_branch(&self, db_name: &str) -> Result<String>;

    /// fetch object bytes by digest
    fn fetch_blob(&self, id: &Hash) -> Result<Vec<u8>>;

    /// upload database bytes as a new commit on a branch; the authoritative
    /// side performs the commit under its per-database lock and returns it
    fn upload_database(&self, db_name: &str, bytes: &[u8], req: &CommitRequest) -> Result<Commit>;

    /// fetch a licence text by digest
    fn licence(&self, id: &Hash) -> Result<Vec<u8>>;

    /// store a licence text, returning its digest
    fn add_licence(&self, text: &[u8]) -> Result<Hash>;
}
