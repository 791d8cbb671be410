//! dio - git-like versioning for whole-file database snapshots
//!
//! a content-addressed versioning engine for databases stored as single
//! files (SQLite and friends): every database gets a commit history,
//! branches, tags and releases, backed by immutable objects keyed by their
//! SHA-256.
//!
//! # Core concepts
//!
//! - **Blob**: raw database bytes, stored once per distinct digest
//! - **Tree**: an ordered snapshot manifest (database file, licence, sub-tree)
//! - **Commit**: an immutable snapshot event referencing one tree and its parent
//! - **Branch / Tag / Release**: named pointers into the commit graph
//! - **Metadata**: the per-database aggregate of all of the above,
//!   cached locally under `.dio/` and reconciled against the authoritative
//!   store by explicit pull/push
//!
//! # Identity
//!
//! commit ID = SHA256 of the canonical commit text (tree, parent, author,
//! committer, message); tree ID = SHA256 of the versioned canonical entry
//! serialization. both are pure functions of their inputs, so independent
//! clients deriving a snapshot from identical inputs agree on its identity.
//!
//! # Example usage
//!
//! ```no_run
//! use dio::ops::commit::CommitRequest;
//! use dio::transport::{push, LocalRemote};
//! use dio::{Cache, Context, Identity, Store};
//! use std::path::Path;
//!
//! // the authoritative store and a local working copy
//! let store = Store::open(Path::new("/var/lib/dio")).unwrap();
//! let remote = LocalRemote::new(&store);
//! let ctx = Context::new(".", Identity::new("Jane", "jane@example.org"));
//! let cache = Cache::open(&ctx).unwrap();
//!
//! // snapshot a database onto its master branch
//! let bytes = std::fs::read("places.db").unwrap();
//! let req = CommitRequest {
//!     branch: "master".to_string(),
//!     message: "nightly snapshot".to_string(),
//!     author: ctx.user.clone(),
//!     committer: None,
//!     timestamp: chrono::Utc::now(),
//!     last_modified: chrono::Utc::now(),
//!     licence_hash: None,
//! };
//! let commit = push(&cache, &remote, "places.db", &bytes, &req).unwrap();
//! println!("committed {}", commit.id);
//! ```

mod cache;
mod config;
mod error;
mod hash;
mod object;
mod store;

pub mod ops;
pub mod transport;
pub mod types;

pub use cache::{Cache, CacheObjects};
pub use config::{Context, Identity};
pub use error::{Error, ErrorKind, Result};
pub use hash::{commit_digest, tree_digest, Hash, TREE_FORMAT_VERSION};
pub use object::{
    read_commit, read_file_blob, read_tree, write_commit, write_tree, ObjectStore,
};
pub use store::{DbLock, Store};
pub use types::{
    BranchHead, Commit, EntryType, Metadata, Release, Tag, TagType, Tree, TreeEntry,
    DEFAULT_BRANCH,
};
