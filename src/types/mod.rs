//! core data types: the object model and the per-database metadata aggregate

mod commit;
mod metadata;
mod tree;

pub use commit::Commit;
pub use metadata::{BranchHead, Metadata, Release, Tag, TagType, DEFAULT_BRANCH};
pub use tree::{EntryType, Tree, TreeEntry};
