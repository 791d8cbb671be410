use crate::error::{Error, Result};
use crate::hash::{tree_digest, Hash};
use crate::object::ObjectStore;
use crate::types::Tree;

/// write a tree to an object store as JSON, keyed by its computed ID
pub fn write_tree(store: &impl ObjectStore, tree: &Tree) -> Result<Hash> {
    let bytes = serde_json::to_vec(tree)?;
    store.put_keyed(&tree.id, &bytes)?;
    Ok(tree.id)
}

/// read a tree back, recomputing its identity from the parsed entries.
/// the stored `id` field is not trusted.
pub fn read_tree(store: &impl ObjectStore, id: &Hash) -> Result<Tree> {
    let bytes = store.get(id)?;
    let tree: Tree = serde_json::from_slice(&bytes)?;

    if tree.id != *id || tree_digest(tree.entries()) != *id {
        return Err(Error::CorruptObject(*id));
    }

    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::tests::MemStore;
    use crate::types::TreeEntry;
    use chrono::TimeZone;

    fn sample_tree() -> Tree {
        let ts = chrono::Utc.with_ymd_and_hms(2019, 3, 15, 18, 1, 1).unwrap();
        Tree::new(vec![TreeEntry::database(
            "main.db",
            Hash::digest(b"db bytes"),
            8,
            ts,
            None,
        )])
        .unwrap()
    }

    #[test]
    fn test_write_and_read_tree() {
        let store = MemStore::default();
        let tree = sample_tree();

        let id = write_tree(&store, &tree).unwrap();
        assert_eq!(id, tree.id);

        let read = read_tree(&store, &id).unwrap();
        assert_eq!(read, tree);
    }

    #[test]
    fn test_read_tree_rejects_wrong_id() {
        let store = MemStore::default();
        let tree = sample_tree();

        // store the tree under an unrelated key
        let bogus = Hash::digest(b"bogus");
        store.put_keyed(&bogus, &serde_json::to_vec(&tree).unwrap()).unwrap();

        let result = read_tree(&store, &bogus);
        assert!(matches!(result, Err(Error::CorruptObject(_))));
    }
}
