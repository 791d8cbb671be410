use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::Context;
use crate::error::{Error, IoResultExt, Result};
use crate::hash::Hash;
use crate::object::{
    blob_exists_at, read_blob_at, read_file_blob_at, write_blob_at, write_keyed_at, ObjectStore,
};
use crate::transport::Remote;
use crate::types::Metadata;

const METADATA_FILE: &str = "metadata.json";

/// the local per-working-directory cache.
///
/// layout under `<working-dir>/.dio/`:
///
/// ```text
/// <db>/metadata.json    the whole metadata aggregate
/// <db>/db/<hex>         committed database bytes and locally created
///                       tree objects (shared content-addressed keyspace)
/// tmp/                  staging for atomic writes
/// ```
pub struct Cache {
    root: PathBuf,
}

impl Cache {
    /// open the cache for a working directory, creating it if missing
    pub fn open(ctx: &Context) -> Result<Self> {
        let root = ctx.cache_dir();
        fs::create_dir_all(root.join("tmp")).with_path(&root)?;
        Ok(Self { root })
    }

    /// cache root (the `.dio` directory)
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// per-database cache directory
    pub fn db_dir(&self, db_name: &str) -> PathBuf {
        self.root.join(db_name)
    }

    /// path to a database's cached metadata aggregate
    pub fn metadata_path(&self, db_name: &str) -> PathBuf {
        self.db_dir(db_name).join(METADATA_FILE)
    }

    fn tmp_path(&self) -> PathBuf {
        self.root.join("tmp")
    }

    /// is this database cached locally
    pub fn has_local(&self, db_name: &str) -> bool {
        self.metadata_path(db_name).is_file()
    }

    /// content-addressed object view for one database
    pub fn objects(&self, db_name: &str) -> CacheObjects {
        CacheObjects {
            dir: self.db_dir(db_name).join("db"),
            tmp: self.tmp_path(),
        }
    }

    /// deserialize the cached aggregate.
    ///
    /// an unparsable cache surfaces as `CorruptMetadata`; it is never
    /// silently discarded, which would fabricate an empty history.
    pub fn load(&self, db_name: &str) -> Result<Metadata> {
        let path = self.metadata_path(db_name);
        let content = match fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::DatabaseNotFound(db_name.to_string()))
            }
            Err(e) => return Err(Error::Io { path, source: e }),
        };

        serde_json::from_slice(&content).map_err(|_| Error::CorruptMetadata(path))
    }

    /// serialize and write the whole aggregate atomically
    /// (temp -> fsync -> rename); a crash mid-write never leaves a
    /// partially written cache
    pub fn save(&self, db_name: &str, meta: &Metadata) -> Result<()> {
        let dir = self.db_dir(db_name);
        fs::create_dir_all(&dir).with_path(&dir)?;

        let path = self.metadata_path(db_name);
        let content = serde_json::to_vec_pretty(meta)?;

        let tmp_path = self.tmp_path().join(uuid::Uuid::new_v4().to_string());
        {
            let mut tmp_file = File::create(&tmp_path).with_path(&tmp_path)?;
            tmp_file.write_all(&content).with_path(&tmp_path)?;
            tmp_file.sync_all().with_path(&tmp_path)?;
        }
        fs::rename(&tmp_path, &path).with_path(&path)?;

        let dir_file = File::open(&dir).with_path(&dir)?;
        dir_file.sync_all().with_path(&dir)?;

        debug!(db = db_name, "metadata cache saved");
        Ok(())
    }

    /// return the cached aggregate, or retrieve it from the authoritative
    /// store. with `persist` the fetched aggregate is written through to
    /// the cache; without it the caller gets a read-only preview (e.g.
    /// `log` against a database never checked out here).
    pub fn load_or_fetch(
        &self,
        db_name: &str,
        persist: bool,
        remote: &dyn Remote,
    ) -> Result<Metadata> {
        if self.has_local(db_name) {
            return self.load(db_name);
        }

        info!(db = db_name, persist, "fetching metadata from remote");
        let meta = remote.metadata(db_name)?;
        if persist {
            self.save(db_name, &meta)?;
        }
        Ok(meta)
    }
}

/// content-addressed object storage inside one database's cache directory
pub struct CacheObjects {
    dir: PathBuf,
    tmp: PathBuf,
}

impl CacheObjects {
    /// read raw database bytes, verified against their digest
    pub fn read_verified(&self, id: &Hash) -> Result<Vec<u8>> {
        read_file_blob_at(&self.dir, id)
    }
}

impl ObjectStore for CacheObjects {
    fn put(&self, bytes: &[u8]) -> Result<Hash> {
        write_blob_at(&self.dir, &self.tmp, bytes)
    }

    fn put_keyed(&self, id: &Hash, bytes: &[u8]) -> Result<()> {
        write_keyed_at(&self.dir, &self.tmp, id, bytes)
    }

    fn get(&self, id: &Hash) -> Result<Vec<u8>> {
        read_blob_at(&self.dir, id)
    }

    fn contains(&self, id: &Hash) -> bool {
        blob_exists_at(&self.dir, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Identity;
    use crate::ops::commit::{commit_database, CommitRequest};
    use crate::store::Store;
    use crate::transport::LocalRemote;
    use tempfile::tempdir;

    fn test_cache() -> (tempfile::TempDir, Cache) {
        let dir = tempdir().unwrap();
        let ctx = Context::new(dir.path(), Identity::new("A", "a@x"));
        let cache = Cache::open(&ctx).unwrap();
        (dir, cache)
    }

    fn committed_meta(cache: &Cache, db_name: &str) -> Metadata {
        let ts = chrono::DateTime::from_timestamp(1_552_672_861, 0).unwrap();
        let mut meta = Metadata::new();
        commit_database(
            &cache.objects(db_name),
            &mut meta,
            db_name,
            b"database bytes",
            &CommitRequest {
                branch: "master".to_string(),
                message: "first".to_string(),
                author: Identity::new("A", "a@x"),
                committer: None,
                timestamp: ts,
                last_modified: ts,
                licence_hash: None,
            },
        )
        .unwrap();
        meta
    }

    #[test]
    fn test_save_load_roundtrip() {
        let (_dir, cache) = test_cache();
        let meta = committed_meta(&cache, "test.db");

        cache.save("test.db", &meta).unwrap();
        let loaded = cache.load("test.db").unwrap();
        assert_eq!(loaded, meta);
    }

    #[test]
    fn test_load_missing_is_not_found() {
        let (_dir, cache) = test_cache();
        assert!(matches!(
            cache.load("ghost.db"),
            Err(Error::DatabaseNotFound(_))
        ));
    }

    #[test]
    fn test_corrupt_cache_surfaces_integrity() {
        let (_dir, cache) = test_cache();
        let meta = committed_meta(&cache, "test.db");
        cache.save("test.db", &meta).unwrap();

        fs::write(cache.metadata_path("test.db"), b"{ truncated").unwrap();

        let result = cache.load("test.db");
        assert!(matches!(result, Err(Error::CorruptMetadata(_))));
    }

    #[test]
    fn test_save_overwrites_whole_unit() {
        let (_dir, cache) = test_cache();
        let mut meta = committed_meta(&cache, "test.db");
        cache.save("test.db", &meta).unwrap();

        meta.active_branch = "dev".to_string();
        meta.branches.insert(
            "dev".to_string(),
            meta.branches["master"].clone(),
        );
        cache.save("test.db", &meta).unwrap();

        let loaded = cache.load("test.db").unwrap();
        assert_eq!(loaded.active_branch, "dev");
        assert_eq!(loaded.branches.len(), 2);
    }

    #[test]
    fn test_load_or_fetch_prefers_local() {
        let dir = tempdir().unwrap();
        let ctx = Context::new(dir.path().join("work"), Identity::new("A", "a@x"));
        let cache = Cache::open(&ctx).unwrap();
        let store = Store::open(&dir.path().join("server")).unwrap();
        let remote = LocalRemote::new(&store);

        let mut meta = committed_meta(&cache, "test.db");
        meta.active_branch = "master".to_string();
        cache.save("test.db", &meta).unwrap();

        // remote has no such database, but the local copy wins
        let loaded = cache.load_or_fetch("test.db", true, &remote).unwrap();
        assert_eq!(loaded, meta);
    }

    #[test]
    fn test_load_or_fetch_persist_flag() {
        let dir = tempdir().unwrap();
        let ctx = Context::new(dir.path().join("work"), Identity::new("A", "a@x"));
        let cache = Cache::open(&ctx).unwrap();
        let store = Store::open(&dir.path().join("server")).unwrap();
        let remote = LocalRemote::new(&store);

        let ts = chrono::DateTime::from_timestamp(1_552_672_861, 0).unwrap();
        remote
            .upload_database(
                "test.db",
                b"server bytes",
                &CommitRequest {
                    branch: "master".to_string(),
                    message: "first".to_string(),
                    author: Identity::new("A", "a@x"),
                    committer: None,
                    timestamp: ts,
                    last_modified: ts,
                    licence_hash: None,
                },
            )
            .unwrap();

        // read-only preview: nothing written locally
        let preview = cache.load_or_fetch("test.db", false, &remote).unwrap();
        assert_eq!(preview.branches.len(), 1);
        assert!(!cache.has_local("test.db"));

        // persisted fetch
        let fetched = cache.load_or_fetch("test.db", true, &remote).unwrap();
        assert_eq!(fetched, preview);
        assert!(cache.has_local("test.db"));
    }

    #[test]
    fn test_cache_objects_roundtrip() {
        let (_dir, cache) = test_cache();
        let objects = cache.objects("test.db");

        let hash = objects.put(b"cached database bytes").unwrap();
        assert!(objects.contains(&hash));
        assert_eq!(objects.read_verified(&hash).unwrap(), b"cached database bytes");
    }
}
