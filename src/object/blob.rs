use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, IoResultExt, Result};
use crate::hash::Hash;

/// store bytes under their own SHA-256 digest.
///
/// idempotent: if an object with this digest already exists, no write
/// happens and the same digest is returned. digest equality is the only
/// criterion; a same-size object is never taken as a match.
pub fn write_blob_at(dir: &Path, tmp_dir: &Path, bytes: &[u8]) -> Result<Hash> {
    let hash = Hash::digest(bytes);
    write_keyed_at(dir, tmp_dir, &hash, bytes)?;
    Ok(hash)
}

/// store bytes under an externally computed identity (serialized trees and
/// commits, whose IDs come from their canonical form rather than their
/// on-disk encoding). idempotent like `write_blob_at`.
pub fn write_keyed_at(dir: &Path, tmp_dir: &Path, id: &Hash, bytes: &[u8]) -> Result<()> {
    let path = blob_path_at(dir, id);
    if path.exists() {
        return Ok(());
    }

    fs::create_dir_all(dir).with_path(dir)?;
    fs::create_dir_all(tmp_dir).with_path(tmp_dir)?;

    // atomic write: temp -> fsync -> rename
    let tmp_path = tmp_dir.join(uuid::Uuid::new_v4().to_string());
    {
        let mut tmp_file = File::create(&tmp_path).with_path(&tmp_path)?;
        tmp_file.write_all(bytes).with_path(&tmp_path)?;
        tmp_file.sync_all().with_path(&tmp_path)?;
    }
    fs::rename(&tmp_path, &path).with_path(&path)?;

    // fsync parent directory
    let dir_file = File::open(dir).with_path(dir)?;
    dir_file.sync_all().with_path(dir)?;

    Ok(())
}

/// read object bytes, without verification
pub fn read_blob_at(dir: &Path, id: &Hash) -> Result<Vec<u8>> {
    let path = blob_path_at(dir, id);
    fs::read(&path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::ObjectNotFound(*id)
        } else {
            Error::Io { path, source: e }
        }
    })
}

/// read raw file bytes and verify them against their digest
pub fn read_file_blob_at(dir: &Path, id: &Hash) -> Result<Vec<u8>> {
    let bytes = read_blob_at(dir, id)?;
    if Hash::digest(&bytes) != *id {
        return Err(Error::CorruptObject(*id));
    }
    Ok(bytes)
}

/// check whether an object exists
pub fn blob_exists_at(dir: &Path, id: &Hash) -> bool {
    blob_path_at(dir, id).exists()
}

/// filesystem path for an object (flat layout, one file per digest)
pub fn blob_path_at(dir: &Path, id: &Hash) -> PathBuf {
    dir.join(id.to_hex())
}

/// list every object digest present in a blob directory
pub fn list_blobs_at(dir: &Path) -> Result<Vec<Hash>> {
    let mut hashes = Vec::new();
    if !dir.exists() {
        return Ok(hashes);
    }

    for entry in fs::read_dir(dir).with_path(dir)? {
        let entry = entry.with_path(dir)?;
        if !entry.file_type().with_path(dir)?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if let Ok(hash) = Hash::from_hex(name) {
                hashes.push(hash);
            }
        }
    }

    hashes.sort();
    Ok(hashes)
}
