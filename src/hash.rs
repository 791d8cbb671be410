use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::types::TreeEntry;
use crate::Error;

/// SHA-256 hash used for content addressing
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash([u8; 32]);

impl Hash {
    /// zero hash (useful as sentinel)
    pub const ZERO: Hash = Hash([0u8; 32]);

    /// create from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// parse from hex string
    pub fn from_hex(s: &str) -> crate::Result<Self> {
        let bytes = hex::decode(s).map_err(|_| Error::InvalidHashHex(s.to_string()))?;
        if bytes.len() != 32 {
            return Err(Error::InvalidHashHex(s.to_string()));
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// hash arbitrary bytes
    pub fn digest(bytes: &[u8]) -> Self {
        Self(Sha256::digest(bytes).into())
    }

    /// get raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", &self.to_hex()[..12])
    }
}

impl Serialize for Hash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// version marker embedded in the canonical tree serialization.
///
/// the entry layout below is frozen for this version; any change to it must
/// bump the marker, since tree IDs derived from version 1 stay valid forever.
pub const TREE_FORMAT_VERSION: &str = "1";

/// timestamps inside the commit digest use the traditional unix `date` layout,
/// e.g. `Fri Mar 15 18:01:01 UTC 2019` (always UTC)
fn unix_date(ts: &DateTime<Utc>) -> String {
    ts.format("%a %b %e %H:%M:%S UTC %Y").to_string()
}

/// timestamps inside the tree digest use second-resolution RFC 3339,
/// e.g. `2019-03-15T18:01:01Z`
fn rfc3339_utc(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// compute the content-derived identity of a commit.
///
/// canonical text form, hashed with SHA-256:
///
/// ```text
/// tree <hex>\n
/// parent <hex>\n                      (only when a parent exists)
/// author <name> <<email>> <unix date>\n
/// committer <name> <<email>> <unix date>\n   (only when distinct from author)
/// \n
/// <message>\0
/// ```
///
/// a pure function of its inputs: two clients committing identical content
/// with identical identity, message and timestamp derive the same ID.
#[allow(clippy::too_many_arguments)]
pub fn commit_digest(
    tree: &Hash,
    parent: Option<&Hash>,
    author_name: &str,
    author_email: &str,
    committer_name: &str,
    committer_email: &str,
    timestamp: &DateTime<Utc>,
    message: &str,
) -> Hash {
    let date = unix_date(timestamp);

    let mut text = String::new();
    text.push_str("tree ");
    text.push_str(&tree.to_hex());
    text.push('\n');

    if let Some(parent) = parent {
        text.push_str("parent ");
        text.push_str(&parent.to_hex());
        text.push('\n');
    }

    text.push_str("author ");
    text.push_str(author_name);
    text.push_str(" <");
    text.push_str(author_email);
    text.push_str("> ");
    text.push_str(&date);
    text.push('\n');

    let distinct_committer = !committer_name.is_empty()
        && !committer_email.is_empty()
        && (committer_name != author_name || committer_email != author_email);
    if distinct_committer {
        text.push_str("committer ");
        text.push_str(committer_name);
        text.push_str(" <");
        text.push_str(committer_email);
        text.push_str("> ");
        text.push_str(&date);
        text.push('\n');
    }

    text.push('\n');
    text.push_str(message);
    text.push('\0');

    Hash(Sha256::digest(text.as_bytes()).into())
}

/// compute the content-derived identity of a tree.
///
/// canonical form (version 1): the version marker line, then for each entry
/// in list order:
///
/// ```text
/// <type tag> NUL <hex content hash> NUL <name> NUL <rfc3339 mtime> NUL <decimal size> LF
/// ```
///
/// entry order is insertion order and significant; the licence hash does not
/// participate in the identity.
pub fn tree_digest(entries: &[TreeEntry]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(TREE_FORMAT_VERSION.as_bytes());
    hasher.update(b"\n");

    for entry in entries {
        hasher.update(entry.entry_type.tag().as_bytes());
        hasher.update(b"\0");
        hasher.update(entry.content_hash.to_hex().as_bytes());
        hasher.update(b"\0");
        hasher.update(entry.name.as_bytes());
        hasher.update(b"\0");
        hasher.update(rfc3339_utc(&entry.last_modified).as_bytes());
        hasher.update(b"\0");
        hasher.update(entry.size.to_string().as_bytes());
        hasher.update(b"\n");
    }

    Hash(hasher.finalize().into())
}
