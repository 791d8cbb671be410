use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// name and email of the acting user
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// explicit per-operation configuration.
///
/// every core operation receives one of these (or a `Store`/`Cache` built
/// from one); nothing in the crate reads process-wide state.
#[derive(Clone, Debug)]
pub struct Context {
    /// working directory that owns the `.dio` cache
    pub work_dir: PathBuf,
    /// identity used as author/committer fallback
    pub user: Identity,
}

impl Context {
    pub fn new(work_dir: impl Into<PathBuf>, user: Identity) -> Self {
        Self {
            work_dir: work_dir.into(),
            user,
        }
    }

    /// root of the local cache
    pub fn cache_dir(&self) -> PathBuf {
        self.work_dir.join(".dio")
    }
}
