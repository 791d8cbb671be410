use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::types::{Commit, Metadata};

/// lazy walk over parent links, newest first.
///
/// stateless: keyed only by the starting ID, so a walk can be restarted at
/// any commit. yields an error item when a parent link points outside the
/// aggregate's commit map, and stops after the root commit.
pub struct Ancestors<'a> {
    meta: &'a Metadata,
    next: Option<Hash>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = Result<&'a Commit>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next.take()?;
        match self.meta.commits.get(&id) {
            Some(commit) => {
                self.next = commit.parent;
                Some(Ok(commit))
            }
            None => Some(Err(Error::CommitNotFound(id))),
        }
    }
}

/// walk the ancestor chain starting at (and including) `start`
pub fn ancestors<'a>(meta: &'a Metadata, start: &Hash) -> Ancestors<'a> {
    Ancestors {
        meta,
        next: Some(*start),
    }
}

/// is `candidate` reachable from `of` by following parent links
/// (inclusive: a commit is an ancestor of itself)
pub fn is_ancestor(meta: &Metadata, candidate: &Hash, of: &Hash) -> bool {
    for commit in ancestors(meta, of) {
        match commit {
            Ok(commit) if commit.id == *candidate => return true,
            Ok(_) => continue,
            Err(_) => return false,
        }
    }
    false
}

/// number of commits reachable from `start` inclusive
pub fn chain_length(meta: &Metadata, start: &Hash) -> Result<u32> {
    let mut count = 0u32;
    for commit in ancestors(meta, start) {
        commit?;
        count += 1;
    }
    Ok(count)
}

/// commit history of a branch, newest first
pub fn log(meta: &Metadata, branch: &str, max_count: Option<usize>) -> Result<Vec<LogEntry>> {
    let head = meta.branch(branch)?;

    let mut entries = Vec::new();
    for commit in ancestors(meta, &head.commit) {
        if let Some(max) = max_count {
            if entries.len() >= max {
                break;
            }
        }
        entries.push(LogEntry {
            commit: commit?.clone(),
        });
    }

    Ok(entries)
}

/// commit with rendering support for log output
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub commit: Commit,
}

impl std::fmt::Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "commit {}", self.commit.id)?;
        writeln!(
            f,
            "Author: {} <{}>",
            self.commit.author_name, self.commit.author_email
        )?;
        writeln!(
            f,
            "Date:   {}",
            self.commit.timestamp.format("%a %b %e %H:%M:%S %Y %z")
        )?;
        writeln!(f)?;
        for line in self.commit.message.lines() {
            writeln!(f, "    {}", line)?;
        }
        Ok(())
    }
}
