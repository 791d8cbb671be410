use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::ops::log::{chain_length, is_ancestor};
use crate::types::{BranchHead, Metadata};

/// create a branch pointing at the active branch's head
pub fn create(meta: &mut Metadata, name: &str, description: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::Validation("branch name is required".to_string()));
    }
    if meta.branches.contains_key(name) {
        return Err(Error::BranchExists(name.to_string()));
    }

    let head = meta.branch(&meta.active_branch)?;
    let branch = BranchHead {
        name: name.to_string(),
        commit: head.commit,
        commit_count: head.commit_count,
        description: description.to_string(),
    };
    meta.branches.insert(name.to_string(), branch);
    debug!(branch = name, "branch created");
    Ok(())
}

/// move a branch head forward by one commit.
///
/// the commit must already exist in the aggregate and must name the current
/// head as its parent; heads only ever move by linear append here.
pub fn append_commit(meta: &mut Metadata, branch: &str, commit_id: Hash) -> Result<()> {
    if !meta.branches.contains_key(branch) {
        return Err(Error::BranchNotFound(branch.to_string()));
    }
    let parent = meta.commit(&commit_id)?.parent;

    let head = meta
        .branches
        .get_mut(branch)
        .ok_or_else(|| Error::BranchNotFound(branch.to_string()))?;
    if parent != Some(head.commit) {
        return Err(Error::Validation(format!(
            "commit {} does not extend the head of branch {}",
            commit_id, branch
        )));
    }

    head.commit = commit_id;
    head.commit_count += 1;
    Ok(())
}

/// move a branch head back to an earlier commit in its own lineage.
///
/// the target must be an ancestor of the current head; there are no merge
/// semantics to reconcile anything else. the head is untouched on failure.
pub fn revert(meta: &mut Metadata, branch: &str, target: Hash) -> Result<()> {
    let head = meta.branch(branch)?;
    if !is_ancestor(meta, &target, &head.commit) {
        return Err(Error::Validation(format!(
            "commit {} is not an ancestor of the head of branch {}",
            target, branch
        )));
    }

    let commit_count = chain_length(meta, &target)?;
    let head = meta
        .branches
        .get_mut(branch)
        .ok_or_else(|| Error::BranchNotFound(branch.to_string()))?;
    head.commit = target;
    head.commit_count = commit_count;
    info!(branch, target = %target, "branch reverted");
    Ok(())
}

/// switch the purely-local active branch pointer
pub fn set_active(meta: &mut Metadata, name: &str) -> Result<()> {
    if !meta.branches.contains_key(name) {
        return Err(Error::BranchNotFound(name.to_string()));
    }
    meta.active_branch = name.to_string();
    Ok(())
}

/// the branch this working copy is tracking
pub fn active(meta: &Metadata) -> &str {
    &meta.active_branch
}

/// set the branch shown by default to other viewers (server-authoritative;
/// `Store::set_default_branch` persists it)
pub fn set_default(meta: &mut Metadata, name: &str) -> Result<()> {
    if !meta.branches.contains_key(name) {
        return Err(Error::BranchNotFound(name.to_string()));
    }
    meta.default_branch = name.to_string();
    Ok(())
}

/// change or clear a branch description
pub fn update_description(meta: &mut Metadata, branch: &str, text: Option<&str>) -> Result<()> {
    let head = meta
        .branches
        .get_mut(branch)
        .ok_or_else(|| Error::BranchNotFound(branch.to_string()))?;
    head.description = text.unwrap_or("").to_string();
    Ok(())
}

/// delete a branch head.
///
/// the last branch can never be removed; a database always keeps at least
/// one line of history; and neither can the branch the working copy or the
/// default view currently points at.
pub fn remove(meta: &mut Metadata, branch: &str) -> Result<()> {
    if !meta.branches.contains_key(branch) {
        return Err(Error::BranchNotFound(branch.to_string()));
    }
    if meta.branches.len() == 1 {
        return Err(Error::Validation(
            "cannot remove the only remaining branch".to_string(),
        ));
    }
    if branch == meta.active_branch {
        return Err(Error::Validation(format!(
            "cannot remove the active branch: {}",
            branch
        )));
    }
    if branch == meta.default_branch {
        return Err(Error::Validation(format!(
            "cannot remove the default branch: {}",
            branch
        )));
    }

    meta.branches.remove(branch);
    debug!(branch, "branch removed");
    Ok(())
}

/// all branch heads, name-sorted
pub fn list(meta: &Metadata) -> Vec<&BranchHead> {
    meta.branches.values().collect()
}
