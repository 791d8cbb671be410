use tracing::debug;

use crate::error::{Error, Result};
use crate::types::{Metadata, Tag};

/// create a tag; the name must be free and the commit known
pub fn create(meta: &mut Metadata, tag: Tag) -> Result<()> {
    if tag.name.is_empty() {
        return Err(Error::Validation("tag name is required".to_string()));
    }
    if meta.tags.contains_key(&tag.name) {
        return Err(Error::TagExists(tag.name));
    }
    meta.commit(&tag.commit)?;

    debug!(tag = %tag.name, commit = %tag.commit, "tag created");
    meta.tags.insert(tag.name.clone(), tag);
    Ok(())
}

/// replace an existing tag's details
pub fn update(meta: &mut Metadata, tag: Tag) -> Result<()> {
    if !meta.tags.contains_key(&tag.name) {
        return Err(Error::TagNotFound(tag.name));
    }
    meta.commit(&tag.commit)?;

    meta.tags.insert(tag.name.clone(), tag);
    Ok(())
}

/// delete a tag, returning the removed entry
pub fn remove(meta: &mut Metadata, name: &str) -> Result<Tag> {
    meta.tags
        .remove(name)
        .ok_or_else(|| Error::TagNotFound(name.to_string()))
}

/// all tags, name-sorted
pub fn list(meta: &Metadata) -> Vec<&Tag> {
    meta.tags.values().collect()
}
