use tracing::debug;

use crate::error::{Error, Result};
use crate::types::{Metadata, Release};

/// create a release; the name must be free and the commit known
pub fn create(meta: &mut Metadata, release: Release) -> Result<()> {
    if release.name.is_empty() {
        return Err(Error::Validation("release name is required".to_string()));
    }
    if meta.releases.contains_key(&release.name) {
        return Err(Error::ReleaseExists(release.name));
    }
    meta.commit(&release.commit)?;

    debug!(release = %release.name, commit = %release.commit, "release created");
    meta.releases.insert(release.name.clone(), release);
    Ok(())
}

/// replace an existing release's details
pub fn update(meta: &mut Metadata, release: Release) -> Result<()> {
    if !meta.releases.contains_key(&release.name) {
        return Err(Error::ReleaseNotFound(release.name));
    }
    meta.commit(&release.commit)?;

    meta.releases.insert(release.name.clone(), release);
    Ok(())
}

/// delete a release, returning the removed entry
pub fn remove(meta: &mut Metadata, name: &str) -> Result<Release> {
    meta.releases
        .remove(name)
        .ok_or_else(|| Error::ReleaseNotFound(name.to_string()))
}

/// all releases, name-sorted
pub fn list(meta: &Metadata) -> Vec<&Release> {
    meta.releases.values().collect()
}
