//! Restores work unit members stranded by an interrupted rebuild.
//!
//! Removing items rebuilds a work unit through a pending
//! `<unit> (rebuilding)` album. If that is cut short after the original unit
//! was deleted, the pending album is the only place its remaining members
//! live, and it is not a work unit itself.

use anyhow::{Context, Result};
use log::warn;
use std::collections::HashSet;

use super::{
    drain::Checkpoint,
    partition::{parse_generation, work_unit_name},
};
use crate::{
    common::REBUILD_SUFFIX,
    library::{Album, PhotoBackend},
};

/// Generation of a pending rebuild album named `<prefix><gen> (rebuilding)`.
pub fn parse_pending_generation(prefix: &str, name: &str) -> Option<u32> {
    parse_generation(prefix, name.strip_suffix(REBUILD_SUFFIX)?)
}

/// Move the members of every pending rebuild album back into their work unit
/// (recreated if needed), then delete the pending album. Members already in
/// the done or failed album stay out. Returns the number of restored members.
pub fn recover_rebuilds<B: PhotoBackend + ?Sized>(
    backend: &B,
    prefix: &str,
    checkpoint: &Checkpoint,
) -> Result<usize> {
    let pending: Vec<(Album, u32)> = backend
        .albums_with_prefix(prefix)
        .context("failed to enumerate pending rebuilds")?
        .into_iter()
        .filter_map(|album| {
            parse_pending_generation(prefix, &album.name).map(|generation| (album, generation))
        })
        .collect();
    if pending.is_empty() {
        return Ok(0);
    }

    let mut recorded = HashSet::new();
    for album in [&checkpoint.done, &checkpoint.failed] {
        let members = backend
            .list_members(album)
            .context(format!("failed to enumerate {:?}", album.name))?;
        recorded.extend(members.into_iter().map(|item| item.id));
    }

    let mut restored = 0;
    for (album, generation) in pending {
        let unit = backend
            .open_or_create_album(&work_unit_name(prefix, generation))
            .context(format!("failed to open work unit {generation}"))?;
        let present: HashSet<String> = backend
            .list_members(&unit)
            .context(format!("failed to enumerate work unit {:?}", unit.name))?
            .into_iter()
            .map(|item| item.id)
            .collect();
        let stranded: Vec<String> = backend
            .list_members(&album)
            .context(format!("failed to enumerate {:?}", album.name))?
            .into_iter()
            .map(|item| item.id)
            .filter(|id| !recorded.contains(id) && !present.contains(id))
            .collect();

        if !stranded.is_empty() {
            backend
                .add_members(&unit, &stranded)
                .context(format!("failed to restore photos into {:?}", unit.name))?;
            warn!(
                "Restored {} photos from {:?} into {:?}",
                stranded.len(),
                album.name,
                unit.name
            );
        }
        backend
            .delete_album(&album)
            .context(format!("failed to delete {:?}", album.name))?;
        restored += stranded.len();
    }
    Ok(restored)
}
