//! Drains one work unit in small batches.
//!
//! After every batch the handled items are added to the done/failed albums and
//! then removed from the work unit, so an interrupted run only repeats the
//! batch that was in flight.

use anyhow::{Context, Result};
use log::{info, warn};
use std::{collections::HashSet, time::Instant};

use super::{Pipeline, handle::handle, partition::WorkUnit, progress::Progress};
use crate::library::{Album, PhotoBackend, PhotoItem};

/// Terminal albums of a run.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    pub done: Album,
    pub failed: Album,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DrainReport {
    pub succeeded: usize,
    pub failed: usize,
    pub batches: usize,
}

/// Process every member of `unit`, then delete it.
pub fn drain(
    pipeline: &Pipeline,
    unit: &WorkUnit,
    checkpoint: &Checkpoint,
    progress: &mut Progress,
) -> Result<DrainReport> {
    let backend = pipeline.backend;
    let batch_size = pipeline.config.batch_size;
    let mut album = unit.album.clone();
    let mut handled: HashSet<String> = HashSet::new();
    let mut report = DrainReport::default();

    loop {
        let start = Instant::now();
        let members = backend
            .list_members(&album)
            .context(format!("failed to enumerate work unit {:?}", album.name))?;
        info!(duration = &*format!("{:?}", start.elapsed()); "Read {} photos from {:?}", members.len(), album.name);

        let listed = members.len();
        let batch: Vec<PhotoItem> = members
            .into_iter()
            .filter(|item| !handled.contains(&item.id))
            .take(batch_size)
            .collect();

        if batch.is_empty() {
            if listed > 0 {
                // Removal did not stick, but all of them are already recorded.
                warn!(
                    "{} photos in {:?} were already moved to {:?} or {:?}",
                    listed, album.name, checkpoint.done.name, checkpoint.failed.name
                );
            }
            break;
        }

        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        for item in batch {
            progress.describe(&item.filename);
            info!(
                "Image {} of {}: {} {}",
                progress.current + 1,
                progress.total,
                item.id,
                item.filename
            );
            let success = match handle(pipeline, &item) {
                Ok(keywords) => {
                    info!("New keywords: {}", keywords.join(", "));
                    true
                }
                Err(err) => {
                    warn!("Skipping {}: {:#}", item.filename, err);
                    false
                }
            };
            if success {
                succeeded.push(item.id.clone());
            } else {
                failed.push(item.id.clone());
            }
            progress.record(success);
            handled.insert(item.id);
        }

        album = record_batch(backend, &album, checkpoint, &succeeded, &failed)?;
        report.succeeded += succeeded.len();
        report.failed += failed.len();
        report.batches += 1;
    }

    backend
        .delete_album(&album)
        .context(format!("failed to delete drained work unit {:?}", album.name))?;
    info!(
        "Drained {:?}: {} done, {} not done",
        album.name, report.succeeded, report.failed
    );
    Ok(report)
}

/// Record a batch in the terminal albums, then take it out of the work unit.
/// Returns the work unit handle to keep using.
pub fn record_batch(
    backend: &dyn PhotoBackend,
    album: &Album,
    checkpoint: &Checkpoint,
    succeeded: &[String],
    failed: &[String],
) -> Result<Album> {
    if !succeeded.is_empty() {
        backend
            .add_members(&checkpoint.done, succeeded)
            .context(format!("failed to add photos to {:?}", checkpoint.done.name))?;
    }
    if !failed.is_empty() {
        backend
            .add_members(&checkpoint.failed, failed)
            .context(format!("failed to add photos to {:?}", checkpoint.failed.name))?;
    }
    info!(
        "Moving {} photos to {:?} and {} to {:?}",
        succeeded.len(),
        checkpoint.done.name,
        failed.len(),
        checkpoint.failed.name
    );

    let handled: Vec<String> = succeeded.iter().chain(failed).cloned().collect();
    let start = Instant::now();
    let album = backend
        .remove_members(album, &handled)
        .context(format!("failed to remove handled photos from {:?}", album.name))?;
    info!(duration = &*format!("{:?}", start.elapsed()); "Removed {} photos from {:?}", handled.len(), album.name);
    Ok(album)
}
