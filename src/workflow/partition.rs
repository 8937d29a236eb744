//! Splits the intake album into work units small enough to drain and delete
//! without the library asking for confirmation.

use anyhow::{Context, Result};
use log::info;
use std::{collections::HashSet, time::Instant};

use crate::library::{Album, PhotoBackend};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnit {
    pub album: Album,
    pub generation: u32,
}

#[derive(Debug)]
pub struct PartitionReport {
    /// The intake album to use from now on (recreated when it was retired)
    pub intake: Album,
    pub distributed: usize,
    pub work_units: Vec<WorkUnit>,
}

pub fn work_unit_name(prefix: &str, generation: u32) -> String {
    format!("{prefix}{generation}")
}

/// Generation index of a work unit name. Only the canonical form produced by
/// [`work_unit_name`] is accepted, so `#01` or `#+1` never alias `#1`.
pub fn parse_generation(prefix: &str, name: &str) -> Option<u32> {
    let digits = name.strip_prefix(prefix)?;
    let canonical = !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit())
        && (digits == "0" || !digits.starts_with('0'));
    if !canonical {
        return None;
    }
    digits.parse().ok()
}

/// Work units currently in the library, ordered by generation.
pub fn list_work_units<B: PhotoBackend + ?Sized>(backend: &B, prefix: &str) -> Result<Vec<WorkUnit>> {
    let mut units: Vec<WorkUnit> = backend
        .albums_with_prefix(prefix)
        .context("failed to enumerate work units")?
        .into_iter()
        .filter_map(|album| {
            parse_generation(prefix, &album.name).map(|generation| WorkUnit { album, generation })
        })
        .collect();
    units.sort_by_key(|unit| unit.generation);
    Ok(units)
}

/// Move every intake member into a work unit of at most `capacity` items,
/// then retire the intake album by deleting and recreating it.
pub fn partition<B: PhotoBackend + ?Sized>(
    backend: &B,
    intake: &Album,
    prefix: &str,
    capacity: usize,
) -> Result<PartitionReport> {
    // The intake can be large, enumerate it exactly once.
    let start = Instant::now();
    let members = backend
        .list_members(intake)
        .context(format!("failed to enumerate intake album {:?}", intake.name))?;
    info!(duration = &*format!("{:?}", start.elapsed()); "Read {} photos from {:?}", members.len(), intake.name);

    if members.is_empty() {
        return Ok(PartitionReport {
            intake: intake.clone(),
            distributed: 0,
            work_units: list_work_units(backend, prefix)?,
        });
    }

    let mut units = Vec::new();
    let mut sizes = Vec::new();
    let mut assigned = HashSet::new();
    for unit in list_work_units(backend, prefix)? {
        let unit_members = backend
            .list_members(&unit.album)
            .context(format!("failed to enumerate work unit {:?}", unit.album.name))?;
        sizes.push(unit_members.len());
        assigned.extend(unit_members.into_iter().map(|item| item.id));
        units.push(unit);
    }

    // Items a previous run already placed in a unit stay where they are.
    let mut seen = HashSet::new();
    let pending: Vec<String> = members
        .into_iter()
        .map(|item| item.id)
        .filter(|id| !assigned.contains(id) && seen.insert(id.clone()))
        .collect();

    let mut cursor = 0;
    let mut generation = 0u32;
    while cursor < pending.len() {
        let position = units.iter().position(|unit| unit.generation == generation);
        let (album, size) = match position {
            Some(index) => (units[index].album.clone(), sizes[index]),
            None => {
                let album = backend
                    .create_album(&work_unit_name(prefix, generation))
                    .context(format!("failed to create work unit {generation}"))?;
                units.push(WorkUnit {
                    album: album.clone(),
                    generation,
                });
                sizes.push(0);
                (album, 0)
            }
        };

        let room = capacity.saturating_sub(size);
        if room > 0 {
            let end = (cursor + room).min(pending.len());
            let chunk = &pending[cursor..end];
            backend
                .add_members(&album, chunk)
                .context(format!("failed to fill work unit {:?}", album.name))?;
            info!("Moved {} photos into {:?}", chunk.len(), album.name);
            if let Some(index) = units.iter().position(|unit| unit.generation == generation) {
                sizes[index] += chunk.len();
            }
            cursor = end;
        }
        generation += 1;
    }

    // Every member is now held by a work unit; the intake can go.
    backend
        .delete_album(intake)
        .context(format!("failed to retire intake album {:?}", intake.name))?;
    let intake = backend
        .create_album(&intake.name)
        .context(format!("failed to recreate intake album {:?}", intake.name))?;

    units.sort_by_key(|unit| unit.generation);
    Ok(PartitionReport {
        intake,
        distributed: pending.len(),
        work_units: units,
    })
}
