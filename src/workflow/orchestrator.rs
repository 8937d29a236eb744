use anyhow::{Context, Result};
use log::info;
use std::time::Instant;

use super::{
    Pipeline,
    drain::{Checkpoint, drain},
    partition::{WorkUnit, list_work_units, partition},
    progress::Progress,
    recover::recover_rebuilds,
};
use crate::{
    config::AppConfig, gateway::ModelGateway, library::PhotoBackend,
    processors::scratch::ScratchDir,
};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Photos moved out of the intake album by this run
    pub distributed: usize,
    /// Photos put back into a work unit after an interrupted rebuild
    pub recovered: usize,
    pub work_units: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Partition the intake album, drain every work unit and clean up.
///
/// State lives in the library's albums only, so a failed run can simply be
/// started again.
pub fn run(
    config: &AppConfig,
    backend: &dyn PhotoBackend,
    gateway: &dyn ModelGateway,
) -> Result<RunSummary> {
    let intake = backend
        .open_or_create_album(&config.intake_album)
        .context("failed to open intake album")?;
    let checkpoint = Checkpoint {
        done: backend
            .open_or_create_album(&config.done_album)
            .context("failed to open done album")?,
        failed: backend
            .open_or_create_album(&config.failed_album)
            .context("failed to open failed album")?,
    };

    let scratch = ScratchDir::new(&config.scratch_dir);
    scratch.reset()?;

    let prefix = config.work_unit_prefix();
    let recovered = recover_rebuilds(backend, &prefix, &checkpoint)?;
    let report = partition(backend, &intake, &prefix, config.work_unit_capacity)?;
    if report.distributed > 0 {
        info!(
            "Distributed {} photos from {:?} into work units",
            report.distributed, intake.name
        );
    }

    // Listed again so units created by another invocation are picked up too.
    let units = list_work_units(backend, &prefix)?;
    let start = Instant::now();
    let mut total = 0;
    for unit in &units {
        total += backend
            .list_members(&unit.album)
            .context(format!("failed to enumerate work unit {:?}", unit.album.name))?
            .len();
    }
    info!(duration = &*format!("{:?}", start.elapsed()); "{} photos in {} work units", total, units.len());

    let pipeline = Pipeline {
        backend,
        gateway,
        scratch: &scratch,
        config,
    };
    let mut progress = Progress::new(total, config.progress_bar);
    let outcome = drain_all(&pipeline, &units, &checkpoint, &mut progress);
    progress.finish();
    let mut summary = outcome?;
    summary.distributed = report.distributed;
    summary.recovered = recovered;

    if progress.is_complete() && total > 0 {
        info!("All {} photos handled", progress.current);
    }

    scratch.remove()?;
    Ok(summary)
}

fn drain_all(
    pipeline: &Pipeline,
    units: &[WorkUnit],
    checkpoint: &Checkpoint,
    progress: &mut Progress,
) -> Result<RunSummary> {
    let mut summary = RunSummary::default();
    for unit in units {
        let report = drain(pipeline, unit, checkpoint, progress)?;
        summary.work_units += 1;
        summary.succeeded += report.succeeded;
        summary.failed += report.failed;
    }
    Ok(summary)
}
