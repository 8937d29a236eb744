use anyhow::{Result, bail};
use log::info;
use std::time::Instant;

use photo_ai_keywords::{
    AppConfig,
    bootstrap::{logger::initialize_logger, setup::check_osascript},
    common::errors::handle_error,
    gateway::OllamaGateway,
    library::ApplePhotosLibrary,
    run,
};

fn main() -> Result<()> {
    initialize_logger();

    let config = AppConfig::from_env().map_err(|err| handle_error(err.context("Invalid configuration.")))?;
    info!(
        "Keywords from {} via {}, translation: {}",
        config.vision_model,
        config.vision_url(),
        config.translate_to
    );

    // check_osascript logs the reason.
    if !check_osascript() {
        bail!("osascript is not available");
    }
    let library = ApplePhotosLibrary::new();
    library
        .check_available()
        .map_err(|err| handle_error(err.context("Photos library unavailable.")))?;

    let gateway = OllamaGateway::new(&config)?;

    let start_time = Instant::now();
    let summary = run(&config, &library, &gateway)
        .map_err(|err| handle_error(err.context("Keyword run aborted, it is safe to start it again.")))?;

    info!(
        duration = &*format!("{:?}", start_time.elapsed());
        "Finished {} work units: {} photos tagged, {} moved to {:?}",
        summary.work_units,
        summary.succeeded,
        summary.failed,
        config.failed_album
    );
    Ok(())
}
