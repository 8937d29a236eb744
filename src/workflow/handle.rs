//! Per-item keyword generation.
//!
//! Every failure is returned as an [`ItemError`]; nothing here aborts the
//! batch. The scratch directory is emptied on every return path.

use anyhow::{Context, anyhow};
use log::info;
use std::time::Instant;
use thiserror::Error;

use super::{
    Pipeline,
    keywords::{merge_keywords, parse_keywords},
};
use crate::{
    library::{MediaKind, PhotoItem},
    processors::{image::prepare_for_model, scratch::delete_with_retry},
    utils::PathExt,
};

#[derive(Debug, Error)]
pub enum ItemError {
    #[error("unsupported kind: {0}")]
    UnsupportedKind(String),
    #[error("export ambiguity: {0}")]
    ExportAmbiguity(String),
    #[error(transparent)]
    Processing(#[from] anyhow::Error),
}

/// Generate keywords for one item and write them back.
/// Returns the keyword set written to the item.
pub fn handle(pipeline: &Pipeline, item: &PhotoItem) -> Result<Vec<String>, ItemError> {
    if item.kind != MediaKind::Image {
        return Err(ItemError::UnsupportedKind(format!(
            "{} is not a still image",
            item.filename
        )));
    }

    let scratch = pipeline.scratch;
    let _guard = scratch.guard();
    scratch.clear()?;

    let start = Instant::now();
    pipeline
        .backend
        .export_media(item, scratch.path())
        .context(format!("failed to export {:?}", item.filename))?;
    info!(duration = &*format!("{:?}", start.elapsed()); "Exported {}", item.filename);

    // The exported file name is not predictable, so take the only file there.
    let files = scratch.files()?;
    let [artifact] = files.as_slice() else {
        return Err(ItemError::ExportAmbiguity(format!(
            "expected one exported file, found {}",
            files.len()
        )));
    };
    if artifact.is_motion() {
        return Err(ItemError::ExportAmbiguity(format!(
            "export produced a motion file {:?}",
            artifact.file_name().unwrap_or_default()
        )));
    }

    let config = pipeline.config;
    let jpeg = prepare_for_model(artifact, config.resample_width)?;

    let reply = pipeline
        .gateway
        .describe_image(&jpeg)
        .context("vision model request failed")?;
    let mut keywords = parse_keywords(&reply);
    info!("Keywords = {}", keywords.join(", "));

    if config.translate_to.is_enabled() {
        let translated = pipeline
            .gateway
            .translate_keywords(&keywords, config.translate_to)
            .context("translation request failed")?;
        keywords = parse_keywords(&translated);
        info!("Keywords ({}) = {}", config.translate_to, keywords.join(", "));
    }

    if keywords.is_empty() {
        return Err(anyhow!("model reply contained no keywords: {reply:?}").into());
    }

    let merged = merge_keywords(&item.keywords, &keywords, &config.keyword_marker);
    let start = Instant::now();
    pipeline
        .backend
        .write_keywords(&item.id, &merged)
        .context(format!("failed to write keywords of {:?}", item.filename))?;
    info!(duration = &*format!("{:?}", start.elapsed()); "Wrote {} keywords", merged.len());

    delete_with_retry(artifact)?;
    Ok(merged)
}
