//! Resumable AI keyword tagging for photo libraries.
//!
//! Photos waiting in an intake album are split into small work units, each
//! photo is described by a vision model, and the generated keywords are
//! written back with a marker suffix. Progress is recorded purely through
//! album membership, so an interrupted run can be restarted at any time.

pub mod bootstrap;
pub mod common;
pub mod config;
pub mod gateway;
pub mod library;
pub mod processors;
pub mod utils;
pub mod workflow;

pub use config::{AppConfig, Language};
pub use workflow::orchestrator::{RunSummary, run};
