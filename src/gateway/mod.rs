pub mod ollama;

use anyhow::Result;

use crate::config::Language;

pub use ollama::OllamaGateway;

/// Vision and translation inference as seen by the workflow.
pub trait ModelGateway {
    /// Ask the vision model for keywords describing a base64 encoded JPEG.
    fn describe_image(&self, jpeg_base64: &str) -> Result<String>;

    /// Translate a keyword list, returning the comma separated reply.
    fn translate_keywords(&self, keywords: &[String], language: Language) -> Result<String>;
}
