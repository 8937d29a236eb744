//! Run configuration.
//!
//! Values come from the process environment (after loading an optional `.env`
//! file) using the `AI_KEYWORDS_` prefix, e.g. `AI_KEYWORDS_TRANSLATE_TO=German`.

use anyhow::{Context, Result, bail};
use dotenv::dotenv;
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf};

use crate::common::{
    DEFAULT_BATCH_SIZE, DEFAULT_KEYWORD_MARKER, DEFAULT_RESAMPLE_WIDTH, DEFAULT_WORK_UNIT_CAPACITY,
    WORK_UNIT_SEPARATOR,
};

pub const ENV_PREFIX: &str = "AI_KEYWORDS_";

// ────────────────────────────────────────────────────────────────
// Target language
// ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(try_from = "String", into = "String")]
pub enum Language {
    /// Translation disabled, the vision model output is used as is.
    #[default]
    None,
    German,
    French,
    Spanish,
    Italian,
    Portuguese,
    Dutch,
    Russian,
    Chinese,
    Japanese,
    Korean,
}

impl Language {
    pub const ALL: [Language; 11] = [
        Language::None,
        Language::German,
        Language::French,
        Language::Spanish,
        Language::Italian,
        Language::Portuguese,
        Language::Dutch,
        Language::Russian,
        Language::Chinese,
        Language::Japanese,
        Language::Korean,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::None => "None",
            Language::German => "German",
            Language::French => "French",
            Language::Spanish => "Spanish",
            Language::Italian => "Italian",
            Language::Portuguese => "Portuguese",
            Language::Dutch => "Dutch",
            Language::Russian => "Russian",
            Language::Chinese => "Chinese",
            Language::Japanese => "Japanese",
            Language::Korean => "Korean",
        }
    }

    pub fn is_enabled(&self) -> bool {
        *self != Language::None
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Language {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let trimmed = value.trim();
        Language::ALL
            .into_iter()
            .find(|language| language.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                let supported: Vec<&str> = Language::ALL.iter().map(Language::as_str).collect();
                format!(
                    "unsupported language {trimmed:?}, expected one of {}",
                    supported.join(", ")
                )
            })
    }
}

impl From<Language> for String {
    fn from(language: Language) -> Self {
        language.as_str().to_string()
    }
}

// ────────────────────────────────────────────────────────────────
// AppConfig
// ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the Ollama server used when no model specific URL is set
    pub ollama_url: String,
    pub vision_model: String,
    pub vision_url: Option<String>,
    pub translate_model: String,
    pub translate_url: Option<String>,
    /// Album holding the photos that still need keywords
    pub intake_album: String,
    pub done_album: String,
    pub failed_album: String,
    pub keyword_marker: String,
    pub translate_to: Language,
    pub batch_size: usize,
    pub work_unit_capacity: usize,
    pub resample_width: u32,
    pub scratch_dir: PathBuf,
    pub request_timeout_secs: u64,
    pub num_predict: u32,
    pub progress_bar: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://127.0.0.1:11434".to_string(),
            vision_model: "llava:v1.6".to_string(),
            vision_url: None,
            translate_model: "llama3.1:latest".to_string(),
            translate_url: None,
            intake_album: "ai-keywords".to_string(),
            done_album: "ai-keywords DONE".to_string(),
            failed_album: "ai-keywords NOT DONE".to_string(),
            keyword_marker: DEFAULT_KEYWORD_MARKER.to_string(),
            translate_to: Language::None,
            batch_size: DEFAULT_BATCH_SIZE,
            work_unit_capacity: DEFAULT_WORK_UNIT_CAPACITY,
            resample_width: DEFAULT_RESAMPLE_WIDTH,
            scratch_dir: PathBuf::from("temporary_ai_photo_export"),
            request_timeout_secs: 300,
            num_predict: 200,
            progress_bar: true,
        }
    }
}

impl AppConfig {
    /// Load `.env` (if any) and read the prefixed environment.
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        let config: AppConfig = envy::prefixed(ENV_PREFIX)
            .from_env()
            .context("failed to read configuration from environment")?;
        config.validate()?;
        Ok(config)
    }

    /// Same as [`AppConfig::from_env`] but reads the given variables only.
    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: AppConfig = envy::prefixed(ENV_PREFIX)
            .from_iter(vars)
            .context("failed to read configuration from variables")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            bail!("batch_size must be greater than zero");
        }
        if self.work_unit_capacity == 0 {
            bail!("work_unit_capacity must be greater than zero");
        }
        if self.resample_width == 0 {
            bail!("resample_width must be greater than zero");
        }
        if self.keyword_marker.trim().is_empty() {
            bail!("keyword_marker must not be blank");
        }
        let names = [&self.intake_album, &self.done_album, &self.failed_album];
        if names.iter().any(|name| name.trim().is_empty()) {
            bail!("album names must not be blank");
        }
        if names[0] == names[1] || names[0] == names[2] || names[1] == names[2] {
            bail!("intake, done and failed albums must have distinct names");
        }
        Ok(())
    }

    pub fn vision_url(&self) -> &str {
        self.vision_url.as_deref().unwrap_or(&self.ollama_url)
    }

    pub fn translate_url(&self) -> &str {
        self.translate_url.as_deref().unwrap_or(&self.ollama_url)
    }

    /// Name prefix shared by every work unit carved out of the intake album.
    pub fn work_unit_prefix(&self) -> String {
        format!("{}{}", self.intake_album, WORK_UNIT_SEPARATOR)
    }
}
