use anyhow::{Context, Result};
use log::info;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::ModelGateway;
use crate::{
    common::{IMAGE_PROMPT, translate_prompt},
    config::{AppConfig, Language},
};

#[derive(Debug, Serialize)]
pub struct GenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<&'a str>,
    pub stream: bool,
    pub options: GenerateOptions,
}

#[derive(Debug, Serialize)]
pub struct GenerateOptions {
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
}

/// Blocking client for the Ollama `/api/generate` endpoint.
#[derive(Debug, Clone)]
pub struct OllamaGateway {
    client: Client,
    vision_url: String,
    vision_model: String,
    translate_url: String,
    translate_model: String,
    num_predict: u32,
}

impl OllamaGateway {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            vision_url: config.vision_url().trim_end_matches('/').to_string(),
            vision_model: config.vision_model.clone(),
            translate_url: config.translate_url().trim_end_matches('/').to_string(),
            translate_model: config.translate_model.clone(),
            num_predict: config.num_predict,
        })
    }

    fn generate(&self, base_url: &str, request: &GenerateRequest) -> Result<String> {
        let url = format!("{base_url}/api/generate");
        let response: GenerateResponse = self
            .client
            .post(&url)
            .json(request)
            .send()
            .context(format!("failed to reach {url}"))?
            .error_for_status()
            .context(format!("model {} rejected the request", request.model))?
            .json()
            .context(format!("malformed reply from model {}", request.model))?;
        Ok(response.response)
    }
}

impl ModelGateway for OllamaGateway {
    fn describe_image(&self, jpeg_base64: &str) -> Result<String> {
        let start = Instant::now();
        let request = GenerateRequest {
            model: &self.vision_model,
            prompt: IMAGE_PROMPT,
            images: vec![jpeg_base64],
            stream: false,
            options: GenerateOptions {
                temperature: 0.0,
                num_predict: Some(self.num_predict),
            },
        };
        let reply = self.generate(&self.vision_url, &request)?;
        info!(duration = &*format!("{:?}", start.elapsed()); "Keywords from {}", self.vision_model);
        Ok(reply)
    }

    fn translate_keywords(&self, keywords: &[String], language: Language) -> Result<String> {
        let start = Instant::now();
        let prompt = translation_request(keywords, language);
        let request = GenerateRequest {
            model: &self.translate_model,
            prompt: &prompt,
            images: Vec::new(),
            stream: false,
            options: GenerateOptions {
                temperature: 0.0,
                num_predict: None,
            },
        };
        let reply = self.generate(&self.translate_url, &request)?;
        info!(duration = &*format!("{:?}", start.elapsed()); "Translated keywords to {language}");
        Ok(reply)
    }
}

/// Instruction followed by a blank line and the keyword list.
pub fn translation_request(keywords: &[String], language: Language) -> String {
    format!("{}\n\n{}", translate_prompt(language.as_str()), keywords.join(", "))
}
