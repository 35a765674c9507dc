//! Vision-language model backend served by Ollama.

use super::{encode_png, TextError, TextExtractor};
use base64::Engine;
use image::RgbImage;
use log::{debug, info};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "llava";
pub const DEFAULT_OLLAMA_PROMPT: &str =
    "Extract the text from this label image. Return ONLY the text content, nothing else.";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaParams {
    pub url: String,
    pub model: String,
    pub prompt: String,
    pub timeout_secs: u64,
}

impl Default for OllamaParams {
    fn default() -> Self {
        Self {
            url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_OLLAMA_MODEL.to_string(),
            prompt: DEFAULT_OLLAMA_PROMPT.to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    images: Vec<String>,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Sends each crop as a base64 PNG to `POST {url}/api/generate`.
pub struct OllamaTextExtractor {
    client: Client,
    endpoint: String,
    params: OllamaParams,
}

impl OllamaTextExtractor {
    pub fn new(params: OllamaParams) -> Result<Self, TextError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(params.timeout_secs))
            .build()?;
        let endpoint = format!("{}/api/generate", params.url.trim_end_matches('/'));
        info!("ollama text extraction: endpoint={endpoint}, model={}", params.model);
        Ok(Self {
            client,
            endpoint,
            params,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl TextExtractor for OllamaTextExtractor {
    fn name(&self) -> &str {
        "ollama"
    }

    fn extract_text(&self, crop: &RgbImage) -> Result<String, TextError> {
        let png = encode_png(crop)?;
        let body = GenerateRequest {
            model: &self.params.model,
            prompt: &self.params.prompt,
            images: vec![base64::engine::general_purpose::STANDARD.encode(png)],
            stream: false,
        };

        let resp = self.client.post(&self.endpoint).json(&body).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(TextError::Status(status.as_u16()));
        }
        let parsed: GenerateResponse = resp.json()?;
        debug!("ollama answered {} chars", parsed.response.len());
        Ok(parsed.response.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_matches_generate_api() {
        let body = GenerateRequest {
            model: "llava",
            prompt: "read it",
            images: vec!["AAAA".to_string()],
            stream: false,
        };
        let json = serde_json::to_value(&body).expect("json");
        assert_eq!(
            json,
            serde_json::json!({
                "model": "llava",
                "prompt": "read it",
                "images": ["AAAA"],
                "stream": false
            })
        );
    }

    #[test]
    fn endpoint_ignores_trailing_slash() {
        let params = OllamaParams {
            url: "http://127.0.0.1:59999/".to_string(),
            ..OllamaParams::default()
        };
        let ex = OllamaTextExtractor::new(params).expect("client");
        assert_eq!(ex.endpoint(), "http://127.0.0.1:59999/api/generate");
        assert!(!ex.needs_cleanup());
    }

    #[test]
    fn unreachable_service_is_an_error() {
        let params = OllamaParams {
            url: "http://127.0.0.1:59999".to_string(),
            timeout_secs: 2,
            ..OllamaParams::default()
        };
        let ex = OllamaTextExtractor::new(params).expect("client");
        let crop = RgbImage::from_pixel(8, 4, image::Rgb([255, 255, 255]));
        assert!(matches!(ex.extract_text(&crop), Err(TextError::Http(_))));
    }

    #[test]
    fn missing_response_field_reads_as_empty() {
        let parsed: GenerateResponse = serde_json::from_str(r#"{"done":true}"#).expect("json");
        assert!(parsed.response.is_empty());
    }
}
