use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::analysis::prompts::{self, ANALYSIS_TEMPERATURE};
use crate::analysis::{to_data_url, AnalysisResult, GeneratedImages, Photo, SermonInput};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    image_model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn from_env() -> Result<Self> {
        let api_key = dotenv::var("GEMINI_API_KEY")
            .or_else(|_| dotenv::var("API_KEY"))
            .ok()
            .filter(|k| !k.is_empty())
            .context("GEMINI_API_KEY (or API_KEY) is required")?;
        let base_url =
            dotenv::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model =
            dotenv::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.5-flash".to_string());
        let image_model = dotenv::var("GEMINI_IMAGE_MODEL")
            .unwrap_or_else(|_| "gemini-2.5-flash-image".to_string());

        Self::new(&base_url, &model, &image_model, &api_key)
    }

    pub fn new(base_url: &str, model: &str, image_model: &str, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            model: model.to_string(),
            image_model: image_model.to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Resolve the generateContent endpoint for `model` from the base URL.
    fn endpoint(&self, model: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/v1beta") {
            format!("{}/models/{}:generateContent", base, model)
        } else {
            format!("{}/v1beta/models/{}:generateContent", base, model)
        }
    }

    async fn generate_content(&self, model: &str, body: &Value) -> Result<Value> {
        let resp = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .context("Gemini request failed")?;

        let status = resp.status();
        let text = resp.text().await.context("Failed to read Gemini response")?;
        if !status.is_success() {
            bail!("Gemini returned {}: {}", status, text);
        }
        serde_json::from_str(&text).context("Failed to parse Gemini JSON")
    }

    /// Ask the text model for the structured sermon analysis.
    pub async fn analyze_sermon(&self, input: &SermonInput) -> Result<AnalysisResult> {
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompts::analysis_prompt(input) }],
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": prompts::response_schema(),
                "temperature": ANALYSIS_TEMPERATURE,
            },
        });

        let json = self.generate_content(&self.model, &body).await?;
        let text = extract_text(&json)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| anyhow!("No content generated by {}", self.model))?;

        debug!(model = %self.model, response_len = text.len(), "analysis received");
        serde_json::from_str(&text).context("Analysis response did not match the expected schema")
    }

    /// Produce the 16:9 thumbnail and 1:1 cover from the preacher's photo.
    /// Both edits run concurrently; either failing fails the whole call.
    pub async fn generate_images(
        &self,
        photo: &Photo,
        title: &str,
        preacher: &str,
    ) -> Result<GeneratedImages> {
        debug!(title, preacher, mime = %photo.mime_type, "generating artwork");

        let thumbnail_prompt = prompts::thumbnail_prompt(title);
        let cover_prompt = prompts::cover_prompt(title);
        let (thumbnail_16_9, artwork_1_1) = tokio::try_join!(
            self.edit_image(photo, &thumbnail_prompt),
            self.edit_image(photo, &cover_prompt),
        )?;

        Ok(GeneratedImages {
            thumbnail_16_9,
            artwork_1_1,
        })
    }

    /// One image edit. Returns a `data:image/png;base64,...` URL.
    async fn edit_image(&self, photo: &Photo, prompt: &str) -> Result<String> {
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "inlineData": { "mimeType": photo.mime_type, "data": STANDARD.encode(&photo.bytes) } },
                    { "text": prompt },
                ],
            }],
            "generationConfig": {
                "responseModalities": ["IMAGE"],
            },
        });

        let json = self.generate_content(&self.image_model, &body).await?;
        match extract_inline_image(&json) {
            Some(data) => {
                let bytes = STANDARD
                    .decode(data)
                    .context("Image response was not valid base64")?;
                Ok(to_data_url("image/png", &bytes))
            }
            None => {
                warn!(
                    finish_reason = json["candidates"][0]["finishReason"].as_str().unwrap_or(""),
                    "Image generation returned no data"
                );
                bail!("Failed to generate image")
            }
        }
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(json: &Value) -> Option<String> {
    let parts = json["candidates"].get(0)?["content"]["parts"].as_array()?;
    let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
    Some(text)
}

/// Base64 payload of the first inline image in the first candidate.
fn extract_inline_image(json: &Value) -> Option<&str> {
    json["candidates"].get(0)?["content"]["parts"]
        .as_array()?
        .iter()
        .find_map(|p| p["inlineData"]["data"].as_str())
        .filter(|d| !d.is_empty())
}
