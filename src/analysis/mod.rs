pub mod prompts;

use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Photo of the preacher used as the base for generated artwork.
#[derive(Debug, Clone)]
pub struct Photo {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl Photo {
    pub fn new(bytes: Vec<u8>, mime_type: &str) -> Result<Self> {
        if !mime_type.starts_with("image/") {
            bail!("expected an image, got '{}'", mime_type);
        }
        if bytes.is_empty() {
            bail!("image is empty");
        }
        Ok(Self {
            bytes,
            mime_type: mime_type.to_string(),
        })
    }
}

/// What the operator submits for one sermon.
#[derive(Debug, Clone)]
pub struct SermonInput {
    pub youtube_url: String,
    pub preacher_name: String,
    pub title: String,
    pub photo: Option<Photo>,
}

impl SermonInput {
    pub fn new(youtube_url: &str, preacher_name: &str, title: &str) -> Result<Self> {
        let field = |name: &str, value: &str| -> Result<String> {
            let value = value.trim();
            if value.is_empty() {
                bail!("{} is required", name);
            }
            Ok(value.to_string())
        };

        Ok(Self {
            youtube_url: field("video link", youtube_url)?,
            preacher_name: field("preacher", preacher_name)?,
            title: field("title", title)?,
            photo: None,
        })
    }

    pub fn with_photo(mut self, photo: Photo) -> Self {
        self.photo = Some(photo);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyMoment {
    pub title: String,
    pub timestamp: String,
    pub reasoning: String,
    pub hook: String,
    pub estimated_context: String,
}

/// Generated artwork. Each value is a `data:` URL until the episode is saved,
/// after which it is a store path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedImages {
    #[serde(rename = "thumbnail16_9")]
    pub thumbnail_16_9: String,
    #[serde(rename = "artwork1_1")]
    pub artwork_1_1: String,
}

/// Structured output of the sermon analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub key_moments: Vec<KeyMoment>,
    pub spotify_titles: Vec<String>,
    pub spotify_description_snippet: String,
    pub spotify_description_body: String,
    #[serde(rename = "spotifyCTA")]
    pub spotify_cta: String,
    pub spotify_poll_question: String,
    pub spotify_poll_options: Vec<String>,
    pub biblical_references: Vec<String>,
    pub tags: Vec<String>,
    pub marketing_hooks: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_images: Option<GeneratedImages>,
}

impl AnalysisResult {
    /// Show notes ready to paste: snippet, body, references, call to action.
    pub fn full_description(&self) -> String {
        let references = self.biblical_references.join("\n");
        let cta = format!("💬 {}", self.spotify_cta);
        let lines: [&str; 8] = [
            &self.spotify_description_snippet,
            "",
            &self.spotify_description_body,
            "",
            "📖 Referências Bíblicas:",
            &references,
            "",
            &cta,
        ];
        lines.join("\n")
    }

    pub fn poll_text(&self) -> String {
        let mut text = self.spotify_poll_question.clone();
        for option in &self.spotify_poll_options {
            text.push('\n');
            text.push_str(option);
        }
        text
    }

    pub fn tags_text(&self) -> String {
        self.tags.join(", ")
    }
}

pub fn is_data_url(value: &str) -> bool {
    value.starts_with("data:")
}

pub fn to_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

/// Decode a base64 `data:` URL into `(mime_type, bytes)`.
pub fn decode_data_url(url: &str) -> Result<(String, Vec<u8>)> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| anyhow!("not a data URL"))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| anyhow!("data URL has no payload"))?;
    let mime_type = header
        .strip_suffix(";base64")
        .ok_or_else(|| anyhow!("only base64 data URLs are supported"))?;

    let bytes = STANDARD
        .decode(payload.trim())
        .context("invalid base64 in data URL")?;
    Ok((mime_type.to_string(), bytes))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_result() -> AnalysisResult {
        AnalysisResult {
            key_moments: vec![KeyMoment {
                title: "O gigante caiu".to_string(),
                timestamp: "12:30 - 14:00".to_string(),
                reasoning: "Clímax emocional".to_string(),
                hook: "Qual gigante você enfrenta hoje?".to_string(),
                estimated_context: "Davi diante de Golias".to_string(),
            }],
            spotify_titles: vec!["Vença seus gigantes pela fé".to_string()],
            spotify_description_snippet: "Descubra como vencer gigantes.".to_string(),
            spotify_description_body: "Resumo da pregação.".to_string(),
            spotify_cta: "Qual é o seu gigante?".to_string(),
            spotify_poll_question: "O que mais te desafia?".to_string(),
            spotify_poll_options: vec!["Medo".to_string(), "Ansiedade".to_string()],
            biblical_references: vec!["1 Samuel 17:45".to_string(), "Salmos 23:1".to_string()],
            tags: vec!["fé".to_string(), "coragem".to_string()],
            marketing_hooks: vec!["Não perca!".to_string()],
            generated_images: None,
        }
    }

    #[test]
    fn test_sermon_input_requires_fields() {
        let input = SermonInput::new(" https://youtu.be/x ", "Pr. João", "Gigantes").unwrap();
        assert_eq!(input.youtube_url, "https://youtu.be/x");
        assert!(input.photo.is_none());

        let err = SermonInput::new("https://youtu.be/x", "  ", "Gigantes").unwrap_err();
        assert!(err.to_string().contains("preacher"));
    }

    #[test]
    fn test_photo_rejects_non_images() {
        assert!(Photo::new(vec![1, 2, 3], "image/jpeg").is_ok());
        assert!(Photo::new(vec![1, 2, 3], "application/pdf").is_err());
        assert!(Photo::new(vec![], "image/png").is_err());
    }

    #[test]
    fn test_deserialize_wire_format() {
        let json = r#"{
            "keyMoments": [{"title": "t", "timestamp": "04:30", "reasoning": "r", "hook": "h", "estimatedContext": "c"}],
            "spotifyTitles": ["a", "b", "c"],
            "spotifyDescriptionSnippet": "snip",
            "spotifyDescriptionBody": "body",
            "spotifyCTA": "cta?",
            "spotifyPollQuestion": "poll?",
            "spotifyPollOptions": ["1", "2", "3", "4", "5"],
            "biblicalReferences": ["João 3:16"],
            "tags": ["x"],
            "marketingHooks": ["go"],
            "generatedImages": {"thumbnail16_9": "episodes/a/thumb_16_9.png", "artwork1_1": "episodes/a/cover_1_1.png"}
        }"#;
        let result: AnalysisResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.key_moments[0].estimated_context, "c");
        assert_eq!(result.spotify_cta, "cta?");
        assert_eq!(result.spotify_poll_options.len(), 5);
        assert_eq!(
            result.generated_images.unwrap().artwork_1_1,
            "episodes/a/cover_1_1.png"
        );
    }

    #[test]
    fn test_images_are_optional() {
        let value = serde_json::to_value(sample_result()).unwrap();
        assert!(value.get("generatedImages").is_none());
        assert_eq!(value["spotifyCTA"], "Qual é o seu gigante?");
    }

    #[test]
    fn test_full_description_order() {
        let text = sample_result().full_description();
        let snippet = text.find("Descubra").unwrap();
        let body = text.find("Resumo").unwrap();
        let refs = text.find("1 Samuel 17:45\nSalmos 23:1").unwrap();
        let cta = text.find("💬 Qual é o seu gigante?").unwrap();
        assert!(snippet < body && body < refs && refs < cta);
    }

    #[test]
    fn test_poll_and_tags_text() {
        let result = sample_result();
        assert_eq!(result.poll_text(), "O que mais te desafia?\nMedo\nAnsiedade");
        assert_eq!(result.tags_text(), "fé, coragem");
    }

    #[test]
    fn test_data_url_decode() {
        let url = to_data_url("image/png", &[137, 80, 78, 71]);
        assert!(is_data_url(&url));
        let (mime, bytes) = decode_data_url(&url).unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(bytes, vec![137, 80, 78, 71]);

        assert!(decode_data_url("episodes/a/thumb.png").is_err());
        assert!(decode_data_url("data:image/png,plain").is_err());
    }
}
