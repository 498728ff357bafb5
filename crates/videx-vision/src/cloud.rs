//! Cloud vision/embedding HTTP client, generalizing the teacher's
//! single-purpose Gemini highlight client into a nine-field-registry-aware
//! vision call plus a text-embedding call, with markdown-fence stripping
//! on the response body.

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use videx_models::field_registry::FIELDS;

use crate::analyzer::{VisionEngine, VisionFields, VisionProvider};
use crate::embedding::EmbeddingProvider;
use crate::error::{VisionError, VisionResult};

const GENERATE_CONTENT_PATH: &str = "v1beta/models";
const EMBED_CONTENT_PATH: &str = "v1beta/models";

pub struct GeminiVisionClient {
    api_key: String,
    client: Client,
    base_url: String,
    model: String,
}

impl GeminiVisionClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: Client::new(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.5-flash".to_string(),
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    fn prompt(&self) -> String {
        let lines: Vec<String> = FIELDS.iter().map(|f| format!("- {}: {}", f.column, f.prompt_line)).collect();
        format!(
            "Analyze this video frame. Respond with a single JSON object with exactly these keys:\n{}\n\nArray fields must be JSON arrays of strings; scalar fields must be strings or null.",
            lines.join("\n")
        )
    }
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<ReqContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct ReqContent {
    parts: Vec<ReqPart>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum ReqPart {
    Text { text: String },
    InlineData { #[serde(rename = "inlineData")] inline_data: InlineData },
}

#[derive(Serialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Vec<RespCandidate>,
}

#[derive(Deserialize)]
struct RespCandidate {
    content: RespContent,
}

#[derive(Deserialize)]
struct RespContent {
    parts: Vec<RespPart>,
}

#[derive(Deserialize)]
struct RespPart {
    text: String,
}

fn strip_markdown_fence(text: &str) -> &str {
    let text = text.trim();
    let text = text.strip_prefix("```json").or_else(|| text.strip_prefix("```")).unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

fn parse_fields_json(json: &Value) -> VisionFields {
    let str_field = |key: &str| json.get(key).and_then(Value::as_str).map(str::to_string);
    let arr_field = |key: &str| -> Vec<String> {
        json.get(key)
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    };

    VisionFields {
        scene: str_field("scene"),
        subjects: arr_field("subjects"),
        actions: arr_field("actions"),
        objects: arr_field("objects"),
        mood: str_field("mood"),
        shot_type: str_field("shot_type"),
        lighting: str_field("lighting"),
        colors: arr_field("colors"),
        description: str_field("description"),
    }
}

#[async_trait]
impl VisionEngine for GeminiVisionClient {
    fn provider(&self) -> VisionProvider {
        VisionProvider::Gemini
    }

    async fn analyze(&self, image_bytes: &[u8]) -> VisionResult<VisionFields> {
        let url = format!(
            "{}/{}/{}:generateContent?key={}",
            self.base_url, GENERATE_CONTENT_PATH, self.model, self.api_key
        );
        let encoded = base64::engine::general_purpose::STANDARD.encode(image_bytes);

        let request = GenerateContentRequest {
            contents: vec![ReqContent {
                parts: vec![
                    ReqPart::Text { text: self.prompt() },
                    ReqPart::InlineData {
                        inline_data: InlineData { mime_type: "image/jpeg".to_string(), data: encoded },
                    },
                ],
            }],
            generation_config: GenerationConfig { response_mime_type: "application/json".to_string() },
        };

        let response = self.client.post(&url).json(&request).send().await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(VisionError::RateLimited);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(VisionError::RequestFailed(format!("{status}: {body}")));
        }

        let parsed: GenerateContentResponse = response.json().await?;
        let text = parsed
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.as_str())
            .ok_or_else(|| VisionError::ResponseParsingFailed("no content in response".to_string()))?;

        let json: Value = serde_json::from_str(strip_markdown_fence(text))
            .map_err(|e| VisionError::ResponseParsingFailed(e.to_string()))?;

        Ok(parse_fields_json(&json))
    }
}

#[derive(Serialize)]
struct EmbedContentRequest {
    model: String,
    content: ReqContent,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

pub struct GeminiEmbeddingClient {
    api_key: String,
    client: Client,
    base_url: String,
    model: String,
    dims: usize,
}

impl GeminiEmbeddingClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: Client::new(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "text-embedding-004".to_string(),
            dims: 768,
        }
    }

    async fn embed(&self, text: &str) -> VisionResult<Vec<f32>> {
        let url = format!(
            "{}/{}/{}:embedContent?key={}",
            self.base_url, EMBED_CONTENT_PATH, self.model, self.api_key
        );
        let request =
            EmbedContentRequest { model: format!("models/{}", self.model), content: ReqContent { parts: vec![ReqPart::Text { text: text.to_string() }] } };
        let response = self.client.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(VisionError::RequestFailed(format!("{status}: {body}")));
        }
        let parsed: EmbedContentResponse = response.json().await?;
        Ok(parsed.embedding.values)
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddingClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_batch(&self, texts: &[String]) -> VisionResult<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    async fn embed_one(&self, text: &str) -> VisionResult<Vec<f32>> {
        self.embed(text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_code_fence() {
        let text = "```json\n{\"scene\":\"kitchen\"}\n```";
        assert_eq!(strip_markdown_fence(text), "{\"scene\":\"kitchen\"}");
    }

    #[test]
    fn leaves_unfenced_text_alone() {
        assert_eq!(strip_markdown_fence("{\"scene\":\"kitchen\"}"), "{\"scene\":\"kitchen\"}");
    }

    #[test]
    fn parses_fields_from_json_value() {
        let json: Value = serde_json::from_str(
            r#"{"scene":"kitchen","subjects":["chef"],"actions":[],"objects":[],"mood":null,"shot_type":"wide","lighting":"bright","colors":["red"],"description":"A cook."}"#,
        )
        .unwrap();
        let fields = parse_fields_json(&json);
        assert_eq!(fields.scene, Some("kitchen".to_string()));
        assert_eq!(fields.subjects, vec!["chef".to_string()]);
        assert_eq!(fields.mood, None);
    }

    #[tokio::test]
    async fn rate_limit_response_maps_to_rate_limited_error() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = GeminiVisionClient::new("test-key".to_string()).with_base_url(server.uri());
        let result = client.analyze(&[1, 2, 3]).await;
        assert!(matches!(result, Err(VisionError::RateLimited)));
    }
}
