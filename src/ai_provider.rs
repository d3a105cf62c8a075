use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::chat::{ImageAttachment, Source};
use crate::config::AiConfig;
use crate::core::error::AiError;
use crate::persona::SYSTEM_INSTRUCTION;

pub const USER_ROLE: &str = "user";
pub const MODEL_ROLE: &str = "model";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn image(image: &ImageAttachment) -> Self {
        Part::InlineData {
            inline_data: InlineData {
                mime_type: image.mime_type.clone(),
                data: image.base64.clone(),
            },
        }
    }
}

/// One turn of a conversation as the service sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

impl Content {
    /// Image first, then text. Empty text is left out.
    pub fn user_turn(text: &str, image: Option<&ImageAttachment>) -> Self {
        let mut parts = Vec::new();
        if let Some(image) = image {
            parts.push(Part::image(image));
        }
        if !text.is_empty() {
            parts.push(Part::text(text));
        }
        Content {
            role: USER_ROLE.to_string(),
            parts,
        }
    }

    pub fn model_turn(text: &str) -> Self {
        Content {
            role: MODEL_ROLE.to_string(),
            parts: vec![Part::text(text)],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reply {
    pub text: String,
    pub sources: Vec<Source>,
}

/// Remote generative model.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Sends `turn` on top of `history` in conversational mode.
    async fn send(&self, history: &[Content], turn: &Content) -> Result<Reply, AiError>;

    /// One-shot completion without persona, tools or history.
    async fn generate(&self, prompt: &str) -> Result<String, AiError>;
}

/// Gemini `generateContent` over REST.
pub struct GeminiBackend {
    client: reqwest::Client,
    config: AiConfig,
}

impl GeminiBackend {
    pub fn new(config: AiConfig) -> Self {
        GeminiBackend {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.api_base.trim_end_matches('/'),
            self.config.model
        )
    }

    async fn post(&self, body: &Value) -> Result<Value, AiError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(AiError::MissingApiKey)?;

        debug!("POST {}", self.endpoint());

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Api { status, body });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl GenerativeBackend for GeminiBackend {
    async fn send(&self, history: &[Content], turn: &Content) -> Result<Reply, AiError> {
        let body = conversation_request(&self.config, history, turn);
        let response = self.post(&body).await?;
        parse_reply(&response)
    }

    async fn generate(&self, prompt: &str) -> Result<String, AiError> {
        let turn = Content {
            role: USER_ROLE.to_string(),
            parts: vec![Part::text(prompt)],
        };
        let body = json!({ "contents": [turn] });
        let response = self.post(&body).await?;
        parse_reply(&response).map(|reply| reply.text)
    }
}

/// Request body for a conversational turn: persona, sampling, optional search
/// tool, and the replayed history followed by `turn`.
pub fn conversation_request(config: &AiConfig, history: &[Content], turn: &Content) -> Value {
    let mut contents: Vec<&Content> = history.iter().collect();
    contents.push(turn);

    let mut body = json!({
        "systemInstruction": { "parts": [{ "text": SYSTEM_INSTRUCTION }] },
        "generationConfig": {
            "temperature": config.temperature,
            "topK": config.top_k,
            "topP": config.top_p,
        },
        "contents": contents,
    });

    if config.web_search {
        body["tools"] = json!([{ "googleSearch": {} }]);
    }

    body
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    web: Option<WebChunk>,
}

#[derive(Debug, Deserialize)]
struct WebChunk {
    uri: Option<String>,
    title: Option<String>,
}

/// Text of the first candidate plus its web citations. Citations missing a uri
/// or title are dropped.
pub fn parse_reply(response: &Value) -> Result<Reply, AiError> {
    let parsed: GenerateResponse =
        serde_json::from_value(response.clone()).map_err(|_| AiError::EmptyResponse)?;
    let candidate = parsed.candidates.into_iter().next().ok_or(AiError::EmptyResponse)?;

    let text: String = candidate
        .content
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(AiError::EmptyResponse);
    }

    let sources = candidate
        .grounding_metadata
        .map(|meta| meta.grounding_chunks)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|chunk| chunk.web)
        .filter_map(|web| match (web.uri, web.title) {
            (Some(uri), Some(title)) if !uri.is_empty() && !title.is_empty() => {
                Some(Source { uri, title })
            }
            _ => None,
        })
        .collect();

    Ok(Reply { text, sources })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_turn_orders_image_before_text() {
        let image = ImageAttachment {
            base64: "iVBORw0KGgo=".to_string(),
            mime_type: "image/png".to_string(),
        };
        let turn = Content::user_turn("what is this plant?", Some(&image));
        let json = serde_json::to_value(&turn).unwrap();

        assert_eq!(json["role"], "user");
        assert_eq!(json["parts"][0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(json["parts"][0]["inlineData"]["data"], "iVBORw0KGgo=");
        assert_eq!(json["parts"][1]["text"], "what is this plant?");
    }

    #[test]
    fn test_user_turn_skips_empty_text() {
        let turn = Content::user_turn("", None);
        assert!(turn.parts.is_empty());
    }

    #[test]
    fn test_conversation_request_shape() {
        let config = AiConfig::default();
        let history = vec![Content::user_turn("hi", None), Content::model_turn("hello 🌱")];
        let body = conversation_request(&config, &history, &Content::user_turn("again", None));

        assert_eq!(body["generationConfig"]["topK"], 10);
        assert_eq!(body["tools"][0]["googleSearch"], json!({}));
        assert_eq!(body["contents"].as_array().unwrap().len(), 3);
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][2]["parts"][0]["text"], "again");
        assert!(body["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Calmly"));

        let no_search = AiConfig {
            web_search: false,
            ..AiConfig::default()
        };
        let body = conversation_request(&no_search, &[], &Content::user_turn("x", None));
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_parse_reply_with_grounding() {
        let response = json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Breathing " }, { "text": "helps." }] },
                "groundingMetadata": {
                    "groundingChunks": [
                        { "web": { "uri": "https://nhs.uk/breathing", "title": "NHS" } },
                        { "web": { "uri": "", "title": "Empty uri" } },
                        { "web": { "uri": "https://no-title.example" } },
                        { "retrievedContext": {} }
                    ]
                }
            }]
        });

        let reply = parse_reply(&response).unwrap();
        assert_eq!(reply.text, "Breathing helps.");
        assert_eq!(
            reply.sources,
            vec![Source {
                uri: "https://nhs.uk/breathing".to_string(),
                title: "NHS".to_string()
            }]
        );
    }

    #[test]
    fn test_parse_reply_without_candidates() {
        assert!(matches!(parse_reply(&json!({})), Err(AiError::EmptyResponse)));
        assert!(matches!(
            parse_reply(&json!({ "candidates": [{ "finishReason": "SAFETY" }] })),
            Err(AiError::EmptyResponse)
        ));
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_before_network() {
        let backend = GeminiBackend::new(AiConfig::default());
        let result = backend.generate("hello").await;
        assert!(matches!(result, Err(AiError::MissingApiKey)));
    }
}
