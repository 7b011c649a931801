//! xAI client: OpenAI-compatible chat completions and image generation.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::error::InsightsError;
use crate::http::{build_client, join, normalize_base_url, read_json};
use crate::llm::CompletionClient;
use crate::media::{GeneratedImage, ImageGenerator};
use crate::retry::{retry_with_backoff, RetryPolicy};

const DEFAULT_BASE_URL: &str = "https://api.x.ai/v1/";
const SERVICE: &str = "xai";

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    response_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
    revised_prompt: Option<String>,
}

/// Models used for each endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XaiModels {
    pub chat: String,
    pub image: String,
}

impl Default for XaiModels {
    fn default() -> Self {
        Self {
            chat: "grok-4-1-fast-reasoning".to_owned(),
            image: "grok-imagine-v0p9".to_owned(),
        }
    }
}

/// Completion and image client for the xAI API.
///
/// The key is checked on each call so that a process without `XAI_API_KEY`
/// can still run commands that never reach the model.
pub struct XaiClient {
    client: Client,
    api_key: Option<String>,
    chat_url: Url,
    images_url: Url,
    models: XaiModels,
    policy: RetryPolicy,
}

impl XaiClient {
    /// Client pointed at the production xAI API.
    ///
    /// # Errors
    ///
    /// Returns [`InsightsError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(
        api_key: Option<String>,
        models: XaiModels,
        timeout_secs: u64,
        policy: RetryPolicy,
    ) -> Result<Self, InsightsError> {
        Self::with_base_url(api_key, models, timeout_secs, DEFAULT_BASE_URL, policy)
    }

    /// Client pointed at `base_url` (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`InsightsError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`InsightsError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        api_key: Option<String>,
        models: XaiModels,
        timeout_secs: u64,
        base_url: &str,
        policy: RetryPolicy,
    ) -> Result<Self, InsightsError> {
        let base = normalize_base_url(base_url)?;
        Ok(Self {
            client: build_client(timeout_secs)?,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            chat_url: join(&base, "chat/completions")?,
            images_url: join(&base, "images/generations")?,
            models,
            policy,
        })
    }

    fn key(&self) -> Result<&str, InsightsError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| InsightsError::MissingCredential("XAI_API_KEY".to_owned()))
    }

    async fn post_json<B: Serialize + Sync>(
        &self,
        url: &Url,
        body: &B,
    ) -> Result<serde_json::Value, InsightsError> {
        let key = self.key()?;
        retry_with_backoff(self.policy, || async move {
            let response = self
                .client
                .post(url.clone())
                .bearer_auth(key)
                .json(body)
                .send()
                .await?;
            read_json(response, SERVICE).await
        })
        .await
    }
}

#[async_trait]
impl CompletionClient for XaiClient {
    async fn complete(
        &self,
        prompt: &str,
        json_mode: bool,
        temperature: f32,
    ) -> Result<String, InsightsError> {
        let request = ChatCompletionRequest {
            model: &self.models.chat,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt.to_owned(),
            }],
            temperature,
            response_format: json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let body = self.post_json(&self.chat_url, &request).await?;
        let parsed: ChatCompletionResponse =
            serde_json::from_value(body).map_err(|e| InsightsError::Deserialize {
                context: "xai chat completion".to_owned(),
                source: e,
            })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| InsightsError::EmptyResponse("xai chat completion".to_owned()))?;

        tracing::debug!(
            model = %self.models.chat,
            json_mode,
            chars = content.len(),
            "completion received"
        );
        Ok(content)
    }
}

#[async_trait]
impl ImageGenerator for XaiClient {
    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, InsightsError> {
        let request = ImageRequest {
            model: &self.models.image,
            prompt,
            n: 1,
            response_format: "url",
        };

        let body = self.post_json(&self.images_url, &request).await?;
        let parsed: ImageResponse =
            serde_json::from_value(body).map_err(|e| InsightsError::Deserialize {
                context: "xai image generation".to_owned(),
                source: e,
            })?;

        let first = parsed
            .data
            .into_iter()
            .next()
            .ok_or_else(|| InsightsError::EmptyResponse("xai image generation".to_owned()))?;
        let url = first
            .url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| InsightsError::Media("no image URL returned".to_owned()))?;

        Ok(GeneratedImage {
            url,
            revised_prompt: first.revised_prompt,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_mode_adds_response_format() {
        let request = ChatCompletionRequest {
            model: "m",
            messages: vec![ChatMessage {
                role: "user",
                content: "hi".to_owned(),
            }],
            temperature: 0.2,
            response_format: Some(ResponseFormat {
                kind: "json_object",
            }),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["response_format"]["type"], "json_object");
        assert_eq!(value["messages"][0]["role"], "user");
    }

    #[test]
    fn plain_mode_omits_response_format() {
        let request = ChatCompletionRequest {
            model: "m",
            messages: Vec::new(),
            temperature: 0.0,
            response_format: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("response_format").is_none());
    }

    #[test]
    fn endpoints_join_onto_base_path() {
        let client = XaiClient::with_base_url(
            None,
            XaiModels::default(),
            30,
            "https://api.x.ai/v1",
            RetryPolicy::none(),
        )
        .unwrap();
        assert_eq!(client.chat_url.as_str(), "https://api.x.ai/v1/chat/completions");
        assert_eq!(client.images_url.as_str(), "https://api.x.ai/v1/images/generations");
    }
}
