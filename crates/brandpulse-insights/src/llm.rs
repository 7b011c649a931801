//! Language-model completion seam and the JSON repair used on its output.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::InsightsError;

/// A text-completion backend.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send a single-turn prompt and return the raw completion text.
    ///
    /// With `json_mode` the backend is asked to emit a JSON object.
    async fn complete(
        &self,
        prompt: &str,
        json_mode: bool,
        temperature: f32,
    ) -> Result<String, InsightsError>;
}

/// Remove a surrounding Markdown code fence (```json ... ```), if any.
#[must_use]
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line.
    let body = rest.split_once('\n').map_or(rest, |(_, body)| body);
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Parse model output as JSON.
///
/// Tries a strict parse of the fence-stripped text first, then the
/// substring between the first `{` and the last `}`.
///
/// # Errors
///
/// Returns [`InsightsError::MalformedResponse`] when neither attempt yields
/// valid JSON.
pub fn parse_json_response(raw: &str) -> Result<Value, InsightsError> {
    let text = strip_code_fences(raw);
    if let Ok(value) = serde_json::from_str(text) {
        return Ok(value);
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str(&text[start..=end]) {
                tracing::debug!("recovered JSON object from surrounding text");
                return Ok(value);
            }
        }
    }

    let preview: String = text.chars().take(120).collect();
    Err(InsightsError::MalformedResponse(preview))
}

/// Run a JSON-mode completion and parse the result.
///
/// # Errors
///
/// Propagates the completion error, or [`InsightsError::MalformedResponse`]
/// from [`parse_json_response`].
pub async fn complete_json(
    client: &dyn CompletionClient,
    prompt: &str,
    temperature: f32,
) -> Result<Value, InsightsError> {
    let raw = client.complete(prompt, true, temperature).await?;
    if raw.trim().is_empty() {
        return Err(InsightsError::EmptyResponse("completion".to_owned()));
    }
    parse_json_response(&raw)
}
