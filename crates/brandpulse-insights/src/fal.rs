//! fal.ai queue client for Pika text-to-video.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use crate::error::InsightsError;
use crate::http::{build_client, join, normalize_base_url, read_json};
use crate::media::{VideoGenerator, VideoJob, VideoRequest};
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::types::VideoStatus;

const DEFAULT_BASE_URL: &str = "https://queue.fal.run/";
const MODEL_PATH: &str = "fal-ai/pika/v2.2/text-to-video";
/// Request status and results live under the app id, not the full model path.
const APP_PATH: &str = "fal-ai/pika";
const SERVICE: &str = "fal";

#[derive(Debug, Serialize)]
struct SubmitBody<'a> {
    prompt: &'a str,
    aspect_ratio: &'a str,
    resolution: &'a str,
    duration: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    negative_prompt: Option<&'a str>,
}

impl<'a> From<&'a VideoRequest> for SubmitBody<'a> {
    fn from(r: &'a VideoRequest) -> Self {
        Self {
            prompt: r.prompt.trim(),
            aspect_ratio: &r.aspect_ratio,
            resolution: &r.resolution,
            duration: r.duration_secs,
            negative_prompt: r.negative_prompt.as_deref(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    request_id: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
struct ResultResponse {
    video: Option<VideoFile>,
}

#[derive(Debug, Deserialize)]
struct VideoFile {
    url: Option<String>,
}

/// Map a queue status onto [`VideoStatus`]. Unknown values read as pending.
#[must_use]
pub fn map_queue_status(status: &str) -> VideoStatus {
    match status {
        "IN_PROGRESS" => VideoStatus::Processing,
        "COMPLETED" => VideoStatus::Completed,
        "FAILED" | "ERROR" => VideoStatus::Failed,
        _ => VideoStatus::Pending,
    }
}

/// Video client for the fal.ai request queue, authenticated with `Key <FAL_KEY>`.
pub struct FalVideoClient {
    client: Client,
    api_key: Option<String>,
    base_url: Url,
    policy: RetryPolicy,
}

impl FalVideoClient {
    /// Client pointed at the production queue.
    ///
    /// # Errors
    ///
    /// Returns [`InsightsError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(
        api_key: Option<String>,
        timeout_secs: u64,
        policy: RetryPolicy,
    ) -> Result<Self, InsightsError> {
        Self::with_base_url(api_key, timeout_secs, DEFAULT_BASE_URL, policy)
    }

    /// Client pointed at `base_url` (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`InsightsError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`InsightsError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        api_key: Option<String>,
        timeout_secs: u64,
        base_url: &str,
        policy: RetryPolicy,
    ) -> Result<Self, InsightsError> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: normalize_base_url(base_url)?,
            policy,
        })
    }

    fn key(&self) -> Result<&str, InsightsError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| InsightsError::MissingCredential("FAL_KEY".to_owned()))
    }

    fn request_url(&self, job_id: &str, suffix: &str) -> Result<Url, InsightsError> {
        join(&self.base_url, &format!("{APP_PATH}/requests/{job_id}{suffix}"))
    }

    async fn send<F>(&self, build: F) -> Result<serde_json::Value, InsightsError>
    where
        F: Fn(&Client) -> RequestBuilder + Send + Sync,
    {
        let key = self.key()?;
        let build = &build;
        retry_with_backoff(self.policy, || async move {
            let response = build(&self.client)
                .header(reqwest::header::AUTHORIZATION, format!("Key {key}"))
                .send()
                .await?;
            read_json(response, SERVICE).await
        })
        .await
    }

    async fn fetch_result_url(&self, job_id: &str) -> Result<Option<String>, InsightsError> {
        let url = self.request_url(job_id, "")?;
        let body = self.send(|c| c.get(url.clone())).await?;
        let result: ResultResponse =
            serde_json::from_value(body).map_err(|e| InsightsError::Deserialize {
                context: format!("fal result for {job_id}"),
                source: e,
            })?;
        Ok(result
            .video
            .and_then(|v| v.url)
            .filter(|u| !u.trim().is_empty()))
    }
}

#[async_trait]
impl VideoGenerator for FalVideoClient {
    async fn submit(&self, request: &VideoRequest) -> Result<VideoJob, InsightsError> {
        let url = join(&self.base_url, MODEL_PATH)?;
        let body = SubmitBody::from(request);
        let value = self.send(|c| c.post(url.clone()).json(&body)).await?;
        let submitted: SubmitResponse =
            serde_json::from_value(value).map_err(|e| InsightsError::Deserialize {
                context: "fal submit".to_owned(),
                source: e,
            })?;

        tracing::info!(job_id = %submitted.request_id, "video job submitted");
        Ok(VideoJob {
            job_id: submitted.request_id,
            status: VideoStatus::Pending,
            url: None,
        })
    }

    async fn poll(&self, job_id: &str) -> Result<VideoJob, InsightsError> {
        let url = self.request_url(job_id, "/status")?;
        let value = self.send(|c| c.get(url.clone())).await?;
        let status: StatusResponse =
            serde_json::from_value(value).map_err(|e| InsightsError::Deserialize {
                context: format!("fal status for {job_id}"),
                source: e,
            })?;

        let status = map_queue_status(&status.status);
        let url = if status == VideoStatus::Completed {
            self.fetch_result_url(job_id).await?
        } else {
            None
        };

        Ok(VideoJob {
            job_id: job_id.to_owned(),
            status,
            url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_statuses_map_to_video_status() {
        assert_eq!(map_queue_status("IN_QUEUE"), VideoStatus::Pending);
        assert_eq!(map_queue_status("IN_PROGRESS"), VideoStatus::Processing);
        assert_eq!(map_queue_status("COMPLETED"), VideoStatus::Completed);
        assert_eq!(map_queue_status("FAILED"), VideoStatus::Failed);
        assert_eq!(map_queue_status("SOMETHING_NEW"), VideoStatus::Pending);
    }

    #[test]
    fn submit_body_uses_wire_names() {
        let mut request = VideoRequest::new("  a lake at dawn ");
        request.negative_prompt = Some("blurry".to_owned());
        let value = serde_json::to_value(SubmitBody::from(&request)).unwrap();
        assert_eq!(value["prompt"], "a lake at dawn");
        assert_eq!(value["duration"], 5);
        assert_eq!(value["aspect_ratio"], "16:9");
        assert_eq!(value["negative_prompt"], "blurry");
    }

    #[test]
    fn request_urls_use_app_path() {
        let client =
            FalVideoClient::with_base_url(None, 30, "https://queue.fal.run", RetryPolicy::none())
                .unwrap();
        assert_eq!(
            client.request_url("abc", "/status").unwrap().as_str(),
            "https://queue.fal.run/fal-ai/pika/requests/abc/status"
        );
    }
}
