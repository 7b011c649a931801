//! Image and video generation seams.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::InsightsError;
use crate::types::VideoStatus;

/// An image produced from a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub url: String,
    /// Prompt after the provider's own rewriting, when it reports one.
    pub revised_prompt: Option<String>,
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, InsightsError>;
}

/// Parameters for a text-to-video request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoRequest {
    pub prompt: String,
    pub aspect_ratio: String,
    pub resolution: String,
    pub duration_secs: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
}

impl VideoRequest {
    /// 16:9, 720p, five seconds.
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            aspect_ratio: "16:9".to_owned(),
            resolution: "720p".to_owned(),
            duration_secs: 5,
            negative_prompt: None,
        }
    }
}

/// Snapshot of an asynchronous video job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoJob {
    pub job_id: String,
    pub status: VideoStatus,
    /// Set once the job has completed and the provider returned a file.
    pub url: Option<String>,
}

#[async_trait]
pub trait VideoGenerator: Send + Sync {
    /// Queue a job; returns immediately with a pending job.
    async fn submit(&self, request: &VideoRequest) -> Result<VideoJob, InsightsError>;

    /// Current state of a previously submitted job.
    async fn poll(&self, job_id: &str) -> Result<VideoJob, InsightsError>;

    /// Submit and poll every `interval` until the job completes.
    ///
    /// # Errors
    ///
    /// [`InsightsError::VideoFailed`] if the provider reports failure,
    /// [`InsightsError::VideoTimeout`] after `max_attempts` polls without a
    /// terminal state, or any submit/poll error.
    async fn generate_and_wait(
        &self,
        request: &VideoRequest,
        max_attempts: u32,
        interval: Duration,
    ) -> Result<VideoJob, InsightsError> {
        let submitted = self.submit(request).await?;
        let job_id = submitted.job_id;
        for attempt in 1..=max_attempts {
            let job = self.poll(&job_id).await?;
            match job.status {
                VideoStatus::Completed => return Ok(job),
                VideoStatus::Failed => return Err(InsightsError::VideoFailed { job_id }),
                VideoStatus::Pending | VideoStatus::Processing => {
                    tracing::debug!(job_id = %job_id, attempt, status = ?job.status, "video still rendering");
                    if attempt < max_attempts {
                        tokio::time::sleep(interval).await;
                    }
                }
            }
        }
        Err(InsightsError::VideoTimeout {
            job_id,
            attempts: max_attempts,
        })
    }
}
