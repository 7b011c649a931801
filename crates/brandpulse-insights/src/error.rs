use thiserror::Error;

#[derive(Debug, Error)]
pub enum InsightsError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited by {service} (retry after {retry_after_secs}s)")]
    RateLimited {
        service: String,
        retry_after_secs: u64,
    },

    #[error("unexpected HTTP status {status} from {url}: {body}")]
    UnexpectedStatus {
        status: u16,
        url: String,
        body: String,
    },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Model output that is not valid JSON even after fence stripping and
    /// substring extraction.
    #[error("malformed model response: {0}")]
    MalformedResponse(String),

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("missing credential: set {0}")]
    MissingCredential(String),

    #[error("empty response from {0}")]
    EmptyResponse(String),

    #[error("media generation failed: {0}")]
    Media(String),

    #[error("video job {job_id} failed")]
    VideoFailed { job_id: String },

    #[error("video job {job_id} still running after {attempts} polls")]
    VideoTimeout { job_id: String, attempts: u32 },

    #[error("sentiment scoring failed: {0}")]
    Scoring(String),

    #[error("history store I/O error for {path}: {source}")]
    HistoryIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl InsightsError {
    /// Errors that must abort the whole pipeline run instead of degrading a
    /// single section to an empty result.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, InsightsError::MissingCredential(_))
    }
}
