use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub brands_path: PathBuf,
    pub history_path: PathBuf,
    /// xAI key used for completions and image generation. Checked at first use.
    pub xai_api_key: Option<String>,
    /// X API v2 bearer token for mention search. Checked at first use.
    pub x_bearer_token: Option<String>,
    /// fal.ai key for video generation. Checked at first use.
    pub fal_api_key: Option<String>,
    pub llm_model: String,
    pub image_model: String,
    pub cache_ttl_secs: u64,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_base_secs: u64,
    pub min_author_followers: u64,
    pub mention_target: usize,
    pub mention_max_pages: u32,
    pub creative_suggestions: usize,
    pub ads_per_suggestion: usize,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("brands_path", &self.brands_path)
            .field("history_path", &self.history_path)
            .field(
                "xai_api_key",
                &self.xai_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "x_bearer_token",
                &self.x_bearer_token.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "fal_api_key",
                &self.fal_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("llm_model", &self.llm_model)
            .field("image_model", &self.image_model)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_secs", &self.retry_backoff_base_secs)
            .field("min_author_followers", &self.min_author_followers)
            .field("mention_target", &self.mention_target)
            .field("mention_max_pages", &self.mention_max_pages)
            .field("creative_suggestions", &self.creative_suggestions)
            .field("ads_per_suggestion", &self.ads_per_suggestion)
            .finish()
    }
}
