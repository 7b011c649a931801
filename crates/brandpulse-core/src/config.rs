use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Credentials are optional here: each external client reports a missing key
/// the first time it is used, so commands that never touch a collaborator do
/// not need its key.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    // First non-empty value among several accepted names.
    let first_of = |vars: &[&str]| -> Option<String> {
        vars.iter()
            .filter_map(|v| lookup(v).ok())
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let env = parse_environment(&or_default("BRANDPULSE_ENV", "development"));
    let log_level = or_default("BRANDPULSE_LOG_LEVEL", "info");
    let brands_path = PathBuf::from(or_default(
        "BRANDPULSE_BRANDS_PATH",
        "./config/brands.yaml",
    ));
    let history_path = PathBuf::from(or_default(
        "BRANDPULSE_HISTORY_PATH",
        "./data/suggestion_history.json",
    ));

    let xai_api_key = first_of(&["XAI_API_KEY"]);
    let x_bearer_token = first_of(&["X_BEARER_TOKEN", "TWITTER_BEARER_TOKEN"]);
    let fal_api_key = first_of(&["FAL_KEY", "PIKA_API_KEY"]);

    let llm_model = or_default("BRANDPULSE_LLM_MODEL", "grok-4-1-fast-reasoning");
    let image_model = or_default("BRANDPULSE_IMAGE_MODEL", "grok-imagine-v0p9");

    let cache_ttl_secs = parse_u64("BRANDPULSE_CACHE_TTL_SECS", "10800")?;
    let request_timeout_secs = parse_u64("BRANDPULSE_REQUEST_TIMEOUT_SECS", "60")?;
    let max_retries = parse_u32("BRANDPULSE_MAX_RETRIES", "3")?;
    let retry_backoff_base_secs = parse_u64("BRANDPULSE_RETRY_BACKOFF_BASE_SECS", "5")?;
    let min_author_followers = parse_u64("BRANDPULSE_MIN_AUTHOR_FOLLOWERS", "1000")?;
    let mention_target = parse_usize("BRANDPULSE_MENTION_TARGET", "500")?;
    let mention_max_pages = parse_u32("BRANDPULSE_MENTION_MAX_PAGES", "10")?;
    let creative_suggestions = parse_usize("BRANDPULSE_CREATIVE_SUGGESTIONS", "1")?;
    let ads_per_suggestion = parse_usize("BRANDPULSE_ADS_PER_SUGGESTION", "4")?;

    if ads_per_suggestion == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "BRANDPULSE_ADS_PER_SUGGESTION".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    Ok(AppConfig {
        env,
        log_level,
        brands_path,
        history_path,
        xai_api_key,
        x_bearer_token,
        fal_api_key,
        llm_model,
        image_model,
        cache_ttl_secs,
        request_timeout_secs,
        max_retries,
        retry_backoff_base_secs,
        min_author_followers,
        mention_target,
        mention_max_pages,
        creative_suggestions,
        ads_per_suggestion,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
