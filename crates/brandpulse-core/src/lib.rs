//! Shared configuration for the BrandPulse workspace.
//!
//! Holds the process-level [`AppConfig`] loaded from environment variables and
//! the optional `brands.yaml` registry that supplies handles, aliases, and
//! keyword exclusions per brand.

pub mod app_config;
pub mod brands;
pub mod config;

pub use app_config::{AppConfig, Environment};
pub use brands::{load_brands, BrandConfig, BrandsFile};
pub use config::{load_app_config, load_app_config_from_env};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read brands file {path}: {source}")]
    BrandsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse brands file: {0}")]
    BrandsFileParse(#[from] serde_yaml::Error),

    #[error("brands validation failed: {0}")]
    Validation(String),
}
