//! Where mentions and brand voice samples come from.

pub mod filters;
pub mod query;
pub mod x_search;

use async_trait::async_trait;
use brandpulse_core::BrandConfig;

use crate::error::InsightsError;
use crate::types::{BrandPost, Mention};

pub use x_search::{SearchOptions, XSearchClient};

/// A provider of public posts about a brand and posts by the brand.
#[async_trait]
pub trait MentionSource: Send + Sync {
    /// Recent public posts mentioning the brand, already filtered for spam
    /// and low-reach authors.
    async fn search_mentions(&self, brand: &BrandConfig) -> Result<Vec<Mention>, InsightsError>;

    /// The brand's own recent posts, used as a tone reference.
    async fn brand_voice(&self, brand: &BrandConfig) -> Result<Vec<BrandPost>, InsightsError>;
}
