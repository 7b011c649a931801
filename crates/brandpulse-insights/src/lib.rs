//! Brand insights pipeline: mentions in, sentiment, topics, suggestions, and
//! ad creatives out.
//!
//! [`InsightsPipeline::run`] is the entry point. Every external service sits
//! behind a trait ([`MentionSource`], [`CompletionClient`], [`ImageGenerator`],
//! [`VideoGenerator`]) and both stores ([`AnnotationStore`],
//! [`SuggestionHistoryStore`]) are injected, so hosts decide what is shared
//! between runs.

pub mod aggregator;
pub mod annotator;
pub mod cache;
pub mod consolidator;
pub mod creative;
pub mod error;
pub mod fal;
mod http;
pub mod history;
pub mod keywords;
pub mod lexicon;
pub mod llm;
pub mod media;
pub mod pipeline;
pub mod playbooks;
pub mod retry;
pub mod scoring;
pub mod sources;
pub mod suggestions;
pub mod types;
pub mod xai;

pub use cache::{AnnotationStore, MemoryAnnotationCache};
pub use creative::{CreativeOptions, CreativeOrchestrator, VideoMode};
pub use error::InsightsError;
pub use fal::FalVideoClient;
pub use history::{JsonFileHistoryStore, MemoryHistoryStore, SuggestionHistoryStore};
pub use lexicon::{LexiconScorer, PolarityScorer};
pub use llm::CompletionClient;
pub use media::{GeneratedImage, ImageGenerator, VideoGenerator, VideoJob, VideoRequest};
pub use pipeline::{Collaborators, InsightsPipeline, PipelineOptions};
pub use retry::RetryPolicy;
pub use sources::{MentionSource, SearchOptions, XSearchClient};
pub use types::*;
pub use xai::{XaiClient, XaiModels};
