//! `insights` and `video-status` command handlers.

use std::path::PathBuf;
use std::sync::Arc;

use brandpulse_core::AppConfig;
use brandpulse_insights::scoring::{sort_by_engagement, sort_by_recency};
use brandpulse_insights::{
    AdFormat, Collaborators, FalVideoClient, InsightsPipeline, MemoryAnnotationCache,
    PipelineOptions, RetryPolicy, ScoredMention, VideoGenerator, VideoMode,
};
use clap::ValueEnum;

use crate::brands::resolve_brand;

/// Order of the `mentions` array in the printed insights.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum MentionOrder {
    /// As returned by the search API
    #[default]
    Fetch,
    /// Highest engagement score first
    Engagement,
    /// Newest first
    Recency,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InsightsArgs {
    pub brand: String,
    pub skip_creative: bool,
    pub skip_playbooks: bool,
    pub video: bool,
    pub async_video: bool,
    pub sort: MentionOrder,
    pub output: Option<PathBuf>,
}

pub(crate) fn order_mentions(
    mentions: Vec<ScoredMention>,
    order: MentionOrder,
) -> Vec<ScoredMention> {
    match order {
        MentionOrder::Fetch => mentions,
        MentionOrder::Engagement => sort_by_engagement(mentions),
        MentionOrder::Recency => sort_by_recency(mentions),
    }
}

/// Pipeline options for one CLI run: config defaults plus the flags.
pub(crate) fn pipeline_options(config: &AppConfig, args: &InsightsArgs) -> PipelineOptions {
    let mut options = PipelineOptions::from_config(config);
    options.skip_creative = args.skip_creative;
    options.skip_playbooks = args.skip_playbooks;
    if args.video {
        options.creative.format = AdFormat::Video;
    }
    if args.async_video {
        options.creative.video_mode = VideoMode::Async;
    }
    options
}

/// Run the pipeline once and emit the insights as pretty JSON.
///
/// # Errors
///
/// Returns an error for an unreadable brands file, a missing credential, or
/// a failed output write. Degraded stages still produce output.
pub(crate) async fn run_insights(config: &AppConfig, args: &InsightsArgs) -> anyhow::Result<()> {
    let brand = resolve_brand(&config.brands_path, &args.brand)?;
    let collaborators =
        Collaborators::from_config(config, Arc::new(MemoryAnnotationCache::new()))?;
    let pipeline = InsightsPipeline::new(collaborators, pipeline_options(config, args));

    let mut insights = pipeline.run(&brand).await?;
    insights.mentions = order_mentions(std::mem::take(&mut insights.mentions), args.sort);
    let json = serde_json::to_string_pretty(&insights)?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, json)
                .map_err(|e| anyhow::anyhow!("failed to write {}: {e}", path.display()))?;
            println!(
                "wrote insights for {} to {} ({} mentions, {} suggestions, {} ads)",
                insights.brand,
                path.display(),
                insights.mentions.len(),
                insights.suggestions.len(),
                insights.generated_ad_ideas.len()
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Poll a video job once and print its state.
///
/// # Errors
///
/// Returns an error if the video key is missing or the status call fails.
pub(crate) async fn run_video_status(config: &AppConfig, job_id: &str) -> anyhow::Result<()> {
    let client = FalVideoClient::new(
        config.fal_api_key.clone(),
        config.request_timeout_secs,
        RetryPolicy::new(config.max_retries, config.retry_backoff_base_secs),
    )?;
    let job = client.poll(job_id).await?;
    println!("{}", serde_json::to_string_pretty(&job)?);
    Ok(())
}
