//! Sequences every stage into one [`BrandInsights`] per brand.
//!
//! Collaborators are injected as trait objects so a host can share one
//! annotation cache and one history store across runs, and tests can swap
//! in fakes. Only a missing credential aborts a run; every other failure
//! empties the affected section and is logged.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use brandpulse_core::{AppConfig, BrandConfig};

use crate::aggregator::build_analysis;
use crate::annotator::Annotator;
use crate::cache::AnnotationStore;
use crate::consolidator::consolidate_annotations;
use crate::creative::{CreativeOptions, CreativeOrchestrator, CreativeOutput};
use crate::error::InsightsError;
use crate::fal::FalVideoClient;
use crate::history::{JsonFileHistoryStore, SuggestionHistoryStore};
use crate::lexicon::{LexiconScorer, PolarityScorer};
use crate::llm::CompletionClient;
use crate::media::{ImageGenerator, VideoGenerator};
use crate::playbooks::{generate_playbooks, PlaybookContext};
use crate::retry::RetryPolicy;
use crate::scoring::score_mentions;
use crate::sources::{MentionSource, SearchOptions, XSearchClient};
use crate::suggestions::{SuggestionContext, SuggestionEngine};
use crate::types::{AnnotatedMention, BrandInsights, ScoredMention};
use crate::xai::{XaiClient, XaiModels};

/// External services and stores the pipeline talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub source: Arc<dyn MentionSource>,
    pub llm: Arc<dyn CompletionClient>,
    pub images: Arc<dyn ImageGenerator>,
    pub video: Arc<dyn VideoGenerator>,
    pub store: Arc<dyn AnnotationStore>,
    pub history: Arc<dyn SuggestionHistoryStore>,
    pub scorer: Arc<dyn PolarityScorer>,
}

impl Collaborators {
    /// Production clients built from `config`, sharing `store` as the cache.
    ///
    /// Credentials are not checked here; each client reports a missing key
    /// on first use.
    ///
    /// # Errors
    ///
    /// Returns [`InsightsError::Http`] if an HTTP client cannot be built.
    pub fn from_config(
        config: &AppConfig,
        store: Arc<dyn AnnotationStore>,
    ) -> Result<Self, InsightsError> {
        let policy = RetryPolicy::new(config.max_retries, config.retry_backoff_base_secs);
        let search = SearchOptions {
            min_author_followers: config.min_author_followers,
            target_count: config.mention_target,
            max_pages: config.mention_max_pages,
            ..SearchOptions::default()
        };
        let source = XSearchClient::new(
            config.x_bearer_token.clone(),
            config.request_timeout_secs,
            policy,
            search,
        )?;
        let xai = Arc::new(XaiClient::new(
            config.xai_api_key.clone(),
            XaiModels {
                chat: config.llm_model.clone(),
                image: config.image_model.clone(),
            },
            config.request_timeout_secs,
            policy,
        )?);
        let video = FalVideoClient::new(
            config.fal_api_key.clone(),
            config.request_timeout_secs,
            policy,
        )?;

        Ok(Self {
            source: Arc::new(source),
            llm: xai.clone(),
            images: xai,
            video: Arc::new(video),
            store,
            history: Arc::new(JsonFileHistoryStore::new(config.history_path.clone())),
            scorer: Arc::new(LexiconScorer),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Cached annotations older than this are recomputed.
    pub cache_ttl: Duration,
    pub skip_creative: bool,
    pub skip_playbooks: bool,
    pub creative: CreativeOptions,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(crate::cache::DEFAULT_TTL_SECS),
            skip_creative: false,
            skip_playbooks: false,
            creative: CreativeOptions::default(),
        }
    }
}

impl PipelineOptions {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            cache_ttl: Duration::from_secs(config.cache_ttl_secs),
            creative: CreativeOptions {
                max_suggestions: config.creative_suggestions,
                ads_per_suggestion: config.ads_per_suggestion,
                ..CreativeOptions::default()
            },
            ..Self::default()
        }
    }
}

/// Downgrade a non-fatal stage failure to the stage's empty value.
fn degrade<T: Default>(
    result: Result<T, InsightsError>,
    brand: &str,
    stage: &str,
) -> Result<T, InsightsError> {
    match result {
        Ok(value) => Ok(value),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            tracing::warn!(brand, stage, error = %e, "stage failed, continuing with empty result");
            Ok(T::default())
        }
    }
}

pub struct InsightsPipeline {
    source: Arc<dyn MentionSource>,
    llm: Arc<dyn CompletionClient>,
    store: Arc<dyn AnnotationStore>,
    scorer: Arc<dyn PolarityScorer>,
    suggestions: SuggestionEngine,
    creative: CreativeOrchestrator,
    options: PipelineOptions,
}

impl InsightsPipeline {
    #[must_use]
    pub fn new(collaborators: Collaborators, options: PipelineOptions) -> Self {
        let Collaborators {
            source,
            llm,
            images,
            video,
            store,
            history,
            scorer,
        } = collaborators;
        Self {
            suggestions: SuggestionEngine::new(Arc::clone(&llm), history),
            creative: CreativeOrchestrator::new(Arc::clone(&llm), images, video, options.creative),
            source,
            llm,
            store,
            scorer,
            options,
        }
    }

    #[must_use]
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    fn ttl(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.options.cache_ttl).unwrap_or(chrono::Duration::MAX)
    }

    /// Evict stale entries, annotate and consolidate mentions the cache has
    /// not seen, then read back annotations for every mention in input order.
    ///
    /// Nothing is stored when consolidation fails fatally.
    async fn annotate_and_cache(
        &self,
        brand: &BrandConfig,
        mentions: &[ScoredMention],
    ) -> Result<Vec<AnnotatedMention>, InsightsError> {
        let evicted = self.store.evict_older_than(self.ttl());
        if evicted > 0 {
            tracing::debug!(brand = %brand.name, evicted, "evicted stale annotations");
        }

        let ids: Vec<String> = mentions.iter().map(|m| m.mention.id.clone()).collect();
        let unanalyzed: HashSet<String> = self.store.get_unanalyzed(&ids).into_iter().collect();

        if unanalyzed.is_empty() {
            tracing::info!(brand = %brand.name, "no new mentions to annotate");
        } else {
            let fresh: Vec<_> = mentions
                .iter()
                .filter(|m| unanalyzed.contains(&m.mention.id))
                .map(|m| m.mention.clone())
                .collect();
            let annotator = Annotator::new(Arc::clone(&self.scorer), brand.blacklist_terms());
            let annotated = annotator.annotate_batch(&fresh);
            let consolidated = consolidate_annotations(self.llm.as_ref(), annotated).await?;
            let newly_annotated = consolidated.len();
            self.store.store_batch(consolidated);
            tracing::info!(
                brand = %brand.name,
                requested = fresh.len(),
                stored = newly_annotated,
                "annotated new mentions"
            );
        }

        let annotations: Vec<AnnotatedMention> = mentions
            .iter()
            .filter_map(|m| self.store.get(&m.mention.id))
            .collect();
        tracing::debug!(
            brand = %brand.name,
            available = annotations.len(),
            total = mentions.len(),
            "cached annotations available"
        );
        Ok(annotations)
    }

    /// Run every stage for `brand`.
    ///
    /// # Errors
    ///
    /// Only fatal errors ([`InsightsError::is_fatal`]) are returned. Fetch,
    /// suggestion, playbook, and creative failures produce empty sections.
    pub async fn run(&self, brand: &BrandConfig) -> Result<BrandInsights, InsightsError> {
        let name = brand.name.as_str();
        tracing::info!(brand = name, "building brand insights");

        let (mentions, voice) = tokio::join!(
            self.source.search_mentions(brand),
            self.source.brand_voice(brand)
        );
        let mentions = degrade(mentions, name, "mention fetch")?;
        let brand_voice_samples = degrade(voice, name, "brand voice fetch")?;

        let scored = score_mentions(mentions);
        let annotations = self.annotate_and_cache(brand, &scored).await?;
        let analysis = build_analysis(&annotations);

        let handle = brand.search_handle();
        let suggestions = degrade(
            self.suggestions
                .generate(&SuggestionContext {
                    brand_handle: &handle,
                    topic_summaries: &analysis.topic_summaries,
                    general_sentiment: analysis.general_sentiment,
                    voice_samples: &brand_voice_samples,
                })
                .await,
            name,
            "suggestions",
        )?;

        let topic_playbooks = if self.options.skip_playbooks {
            Default::default()
        } else {
            degrade(
                generate_playbooks(
                    self.llm.as_ref(),
                    &PlaybookContext {
                        brand_handle: &handle,
                        topic_summaries: &analysis.topic_summaries,
                        suggestions: &suggestions,
                        general_sentiment: analysis.general_sentiment,
                        voice_samples: &brand_voice_samples,
                    },
                )
                .await,
                name,
                "playbooks",
            )?
        };

        let CreativeOutput { ad_ideas, media } = if self.options.skip_creative {
            CreativeOutput::default()
        } else {
            degrade(
                self.creative
                    .generate(&suggestions, &brand_voice_samples, &handle)
                    .await,
                name,
                "creative",
            )?
        };

        tracing::info!(
            brand = name,
            mentions = scored.len(),
            annotations = annotations.len(),
            topics = analysis.topic_summaries.len(),
            score = analysis.general_sentiment.score,
            suggestions = suggestions.len(),
            ads = ad_ideas.len(),
            "brand insights ready"
        );

        Ok(BrandInsights {
            brand: brand.name.clone(),
            mentions: scored,
            brand_voice_samples,
            topic_summaries: analysis.topic_summaries,
            general_sentiment: analysis.general_sentiment,
            suggestions,
            topic_playbooks,
            generated_ad_ideas: ad_ideas,
            generated_media: media,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degrade_keeps_fatal_errors() {
        let err = degrade::<Vec<u8>>(
            Err(InsightsError::MissingCredential("XAI_API_KEY".to_owned())),
            "acme",
            "suggestions",
        )
        .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn degrade_empties_other_errors() {
        let value = degrade::<Vec<u8>>(
            Err(InsightsError::MalformedResponse("x".to_owned())),
            "acme",
            "suggestions",
        )
        .unwrap();
        assert!(value.is_empty());
    }

    #[test]
    fn default_ttl_is_three_hours() {
        assert_eq!(PipelineOptions::default().cache_ttl, Duration::from_secs(10_800));
    }
}
