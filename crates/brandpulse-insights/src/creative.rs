//! Ad ideas and their media, generated from the top suggestions.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use crate::error::InsightsError;
use crate::llm::{complete_json, CompletionClient};
use crate::media::{ImageGenerator, VideoGenerator, VideoRequest};
use crate::types::{
    AdFormat, AdIdea, BrandPost, GeneratedMedia, MediaKind, Objective, Suggestion, VideoStatus,
};

/// Prompts at or below this many characters are too thin to render well.
pub const MIN_PROMPT_CHARS: usize = 50;

const CREATIVE_TEMPERATURE: f32 = 0.7;
const MAX_VOICE_SAMPLES: usize = 10;
const IMAGE_SIZE: u32 = 1024;

/// How video-format ads wait for their render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoMode {
    /// Poll until the render finishes; ads whose video fails are dropped.
    Wait,
    /// Submit only; ads carry the job id with status `pending`.
    Async,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreativeOptions {
    /// How many of the top suggestions get creatives.
    pub max_suggestions: usize,
    pub ads_per_suggestion: usize,
    pub format: AdFormat,
    pub video_mode: VideoMode,
    pub video_poll_attempts: u32,
    pub video_poll_interval: Duration,
}

impl Default for CreativeOptions {
    fn default() -> Self {
        Self {
            max_suggestions: 1,
            ads_per_suggestion: 4,
            format: AdFormat::SingleImage,
            video_mode: VideoMode::Wait,
            video_poll_attempts: 60,
            video_poll_interval: Duration::from_secs(2),
        }
    }
}

/// Ads that made it through validation and media generation, with their media.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreativeOutput {
    pub ad_ideas: Vec<AdIdea>,
    pub media: Vec<GeneratedMedia>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAd {
    headline: Option<String>,
    body: Option<String>,
    call_to_action: Option<String>,
    hashtags: Option<Vec<String>>,
    objective: Option<String>,
    #[serde(alias = "image_prompt", alias = "video_prompt", alias = "media_prompt")]
    creative_prompt: Option<String>,
}

fn raw_ads(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("ads") {
            Some(Value::Array(items)) => items,
            Some(other) => vec![other],
            None => vec![Value::Object(obj)],
        },
        _ => Vec::new(),
    }
}

fn required(field: Option<String>, name: &str) -> Result<String, String> {
    field
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("missing {name}"))
}

fn normalize_hashtag(tag: &str) -> Option<String> {
    let tag = tag.trim().trim_start_matches('#');
    (!tag.is_empty()).then(|| format!("#{tag}"))
}

/// Ready-to-post text: headline, body, then CTA and hashtags.
#[must_use]
pub fn compose_post_text(headline: &str, body: &str, cta: &str, hashtags: &[String]) -> String {
    format!("{headline}\n\n{body}\n\n{cta} {}", hashtags.join(" "))
        .trim()
        .to_owned()
}

fn validate_ad(raw: RawAd, id: String, suggestion_id: &str, format: AdFormat) -> Result<AdIdea, String> {
    let headline = required(raw.headline, "headline")?;
    let body = required(raw.body, "body")?;
    let call_to_action = required(raw.call_to_action, "call_to_action")?;
    let hashtags: Vec<String> = raw
        .hashtags
        .ok_or("hashtags must be an array")?
        .iter()
        .filter_map(|t| normalize_hashtag(t))
        .collect();
    let objective = raw
        .objective
        .as_deref()
        .and_then(Objective::parse)
        .ok_or("objective outside awareness/engagement/conversions/retention")?;
    let creative_prompt = required(raw.creative_prompt, "creative_prompt")?;
    let prompt_chars = creative_prompt.chars().count();
    if prompt_chars <= MIN_PROMPT_CHARS {
        return Err(format!("creative_prompt is only {prompt_chars} characters"));
    }

    let suggested_post_text = compose_post_text(&headline, &body, &call_to_action, &hashtags);
    Ok(AdIdea {
        id,
        suggestion_id: suggestion_id.to_owned(),
        headline,
        body,
        call_to_action,
        hashtags,
        format,
        objective,
        creative_prompt,
        suggested_post_text,
        generated_media_url: None,
        video_status: None,
        video_job_id: None,
    })
}

/// Validate the model's ad list, keeping at most `limit` ads.
///
/// Ids are `ad-{suggestion_id}-{n}`, numbered over the surviving ads.
#[must_use]
pub fn parse_ad_ideas(
    value: Value,
    suggestion_id: &str,
    format: AdFormat,
    limit: usize,
) -> Vec<AdIdea> {
    let mut ads = Vec::new();
    for (i, item) in raw_ads(value).into_iter().enumerate() {
        if ads.len() == limit {
            break;
        }
        let raw = match serde_json::from_value::<RawAd>(item) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!(suggestion_id, position = i + 1, error = %e, "dropping unparseable ad idea");
                continue;
            }
        };
        let id = format!("ad-{suggestion_id}-{}", ads.len() + 1);
        match validate_ad(raw, id, suggestion_id, format) {
            Ok(ad) => ads.push(ad),
            Err(reason) => {
                tracing::debug!(suggestion_id, position = i + 1, reason = %reason, "dropping invalid ad idea");
            }
        }
    }
    ads
}

fn build_prompt(
    suggestion: &Suggestion,
    voice_samples: &[BrandPost],
    brand_handle: &str,
    options: &CreativeOptions,
) -> String {
    let mut prompt = String::new();
    if !voice_samples.is_empty() {
        prompt.push_str("Brand's exact tone and style from recent posts (MUST MATCH THIS VOICE):\n");
        for post in voice_samples.iter().take(MAX_VOICE_SAMPLES) {
            let _ = writeln!(prompt, "- \"{}\"", post.text);
        }
        prompt.push('\n');
    }

    let _ = write!(
        prompt,
        "ACTION TO TAKE:\n\
         Title: {title}\n\
         Rationale: {rationale}\n\
         Topic: {topic}\n\
         Priority: {priority}\n\
         Tone: {tone}\n\
         Example post: \"{copy}\"\n\n",
        title = suggestion.title,
        rationale = suggestion.rationale,
        topic = suggestion.topic,
        priority = suggestion.priority.as_str(),
        tone = suggestion.tone,
        copy = suggestion.suggested_copy,
    );

    let (format_rule, prompt_rule) = match options.format {
        AdFormat::SingleImage => (
            "single_image (1024x1024)",
            "The creative_prompt describes one still image: impactful, realistic, clean and sleek",
        ),
        AdFormat::Video => (
            "video (5 seconds, 16:9)",
            "The creative_prompt describes a short video: subject, camera motion, lighting, and mood",
        ),
    };
    let count = options.ads_per_suggestion;
    let _ = write!(
        prompt,
        "You are a world-class X ad strategist and copywriter for {brand_handle}.\n\
         Generate exactly {count} promotable ad ideas that directly address the action above.\n\n\
         Rules:\n\
         - Match the brand's voice from the posts above\n\
         - Vary objectives across awareness, engagement, conversions, and retention\n\
         - Format: {format_rule}\n\
         - Include a punchy headline, compelling body, clear CTA, and 2-4 relevant hashtags\n\
         - {prompt_rule}; at least {MIN_PROMPT_CHARS} characters\n\n\
         Return ONLY a JSON object with this structure:\n\
         {{\"ads\": [{{\"headline\": string, \"body\": string, \"call_to_action\": string, \
         \"hashtags\": [string], \"objective\": \"awareness\" | \"engagement\" | \"conversions\" | \"retention\", \
         \"creative_prompt\": string}}]}}"
    );
    prompt
}

/// Turns suggestions into ad ideas with generated media.
pub struct CreativeOrchestrator {
    llm: Arc<dyn CompletionClient>,
    images: Arc<dyn ImageGenerator>,
    video: Arc<dyn VideoGenerator>,
    options: CreativeOptions,
}

impl CreativeOrchestrator {
    #[must_use]
    pub fn new(
        llm: Arc<dyn CompletionClient>,
        images: Arc<dyn ImageGenerator>,
        video: Arc<dyn VideoGenerator>,
        options: CreativeOptions,
    ) -> Self {
        Self {
            llm,
            images,
            video,
            options,
        }
    }

    #[must_use]
    pub fn options(&self) -> &CreativeOptions {
        &self.options
    }

    /// Generate creatives for the first `max_suggestions` suggestions.
    ///
    /// Work is sequential: one ad-ideas call per suggestion, then one media
    /// call per ad. A failed call only loses that suggestion or that ad.
    ///
    /// # Errors
    ///
    /// Only fatal errors (missing credentials) are returned.
    pub async fn generate(
        &self,
        suggestions: &[Suggestion],
        voice_samples: &[BrandPost],
        brand_handle: &str,
    ) -> Result<CreativeOutput, InsightsError> {
        let mut output = CreativeOutput::default();

        for suggestion in suggestions.iter().take(self.options.max_suggestions) {
            let prompt = build_prompt(suggestion, voice_samples, brand_handle, &self.options);
            let ads = match complete_json(self.llm.as_ref(), &prompt, CREATIVE_TEMPERATURE).await {
                Ok(value) => parse_ad_ideas(
                    value,
                    &suggestion.id,
                    self.options.format,
                    self.options.ads_per_suggestion,
                ),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        suggestion_id = %suggestion.id,
                        error = %e,
                        "ad idea generation failed, skipping suggestion"
                    );
                    continue;
                }
            };

            for ad in ads {
                match self.attach_media(ad).await {
                    Ok((ad, media)) => {
                        output.ad_ideas.push(ad);
                        output.media.push(media);
                    }
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        tracing::warn!(error = %e, "media generation failed, dropping ad idea");
                    }
                }
            }
        }

        tracing::info!(
            ads = output.ad_ideas.len(),
            media = output.media.len(),
            "creative generation finished"
        );
        Ok(output)
    }

    async fn attach_media(&self, mut ad: AdIdea) -> Result<(AdIdea, GeneratedMedia), InsightsError> {
        match ad.format {
            AdFormat::SingleImage => {
                let image = self
                    .images
                    .generate_image(&ad.creative_prompt)
                    .await
                    .map_err(|e| annotate(e, &ad.id))?;
                ad.generated_media_url = Some(image.url.clone());
                let media = GeneratedMedia {
                    ad_idea_id: ad.id.clone(),
                    kind: MediaKind::Image,
                    url: Some(image.url),
                    job_id: None,
                    status: VideoStatus::Completed,
                    prompt_used: image
                        .revised_prompt
                        .unwrap_or_else(|| ad.creative_prompt.clone()),
                    generated_at: Utc::now(),
                    width: Some(IMAGE_SIZE),
                    height: Some(IMAGE_SIZE),
                };
                Ok((ad, media))
            }
            AdFormat::Video => {
                let request = VideoRequest::new(ad.creative_prompt.clone());
                let job = match self.options.video_mode {
                    VideoMode::Async => self.video.submit(&request).await,
                    VideoMode::Wait => {
                        self.video
                            .generate_and_wait(
                                &request,
                                self.options.video_poll_attempts,
                                self.options.video_poll_interval,
                            )
                            .await
                    }
                }
                .map_err(|e| annotate(e, &ad.id))?;

                if self.options.video_mode == VideoMode::Wait && job.url.is_none() {
                    return Err(InsightsError::Media(format!(
                        "video job {} for ad {} completed without a URL",
                        job.job_id, ad.id
                    )));
                }

                ad.generated_media_url.clone_from(&job.url);
                ad.video_status = Some(job.status);
                ad.video_job_id = Some(job.job_id.clone());
                let media = GeneratedMedia {
                    ad_idea_id: ad.id.clone(),
                    kind: MediaKind::Video,
                    url: job.url,
                    job_id: Some(job.job_id),
                    status: job.status,
                    prompt_used: ad.creative_prompt.clone(),
                    generated_at: Utc::now(),
                    width: None,
                    height: None,
                };
                Ok((ad, media))
            }
        }
    }
}

/// Tag non-fatal media errors with the ad they belong to.
fn annotate(err: InsightsError, ad_id: &str) -> InsightsError {
    if err.is_fatal() {
        err
    } else {
        InsightsError::Media(format!("ad {ad_id}: {err}"))
    }
}

#[cfg(test)]
#[path = "creative_test.rs"]
mod tests;
