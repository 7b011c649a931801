//! Domain types shared by every pipeline stage.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Public engagement counters attached to a post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub retweets: u64,
    #[serde(default)]
    pub replies: u64,
    #[serde(default)]
    pub quotes: u64,
}

/// A public post referencing the brand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mention {
    pub id: String,
    pub text: String,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metrics: Metrics,
}

/// A media attachment on one of the brand's own posts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaObject {
    /// `photo`, `video`, or `animated_gif`.
    pub kind: String,
    pub url: Option<String>,
    pub alt_text: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// A post published by the brand itself, used as a tone reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandPost {
    pub id: String,
    pub text: String,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metrics: Metrics,
    #[serde(default)]
    pub media: Vec<MediaObject>,
}

/// A mention plus its engagement score. Recomputed every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMention {
    #[serde(flatten)]
    pub mention: Mention,
    pub engagement_score: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Low,
    Medium,
    High,
}

impl Intensity {
    /// Weight of one annotation in the overall brand score.
    #[must_use]
    pub fn weight(self) -> f64 {
        match self {
            Intensity::High => 2.0,
            Intensity::Medium => 1.3,
            Intensity::Low => 1.0,
        }
    }
}

/// Sentiment classification of one mention. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedMention {
    pub mention_id: String,
    pub sentiment: Sentiment,
    /// Positivity index in `[0.0, 1.0]`: 0 is maximally negative, 1 maximally positive.
    pub sentiment_score: f64,
    pub topics: Vec<String>,
    pub key_phrase: Option<String>,
    pub is_sarcasm: bool,
    pub intensity: Intensity,
    pub analyzed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntensityBreakdown {
    pub low: u32,
    pub medium: u32,
    pub high: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSummary {
    pub topic: String,
    pub total: u32,
    pub positive: u32,
    pub neutral: u32,
    pub negative: u32,
    pub positive_pct: u32,
    pub sample_mention_ids: Vec<String>,
    pub intensity_breakdown: IntensityBreakdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    #[serde(rename = "very negative")]
    VeryNegative,
    Negative,
    Neutral,
    Positive,
    #[serde(rename = "very positive")]
    VeryPositive,
}

impl SentimentLabel {
    #[must_use]
    pub fn from_score(score: u32) -> Self {
        match score {
            80.. => SentimentLabel::VeryPositive,
            60..=79 => SentimentLabel::Positive,
            40..=59 => SentimentLabel::Neutral,
            20..=39 => SentimentLabel::Negative,
            _ => SentimentLabel::VeryNegative,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SentimentLabel::VeryNegative => "very negative",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Positive => "positive",
            SentimentLabel::VeryPositive => "very positive",
        }
    }
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall weighted brand sentiment on a 0-100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralSentiment {
    pub score: u32,
    pub label: SentimentLabel,
}

impl Default for GeneralSentiment {
    fn default() -> Self {
        Self {
            score: 50,
            label: SentimentLabel::Neutral,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Parse the wire form; anything outside the allowed set is `None`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "high" => Some(Priority::High),
            "medium" => Some(Priority::Medium),
            "low" => Some(Priority::Low),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

/// A topic-scoped recommendation with ready-to-post copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: String,
    pub title: String,
    pub rationale: String,
    pub topic: String,
    pub priority: Priority,
    /// At most 280 characters.
    pub suggested_copy: String,
    pub tone: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdFormat {
    SingleImage,
    Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Objective {
    Awareness,
    Engagement,
    Conversions,
    Retention,
}

impl Objective {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "awareness" => Some(Objective::Awareness),
            "engagement" => Some(Objective::Engagement),
            "conversions" => Some(Objective::Conversions),
            "retention" => Some(Objective::Retention),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// A generated marketing unit derived from a suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdIdea {
    pub id: String,
    pub suggestion_id: String,
    pub headline: String,
    pub body: String,
    pub call_to_action: String,
    pub hashtags: Vec<String>,
    pub format: AdFormat,
    pub objective: Objective,
    /// Prompt sent to the image or video generator.
    pub creative_prompt: String,
    pub suggested_post_text: String,
    pub generated_media_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_status: Option<VideoStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_job_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

/// A media asset linked back to the ad idea it was generated for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedMedia {
    pub ad_idea_id: String,
    pub kind: MediaKind,
    pub url: Option<String>,
    pub job_id: Option<String>,
    pub status: VideoStatus,
    pub prompt_used: String,
    pub generated_at: DateTime<Utc>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Top-level result of one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandInsights {
    pub brand: String,
    pub mentions: Vec<ScoredMention>,
    pub brand_voice_samples: Vec<BrandPost>,
    pub topic_summaries: Vec<TopicSummary>,
    pub general_sentiment: GeneralSentiment,
    pub suggestions: Vec<Suggestion>,
    /// Per-topic action plans, keyed by topic.
    pub topic_playbooks: BTreeMap<String, String>,
    pub generated_ad_ideas: Vec<AdIdea>,
    pub generated_media: Vec<GeneratedMedia>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_thresholds() {
        assert_eq!(SentimentLabel::from_score(100), SentimentLabel::VeryPositive);
        assert_eq!(SentimentLabel::from_score(80), SentimentLabel::VeryPositive);
        assert_eq!(SentimentLabel::from_score(79), SentimentLabel::Positive);
        assert_eq!(SentimentLabel::from_score(60), SentimentLabel::Positive);
        assert_eq!(SentimentLabel::from_score(59), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_score(40), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_score(39), SentimentLabel::Negative);
        assert_eq!(SentimentLabel::from_score(20), SentimentLabel::Negative);
        assert_eq!(SentimentLabel::from_score(19), SentimentLabel::VeryNegative);
        assert_eq!(SentimentLabel::from_score(0), SentimentLabel::VeryNegative);
    }

    #[test]
    fn label_serializes_with_spaces() {
        let json = serde_json::to_string(&SentimentLabel::VeryPositive).unwrap();
        assert_eq!(json, "\"very positive\"");
        let json = serde_json::to_string(&SentimentLabel::Neutral).unwrap();
        assert_eq!(json, "\"neutral\"");
    }

    #[test]
    fn priority_rejects_unknown_values() {
        assert_eq!(Priority::parse(" HIGH "), Some(Priority::High));
        assert_eq!(Priority::parse("urgent"), None);
    }

    #[test]
    fn scored_mention_flattens_mention_fields() {
        let scored = ScoredMention {
            mention: Mention {
                id: "1".to_owned(),
                text: "hi".to_owned(),
                author_id: "a".to_owned(),
                created_at: DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                    .unwrap()
                    .with_timezone(&Utc),
                metrics: Metrics::default(),
            },
            engagement_score: 7,
        };
        let value = serde_json::to_value(&scored).unwrap();
        assert_eq!(value["id"], "1");
        assert_eq!(value["engagement_score"], 7);
    }
}
