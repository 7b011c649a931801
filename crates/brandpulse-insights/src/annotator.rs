//! Per-mention sentiment, intensity, and provisional topic annotation.

use std::sync::Arc;

use chrono::Utc;

use crate::error::InsightsError;
use crate::keywords::extract_keywords;
use crate::lexicon::PolarityScorer;
use crate::types::{AnnotatedMention, Intensity, Mention, Sentiment};

const MAX_PROVISIONAL_TOPICS: usize = 2;
const DEFAULT_TOPIC: &str = "general";

#[must_use]
pub fn classify_polarity(compound: f64) -> Sentiment {
    if compound >= 0.05 {
        Sentiment::Positive
    } else if compound <= -0.05 {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

#[must_use]
pub fn classify_intensity(compound: f64) -> Intensity {
    let magnitude = compound.abs();
    if magnitude > 0.6 {
        Intensity::High
    } else if magnitude > 0.3 {
        Intensity::Medium
    } else {
        Intensity::Low
    }
}

/// Sarcasm detection is not implemented; every mention is taken at face value.
#[must_use]
pub fn detect_sarcasm(_text: &str) -> bool {
    false
}

/// Turns raw mentions into [`AnnotatedMention`]s.
pub struct Annotator {
    scorer: Arc<dyn PolarityScorer>,
    blacklist: Vec<String>,
}

impl Annotator {
    /// `blacklist` holds lowercase brand terms that must never become topics.
    #[must_use]
    pub fn new(scorer: Arc<dyn PolarityScorer>, blacklist: Vec<String>) -> Self {
        Self { scorer, blacklist }
    }

    /// Annotate a single mention.
    ///
    /// Topics are the first two extracted keywords; `["general"]` when the
    /// text yields none. They are provisional until consolidation.
    ///
    /// # Errors
    ///
    /// Returns [`InsightsError::Scoring`] if the polarity scorer fails or
    /// produces a non-finite value.
    pub fn annotate(&self, mention: &Mention) -> Result<AnnotatedMention, InsightsError> {
        let compound = self.scorer.polarity(&mention.text)?;
        if !compound.is_finite() {
            return Err(InsightsError::Scoring(format!(
                "non-finite polarity {compound} for mention {}",
                mention.id
            )));
        }
        let compound = compound.clamp(-1.0, 1.0);

        let mut topics = extract_keywords(&mention.text, &self.blacklist);
        topics.truncate(MAX_PROVISIONAL_TOPICS);
        if topics.is_empty() {
            topics.push(DEFAULT_TOPIC.to_owned());
        }
        let key_phrase = topics.first().cloned();

        Ok(AnnotatedMention {
            mention_id: mention.id.clone(),
            sentiment: classify_polarity(compound),
            sentiment_score: (compound + 1.0) / 2.0,
            topics,
            key_phrase,
            is_sarcasm: detect_sarcasm(&mention.text),
            intensity: classify_intensity(compound),
            analyzed_at: Utc::now(),
        })
    }

    /// Annotate every mention, skipping (and logging) any that fail.
    #[must_use]
    pub fn annotate_batch(&self, mentions: &[Mention]) -> Vec<AnnotatedMention> {
        mentions
            .iter()
            .filter_map(|mention| match self.annotate(mention) {
                Ok(annotation) => Some(annotation),
                Err(e) => {
                    tracing::warn!(
                        mention_id = %mention.id,
                        error = %e,
                        "annotation failed, skipping mention"
                    );
                    None
                }
            })
            .collect()
    }
}
