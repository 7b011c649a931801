//! Topic summaries and overall weighted sentiment from a set of annotations.

use std::collections::{HashMap, HashSet};

use crate::types::{
    AnnotatedMention, GeneralSentiment, Intensity, IntensityBreakdown, Sentiment, SentimentLabel,
    TopicSummary,
};

const MAX_SAMPLE_IDS: usize = 3;
const UNTOPICED: &str = "general";

/// Aggregated view over one run's annotations.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub topic_summaries: Vec<TopicSummary>,
    pub general_sentiment: GeneralSentiment,
}

/// Build topic summaries and the overall sentiment.
///
/// Pure: the same annotations in the same order always produce the same
/// result.
#[must_use]
pub fn build_analysis(annotations: &[AnnotatedMention]) -> Analysis {
    Analysis {
        topic_summaries: summarize_topics(annotations),
        general_sentiment: general_sentiment(annotations),
    }
}

/// One summary per normalized topic, largest first.
///
/// Topics with equal totals keep first-seen order. A mention counts once per
/// distinct topic it carries; a mention with no topics counts as `general`.
#[must_use]
pub fn summarize_topics(annotations: &[AnnotatedMention]) -> Vec<TopicSummary> {
    let mut summaries: Vec<TopicSummary> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for annotation in annotations {
        let mut topics: Vec<String> = annotation
            .topics
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        if topics.is_empty() {
            topics.push(UNTOPICED.to_owned());
        }
        let mut seen = HashSet::new();
        topics.retain(|t| seen.insert(t.clone()));

        for topic in topics {
            let i = *index.entry(topic.clone()).or_insert_with(|| {
                summaries.push(empty_summary(topic));
                summaries.len() - 1
            });
            record(&mut summaries[i], annotation);
        }
    }

    for summary in &mut summaries {
        summary.positive_pct = percentage(summary.positive, summary.total);
    }
    summaries.sort_by(|a, b| b.total.cmp(&a.total));
    summaries
}

fn empty_summary(topic: String) -> TopicSummary {
    TopicSummary {
        topic,
        total: 0,
        positive: 0,
        neutral: 0,
        negative: 0,
        positive_pct: 0,
        sample_mention_ids: Vec::new(),
        intensity_breakdown: IntensityBreakdown::default(),
    }
}

fn record(summary: &mut TopicSummary, annotation: &AnnotatedMention) {
    summary.total += 1;
    match annotation.sentiment {
        Sentiment::Positive => summary.positive += 1,
        Sentiment::Neutral => summary.neutral += 1,
        Sentiment::Negative => summary.negative += 1,
    }
    match annotation.intensity {
        Intensity::Low => summary.intensity_breakdown.low += 1,
        Intensity::Medium => summary.intensity_breakdown.medium += 1,
        Intensity::High => summary.intensity_breakdown.high += 1,
    }
    if summary.sample_mention_ids.len() < MAX_SAMPLE_IDS {
        summary
            .sample_mention_ids
            .push(annotation.mention_id.clone());
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn percentage(part: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    (f64::from(part) / f64::from(total) * 100.0).round() as u32
}

/// Contribution of one annotation to the overall score, in `[0, 1]`.
///
/// `sentiment_score` is already a positivity index (a confident negative sits
/// near 0), so polar mentions contribute it directly and neutral mentions
/// contribute the midpoint. Sarcasm inverts the result.
fn contribution(annotation: &AnnotatedMention) -> f64 {
    let score = annotation.sentiment_score.clamp(0.0, 1.0);
    let value = match annotation.sentiment {
        Sentiment::Positive | Sentiment::Negative => score,
        Sentiment::Neutral => 0.5,
    };
    if annotation.is_sarcasm {
        1.0 - value
    } else {
        value
    }
}

/// Intensity-weighted overall sentiment on a 0-100 scale.
///
/// No annotations yields 50 / neutral.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn general_sentiment(annotations: &[AnnotatedMention]) -> GeneralSentiment {
    let (sum, weight) = annotations.iter().fold((0.0_f64, 0.0_f64), |(s, w), a| {
        let wt = a.intensity.weight();
        (s + contribution(a) * wt, w + wt)
    });
    if weight <= 0.0 {
        return GeneralSentiment::default();
    }

    let score = (100.0 * sum / weight).round().clamp(0.0, 100.0) as u32;
    GeneralSentiment {
        score,
        label: SentimentLabel::from_score(score),
    }
}
