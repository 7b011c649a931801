//! Engagement scoring for raw mentions.

use crate::types::{Mention, Metrics, ScoredMention};

/// Weighted engagement: replies and quotes cost more than a like, and a
/// retweet is the strongest distribution signal.
#[must_use]
pub fn engagement_score(metrics: &Metrics) -> u64 {
    metrics
        .likes
        .saturating_add(metrics.replies.saturating_mul(2))
        .saturating_add(metrics.quotes.saturating_mul(2))
        .saturating_add(metrics.retweets.saturating_mul(3))
}

/// Attach an engagement score to every mention, preserving input order.
#[must_use]
pub fn score_mentions(mentions: Vec<Mention>) -> Vec<ScoredMention> {
    mentions
        .into_iter()
        .map(|mention| {
            let engagement_score = engagement_score(&mention.metrics);
            ScoredMention {
                mention,
                engagement_score,
            }
        })
        .collect()
}

/// Highest engagement first. Equal scores keep their fetch order.
#[must_use]
pub fn sort_by_engagement(mut mentions: Vec<ScoredMention>) -> Vec<ScoredMention> {
    mentions.sort_by(|a, b| b.engagement_score.cmp(&a.engagement_score));
    mentions
}

/// Newest first. Equal timestamps keep their input order.
#[must_use]
pub fn sort_by_recency(mut mentions: Vec<ScoredMention>) -> Vec<ScoredMention> {
    mentions.sort_by(|a, b| b.mention.created_at.cmp(&a.mention.created_at));
    mentions
}
