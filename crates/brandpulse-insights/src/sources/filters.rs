//! Post-level filters applied to every page of search results.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::Metrics;

const MAX_HASHTAGS: usize = 4;
const MAX_URLS: usize = 2;
/// Hashtag count at which a post with no engagement at all is treated as spam.
const ZERO_ENGAGEMENT_HASHTAGS: usize = 3;

const PROMO_PHRASES: &[&str] = &[
    "giveaway",
    "airdrop",
    "promo code",
    "dm me",
    "dm for",
    "follow back",
    "free followers",
    "click the link",
    "limited time offer",
    "crypto signal",
];

static HASHTAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)#\w+").expect("valid hashtag regex"));

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)https?://\S+").expect("valid url regex"));

fn hashtag_count(text: &str) -> usize {
    HASHTAG_RE.find_iter(text).count()
}

/// Heuristic spam check: hashtag stuffing, link farms, promotional phrasing,
/// or a hashtag-heavy post nobody engaged with.
#[must_use]
pub fn is_spam(text: &str, metrics: &Metrics) -> bool {
    let hashtags = hashtag_count(text);
    if hashtags > MAX_HASHTAGS {
        return true;
    }
    if URL_RE.find_iter(text).count() > MAX_URLS {
        return true;
    }
    let lower = text.to_lowercase();
    if PROMO_PHRASES.iter().any(|p| lower.contains(p)) {
        return true;
    }
    let engagement = metrics.likes + metrics.retweets + metrics.replies + metrics.quotes;
    engagement == 0 && hashtags >= ZERO_ENGAGEMENT_HASHTAGS
}

/// Authors with at least `min_followers` followers pass. Unknown authors
/// count as zero.
#[must_use]
pub fn meets_follower_threshold(followers: Option<u64>, min_followers: u64) -> bool {
    followers.unwrap_or(0) >= min_followers
}
