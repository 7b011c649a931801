//! X API v2 recent-search client.
//!
//! Mentions are paged 100 at a time via `next_token`, filtered per page by
//! author follower count and spam heuristics, and collected until the target
//! count or the page cap is reached. Brand voice samples come from a single
//! page of the brand's own posts with media expansions.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use brandpulse_core::BrandConfig;
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;

use super::filters::{is_spam, meets_follower_threshold};
use super::query::{brand_voice_query, mention_query};
use super::MentionSource;
use crate::error::InsightsError;
use crate::http::{build_client, join, normalize_base_url, read_json};
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::types::{BrandPost, MediaObject, Mention, Metrics};

const DEFAULT_BASE_URL: &str = "https://api.twitter.com/2/";
const SEARCH_PATH: &str = "tweets/search/recent";
const SERVICE: &str = "x";
const PAGE_SIZE: u32 = 100;

/// Paging and filtering knobs for [`XSearchClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    pub min_author_followers: u64,
    /// Filtered mentions wanted; paging stops once reached.
    pub target_count: usize,
    pub max_pages: u32,
    pub page_delay: Duration,
    /// Brand posts requested for tone reference (10..=100).
    pub voice_limit: u32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            min_author_followers: 1000,
            target_count: 500,
            max_pages: 10,
            page_delay: Duration::from_secs(1),
            voice_limit: 50,
        }
    }
}

// ---- wire types -------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct SearchPage {
    #[serde(default)]
    data: Vec<RawTweet>,
    #[serde(default)]
    includes: Includes,
    #[serde(default)]
    meta: PageMeta,
}

#[derive(Debug, Deserialize)]
struct RawTweet {
    id: String,
    text: String,
    author_id: Option<String>,
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    public_metrics: RawMetrics,
    attachments: Option<Attachments>,
}

#[derive(Debug, Default, Deserialize)]
struct RawMetrics {
    #[serde(default)]
    like_count: u64,
    #[serde(default)]
    retweet_count: u64,
    #[serde(default)]
    reply_count: u64,
    #[serde(default)]
    quote_count: u64,
}

impl From<&RawMetrics> for Metrics {
    fn from(m: &RawMetrics) -> Self {
        Metrics {
            likes: m.like_count,
            retweets: m.retweet_count,
            replies: m.reply_count,
            quotes: m.quote_count,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct Attachments {
    #[serde(default)]
    media_keys: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Includes {
    #[serde(default)]
    users: Vec<RawUser>,
    #[serde(default)]
    media: Vec<RawMedia>,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    id: String,
    public_metrics: Option<UserMetrics>,
}

#[derive(Debug, Deserialize)]
struct UserMetrics {
    followers_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawMedia {
    media_key: String,
    #[serde(rename = "type")]
    kind: String,
    url: Option<String>,
    preview_image_url: Option<String>,
    alt_text: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct PageMeta {
    next_token: Option<String>,
}

// ---- page processing --------------------------------------------------------

/// Convert one page into mentions, dropping low-follower authors, spam, and
/// posts missing an author or timestamp.
fn page_mentions(page: &SearchPage, min_followers: u64) -> Vec<Mention> {
    let followers: HashMap<&str, Option<u64>> = page
        .includes
        .users
        .iter()
        .map(|u| {
            (
                u.id.as_str(),
                u.public_metrics.as_ref().and_then(|m| m.followers_count),
            )
        })
        .collect();

    page.data
        .iter()
        .filter_map(|tweet| {
            let (Some(author_id), Some(created_at)) = (&tweet.author_id, tweet.created_at) else {
                tracing::debug!(tweet_id = %tweet.id, "skipping tweet without author or timestamp");
                return None;
            };
            let author_followers = followers.get(author_id.as_str()).copied().flatten();
            if !meets_follower_threshold(author_followers, min_followers) {
                return None;
            }
            let metrics = Metrics::from(&tweet.public_metrics);
            if is_spam(&tweet.text, &metrics) {
                tracing::debug!(tweet_id = %tweet.id, "dropping spam tweet");
                return None;
            }
            Some(Mention {
                id: tweet.id.clone(),
                text: tweet.text.clone(),
                author_id: author_id.clone(),
                created_at,
                metrics,
            })
        })
        .collect()
}

/// Convert one page of the brand's own posts, resolving media keys.
fn page_brand_posts(page: &SearchPage) -> Vec<BrandPost> {
    let media: HashMap<&str, &RawMedia> = page
        .includes
        .media
        .iter()
        .map(|m| (m.media_key.as_str(), m))
        .collect();

    page.data
        .iter()
        .map(|tweet| BrandPost {
            id: tweet.id.clone(),
            text: tweet.text.clone(),
            created_at: tweet.created_at,
            metrics: Metrics::from(&tweet.public_metrics),
            media: tweet
                .attachments
                .iter()
                .flat_map(|a| &a.media_keys)
                .filter_map(|key| media.get(key.as_str()))
                .map(|m| MediaObject {
                    kind: m.kind.clone(),
                    url: m.url.clone().or_else(|| m.preview_image_url.clone()),
                    alt_text: m.alt_text.clone(),
                    width: m.width,
                    height: m.height,
                })
                .collect(),
        })
        .collect()
}

// ---- client -----------------------------------------------------------------

/// Bearer-token client for `tweets/search/recent`.
///
/// A missing token is not an error until the first request, which then fails
/// with [`InsightsError::MissingCredential`].
pub struct XSearchClient {
    client: Client,
    bearer_token: Option<String>,
    search_url: Url,
    policy: RetryPolicy,
    options: SearchOptions,
}

impl XSearchClient {
    /// Client pointed at the production X API.
    ///
    /// # Errors
    ///
    /// Returns [`InsightsError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(
        bearer_token: Option<String>,
        timeout_secs: u64,
        policy: RetryPolicy,
        options: SearchOptions,
    ) -> Result<Self, InsightsError> {
        Self::with_base_url(bearer_token, timeout_secs, DEFAULT_BASE_URL, policy, options)
    }

    /// Client pointed at `base_url` (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`InsightsError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`InsightsError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        bearer_token: Option<String>,
        timeout_secs: u64,
        base_url: &str,
        policy: RetryPolicy,
        options: SearchOptions,
    ) -> Result<Self, InsightsError> {
        let client = build_client(timeout_secs)?;
        let search_url = join(&normalize_base_url(base_url)?, SEARCH_PATH)?;
        Ok(Self {
            client,
            bearer_token: bearer_token.filter(|t| !t.trim().is_empty()),
            search_url,
            policy,
            options,
        })
    }

    fn token(&self) -> Result<&str, InsightsError> {
        self.bearer_token
            .as_deref()
            .ok_or_else(|| InsightsError::MissingCredential("X_BEARER_TOKEN".to_owned()))
    }

    fn mentions_url(&self, query: &str, next_token: Option<&str>) -> Url {
        let mut url = self.search_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("query", query);
            pairs.append_pair("max_results", &PAGE_SIZE.to_string());
            pairs.append_pair("tweet.fields", "author_id,public_metrics,created_at");
            pairs.append_pair("expansions", "author_id");
            pairs.append_pair("user.fields", "public_metrics,username");
            if let Some(token) = next_token {
                pairs.append_pair("next_token", token);
            }
        }
        url
    }

    fn voice_url(&self, query: &str) -> Url {
        let mut url = self.search_url.clone();
        url.query_pairs_mut()
            .append_pair("query", query)
            .append_pair(
                "max_results",
                &self.options.voice_limit.clamp(10, PAGE_SIZE).to_string(),
            )
            .append_pair("tweet.fields", "public_metrics,created_at,attachments")
            .append_pair("expansions", "attachments.media_keys")
            .append_pair(
                "media.fields",
                "type,url,preview_image_url,alt_text,width,height",
            );
        url
    }

    async fn fetch_page(&self, url: &Url, token: &str) -> Result<SearchPage, InsightsError> {
        retry_with_backoff(self.policy, || async move {
            let response = self
                .client
                .get(url.clone())
                .bearer_auth(token)
                .send()
                .await?;
            let body = read_json(response, SERVICE).await?;
            serde_json::from_value::<SearchPage>(body).map_err(|e| InsightsError::Deserialize {
                context: "X recent search page".to_owned(),
                source: e,
            })
        })
        .await
    }
}

#[async_trait]
impl MentionSource for XSearchClient {
    /// Page through recent mentions until `target_count` filtered mentions
    /// are collected, results run out, or `max_pages` is hit.
    ///
    /// A failure on the first page is returned; a failure on a later page
    /// stops paging and keeps what was collected.
    async fn search_mentions(&self, brand: &BrandConfig) -> Result<Vec<Mention>, InsightsError> {
        let token = self.token()?;
        let query = mention_query(brand);
        let target = self.options.target_count;

        let mut mentions: Vec<Mention> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut next_token: Option<String> = None;
        let mut pages = 0u32;

        while pages < self.options.max_pages {
            if pages > 0 && !self.options.page_delay.is_zero() {
                tokio::time::sleep(self.options.page_delay).await;
            }
            let url = self.mentions_url(&query, next_token.as_deref());
            let page = match self.fetch_page(&url, token).await {
                Ok(page) => page,
                Err(e) if pages == 0 || e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        brand = %brand.name,
                        page = pages + 1,
                        error = %e,
                        "mention paging stopped early, keeping results so far"
                    );
                    break;
                }
            };
            pages += 1;

            let raw = page.data.len();
            let kept: Vec<Mention> = page_mentions(&page, self.options.min_author_followers)
                .into_iter()
                .filter(|m| seen.insert(m.id.clone()))
                .collect();
            tracing::debug!(
                brand = %brand.name,
                page = pages,
                raw,
                kept = kept.len(),
                "mention page fetched"
            );
            mentions.extend(kept);

            if mentions.len() >= target {
                break;
            }
            match page.meta.next_token {
                Some(cursor) => next_token = Some(cursor),
                None => break,
            }
        }

        mentions.truncate(target);
        tracing::info!(
            brand = %brand.name,
            pages,
            count = mentions.len(),
            "mentions fetched"
        );
        Ok(mentions)
    }

    async fn brand_voice(&self, brand: &BrandConfig) -> Result<Vec<BrandPost>, InsightsError> {
        let token = self.token()?;
        let url = self.voice_url(&brand_voice_query(brand));
        let page = self.fetch_page(&url, token).await?;
        let posts = page_brand_posts(&page);
        tracing::debug!(brand = %brand.name, count = posts.len(), "brand voice samples fetched");
        Ok(posts)
    }
}
