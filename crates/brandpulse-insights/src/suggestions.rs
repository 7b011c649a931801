//! Topic ranking and model-generated action suggestions.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::error::InsightsError;
use crate::history::{normalize_topic, SuggestionHistoryStore};
use crate::llm::{complete_json, CompletionClient};
use crate::types::{BrandPost, GeneralSentiment, Priority, Suggestion, TopicSummary};

/// Hard limit on a post's length, in characters.
pub const MAX_COPY_CHARS: usize = 280;
/// Topics the model sees, after history exclusion.
pub const MAX_CANDIDATE_TOPICS: usize = 10;
/// Suggestions requested per run.
pub const SUGGESTION_COUNT: usize = 3;
/// Topics above this positive share are worth amplifying.
pub const AMPLIFY_THRESHOLD_PCT: u32 = 70;

const SUGGESTION_TEMPERATURE: f32 = 0.2;
const MAX_VOICE_SAMPLES: usize = 10;

/// Everything the engine needs from one pipeline run.
#[derive(Debug, Clone, Copy)]
pub struct SuggestionContext<'a> {
    pub brand_handle: &'a str,
    pub topic_summaries: &'a [TopicSummary],
    pub general_sentiment: GeneralSentiment,
    pub voice_samples: &'a [BrandPost],
}

/// Urgency of a topic: favors low positivity and high-intensity chatter.
#[must_use]
pub fn priority_score(summary: &TopicSummary) -> f64 {
    let high_share = f64::from(summary.intensity_breakdown.high) / f64::from(summary.total.max(1));
    0.7 * f64::from(100u32.saturating_sub(summary.positive_pct)) + 30.0 * high_share
}

/// Topics eligible for suggestions this run.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePool {
    /// Largest topics first, at most [`MAX_CANDIDATE_TOPICS`].
    pub topics: Vec<TopicSummary>,
    /// `true` when every topic was in history and the full list was used.
    pub fell_back: bool,
}

/// Drop topics present in `recent_topics`; if nothing survives, use every
/// topic instead.
#[must_use]
pub fn candidate_pool(summaries: &[TopicSummary], recent_topics: &[String]) -> CandidatePool {
    let recent: HashSet<String> = recent_topics.iter().map(|t| normalize_topic(t)).collect();
    let mut available: Vec<TopicSummary> = summaries
        .iter()
        .filter(|s| !recent.contains(&normalize_topic(&s.topic)))
        .cloned()
        .collect();

    let fell_back = available.is_empty();
    if fell_back {
        if !summaries.is_empty() {
            tracing::warn!("all topics were recently suggested, falling back to the full list");
        }
        available = summaries.to_vec();
    }
    available.sort_by(|a, b| b.total.cmp(&a.total));
    available.truncate(MAX_CANDIDATE_TOPICS);
    CandidatePool {
        topics: available,
        fell_back,
    }
}

fn build_prompt(ctx: &SuggestionContext<'_>, pool: &CandidatePool) -> String {
    let mut prompt = String::new();

    if !ctx.voice_samples.is_empty() {
        prompt.push_str("These are the brand's recent posts (for tone reference only):\n");
        for post in ctx.voice_samples.iter().take(MAX_VOICE_SAMPLES) {
            let _ = writeln!(prompt, "- {}", post.text);
        }
        prompt.push('\n');
    }

    let _ = writeln!(
        prompt,
        "Overall brand sentiment: {}/100 ({})\n",
        ctx.general_sentiment.score, ctx.general_sentiment.label
    );

    prompt.push_str("TOP TOPICS BY VOLUME (focus suggestions here):\n");
    for t in &pool.topics {
        let _ = writeln!(
            prompt,
            "- {}: {} mentions, {}% positive, high intensity: {}",
            t.topic, t.total, t.positive_pct, t.intensity_breakdown.high
        );
    }

    let mut ranked: Vec<&TopicSummary> = pool.topics.iter().collect();
    ranked.sort_by(|a, b| priority_score(b).total_cmp(&priority_score(a)));
    prompt.push_str("\nHIGH PRIORITY (negative or intense):\n");
    for t in ranked.iter().take(5) {
        let _ = writeln!(prompt, "- {}", t.topic);
    }

    prompt.push_str("\nPOSITIVE TOPICS TO AMPLIFY:\n");
    for t in pool
        .topics
        .iter()
        .filter(|t| t.positive_pct > AMPLIFY_THRESHOLD_PCT)
    {
        let _ = writeln!(prompt, "- {}", t.topic);
    }

    let _ = write!(
        prompt,
        "\nYou are a senior social media strategist for {handle}.\n\
         Generate exactly {SUGGESTION_COUNT} concrete, actionable suggestions based on the data above.\n\n\
         Rules:\n\
         - Prioritize fixing high-priority topics (negative sentiment or high intensity)\n\
         - Amplify strong positive topics\n\
         - Every suggestion must include a ready-to-post copy of at most {MAX_COPY_CHARS} characters in the brand's voice\n\
         - The topic field must be one of the topics listed above\n\
         - Do not target specific users or handles; focus on themes, product features, and sentiment patterns\n\n\
         Return ONLY a JSON object with this structure:\n\
         {{\"suggestions\": [{{\"id\": string, \"title\": string, \"rationale\": string, \"topic\": string, \
         \"priority\": \"high\" | \"medium\" | \"low\", \"suggested_copy\": string, \
         \"tone\": \"empathetic\" | \"funny\" | \"promotional\" | \"straightforward\"}}]}}",
        handle = ctx.brand_handle,
    );
    prompt
}

/// A suggestion as the model returned it, before validation.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSuggestion {
    id: Option<String>,
    title: Option<String>,
    rationale: Option<String>,
    topic: Option<String>,
    priority: Option<String>,
    suggested_copy: Option<String>,
    tone: Option<String>,
}

/// Accept `{"suggestions": [...]}`, a bare array, or a single object.
fn raw_items(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("suggestions") {
            Some(Value::Array(items)) => items,
            Some(other) => vec![other],
            None => vec![Value::Object(obj)],
        },
        _ => Vec::new(),
    }
}

fn non_blank(field: Option<String>) -> Option<String> {
    field
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
}

/// Validate one raw item. `position` is 1-based and used for missing ids.
fn validate(
    raw: RawSuggestion,
    position: usize,
    excluded: &HashSet<String>,
) -> Result<Suggestion, String> {
    let title = non_blank(raw.title).ok_or("missing title")?;
    let rationale = non_blank(raw.rationale).ok_or("missing rationale")?;
    let topic = non_blank(raw.topic).ok_or("missing topic")?;
    let tone = non_blank(raw.tone).ok_or("missing tone")?;
    let suggested_copy = non_blank(raw.suggested_copy).ok_or("missing suggested_copy")?;
    let priority = raw
        .priority
        .as_deref()
        .and_then(Priority::parse)
        .ok_or("priority outside high/medium/low")?;

    let chars = suggested_copy.chars().count();
    if chars > MAX_COPY_CHARS {
        return Err(format!("suggested_copy is {chars} characters"));
    }
    if excluded.contains(&normalize_topic(&topic)) {
        return Err(format!("topic '{topic}' was suggested recently"));
    }

    let id = non_blank(raw.id).unwrap_or_else(|| format!("sug-{position}"));
    Ok(Suggestion {
        id,
        title,
        rationale,
        topic,
        priority,
        suggested_copy,
        tone,
    })
}

/// Parse and validate the model's response. Invalid items are dropped.
///
/// `excluded` holds normalized topics that may not be suggested.
#[must_use]
pub fn parse_suggestions(value: Value, excluded: &HashSet<String>) -> Vec<Suggestion> {
    raw_items(value)
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let raw = match serde_json::from_value::<RawSuggestion>(item) {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::debug!(position = i + 1, error = %e, "dropping unparseable suggestion");
                    return None;
                }
            };
            match validate(raw, i + 1, excluded) {
                Ok(s) => Some(s),
                Err(reason) => {
                    tracing::debug!(position = i + 1, reason = %reason, "dropping invalid suggestion");
                    None
                }
            }
        })
        .collect()
}

/// Generates suggestions and keeps the anti-repetition history current.
pub struct SuggestionEngine {
    llm: Arc<dyn CompletionClient>,
    history: Arc<dyn SuggestionHistoryStore>,
}

impl SuggestionEngine {
    #[must_use]
    pub fn new(llm: Arc<dyn CompletionClient>, history: Arc<dyn SuggestionHistoryStore>) -> Self {
        Self { llm, history }
    }

    /// Produce up to [`SUGGESTION_COUNT`] validated suggestions.
    ///
    /// No topics means no model call and an empty result. History read and
    /// write failures are logged and do not fail the call.
    ///
    /// # Errors
    ///
    /// Propagates the completion error or a malformed-response error.
    pub async fn generate(
        &self,
        ctx: &SuggestionContext<'_>,
    ) -> Result<Vec<Suggestion>, InsightsError> {
        if ctx.topic_summaries.is_empty() {
            return Ok(Vec::new());
        }

        let recent = self.history.recent_topics().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not read suggestion history");
            Vec::new()
        });
        let pool = candidate_pool(ctx.topic_summaries, &recent);
        let excluded: HashSet<String> = if pool.fell_back {
            HashSet::new()
        } else {
            recent.iter().map(|t| normalize_topic(t)).collect()
        };

        let prompt = build_prompt(ctx, &pool);
        let value = complete_json(self.llm.as_ref(), &prompt, SUGGESTION_TEMPERATURE).await?;
        let mut suggestions = parse_suggestions(value, &excluded);
        suggestions.truncate(SUGGESTION_COUNT);

        if !suggestions.is_empty() {
            let topics: Vec<String> = suggestions.iter().map(|s| s.topic.clone()).collect();
            match self.history.record_topics(&topics) {
                Ok(()) => tracing::info!(
                    count = topics.len(),
                    "added suggestion topics to exclusion history"
                ),
                Err(e) => tracing::warn!(error = %e, "could not update suggestion history"),
            }
        }

        tracing::info!(
            brand = ctx.brand_handle,
            count = suggestions.len(),
            "suggestions generated"
        );
        Ok(suggestions)
    }
}

#[cfg(test)]
#[path = "suggestions_test.rs"]
mod tests;
