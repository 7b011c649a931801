//! Short per-topic action plans.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde_json::Value;

use crate::error::InsightsError;
use crate::llm::{complete_json, CompletionClient};
use crate::types::{BrandPost, GeneralSentiment, Suggestion, TopicSummary};

const MAX_TOPICS: usize = 8;
const MAX_VOICE_SAMPLES: usize = 8;
const MAX_SUGGESTIONS: usize = 6;
const PLAYBOOK_TEMPERATURE: f32 = 0.0;

#[derive(Debug, Clone, Copy)]
pub struct PlaybookContext<'a> {
    pub brand_handle: &'a str,
    pub topic_summaries: &'a [TopicSummary],
    pub suggestions: &'a [Suggestion],
    pub general_sentiment: GeneralSentiment,
    pub voice_samples: &'a [BrandPost],
}

fn build_prompt(ctx: &PlaybookContext<'_>, topics: &[&TopicSummary]) -> String {
    let mut voice = String::new();
    for post in ctx.voice_samples.iter().take(MAX_VOICE_SAMPLES) {
        let _ = writeln!(voice, "- {}", post.text);
    }
    if voice.is_empty() {
        voice.push_str("- (no samples provided)\n");
    }

    let mut suggestions = String::new();
    for s in ctx.suggestions.iter().take(MAX_SUGGESTIONS) {
        let _ = writeln!(
            suggestions,
            "- {}: {} ({})",
            s.topic,
            s.title,
            s.priority.as_str()
        );
    }
    if suggestions.is_empty() {
        suggestions.push_str("- none yet\n");
    }

    let mut topic_lines = String::new();
    for t in topics {
        let _ = writeln!(
            topic_lines,
            "- {} | mentions:{} | positive:{}% | intensity-high:{}",
            t.topic, t.total, t.positive_pct, t.intensity_breakdown.high
        );
    }

    format!(
        "You are a lifecycle and social strategist for {handle}.\n\
         We have clustered public posts into topics and want a short playbook for each topic to improve favorability.\n\n\
         Overall sentiment: {score}/100 ({label})\n\n\
         Brand tone reference (recent posts):\n{voice}\n\
         Existing suggestions:\n{suggestions}\n\
         Topics (prioritize those at the top):\n{topic_lines}\n\
         For EACH topic above, write a focused 3-4 sentence action plan with:\n\
         - The opening move (acknowledge pain or amplify win)\n\
         - Creative angle and proof to show\n\
         - A targeting or retargeting hint\n\
         - CTA wording that fits the tone\n\n\
         Return ONLY JSON with this shape:\n\
         {{\"actionable_steps\": [{{\"topic\": \"topic name\", \"playbook\": \"3-4 sentences\"}}]}}",
        handle = ctx.brand_handle,
        score = ctx.general_sentiment.score,
        label = ctx.general_sentiment.label,
    )
}

/// Read `{"actionable_steps": [{topic, playbook}]}` (or a bare array of the
/// same items) into a topic-keyed map. Incomplete items are skipped.
#[must_use]
pub fn parse_playbooks(value: &Value) -> BTreeMap<String, String> {
    let items = value
        .get("actionable_steps")
        .and_then(Value::as_array)
        .or_else(|| value.as_array());

    items
        .into_iter()
        .flatten()
        .filter_map(|item| {
            let topic = item.get("topic")?.as_str()?.trim();
            let playbook = item.get("playbook")?.as_str()?.trim();
            (!topic.is_empty() && !playbook.is_empty())
                .then(|| (topic.to_owned(), playbook.to_owned()))
        })
        .collect()
}

/// Generate one playbook per top topic (by volume, at most eight).
///
/// # Errors
///
/// Propagates completion and malformed-response errors. No topics means no
/// model call and an empty map.
pub async fn generate_playbooks(
    llm: &dyn CompletionClient,
    ctx: &PlaybookContext<'_>,
) -> Result<BTreeMap<String, String>, InsightsError> {
    if ctx.topic_summaries.is_empty() {
        return Ok(BTreeMap::new());
    }

    let mut topics: Vec<&TopicSummary> = ctx.topic_summaries.iter().collect();
    topics.sort_by(|a, b| b.total.cmp(&a.total));
    topics.truncate(MAX_TOPICS);

    let prompt = build_prompt(ctx, &topics);
    let value = complete_json(llm, &prompt, PLAYBOOK_TEMPERATURE).await?;
    let playbooks = parse_playbooks(&value);
    tracing::debug!(count = playbooks.len(), "topic playbooks generated");
    Ok(playbooks)
}
