//! Collapses per-mention keywords into a handful of canonical topics.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::error::InsightsError;
use crate::llm::{complete_json, CompletionClient};
use crate::types::AnnotatedMention;

/// Keywords beyond this many (by frequency) are left unmapped.
pub const MAX_KEYWORDS: usize = 60;
/// Topic assigned to keywords the model did not map.
pub const FALLBACK_TOPIC: &str = "general chatter";

const CONSOLIDATION_TEMPERATURE: f32 = 0.0;

/// Count keyword occurrences across annotations and keep the `limit` most
/// frequent. Ties keep first-seen order.
#[must_use]
pub fn top_keywords(annotations: &[AnnotatedMention], limit: usize) -> Vec<String> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for topic in annotations.iter().flat_map(|a| a.topics.iter()) {
        let key = normalize(topic);
        if key.is_empty() {
            continue;
        }
        if let Some(&i) = index.get(&key) {
            counts[i].1 += 1;
        } else {
            index.insert(key.clone(), counts.len());
            counts.push((key, 1));
        }
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.into_iter().take(limit).map(|(k, _)| k).collect()
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

fn identity_mapping(keywords: &[String]) -> HashMap<String, String> {
    keywords
        .iter()
        .map(|k| (normalize(k), normalize(k)))
        .collect()
}

fn build_prompt(keywords: &[String]) -> String {
    format!(
        "You group social media keywords into topics.\n\
         Keywords: {}\n\n\
         Merge these keywords into 5 to 8 canonical topics (short, lowercase, 1-3 words).\n\
         Every keyword must map to exactly one topic.\n\
         Return ONLY a flat JSON object mapping each keyword to its topic, for example:\n\
         {{\"shipping\": \"delivery\", \"late\": \"delivery\", \"colorway\": \"design\"}}",
        keywords.join(", ")
    )
}

/// Read a `{keyword: topic}` object, optionally wrapped as `{"mapping": {...}}`.
/// Non-string values and blank keys or topics are dropped.
fn mapping_from_value(value: &Value) -> HashMap<String, String> {
    let object = match value.get("mapping") {
        Some(Value::Object(inner)) => inner,
        _ => match value {
            Value::Object(outer) => outer,
            _ => return HashMap::new(),
        },
    };

    object
        .iter()
        .filter_map(|(k, v)| {
            let topic = normalize(v.as_str()?);
            let keyword = normalize(k);
            (!keyword.is_empty() && !topic.is_empty()).then_some((keyword, topic))
        })
        .collect()
}

/// Ask the model for a mapping. `None` means the caller should fall back to
/// identity: the call failed, the output did not parse, or it mapped nothing.
async fn request_mapping(
    llm: &dyn CompletionClient,
    keywords: &[String],
) -> Result<Option<HashMap<String, String>>, InsightsError> {
    let prompt = build_prompt(keywords);
    match complete_json(llm, &prompt, CONSOLIDATION_TEMPERATURE).await {
        Ok(value) => {
            let mapping = mapping_from_value(&value);
            if mapping.is_empty() {
                tracing::warn!(
                    keywords = keywords.len(),
                    "topic consolidation returned no mapping, using identity"
                );
                Ok(None)
            } else {
                tracing::debug!(
                    keywords = keywords.len(),
                    mapped = mapping.len(),
                    "topics consolidated"
                );
                Ok(Some(mapping))
            }
        }
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            tracing::warn!(error = %e, "topic consolidation failed, using identity");
            Ok(None)
        }
    }
}

/// Ask the model to map `keywords` onto canonical topics.
///
/// An empty input returns an empty map without calling the model. Model or
/// parse failures (or an empty mapping) fall back to mapping every keyword
/// to itself.
///
/// # Errors
///
/// Only fatal errors ([`InsightsError::is_fatal`]) are returned.
pub async fn consolidate_topics(
    llm: &dyn CompletionClient,
    keywords: &[String],
) -> Result<HashMap<String, String>, InsightsError> {
    if keywords.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(request_mapping(llm, keywords)
        .await?
        .unwrap_or_else(|| identity_mapping(keywords)))
}

/// Rewrite each annotation's topics through `mapping`.
///
/// Unmapped keywords become [`FALLBACK_TOPIC`]. The result is deduplicated
/// and never empty.
#[must_use]
pub fn apply_mapping(
    annotations: Vec<AnnotatedMention>,
    mapping: &HashMap<String, String>,
) -> Vec<AnnotatedMention> {
    annotations
        .into_iter()
        .map(|mut annotation| {
            let mut seen = HashSet::new();
            let mut topics: Vec<String> = annotation
                .topics
                .iter()
                .map(|t| {
                    mapping
                        .get(&normalize(t))
                        .cloned()
                        .unwrap_or_else(|| FALLBACK_TOPIC.to_owned())
                })
                .filter(|t| seen.insert(t.clone()))
                .collect();
            if topics.is_empty() {
                topics.push(FALLBACK_TOPIC.to_owned());
            }
            annotation.topics = topics;
            annotation
        })
        .collect()
}

/// Consolidate freshly annotated mentions in one step.
///
/// Only the [`MAX_KEYWORDS`] most frequent keywords are sent to the model.
/// When the model gives no usable mapping, every keyword in the batch keeps
/// its own topic, including the ones that were not sent.
///
/// # Errors
///
/// Only fatal errors ([`InsightsError::is_fatal`]) are returned.
pub async fn consolidate_annotations(
    llm: &dyn CompletionClient,
    annotations: Vec<AnnotatedMention>,
) -> Result<Vec<AnnotatedMention>, InsightsError> {
    if annotations.is_empty() {
        return Ok(annotations);
    }
    let keywords = top_keywords(&annotations, MAX_KEYWORDS);
    let mapping = match request_mapping(llm, &keywords).await? {
        Some(mapping) => mapping,
        None => identity_mapping(&top_keywords(&annotations, usize::MAX)),
    };
    Ok(apply_mapping(annotations, &mapping))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;
    use crate::types::{Intensity, Sentiment};

    enum Reply {
        Text(&'static str),
        Empty,
        NoKey,
    }

    struct Scripted {
        reply: Reply,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(reply: Reply) -> Self {
            Self {
                reply,
                calls: AtomicUsize::new(0),
            }
        }

        fn ok(reply: &'static str) -> Self {
            Self::new(Reply::Text(reply))
        }

        fn failing() -> Self {
            Self::new(Reply::Empty)
        }
    }

    #[async_trait]
    impl CompletionClient for Scripted {
        async fn complete(&self, _: &str, _: bool, _: f32) -> Result<String, InsightsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Reply::Text(text) => Ok(text.to_owned()),
                Reply::Empty => Err(InsightsError::EmptyResponse("scripted".to_owned())),
                Reply::NoKey => Err(InsightsError::MissingCredential("XAI_API_KEY".to_owned())),
            }
        }
    }

    fn annotation(id: &str, topics: &[&str]) -> AnnotatedMention {
        AnnotatedMention {
            mention_id: id.to_owned(),
            sentiment: Sentiment::Neutral,
            sentiment_score: 0.5,
            topics: topics.iter().map(|t| (*t).to_owned()).collect(),
            key_phrase: None,
            is_sarcasm: false,
            intensity: Intensity::Low,
            analyzed_at: Utc::now(),
        }
    }

    #[test]
    fn top_keywords_orders_by_frequency_then_first_seen() {
        let anns = vec![
            annotation("1", &["price", "shipping"]),
            annotation("2", &["Shipping", "battery"]),
            annotation("3", &["battery"]),
        ];
        assert_eq!(top_keywords(&anns, 60), vec!["shipping", "battery", "price"]);
        assert_eq!(top_keywords(&anns, 1), vec!["shipping"]);
    }

    #[tokio::test]
    async fn empty_input_makes_no_call() {
        let llm = Scripted::ok("{}");
        let mapping = consolidate_topics(&llm, &[]).await.unwrap();
        assert!(mapping.is_empty());
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failure_falls_back_to_identity() {
        let llm = Scripted::failing();
        let keywords = vec!["shipping".to_owned(), "price".to_owned()];
        let mapping = consolidate_topics(&llm, &keywords).await.unwrap();
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping["shipping"], "shipping");
        assert_eq!(mapping["price"], "price");
    }

    #[tokio::test]
    async fn empty_mapping_falls_back_to_identity() {
        let llm = Scripted::ok("{}");
        let mapping = consolidate_topics(&llm, &["shipping".to_owned()]).await.unwrap();
        assert_eq!(mapping["shipping"], "shipping");
    }

    #[tokio::test]
    async fn accepts_wrapped_and_fenced_mapping() {
        let llm = Scripted::ok("```json\n{\"mapping\": {\"Shipping\": \" Delivery \", \"late\": 3}}\n```");
        let mapping = consolidate_topics(&llm, &["shipping".to_owned()]).await.unwrap();
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping["shipping"], "delivery");
    }

    #[test]
    fn apply_mapping_rewrites_and_deduplicates() {
        let mapping: HashMap<String, String> = [
            ("shipping".to_owned(), "delivery".to_owned()),
            ("late".to_owned(), "delivery".to_owned()),
        ]
        .into_iter()
        .collect();
        let out = apply_mapping(
            vec![
                annotation("1", &["shipping", "late"]),
                annotation("2", &["zipper"]),
                annotation("3", &[]),
            ],
            &mapping,
        );
        assert_eq!(out[0].topics, vec!["delivery"]);
        assert_eq!(out[1].topics, vec![FALLBACK_TOPIC]);
        assert_eq!(out[2].topics, vec![FALLBACK_TOPIC]);
    }

    #[tokio::test]
    async fn consolidate_annotations_skips_call_for_empty_batch() {
        let llm = Scripted::ok("{}");
        let out = consolidate_annotations(&llm, Vec::new()).await.unwrap();
        assert!(out.is_empty());
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_call_keeps_every_keyword_beyond_the_prompt_limit() {
        let llm = Scripted::failing();
        let names: Vec<String> = (0..MAX_KEYWORDS + 10)
            .map(|i| format!("keyword{i:03}"))
            .collect();
        let anns: Vec<AnnotatedMention> = names
            .iter()
            .enumerate()
            .map(|(i, name)| annotation(&i.to_string(), &[name.as_str()]))
            .collect();

        let out = consolidate_annotations(&llm, anns).await.unwrap();

        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
        assert_eq!(out.len(), names.len());
        for (annotation, name) in out.iter().zip(&names) {
            assert_eq!(&annotation.topics, &vec![name.clone()]);
        }
    }

    #[tokio::test]
    async fn successful_mapping_still_buckets_unsent_keywords() {
        let llm = Scripted::ok(r#"{"keyword000": "first"}"#);
        let anns: Vec<AnnotatedMention> = (0..=MAX_KEYWORDS)
            .map(|i| annotation(&i.to_string(), &[format!("keyword{i:03}").as_str()]))
            .collect();

        let out = consolidate_annotations(&llm, anns).await.unwrap();

        assert_eq!(out[0].topics, vec!["first"]);
        assert_eq!(out[MAX_KEYWORDS].topics, vec![FALLBACK_TOPIC]);
    }

    #[tokio::test]
    async fn missing_credential_is_returned_not_swallowed() {
        let llm = Scripted::new(Reply::NoKey);
        let err = consolidate_annotations(&llm, vec![annotation("1", &["shipping"])])
            .await
            .unwrap_err();
        assert!(err.is_fatal());

        let err = consolidate_topics(&llm, &["shipping".to_owned()])
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }
}
