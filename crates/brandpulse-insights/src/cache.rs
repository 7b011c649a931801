//! In-process store of annotations keyed by mention id.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{Duration, Utc};

use crate::types::AnnotatedMention;

/// Default time-to-live of a cached annotation.
pub const DEFAULT_TTL_SECS: u64 = 3 * 60 * 60;

/// Storage for annotations already computed in earlier runs.
///
/// Entries are insert-only: storing an id that is already present keeps
/// the existing annotation. Entries leave only through eviction.
pub trait AnnotationStore: Send + Sync {
    /// Ids from `ids` with no stored annotation, in input order.
    fn get_unanalyzed(&self, ids: &[String]) -> Vec<String>;

    fn store_batch(&self, annotations: Vec<AnnotatedMention>);

    fn get(&self, id: &str) -> Option<AnnotatedMention>;

    /// Drop entries analysed more than `max_age` ago; returns how many went.
    fn evict_older_than(&self, max_age: Duration) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// [`AnnotationStore`] backed by a mutex-guarded `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryAnnotationCache {
    entries: Mutex<HashMap<String, AnnotatedMention>>,
}

impl MemoryAnnotationCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, AnnotatedMention>> {
        // A panic while holding the lock cannot leave a half-written entry,
        // so a poisoned map is still consistent.
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl AnnotationStore for MemoryAnnotationCache {
    fn get_unanalyzed(&self, ids: &[String]) -> Vec<String> {
        let entries = self.lock();
        ids.iter()
            .filter(|id| !entries.contains_key(id.as_str()))
            .cloned()
            .collect()
    }

    fn store_batch(&self, annotations: Vec<AnnotatedMention>) {
        let mut entries = self.lock();
        for annotation in annotations {
            entries
                .entry(annotation.mention_id.clone())
                .or_insert(annotation);
        }
    }

    fn get(&self, id: &str) -> Option<AnnotatedMention> {
        self.lock().get(id).cloned()
    }

    fn evict_older_than(&self, max_age: Duration) -> usize {
        let Some(cutoff) = Utc::now().checked_sub_signed(max_age) else {
            return 0;
        };
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, a| a.analyzed_at >= cutoff);
        before - entries.len()
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::types::{Intensity, Sentiment};

    fn annotation(id: &str, age_secs: i64, sentiment: Sentiment) -> AnnotatedMention {
        AnnotatedMention {
            mention_id: id.to_owned(),
            sentiment,
            sentiment_score: 0.5,
            topics: vec!["general".to_owned()],
            key_phrase: None,
            is_sarcasm: false,
            intensity: Intensity::Low,
            analyzed_at: Utc::now() - Duration::seconds(age_secs),
        }
    }

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn unanalyzed_preserves_input_order() {
        let cache = MemoryAnnotationCache::new();
        cache.store_batch(vec![annotation("b", 0, Sentiment::Neutral)]);
        assert_eq!(cache.get_unanalyzed(&ids(&["c", "b", "a"])), ids(&["c", "a"]));
    }

    #[test]
    fn store_never_overwrites() {
        let cache = MemoryAnnotationCache::new();
        cache.store_batch(vec![annotation("1", 0, Sentiment::Positive)]);
        cache.store_batch(vec![annotation("1", 0, Sentiment::Negative)]);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("1").unwrap().sentiment, Sentiment::Positive);
    }

    #[test]
    fn eviction_removes_only_stale_entries() {
        let cache = MemoryAnnotationCache::new();
        cache.store_batch(vec![
            annotation("old", 4 * 3600, Sentiment::Neutral),
            annotation("fresh", 60, Sentiment::Neutral),
        ]);
        let evicted = cache.evict_older_than(Duration::hours(3));
        assert_eq!(evicted, 1);
        assert!(cache.get("old").is_none());
        assert!(cache.get("fresh").is_some());
    }

    #[test]
    fn evicted_ids_become_unanalyzed_again() {
        let cache = MemoryAnnotationCache::new();
        cache.store_batch(vec![annotation("1", 10, Sentiment::Neutral)]);
        assert!(cache.get_unanalyzed(&ids(&["1"])).is_empty());
        cache.evict_older_than(Duration::zero());
        assert_eq!(cache.get_unanalyzed(&ids(&["1"])), ids(&["1"]));
        assert!(cache.is_empty());
    }

    #[test]
    fn shared_cache_is_safe_across_threads() {
        let cache = Arc::new(MemoryAnnotationCache::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        cache.store_batch(vec![annotation(
                            &format!("{}", (t * 50 + i) % 100),
                            0,
                            Sentiment::Neutral,
                        )]);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cache.len(), 100);
    }
}
