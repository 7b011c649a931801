//! Recently suggested topics, kept so consecutive runs don't repeat themselves.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::InsightsError;

/// Maximum number of topics remembered.
pub const HISTORY_LIMIT: usize = 20;

/// On-disk shape of the history file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionHistory {
    #[serde(default, alias = "recentTopics")]
    pub recent_topics: Vec<String>,
}

/// Persistence for [`SuggestionHistory`].
pub trait SuggestionHistoryStore: Send + Sync {
    /// Recent topics, newest first, already normalized.
    ///
    /// # Errors
    ///
    /// Implementations may fail on I/O; a missing or unreadable document is
    /// reported as empty rather than an error.
    fn recent_topics(&self) -> Result<Vec<String>, InsightsError>;

    /// Prepend `topics` to the history, keeping it bounded and unique.
    ///
    /// # Errors
    ///
    /// Returns [`InsightsError::HistoryIo`] if the history cannot be saved.
    fn record_topics(&self, topics: &[String]) -> Result<(), InsightsError>;

    /// Forget every remembered topic.
    ///
    /// # Errors
    ///
    /// Returns [`InsightsError::HistoryIo`] if the history cannot be saved.
    fn clear(&self) -> Result<(), InsightsError>;
}

#[must_use]
pub fn normalize_topic(topic: &str) -> String {
    topic.trim().to_lowercase()
}

/// New topics first (in their given order), then the existing ones;
/// normalized, blank entries dropped, deduplicated, capped at [`HISTORY_LIMIT`].
#[must_use]
pub fn merge_topics(new: &[String], existing: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    new.iter()
        .chain(existing)
        .map(|t| normalize_topic(t))
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .take(HISTORY_LIMIT)
        .collect()
}

/// History stored as a pretty-printed JSON document on disk.
#[derive(Debug)]
pub struct JsonFileHistoryStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    guard: Mutex<()>,
}

impl JsonFileHistoryStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> InsightsError {
        InsightsError::HistoryIo {
            path: self.path.display().to_string(),
            source,
        }
    }

    fn read(&self) -> Result<SuggestionHistory, InsightsError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(SuggestionHistory::default()),
            Err(e) => return Err(self.io_error(e)),
        };
        match serde_json::from_str::<SuggestionHistory>(&content) {
            Ok(history) => Ok(history),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "suggestion history is corrupt, treating as empty"
                );
                Ok(SuggestionHistory::default())
            }
        }
    }

    /// Write through a sibling temp file and rename so readers never see a
    /// partial document.
    fn write(&self, history: &SuggestionHistory) -> Result<(), InsightsError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let json = serde_json::to_string_pretty(history)
            .map_err(|e| self.io_error(std::io::Error::other(e)))?;
        let tmp = self
            .path
            .with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
        std::fs::write(&tmp, json).map_err(|e| self.io_error(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            self.io_error(e)
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.guard
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl SuggestionHistoryStore for JsonFileHistoryStore {
    fn recent_topics(&self) -> Result<Vec<String>, InsightsError> {
        let _guard = self.lock();
        let history = self.read()?;
        Ok(merge_topics(&[], &history.recent_topics))
    }

    fn record_topics(&self, topics: &[String]) -> Result<(), InsightsError> {
        let _guard = self.lock();
        let history = self.read()?;
        let updated = SuggestionHistory {
            recent_topics: merge_topics(topics, &history.recent_topics),
        };
        self.write(&updated)
    }

    fn clear(&self) -> Result<(), InsightsError> {
        let _guard = self.lock();
        self.write(&SuggestionHistory::default())
    }
}

/// History held in memory; used by tests and one-off runs.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    topics: Mutex<Vec<String>>,
}

impl MemoryHistoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_topics(topics: &[&str]) -> Self {
        let owned: Vec<String> = topics.iter().map(|t| (*t).to_owned()).collect();
        Self {
            topics: Mutex::new(merge_topics(&owned, &[])),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.topics
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl SuggestionHistoryStore for MemoryHistoryStore {
    fn recent_topics(&self) -> Result<Vec<String>, InsightsError> {
        Ok(self.lock().clone())
    }

    fn record_topics(&self, topics: &[String]) -> Result<(), InsightsError> {
        let mut current = self.lock();
        *current = merge_topics(topics, &current);
        Ok(())
    }

    fn clear(&self) -> Result<(), InsightsError> {
        self.lock().clear();
        Ok(())
    }
}

#[cfg(test)]
#[path = "history_test.rs"]
mod tests;
