use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// One tracked brand from `brands.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandConfig {
    pub name: String,
    /// X handle without the leading `@`. Defaults to the brand name.
    #[serde(default)]
    pub handle: Option<String>,
    /// Alternate spellings; filtered out of keyword extraction.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Extra words that should never become topics for this brand.
    #[serde(default)]
    pub excluded_keywords: Vec<String>,
}

impl BrandConfig {
    /// Handle to search the brand's own timeline with, `@` stripped.
    #[must_use]
    pub fn search_handle(&self) -> String {
        self.handle
            .as_deref()
            .unwrap_or(&self.name)
            .trim()
            .trim_start_matches('@')
            .to_string()
    }

    /// Lowercased terms the keyword extractor must discard for this brand:
    /// the name, its individual words, the handle, aliases, and exclusions.
    #[must_use]
    pub fn blacklist_terms(&self) -> Vec<String> {
        let mut terms: Vec<String> = Vec::new();
        let mut push = |t: &str| {
            let t = t.trim().trim_start_matches('@').to_lowercase();
            if !t.is_empty() && !terms.contains(&t) {
                terms.push(t);
            }
        };

        push(&self.name);
        for word in self.name.split_whitespace() {
            push(word);
        }
        if let Some(handle) = &self.handle {
            push(handle);
        }
        for alias in &self.aliases {
            push(alias);
        }
        for kw in &self.excluded_keywords {
            push(kw);
        }
        terms
    }

    /// Build an ad-hoc config for a brand that is not in the registry.
    #[must_use]
    pub fn adhoc(name: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            handle: None,
            aliases: Vec::new(),
            excluded_keywords: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BrandsFile {
    pub brands: Vec<BrandConfig>,
}

impl BrandsFile {
    /// Case-insensitive lookup by name, handle, or alias.
    #[must_use]
    pub fn find(&self, query: &str) -> Option<&BrandConfig> {
        let q = query.trim().trim_start_matches('@').to_lowercase();
        self.brands.iter().find(|b| {
            b.name.to_lowercase() == q
                || b.handle
                    .as_deref()
                    .is_some_and(|h| h.trim_start_matches('@').to_lowercase() == q)
                || b.aliases.iter().any(|a| a.to_lowercase() == q)
        })
    }
}

/// Load and validate the brands configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_brands(path: &Path) -> Result<BrandsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::BrandsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_brands(&content)
}

fn parse_brands(content: &str) -> Result<BrandsFile, ConfigError> {
    let brands_file: BrandsFile =
        serde_yaml::from_str(content).map_err(ConfigError::BrandsFileParse)?;

    validate_brands(&brands_file)?;

    Ok(brands_file)
}

fn validate_brands(brands_file: &BrandsFile) -> Result<(), ConfigError> {
    let mut seen_names = HashSet::new();

    for brand in &brands_file.brands {
        if brand.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "brand name must be non-empty".to_string(),
            ));
        }

        if brand
            .handle
            .as_deref()
            .is_some_and(|h| h.trim().trim_start_matches('@').is_empty())
        {
            return Err(ConfigError::Validation(format!(
                "brand '{}' has an empty handle",
                brand.name
            )));
        }

        let lower_name = brand.name.trim().to_lowercase();
        if !seen_names.insert(lower_name) {
            return Err(ConfigError::Validation(format!(
                "duplicate brand name: '{}'",
                brand.name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "brands_test.rs"]
mod tests;
