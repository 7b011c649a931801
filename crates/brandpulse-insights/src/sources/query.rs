//! Search query construction for the X recent-search endpoint.

use brandpulse_core::BrandConfig;

/// One search rule, tagged by the signal it is meant to catch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRule {
    pub tag: &'static str,
    pub value: String,
}

const POSITIVE_TERMS: &[&str] = &["love", "amazing", "awesome", "great", "recommend"];
const NEGATIVE_TERMS: &[&str] = &["sucks", "broken", "refund", "issue", "terrible", "hate"];
const COMPARISON_TERMS: &[&str] = &["vs", "\"better than\"", "\"worse than\""];

/// Quote multi-word names so the search treats them as a phrase.
fn term(name: &str) -> String {
    let name = name.trim();
    if name.contains(char::is_whitespace) {
        format!("\"{name}\"")
    } else {
        name.to_owned()
    }
}

fn any_of(words: &[&str]) -> String {
    format!("({})", words.join(" OR "))
}

/// Direct, positive, negative, hashtag, and comparison rules for `brand`.
#[must_use]
pub fn brand_rules(brand: &BrandConfig) -> Vec<QueryRule> {
    let name = term(&brand.name);
    let handle = brand.search_handle();
    let hashtag: String = brand
        .name
        .split_whitespace()
        .collect::<String>()
        .to_lowercase();

    vec![
        QueryRule {
            tag: "brand_direct",
            value: format!("{name} OR @{handle}"),
        },
        QueryRule {
            tag: "brand_positive",
            value: format!("{name} {}", any_of(POSITIVE_TERMS)),
        },
        QueryRule {
            tag: "brand_negative",
            value: format!("{name} {}", any_of(NEGATIVE_TERMS)),
        },
        QueryRule {
            tag: "brand_hashtag",
            value: format!("#{hashtag}"),
        },
        QueryRule {
            tag: "brand_comparison",
            value: format!("{name} {}", any_of(COMPARISON_TERMS)),
        },
    ]
}

/// All rules OR-ed together, retweets excluded, English only.
#[must_use]
pub fn mention_query(brand: &BrandConfig) -> String {
    let mut clauses: Vec<String> = brand_rules(brand)
        .into_iter()
        .map(|r| format!("({})", r.value))
        .collect();
    for alias in brand.aliases.iter().filter(|a| !a.trim().is_empty()) {
        clauses.push(term(alias));
    }
    format!("({}) -is:retweet lang:en", clauses.join(" OR "))
}

/// The brand's own original posts.
#[must_use]
pub fn brand_voice_query(brand: &BrandConfig) -> String {
    format!("from:{} -is:retweet lang:en", brand.search_handle())
}
