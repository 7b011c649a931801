//! Text cleanup and provisional keyword extraction for mention text.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@\w+").expect("valid mention regex"));
static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(https?://|www\.)\S+").expect("valid url regex"));

/// Common English function words plus the filler verbs that show up in
/// complaint-style posts ("took", "got", "still").
const STOPWORDS: &[&str] = &[
    "a", "about", "after", "again", "all", "also", "am", "an", "and", "any", "are", "as", "at",
    "be", "been", "before", "being", "but", "by", "can", "could", "did", "do", "does", "doing",
    "done", "for", "from", "get", "gets", "getting", "got", "had", "has", "have", "having", "he",
    "her", "here", "him", "his", "how", "i", "if", "in", "into", "is", "it", "its", "just", "like",
    "made", "make", "makes", "me", "more", "most", "much", "my", "new", "no", "not", "now", "of",
    "off", "on", "one", "only", "or", "our", "out", "over", "really", "same", "say", "says", "she",
    "should", "so", "some", "still", "such", "take", "takes", "than", "that", "the", "their",
    "them", "then", "there", "these", "they", "this", "those", "through", "to", "too", "took",
    "under", "until", "up", "very", "was", "way", "we", "were", "what", "when", "where", "which",
    "while", "who", "why", "will", "with", "would", "you", "your", "yours", "don't", "didn't",
    "doesn't", "isn't", "wasn't", "can't", "won't", "i'm", "it's", "that's", "you're", "they're",
    "we're", "i've", "ive", "dont", "didnt", "doesnt", "isnt", "cant", "wont", "im", "thats",
    "amp", "rt", "via", "lol", "omg", "yes", "yeah", "ever", "even", "every", "want", "need",
    "going", "gonna", "know", "think", "today", "day", "time", "well", "back", "thing", "things",
];

/// Remove @handles and URLs, then replace punctuation with spaces.
///
/// Apostrophes inside words are kept so contractions still match the
/// stopword list.
#[must_use]
pub fn clean_text(text: &str) -> String {
    let without_urls = URL_RE.replace_all(text, " ");
    let without_mentions = MENTION_RE.replace_all(&without_urls, " ");
    without_mentions
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '\'' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect()
}

/// Extract candidate topic keywords in order of first appearance.
///
/// Tokens are lowercased and stripped of digits. Stopwords, anything in
/// `blacklist`, and tokens of two characters or fewer are dropped. The
/// result has no duplicates.
#[must_use]
pub fn extract_keywords(text: &str, blacklist: &[String]) -> Vec<String> {
    let cleaned = clean_text(text);
    let blocked: HashSet<&str> = blacklist.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    let mut keywords = Vec::new();

    for raw in cleaned.split_whitespace() {
        let token: String = raw
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_ascii_digit())
            .collect();
        let token = token.trim_matches('\'');
        if token.chars().count() <= 2
            || STOPWORDS.contains(&token)
            || blocked.contains(token)
        {
            continue;
        }
        if seen.insert(token.to_owned()) {
            keywords.push(token.to_owned());
        }
    }
    keywords
}
