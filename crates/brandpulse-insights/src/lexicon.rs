//! Rule-based polarity scorer for short social posts.
//!
//! Word valences sit on a `[-4.0, 4.0]` scale. A post's valences are summed
//! after applying booster, negation, contrast ("but") and emphasis rules, then
//! squashed into a compound score in `[-1.0, 1.0]` with `x / sqrt(x² + α)`.

use crate::error::InsightsError;

/// Normalization constant for the compound score.
const ALPHA: f64 = 15.0;

/// Added to a word's magnitude by a preceding booster (subtracted for dampeners).
const BOOSTER_INCREMENT: f64 = 0.293;

/// Extra magnitude for a sentiment word written in ALL CAPS amid mixed-case text.
const CAPS_INCREMENT: f64 = 0.733;

/// Multiplier applied to a word preceded by a negation.
const NEGATION_SCALAR: f64 = -0.74;

/// Per-exclamation-mark emphasis, at most four counted.
const EXCLAMATION_INCREMENT: f64 = 0.292;

/// Word valences. Keys are lowercase single words.
pub(crate) const LEXICON: &[(&str, f64)] = &[
    // Positive
    ("love", 3.2),
    ("loved", 2.9),
    ("loving", 2.9),
    ("loves", 2.7),
    ("lovely", 2.8),
    ("great", 3.1),
    ("greatest", 3.2),
    ("good", 1.9),
    ("better", 1.9),
    ("best", 3.2),
    ("excellent", 2.7),
    ("amazing", 2.8),
    ("awesome", 3.1),
    ("fantastic", 2.6),
    ("wonderful", 2.7),
    ("brilliant", 2.8),
    ("perfect", 2.7),
    ("beautiful", 2.9),
    ("gorgeous", 3.0),
    ("stunning", 2.6),
    ("nice", 1.8),
    ("cool", 1.3),
    ("fun", 2.3),
    ("happy", 2.7),
    ("glad", 2.0),
    ("pleased", 1.9),
    ("delighted", 2.8),
    ("excited", 1.4),
    ("impressed", 2.1),
    ("impressive", 2.3),
    ("favorite", 2.0),
    ("favourite", 2.0),
    ("recommend", 1.5),
    ("recommended", 1.6),
    ("thanks", 1.9),
    ("thank", 1.5),
    ("wow", 2.8),
    ("win", 2.8),
    ("winner", 2.8),
    ("enjoy", 2.2),
    ("enjoyed", 2.3),
    ("incredible", 2.6),
    ("outstanding", 3.0),
    ("superb", 3.1),
    ("solid", 1.2),
    ("reliable", 1.8),
    ("smooth", 1.7),
    ("helpful", 1.8),
    ("friendly", 2.2),
    ("quality", 1.4),
    ("worth", 0.9),
    ("easy", 1.9),
    ("comfortable", 1.5),
    ("safe", 1.9),
    ("fresh", 1.3),
    ("clean", 1.7),
    ("fast", 1.0),
    ("quick", 1.0),
    ("super", 2.9),
    ("yay", 2.4),
    ("congrats", 2.4),
    ("proud", 2.1),
    ("satisfied", 1.8),
    ("obsessed", 1.2),
    ("legit", 1.3),
    ("stellar", 2.8),
    ("flawless", 2.3),
    ("elegant", 2.1),
    ("sleek", 1.5),
    ("upgrade", 1.2),
    // Negative
    ("hate", -2.7),
    ("hated", -3.2),
    ("hates", -1.9),
    ("terrible", -2.1),
    ("horrible", -2.5),
    ("awful", -2.0),
    ("worst", -3.1),
    ("worse", -2.1),
    ("bad", -2.5),
    ("poor", -2.1),
    ("sucks", -1.5),
    ("suck", -1.9),
    ("trash", -1.7),
    ("garbage", -1.9),
    ("useless", -1.8),
    ("broken", -1.5),
    ("broke", -1.8),
    ("disappointed", -1.9),
    ("disappointing", -2.2),
    ("disappointment", -2.3),
    ("annoying", -1.8),
    ("annoyed", -1.6),
    ("angry", -2.3),
    ("furious", -2.7),
    ("frustrated", -2.0),
    ("frustrating", -1.9),
    ("upset", -1.6),
    ("sad", -2.1),
    ("ugly", -2.3),
    ("scam", -2.8),
    ("fraud", -2.8),
    ("ripoff", -2.4),
    ("overpriced", -1.7),
    ("expensive", -0.9),
    ("slow", -1.0),
    ("delayed", -1.2),
    ("delay", -1.0),
    ("delays", -1.1),
    ("late", -0.8),
    ("missing", -1.2),
    ("lost", -1.3),
    ("damaged", -1.9),
    ("defective", -1.9),
    ("faulty", -1.8),
    ("problem", -1.7),
    ("problems", -1.7),
    ("issue", -0.9),
    ("issues", -1.0),
    ("fail", -2.5),
    ("failed", -2.3),
    ("failure", -2.3),
    ("fails", -2.0),
    ("wrong", -2.1),
    ("refund", -1.0),
    ("cancel", -1.0),
    ("cancelled", -1.2),
    ("canceled", -1.2),
    ("complaint", -1.6),
    ("rude", -2.0),
    ("unacceptable", -2.0),
    ("ridiculous", -1.5),
    ("pathetic", -2.6),
    ("nightmare", -2.4),
    ("dangerous", -2.1),
    ("recall", -1.5),
    ("lawsuit", -1.8),
    ("banned", -1.5),
    ("waste", -1.8),
    ("wasted", -2.2),
    ("crash", -1.7),
    ("crashed", -1.8),
    ("bug", -0.9),
    ("buggy", -1.6),
    ("ugh", -1.8),
    ("meh", -0.5),
];

/// Multi-word expressions scored as a single unit, replacing word valences.
const IDIOMS: &[(&[&str], f64)] = &[
    (&["took", "forever"], -2.0),
    (&["takes", "forever"], -2.0),
    (&["taking", "forever"], -2.0),
    (&["waste", "of", "money"], -2.6),
    (&["waste", "of", "time"], -2.4),
    (&["never", "again"], -2.1),
    (&["still", "waiting"], -1.6),
    (&["no", "response"], -1.5),
    (&["not", "worth", "it"], -1.9),
    (&["worth", "every", "penny"], 2.6),
    (&["game", "changer"], 2.4),
    (&["highly", "recommend"], 2.4),
    (&["five", "stars"], 2.2),
    (&["love", "it"], 3.2),
];

const BOOSTERS: &[&str] = &[
    "absolutely",
    "amazingly",
    "completely",
    "deeply",
    "especially",
    "extremely",
    "hugely",
    "incredibly",
    "insanely",
    "particularly",
    "really",
    "so",
    "such",
    "seriously",
    "too",
    "totally",
    "truly",
    "utterly",
    "very",
    "most",
    "mega",
];

const DAMPENERS: &[&str] = &[
    "almost",
    "barely",
    "hardly",
    "kinda",
    "marginally",
    "partly",
    "slightly",
    "somewhat",
    "sorta",
];

const NEGATIONS: &[&str] = &[
    "not", "no", "never", "none", "nobody", "nothing", "neither", "nor", "cannot", "cant",
    "can't", "dont", "don't", "doesnt", "doesn't", "didnt", "didn't", "isnt", "isn't", "wasnt",
    "wasn't", "arent", "aren't", "wont", "won't", "wouldnt", "wouldn't", "shouldnt",
    "shouldn't", "couldnt", "couldn't", "hasnt", "hasn't", "havent", "haven't", "hadnt",
    "hadn't", "aint", "ain't", "without",
];

/// Produces a compound polarity in `[-1.0, 1.0]` for a piece of text.
///
/// Implementations must be deterministic for the same text.
pub trait PolarityScorer: Send + Sync {
    /// # Errors
    ///
    /// Returns [`InsightsError::Scoring`] when the text cannot be scored.
    fn polarity(&self, text: &str) -> Result<f64, InsightsError>;
}

/// The built-in lexicon scorer.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexiconScorer;

impl PolarityScorer for LexiconScorer {
    fn polarity(&self, text: &str) -> Result<f64, InsightsError> {
        Ok(compound_score(text))
    }
}

fn valence(word: &str) -> Option<f64> {
    LEXICON
        .iter()
        .find(|(w, _)| *w == word)
        .map(|&(_, v)| v)
}

fn is_negation(word: &str) -> bool {
    NEGATIONS.contains(&word) || word.ends_with("n't")
}

fn booster_scalar(word: &str) -> f64 {
    if BOOSTERS.contains(&word) {
        BOOSTER_INCREMENT
    } else if DAMPENERS.contains(&word) {
        -BOOSTER_INCREMENT
    } else {
        0.0
    }
}

fn is_shouting(raw: &str) -> bool {
    raw.chars().filter(|c| c.is_alphabetic()).count() > 1
        && raw.chars().all(|c| !c.is_alphabetic() || c.is_uppercase())
}

/// Split into `(raw, lowercase)` word pairs, trimming surrounding punctuation
/// but keeping inner apostrophes (`don't`).
fn tokenize(text: &str) -> Vec<(String, String)> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '\''))
        .map(|w| w.trim_matches('\''))
        .filter(|w| !w.is_empty())
        .map(|w| (w.to_string(), w.to_lowercase()))
        .collect()
}

/// Score `text` into a compound polarity in `[-1.0, 1.0]`.
///
/// Returns `0.0` for empty text or text with no sentiment-bearing words.
#[must_use]
pub fn compound_score(text: &str) -> f64 {
    let tokens = tokenize(text);
    if tokens.is_empty() {
        return 0.0;
    }

    let lower: Vec<&str> = tokens.iter().map(|(_, l)| l.as_str()).collect();
    let mixed_case = tokens.iter().any(|(raw, _)| !is_shouting(raw));

    let mut sentiments = vec![0.0_f64; tokens.len()];
    let mut i = 0;
    while i < tokens.len() {
        let (span, mut v) = if let Some(idiom) = match_idiom(&lower[i..]) {
            idiom
        } else if let Some(v) = valence(lower[i]) {
            if mixed_case && is_shouting(&tokens[i].0) {
                (1, v + CAPS_INCREMENT.copysign(v))
            } else {
                (1, v)
            }
        } else {
            i += 1;
            continue;
        };

        // Boosters within three words, decaying with distance.
        for (distance, decay) in [(1usize, 1.0), (2, 0.95), (3, 0.9)] {
            if i >= distance {
                let scalar = booster_scalar(lower[i - distance]) * decay;
                if scalar != 0.0 {
                    v += scalar.copysign(v);
                }
            }
        }

        if (1..=3).any(|d| i >= d && is_negation(lower[i - d])) {
            v *= NEGATION_SCALAR;
        }

        sentiments[i] = v;
        i += span;
    }

    // Contrast: clause before "but" is softened, clause after is stressed.
    if let Some(but_idx) = lower.iter().position(|w| *w == "but") {
        for (idx, s) in sentiments.iter_mut().enumerate() {
            if idx < but_idx {
                *s *= 0.5;
            } else if idx > but_idx {
                *s *= 1.5;
            }
        }
    }

    let mut sum: f64 = sentiments.iter().sum();
    if sum != 0.0 {
        let bangs = text.chars().filter(|c| *c == '!').count().min(4);
        #[allow(clippy::cast_precision_loss)]
        let emphasis = bangs as f64 * EXCLAMATION_INCREMENT;
        sum += emphasis.copysign(sum);
    }

    normalize(sum)
}

fn match_idiom(words: &[&str]) -> Option<(usize, f64)> {
    IDIOMS
        .iter()
        .filter(|(phrase, _)| words.len() >= phrase.len())
        .find(|(phrase, _)| words.iter().zip(phrase.iter()).all(|(w, p)| w == p))
        .map(|(phrase, v)| (phrase.len(), *v))
}

fn normalize(sum: f64) -> f64 {
    if sum == 0.0 {
        return 0.0;
    }
    (sum / (sum * sum + ALPHA).sqrt()).clamp(-1.0, 1.0)
}
