//! Similarity scoring between text spans
//!
//! Three measures are exposed:
//! - **Jaccard**: intersection over union of two sets
//! - **Similarity**: 0.4 x word Jaccard + 0.6 x bigram Jaccard
//! - **Coverage**: share of one span's vocabulary found in the other
//!
//! `approx_equal` combines them into the equality predicate used by the
//! sentence-level differ. It is an OR of three independent checks:
//!
//! 1. identical flattened normal forms
//! 2. mutual containment (both coverage directions reach the containment
//!    threshold, so "template sentence + appended clause" is not equal)
//! 3. blended similarity reaching the similarity threshold

use crate::normalize::{normalize_flat, token_bigrams, tokens, word_runs};
use crate::types::EngineConfig;
use std::collections::HashSet;
use std::hash::Hash;

const WORD_WEIGHT: f64 = 0.4;
const BIGRAM_WEIGHT: f64 = 0.6;

/// Intersection size over union size; 1.0 when both sets are empty
pub fn jaccard<T: Eq + Hash>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        1.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Pre-computed comparison view of a text span
///
/// The differ evaluates the equality predicate O(n x m) times, so spans are
/// normalized and tokenized once up front.
#[derive(Debug, Clone)]
pub struct TextProfile {
    flat: String,
    words: HashSet<String>,
    bigrams: HashSet<String>,
}

impl TextProfile {
    pub fn new(text: &str) -> Self {
        let flat = normalize_flat(text);
        let toks = word_runs(&flat);
        let bigrams = token_bigrams(&toks).into_iter().collect();
        Self {
            flat,
            words: toks.into_iter().collect(),
            bigrams,
        }
    }

    /// Flattened normal form
    pub fn flat(&self) -> &str {
        &self.flat
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Blended word/bigram Jaccard against another profile
    pub fn similarity(&self, other: &TextProfile) -> f64 {
        if self.words.is_empty() && other.words.is_empty() {
            return 1.0;
        }
        WORD_WEIGHT * jaccard(&self.words, &other.words)
            + BIGRAM_WEIGHT * jaccard(&self.bigrams, &other.bigrams)
    }

    /// Coverage of `self` by `other` and of `other` by `self`
    pub fn coverage_both_ways(&self, other: &TextProfile) -> (f64, f64) {
        match (self.words.is_empty(), other.words.is_empty()) {
            (true, true) => (1.0, 1.0),
            (true, false) | (false, true) => (0.0, 0.0),
            (false, false) => {
                let intersection = self.words.intersection(&other.words).count() as f64;
                (
                    intersection / self.words.len() as f64,
                    intersection / other.words.len() as f64,
                )
            }
        }
    }

    /// Larger of the two coverage directions
    pub fn coverage(&self, other: &TextProfile) -> f64 {
        let (forward, backward) = self.coverage_both_ways(other);
        forward.max(backward)
    }

    /// Approximate equality under the configured thresholds
    pub fn approx_equal(&self, other: &TextProfile, config: &EngineConfig) -> bool {
        if self.flat == other.flat {
            return true;
        }
        let (forward, backward) = self.coverage_both_ways(other);
        if forward >= config.containment_threshold && backward >= config.containment_threshold {
            return true;
        }
        self.similarity(other) >= config.similarity_threshold
    }
}

/// Blended word/bigram Jaccard similarity of two spans
pub fn similarity(a: &str, b: &str) -> f64 {
    let (ta, tb) = (tokens(a), tokens(b));
    if ta.is_empty() && tb.is_empty() {
        return 1.0;
    }
    let words_a: HashSet<&String> = ta.iter().collect();
    let words_b: HashSet<&String> = tb.iter().collect();
    let bigrams_a: HashSet<String> = token_bigrams(&ta).into_iter().collect();
    let bigrams_b: HashSet<String> = token_bigrams(&tb).into_iter().collect();
    WORD_WEIGHT * jaccard(&words_a, &words_b) + BIGRAM_WEIGHT * jaccard(&bigrams_a, &bigrams_b)
}

/// Directional containment: `max(I/|A|, I/|B|)`
///
/// 1.0 when both spans have no tokens, 0.0 when exactly one has none.
pub fn coverage(a: &str, b: &str) -> f64 {
    TextProfile::new(a).coverage(&TextProfile::new(b))
}

/// Both containment directions: `(I/|A|, I/|B|)`
pub fn coverage_both_ways(a: &str, b: &str) -> (f64, f64) {
    TextProfile::new(a).coverage_both_ways(&TextProfile::new(b))
}

/// Approximate equality of two spans (see module docs)
pub fn approx_equal(a: &str, b: &str, config: &EngineConfig) -> bool {
    TextProfile::new(a).approx_equal(&TextProfile::new(b), config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jaccard_empty_sets() {
        let empty: HashSet<&str> = HashSet::new();
        assert_eq!(jaccard(&empty, &empty), 1.0);
        let one: HashSet<&str> = ["a"].into_iter().collect();
        assert_eq!(jaccard(&one, &empty), 0.0);
        let two: HashSet<&str> = ["a", "b"].into_iter().collect();
        assert_eq!(jaccard(&one, &two), 0.5);
    }

    #[test]
    fn test_self_similarity() {
        for s in ["El hígado es normal.", "uno", "Riñón derecho de 10 cm, sin litiasis."] {
            assert_eq!(similarity(s, s), 1.0);
            assert_eq!(coverage(s, s), 1.0);
        }
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(coverage("", " ... "), 1.0);
    }

    #[test]
    fn test_disjoint_and_one_sided_empty() {
        assert_eq!(similarity("bazo normal", "vesicula distendida"), 0.0);
        assert_eq!(coverage("", "algo"), 0.0);
        assert_eq!(coverage_both_ways("algo", ""), (0.0, 0.0));
    }

    #[test]
    fn test_similarity_ignores_case_and_accents() {
        assert_eq!(similarity("HÍGADO NORMAL", "higado normal"), 1.0);
    }

    #[test]
    fn test_coverage_directions() {
        let (forward, backward) = coverage_both_ways("a b", "a b c d");
        assert_eq!(forward, 1.0);
        assert_eq!(backward, 0.5);
        assert_eq!(coverage("a b", "a b c d"), 1.0);
    }

    #[test]
    fn test_approx_equal_is_reflexive() {
        let config = EngineConfig::default();
        for s in ["", "   ", "Texto.", "El bazo mide 11 cm."] {
            assert!(approx_equal(s, s, &config));
        }
    }

    #[test]
    fn test_approx_equal_accepts_formatting_changes() {
        let config = EngineConfig::default();
        assert!(approx_equal(
            "Vesícula biliar sin cálculos.",
            "VESICULA  biliar sin calculos .",
            &config
        ));
    }

    #[test]
    fn test_appended_clause_is_not_equal() {
        let config = EngineConfig::default();
        let template = "El páncreas es de aspecto normal.";
        let report = "El páncreas es de aspecto normal con quiste pequeño.";
        let (forward, backward) = coverage_both_ways(template, report);
        // one-sided containment is total ...
        assert_eq!(forward, 1.0);
        // ... but the other direction falls below the threshold
        assert!(backward < 0.9);
        assert!(!approx_equal(template, report, &config));
    }

    #[test]
    fn test_small_wording_change_within_thresholds() {
        let config = EngineConfig::new(0.8, 0.9, 8).unwrap();
        let template = "No se observan adenopatías retroperitoneales ni líquido libre en la cavidad";
        let report = "No se observan adenopatías retroperitoneales ni líquido libre en cavidad";
        assert!(approx_equal(template, report, &config));
    }
}
