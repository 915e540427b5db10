//! Text normalization and tokenization
//!
//! Comparison never looks at raw text. Both documents go through the same
//! canonicalization pipeline first:
//!
//! 1. **Compose**: Unicode NFKC
//! 2. **Strip diacritics**: Latin-1 Supplement to Latin Extended-B letters are
//!    decomposed and their combining marks dropped (`í` -> `i`)
//! 3. **Lowercase**
//! 4. **Whitespace**: horizontal runs collapse to one space, padding around
//!    newlines is removed
//! 5. **Punctuation**: a space is inserted after `,.;:!?…` when a
//!    non-space character follows directly
//! 6. **Collapse and trim**: remaining whitespace runs become one space
//!
//! Tokens are maximal runs of letters/digits taken from the normalized text.
//! Punctuation never reaches the token stream, it only affects comparisons of
//! normalized text.

use regex::Regex;
use std::ops::RangeInclusive;
use std::sync::LazyLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Characters whose diacritics are stripped
const DIACRITIC_RANGE: RangeInclusive<char> = '\u{00C0}'..='\u{024F}';

/// Sentence and clause punctuation that must be followed by a space
const CLAUSE_PUNCTUATION: [char; 7] = [',', '.', ';', ':', '!', '?', '…'];

static HORIZONTAL_WS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\r]+").expect("valid horizontal whitespace pattern"));
static NEWLINE_PADDING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]*\n[ \t]*").expect("valid newline padding pattern"));
static NON_NEWLINE_WS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\S\r\n]+").expect("valid inline whitespace pattern"));
static ANY_WS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));
static NEWLINE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n+").expect("valid newline pattern"));
static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{N}]+").expect("valid word pattern"));
static EDIT_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\p{L}\p{N}]+|[^\s\p{L}\p{N}]+|\s+").expect("valid edit token pattern")
});

/// Canonicalize text for comparison
pub fn normalize_for_compare(text: &str) -> String {
    let composed: String = text.nfkc().collect();
    let lowered = strip_diacritics(&composed).to_lowercase();

    let s = HORIZONTAL_WS.replace_all(&lowered, " ");
    let s = NEWLINE_PADDING.replace_all(&s, "\n");
    let s = NON_NEWLINE_WS.replace_all(&s, " ");
    let s = space_after_punctuation(&s);
    let s = ANY_WS.replace_all(&s, " ");

    s.trim().to_string()
}

/// Canonicalize text and flatten line structure into single spaces
///
/// Used wherever paragraph boundaries are irrelevant, e.g. when a whole
/// paragraph is compared against another as one span.
pub fn normalize_flat(text: &str) -> String {
    let normalized = normalize_for_compare(text);
    NEWLINE_RUN.replace_all(&normalized, " ").into_owned()
}

/// Content tokens (letter/digit runs) of the normalized text
pub fn tokens(text: &str) -> Vec<String> {
    word_runs(&normalize_for_compare(text))
}

/// Letter/digit runs of text that is already normalized
pub fn word_runs(normalized: &str) -> Vec<String> {
    WORD.find_iter(normalized)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Adjacent token pairs joined by a single space
pub fn token_bigrams(tokens: &[String]) -> Vec<String> {
    tokens
        .windows(2)
        .map(|pair| format!("{} {}", pair[0], pair[1]))
        .collect()
}

/// Tokens for the live editor diff
///
/// Runs of letters/digits, runs of other non-whitespace characters and runs
/// of whitespace, taken from the raw text. Concatenating them reproduces the
/// input exactly.
pub fn edit_tokens(text: &str) -> Vec<&str> {
    EDIT_TOKEN.find_iter(text).map(|m| m.as_str()).collect()
}

/// Remove combining marks from letters in the Latin diacritic range
pub fn strip_diacritics(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if DIACRITIC_RANGE.contains(&ch) {
            out.extend(ch.nfd().filter(|c| !is_combining_mark(*c)));
        } else {
            out.push(ch);
        }
    }
    out
}

fn space_after_punctuation(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        out.push(ch);
        if CLAUSE_PUNCTUATION.contains(&ch) {
            if let Some(next) = chars.peek() {
                if !next.is_whitespace() {
                    out.push(' ');
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &[&str] = &[
        "",
        "   ",
        "El hígado es normal.",
        "Vesícula  biliar\t sin   cálculos.Colédoco de 4 mm;sin dilatación",
        "HALLAZGOS:\r\n\r\n  Riñón derecho   \n  de tamaño normal…Sin hidronefrosis!",
        "a...b,c;d:e!f?g",
        "İstanbul ǅemal ß Å",
        "  trailing spaces and\n\n\nnewlines  \n",
    ];

    #[test]
    fn test_normalization_is_idempotent() {
        for sample in SAMPLES {
            let once = normalize_for_compare(sample);
            assert_eq!(normalize_for_compare(&once), once, "sample: {:?}", sample);
            let flat = normalize_flat(sample);
            assert_eq!(normalize_flat(&flat), flat, "sample: {:?}", sample);
        }
    }

    #[test]
    fn test_diacritics_case_and_spacing() {
        assert_eq!(normalize_for_compare("El Hígado ES normal."), "el higado es normal.");
        assert_eq!(normalize_for_compare("uno,dos;tres"), "uno, dos; tres");
        assert_eq!(normalize_for_compare("  a \t\t b \n\n c  "), "a b c");
    }

    #[test]
    fn test_flat_has_no_newlines() {
        let flat = normalize_flat("uno\n\ndos\ntres");
        assert!(!flat.contains('\n'));
        assert_eq!(flat, "uno dos tres");
    }

    #[test]
    fn test_tokens_drop_punctuation() {
        assert_eq!(
            tokens("Nódulo de 5 mm, sin cambios."),
            vec!["nodulo", "de", "5", "mm", "sin", "cambios"]
        );
        assert!(tokens(" ... ").is_empty());
    }

    #[test]
    fn test_bigrams() {
        let toks = tokens("el higado es normal");
        assert_eq!(
            token_bigrams(&toks),
            vec!["el higado", "higado es", "es normal"]
        );
        assert!(token_bigrams(&toks[..1]).is_empty());
    }

    #[test]
    fn test_edit_tokens_reconstruct_input() {
        let text = "Riñón  derecho: 10,5 cm.\n\nSIN cambios!!";
        let toks = edit_tokens(text);
        assert_eq!(toks.concat(), text);
        assert_eq!(toks[0], "Riñón");
        assert_eq!(toks[1], "  ");
        assert!(toks.contains(&"!!"));
    }
}
