//! Report casing
//!
//! Turns dictated or shouted text into report style: lower case with sentence
//! capitals, tidy spacing around punctuation and preserved acronyms.
//! Decimal numbers (`1,5` or `2.3`) and clock times keep their separators
//! without a space.

use crate::normalize::strip_diacritics;
use regex::{Captures, Regex};
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Acronyms always recognized in source text
pub const ACRONYM_WHITELIST: &[&str] = &[
    "UH", "VCI", "VBI", "VMS", "TC", "RM", "TAC", "T1", "T2", "FOV", "SUV", "CTA", "MRA", "MIP",
    "DWI", "ADC", "IV", "VO", "HCC", "BIRADS", "PI-RADS", "PI RADS", "LIRADS", "LI-RADS",
];

static SPACE_BEFORE_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+([,.;:!?…])").expect("valid punctuation pattern"));
static SPACE_AFTER_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([(\[{])\s+").expect("valid bracket pattern"));
static SPACE_BEFORE_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+([)\]}])").expect("valid bracket pattern"));
static PUNCT_FOLLOWED_BY_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d)?([,;:.!?…])(\s*)([\p{L}\d])").expect("valid spacing pattern")
});
static MULTI_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("valid space pattern"));
static SENTENCE_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[.!?…]\s+)(\p{L})").expect("valid sentence pattern"));
static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{N}-]+").expect("valid word pattern"));
static ACRONYM_CANDIDATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[0-9A-ZÁÉÍÓÚÜÑ-]{2,}\b").expect("valid acronym pattern"));

/// Rewrite text in report casing, line by line
///
/// With `keep_headings`, a line ending in `:` is upper-cased whole instead.
/// Words whose upper-case form is in `acronyms` are restored to upper case.
pub fn to_report_case(text: &str, keep_headings: bool, acronyms: &BTreeSet<String>) -> String {
    text.replace("\r\n", "\n")
        .split('\n')
        .map(|line| case_line(line, keep_headings, acronyms))
        .collect::<Vec<_>>()
        .join("\n")
}

fn case_line(line: &str, keep_headings: bool, acronyms: &BTreeSet<String>) -> String {
    let raw = line.trim();
    if keep_headings && raw.ends_with(':') {
        return raw.to_uppercase();
    }

    let s = raw.to_lowercase();
    let s = SPACE_BEFORE_PUNCT.replace_all(&s, "$1");
    let s = SPACE_AFTER_OPEN.replace_all(&s, "$1");
    let s = SPACE_BEFORE_CLOSE.replace_all(&s, "$1");
    let s = PUNCT_FOLLOWED_BY_WORD.replace_all(&s, |caps: &Captures| {
        let digit = caps.get(1).map_or("", |m| m.as_str());
        let next = &caps[4];
        let is_number = !digit.is_empty()
            && caps[3].is_empty()
            && next.chars().all(|c| c.is_ascii_digit());
        if is_number {
            caps[0].to_string()
        } else {
            format!("{}{} {}", digit, &caps[2], next)
        }
    });
    let s = MULTI_SPACE.replace_all(&s, " ");
    let s = SENTENCE_START.replace_all(&s, |caps: &Captures| {
        format!("{}{}", &caps[1], caps[2].to_uppercase())
    });

    if acronyms.is_empty() {
        return s.into_owned();
    }
    WORD.replace_all(&s, |caps: &Captures| {
        let word = &caps[0];
        let upper = word.to_uppercase();
        if acronyms.contains(&upper) {
            upper
        } else {
            word.to_string()
        }
    })
    .into_owned()
}

/// Collect acronyms worth preserving from upper-case runs of the text
///
/// A run qualifies when its diacritic-free upper-case form is whitelisted or
/// contains a digit (`T2`, `LI-RADS`, `12`).
pub fn extract_acronyms(text: &str) -> BTreeSet<String> {
    ACRONYM_CANDIDATE
        .find_iter(text)
        .map(|m| strip_diacritics(m.as_str()).to_uppercase())
        .filter(|word| {
            ACRONYM_WHITELIST.contains(&word.as_str()) || word.chars().any(|c| c.is_ascii_digit())
        })
        .collect()
}
