//! Paragraph and sentence segmentation
//!
//! Paragraphs are blocks separated by one or more blank lines. Sentences are
//! contiguous slices of a paragraph; every slice keeps its own terminator and
//! trailing whitespace, so joining the sentences of a paragraph always gives
//! back the paragraph byte for byte.

use crate::types::SentenceSplitter;
use regex::Regex;
use std::sync::LazyLock;
use unicode_segmentation::UnicodeSegmentation;

static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("valid paragraph break pattern"));

/// Fallback sentence pattern
///
/// A sentence is a run of non-terminator characters (not crossing a line
/// break), an optional run of `.!?…`, then any whitespace. Stray terminators
/// and stray whitespace form their own pieces so that nothing is dropped.
static SENTENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:[^.!?…\s][^.!?…\n\r]*[.!?…]*|[.!?…]+)\s*|\s+")
        .expect("valid sentence pattern")
});

/// Split a document into paragraphs
///
/// Line endings are normalized to `\n` and trailing whitespace is removed
/// first. An effectively empty document yields no paragraphs.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    let unified = text.replace("\r\n", "\n");
    let trimmed = unified.trim_end();
    if trimmed.is_empty() {
        return Vec::new();
    }
    PARAGRAPH_BREAK
        .split(trimmed)
        .map(|p| p.to_string())
        .collect()
}

/// Split a paragraph into sentences
///
/// A blank paragraph is returned as a single (blank) sentence.
pub fn split_sentences(paragraph: &str, splitter: SentenceSplitter) -> Vec<&str> {
    if paragraph.trim().is_empty() {
        return vec![paragraph];
    }
    match splitter {
        SentenceSplitter::Unicode => paragraph.split_sentence_bounds().collect(),
        SentenceSplitter::Pattern => split_by_pattern(paragraph),
    }
}

fn split_by_pattern(text: &str) -> Vec<&str> {
    let mut starts: Vec<usize> = SENTENCE.find_iter(text).map(|m| m.start()).collect();
    if starts.first() != Some(&0) {
        starts.insert(0, 0);
    }
    // leading indentation belongs to the first sentence
    if starts.len() > 1 && text[..starts[1]].trim().is_empty() {
        starts.remove(1);
    }

    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(text.len());
            &text[start..end]
        })
        .collect()
}
