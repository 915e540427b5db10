//! Change rendering
//!
//! Two renderers share the differ:
//!
//! - **Sentence level** (template vs report): equal sentences are copied from
//!   the report, inserted/replaced sentences are upper-cased as the visual
//!   change marker, deleted template sentences emit nothing.
//! - **Token level** (live editor): the frozen base text is diffed against the
//!   current text with exact token equality. Inserted text becomes a "new
//!   edit" span; equal tokens that were already upper-case in the base become
//!   "pre-existing emphasis"; deletions leave no trace so the live view stays
//!   uncluttered.

use crate::diff::diff;
use crate::metrics::sentence_stats;
use crate::normalize::edit_tokens;
use crate::segment::split_sentences;
use crate::similarity::TextProfile;
use crate::types::{DiffTag, EditOp, EngineConfig, ParagraphComparison};
use serde::{Deserialize, Serialize};

/// Compare one template paragraph with one report paragraph by sentences
pub fn compare_sentences(
    template_paragraph: &str,
    report_paragraph: &str,
    config: &EngineConfig,
) -> ParagraphComparison {
    let template_sentences = split_sentences(template_paragraph, config.sentence_splitter);
    let report_sentences = split_sentences(report_paragraph, config.sentence_splitter);

    let template_profiles: Vec<TextProfile> =
        template_sentences.iter().map(|s| TextProfile::new(s)).collect();
    let report_profiles: Vec<TextProfile> =
        report_sentences.iter().map(|s| TextProfile::new(s)).collect();

    let ops = diff(&template_profiles, &report_profiles, |a, b| {
        a.approx_equal(b, config)
    });

    ParagraphComparison {
        text: render_sentence_ops(&report_sentences, &ops),
        stats: sentence_stats(&ops),
    }
}

/// Render a sentence-level edit script over the report's sentences
pub fn render_sentence_ops(report_sentences: &[&str], ops: &[EditOp]) -> String {
    ops.iter().fold(String::new(), |mut out, op| {
        let segment = report_sentences[op.target.clone()].concat();
        match op.tag {
            DiffTag::Equal => out.push_str(&segment),
            DiffTag::Insert | DiffTag::Replace => out.push_str(&segment.to_uppercase()),
            DiffTag::Delete => {}
        }
        out
    })
}

/// Classification of a span of live-editor markup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpanKind {
    /// Unchanged text
    Plain,
    /// Text added since the base was frozen
    NewEdit,
    /// Unchanged text that was already upper-case in the base
    PriorEmphasis,
}

/// A run of current text with one classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkupSpan {
    pub kind: SpanKind,
    pub text: String,
}

/// Live-editor markup: ordered spans covering the current text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Markup {
    spans: Vec<MarkupSpan>,
}

impl Markup {
    pub fn spans(&self) -> &[MarkupSpan] {
        &self.spans
    }

    /// Append text, extending the last span when the kind matches
    pub fn push(&mut self, kind: SpanKind, text: &str) {
        if text.is_empty() {
            return;
        }
        match self.spans.last_mut() {
            Some(last) if last.kind == kind => last.text.push_str(text),
            _ => self.spans.push(MarkupSpan {
                kind,
                text: text.to_string(),
            }),
        }
    }

    /// The current text without annotations
    pub fn plain_text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    /// HTML with `<mark class="add">` for new edits and
    /// `<strong class="original-upper">` for pre-existing emphasis
    pub fn to_html(&self) -> String {
        let mut html = String::new();
        for span in &self.spans {
            let text = escape_html(&span.text);
            match span.kind {
                SpanKind::Plain => html.push_str(&text),
                SpanKind::NewEdit => {
                    html.push_str("<mark class=\"add\">");
                    html.push_str(&text);
                    html.push_str("</mark>");
                }
                SpanKind::PriorEmphasis => {
                    html.push_str("<strong class=\"original-upper\">");
                    html.push_str(&text);
                    html.push_str("</strong>");
                }
            }
        }
        html
    }
}

/// Diff a frozen base text against the current text and classify the result
pub fn render_live(base: &str, current: &str) -> Markup {
    let base_tokens = edit_tokens(base);
    let current_tokens = edit_tokens(current);
    let ops = diff(&base_tokens, &current_tokens, |a, b| a == b);

    ops.iter().fold(Markup::default(), |mut markup, op| {
        match op.tag {
            DiffTag::Equal => {
                let pairs = base_tokens[op.source.clone()]
                    .iter()
                    .zip(&current_tokens[op.target.clone()]);
                for (base_token, current_token) in pairs {
                    let kind = if is_originally_upper(base_token) {
                        SpanKind::PriorEmphasis
                    } else {
                        SpanKind::Plain
                    };
                    markup.push(kind, current_token);
                }
            }
            DiffTag::Insert | DiffTag::Replace => {
                let added = current_tokens[op.target.clone()].concat();
                // whitespace-only additions are not worth a highlight
                let kind = if added.trim().is_empty() {
                    SpanKind::Plain
                } else {
                    SpanKind::NewEdit
                };
                markup.push(kind, &added);
            }
            DiffTag::Delete => {}
        }
        markup
    })
}

/// True when the text has more than one letter and is entirely upper-case
pub fn is_originally_upper(text: &str) -> bool {
    let letters = text.chars().filter(|c| c.is_alphabetic()).count();
    let trimmed = text.trim();
    letters > 1 && trimmed == trimmed.to_uppercase()
}

/// Escape HTML special characters
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appended_sentence_is_uppercased() {
        let config = EngineConfig::default();
        let result = compare_sentences(
            "El hígado es normal.",
            "El hígado es normal. Se observa un nódulo de 5 mm.",
            &config,
        );
        assert_eq!(result.text, "El hígado es normal. SE OBSERVA UN NÓDULO DE 5 MM.");
        assert_eq!(result.stats.template_sentences, 1);
        assert_eq!(result.stats.report_sentences, 2);
        assert_eq!(result.stats.changed_sentences, 1);
        assert_eq!(result.stats.denom, 2);
    }

    #[test]
    fn test_deleted_sentence_emits_nothing_but_counts() {
        let config = EngineConfig::default();
        let result = compare_sentences(
            "Bazo normal. Páncreas sin alteraciones. Riñones normales.",
            "Bazo normal. Riñones normales.",
            &config,
        );
        assert_eq!(result.text, "Bazo normal. Riñones normales.");
        assert_eq!(result.stats.changed_sentences, 1);
        assert_eq!(result.stats.denom, 3);
    }

    #[test]
    fn test_equal_sentences_keep_report_wording() {
        let config = EngineConfig::default();
        let result = compare_sentences("Vesícula sin cálculos.", "VESÍCULA sin  calculos.", &config);
        assert_eq!(result.text, "VESÍCULA sin  calculos.");
        assert_eq!(result.stats.changed_sentences, 0);
    }

    #[test]
    fn test_empty_template_marks_everything() {
        let config = EngineConfig::default();
        let result = compare_sentences("", "Hallazgo nuevo. Otro más.", &config);
        assert_eq!(result.text, "HALLAZGO NUEVO. OTRO MÁS.");
        assert_eq!(result.stats.changed_sentences, 2);
    }

    #[test]
    fn test_live_insert_is_marked() {
        let markup = render_live("Bazo normal.", "Bazo de tamaño normal.");
        assert_eq!(markup.plain_text(), "Bazo de tamaño normal.");
        assert_eq!(
            markup.to_html(),
            "Bazo<mark class=\"add\"> de tamaño</mark> normal."
        );
    }

    #[test]
    fn test_live_deletions_leave_no_trace() {
        let markup = render_live("Bazo de tamaño normal.", "Bazo normal.");
        assert_eq!(markup.to_html(), "Bazo normal.");
        assert!(markup.spans().iter().all(|s| s.kind == SpanKind::Plain));
    }

    #[test]
    fn test_live_prior_emphasis() {
        let base = "Hígado normal. NÓDULO DE 5 MM.";
        let markup = render_live(base, base);
        assert_eq!(markup.plain_text(), base);
        let emphasized: Vec<&str> = markup
            .spans()
            .iter()
            .filter(|s| s.kind == SpanKind::PriorEmphasis)
            .map(|s| s.text.as_str())
            .collect();
        assert_eq!(emphasized, vec!["NÓDULO", "DE", "MM"]);
        assert!(!markup.spans().iter().any(|s| s.kind == SpanKind::NewEdit));
    }

    #[test]
    fn test_live_whitespace_insert_is_plain() {
        let markup = render_live("uno dos", "uno  dos");
        assert!(markup.spans().iter().all(|s| s.kind != SpanKind::NewEdit));
        assert_eq!(markup.plain_text(), "uno  dos");
    }

    #[test]
    fn test_live_html_is_escaped() {
        let markup = render_live("a", "a <b>");
        assert_eq!(markup.to_html(), "a<mark class=\"add\"> &lt;b&gt;</mark>");
    }

    #[test]
    fn test_originally_upper_predicate() {
        assert!(is_originally_upper("TAC"));
        assert!(is_originally_upper(" LI-RADS "));
        assert!(!is_originally_upper("A"));
        assert!(!is_originally_upper("Tac"));
        assert!(!is_originally_upper("  "));
        assert!(!is_originally_upper("5"));
    }
}
