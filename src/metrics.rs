//! Sentence change statistics
//!
//! Every compared paragraph contributes report/template/changed sentence
//! counts and a denominator `max(report, template)` floored to 1. The
//! document figure is `100 x changed / sum(denominators)`, rounded to two
//! decimals, or 0 when nothing was compared.

use crate::types::{ComparisonMetrics, DiffTag, EditOp, SentenceStats};

/// Count sentences touched by a sentence-level edit script
///
/// Insert and Replace runs count their report-side sentences as changed,
/// Delete runs count their template-side sentences.
pub fn sentence_stats(ops: &[EditOp]) -> SentenceStats {
    let mut stats = SentenceStats::default();
    for op in ops {
        stats.template_sentences += op.source_len();
        stats.report_sentences += op.target_len();
        match op.tag {
            DiffTag::Equal => {}
            DiffTag::Insert | DiffTag::Replace => stats.changed_sentences += op.target_len(),
            DiffTag::Delete => stats.changed_sentences += op.source_len(),
        }
    }
    stats.denom = stats.report_sentences.max(stats.template_sentences).max(1);
    stats
}

/// Running totals across the paragraphs of one document
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsAggregator {
    report_sentences: usize,
    template_sentences: usize,
    changed_sentences: usize,
    denom: usize,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, stats: &SentenceStats) {
        self.report_sentences += stats.report_sentences;
        self.template_sentences += stats.template_sentences;
        self.changed_sentences += stats.changed_sentences;
        self.denom += stats.denom;
    }

    pub fn finish(&self) -> ComparisonMetrics {
        ComparisonMetrics {
            total_report_sentences: self.report_sentences,
            total_template_sentences: self.template_sentences,
            changed_sentences: self.changed_sentences,
            percent_changed: percent(self.changed_sentences, self.denom),
        }
    }
}

/// `100 x part / whole` rounded to two decimals, 0 for an empty whole
pub fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 10_000.0).round() / 100.0
}
