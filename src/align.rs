//! Paragraph alignment and document comparison
//!
//! Report paragraphs are paired with template paragraphs before the
//! sentence-level diff runs. Positional pairing is tried first (the template
//! paragraph under the cursor); when it fails, a window of `window_size`
//! template paragraphs on each side of the cursor is searched for the most
//! similar one. This absorbs whole-paragraph insertions and deletions without
//! a paragraph-level LCS.
//!
//! The cursor only moves forward. A report paragraph that happens to resemble
//! an already consumed template paragraph may still pair with it, but it can
//! never pull the cursor back.

use crate::metrics::MetricsAggregator;
use crate::render::compare_sentences;
use crate::segment::split_paragraphs;
use crate::similarity::TextProfile;
use crate::types::{AlignmentKind, DocumentComparison, EngineConfig, ParagraphAlignment};
use log::debug;

/// Stateful matcher of report paragraphs against one template document
///
/// One aligner serves exactly one comparison run; its cursor must not be
/// shared between runs.
pub struct ParagraphAligner<'a> {
    config: &'a EngineConfig,
    profiles: Vec<TextProfile>,
    cursor: usize,
}

impl<'a> ParagraphAligner<'a> {
    pub fn new(template_paragraphs: &[String], config: &'a EngineConfig) -> Self {
        Self {
            config,
            profiles: template_paragraphs
                .iter()
                .map(|p| TextProfile::new(p))
                .collect(),
            cursor: 0,
        }
    }

    /// Index of the next template paragraph expected positionally
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Decide which template paragraph the report paragraph is compared with
    pub fn align(&mut self, report_index: usize, report_paragraph: &str) -> ParagraphAlignment {
        if report_paragraph.trim().is_empty() {
            return self.decision(report_index, None, AlignmentKind::Passthrough);
        }

        let report = TextProfile::new(report_paragraph);

        if let Some(current) = self.profiles.get(self.cursor) {
            if !current.flat().is_empty() && current.approx_equal(&report, self.config) {
                let index = self.cursor;
                self.cursor += 1;
                return self.decision(report_index, Some(index), AlignmentKind::Positional);
            }
        }

        match self.best_match(&report) {
            Some(index) => {
                self.cursor = self.cursor.max(index + 1);
                debug!(
                    "report paragraph {} realigned to template paragraph {} (cursor {})",
                    report_index, index, self.cursor
                );
                self.decision(report_index, Some(index), AlignmentKind::BestMatch)
            }
            None => self.decision(report_index, None, AlignmentKind::Unpaired),
        }
    }

    /// Most similar template paragraph near the cursor, falling back to the
    /// whole template when the window holds no candidate
    fn best_match(&self, report: &TextProfile) -> Option<usize> {
        let last = self.profiles.len().checked_sub(1)?;
        let lo = self.cursor.saturating_sub(self.config.window_size);
        let hi = last.min(self.cursor.saturating_add(self.config.window_size));

        if lo <= hi {
            if let Some(index) = self.argmax(lo..=hi, report) {
                return Some(index);
            }
        }
        self.argmax(0..=last, report)
    }

    /// First index with the highest similarity
    fn argmax(
        &self,
        range: std::ops::RangeInclusive<usize>,
        report: &TextProfile,
    ) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for index in range {
            let score = self.profiles[index].similarity(report);
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((index, score));
            }
        }
        best.map(|(index, _)| index)
    }

    fn decision(
        &self,
        report_index: usize,
        template_index: Option<usize>,
        kind: AlignmentKind,
    ) -> ParagraphAlignment {
        ParagraphAlignment {
            report_index,
            template_index,
            kind,
            cursor: self.cursor,
        }
    }
}

/// Compare a template document against a report document
///
/// Blank report paragraphs are copied through untouched. Every other report
/// paragraph is diffed by sentences against its aligned template paragraph
/// (or against empty text when the template has none), and the annotated
/// paragraphs are joined with a blank line.
pub fn compare_documents(template: &str, report: &str, config: &EngineConfig) -> DocumentComparison {
    let template_paragraphs = split_paragraphs(template);
    let report_paragraphs = split_paragraphs(report);

    let mut aligner = ParagraphAligner::new(&template_paragraphs, config);
    let mut aggregator = MetricsAggregator::new();
    let mut output = Vec::with_capacity(report_paragraphs.len());
    let mut alignments = Vec::with_capacity(report_paragraphs.len());

    for (k, paragraph) in report_paragraphs.iter().enumerate() {
        let alignment = aligner.align(k, paragraph);
        alignments.push(alignment);

        if alignment.kind == AlignmentKind::Passthrough {
            output.push(paragraph.clone());
            continue;
        }

        let template_paragraph = alignment
            .template_index
            .map(|i| template_paragraphs[i].as_str())
            .unwrap_or("");
        let compared = compare_sentences(template_paragraph, paragraph, config);
        aggregator.add(&compared.stats);
        output.push(compared.text);
    }

    let metrics = aggregator.finish();
    debug!(
        "compared {} report paragraphs against {} template paragraphs: {}% changed",
        report_paragraphs.len(),
        template_paragraphs.len(),
        metrics.percent_changed
    );

    DocumentComparison {
        text: output.join("\n\n"),
        metrics,
        alignments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ComparisonMetrics;

    fn has_uppercase_sentence(text: &str) -> bool {
        text.split(". ").any(|s| {
            let letters = s.chars().filter(|c| c.is_alphabetic()).count();
            letters > 1 && s == s.to_uppercase()
        })
    }

    #[test]
    fn test_appended_finding_scenario() {
        let config = EngineConfig::default();
        let result = compare_documents(
            "El hígado es normal.",
            "El hígado es normal. Se observa un nódulo de 5 mm.",
            &config,
        );
        assert_eq!(result.text, "El hígado es normal. SE OBSERVA UN NÓDULO DE 5 MM.");
        assert_eq!(result.metrics.total_template_sentences, 1);
        assert_eq!(result.metrics.total_report_sentences, 2);
        assert_eq!(result.metrics.changed_sentences, 1);
        assert_eq!(result.metrics.percent_changed, 50.0);
    }

    #[test]
    fn test_identical_documents() {
        let config = EngineConfig::default();
        let doc = "HALLAZGOS:\nHígado de tamaño normal. Vía biliar no dilatada.\n\nBazo homogéneo.\n\nIMPRESIÓN:\nSin hallazgos.";
        let result = compare_documents(doc, doc, &config);
        assert_eq!(result.metrics.percent_changed, 0.0);
        assert_eq!(result.metrics.changed_sentences, 0);
        assert_eq!(result.text, doc);
        assert!(result
            .alignments
            .iter()
            .all(|a| a.kind == AlignmentKind::Positional));
    }

    #[test]
    fn test_deleted_first_paragraph_realigns() {
        let config = EngineConfig::default();
        let template = "Hígado de tamaño y morfología normales sin lesiones focales.\n\nRiñones de tamaño normal, sin litiasis ni hidronefrosis.";
        let report = "Riñones de tamaño normal, sin litiasis ni hidronefrosis.";
        let result = compare_documents(template, report, &config);
        assert_eq!(result.alignments.len(), 1);
        assert_eq!(result.alignments[0].template_index, Some(1));
        assert_eq!(result.alignments[0].kind, AlignmentKind::BestMatch);
        assert_eq!(result.alignments[0].cursor, 2);
        assert_eq!(result.metrics.percent_changed, 0.0);
        assert_eq!(result.text, report);
    }

    #[test]
    fn test_inserted_paragraph_keeps_following_alignment() {
        let config = EngineConfig::default();
        let template = "Páncreas sin alteraciones.\n\nBazo de tamaño normal.";
        let report = "Páncreas sin alteraciones.\n\nQuiste cortical simple en riñón izquierdo.\n\nBazo de tamaño normal.";
        let result = compare_documents(template, report, &config);
        let indices: Vec<Option<usize>> =
            result.alignments.iter().map(|a| a.template_index).collect();
        assert_eq!(indices, vec![Some(0), Some(0), Some(1)]);
        assert_eq!(result.alignments[1].kind, AlignmentKind::BestMatch);
        assert_eq!(result.alignments[1].cursor, 1);
        assert_eq!(result.alignments[2].kind, AlignmentKind::Positional);
        assert!(result
            .text
            .contains("QUISTE CORTICAL SIMPLE EN RIÑÓN IZQUIERDO."));
        assert_eq!(result.metrics.changed_sentences, 1);
    }

    #[test]
    fn test_cursor_is_monotonic() {
        let config = EngineConfig::default();
        let template = "Uno dos tres cuatro.\n\nCinco seis siete ocho.\n\nNueve diez once doce.\n\nTrece catorce quince.";
        let report = "Nueve diez once doce.\n\nUno dos tres cuatro.\n\n\n\nCinco seis siete ocho.\n\nAlgo completamente distinto.\n\nTrece catorce quince.";
        let result = compare_documents(template, report, &config);
        let cursors: Vec<usize> = result.alignments.iter().map(|a| a.cursor).collect();
        assert!(cursors.windows(2).all(|w| w[0] <= w[1]), "{:?}", cursors);
        // the second report paragraph matched an earlier template paragraph
        // without moving the cursor back
        assert_eq!(result.alignments[1].template_index, Some(0));
        assert_eq!(result.alignments[1].cursor, 3);
    }

    #[test]
    fn test_empty_inputs() {
        let config = EngineConfig::default();
        let result = compare_documents("", "", &config);
        assert_eq!(result.text, "");
        assert_eq!(result.metrics, ComparisonMetrics::default());

        let result = compare_documents("Plantilla con texto.", "   \n", &config);
        assert_eq!(result.text, "");
        assert_eq!(result.metrics.percent_changed, 0.0);
    }

    #[test]
    fn test_empty_template_marks_all_report_content() {
        let config = EngineConfig::default();
        let result = compare_documents("", "Nódulo hepático.\n\nQuiste renal.", &config);
        assert_eq!(result.text, "NÓDULO HEPÁTICO.\n\nQUISTE RENAL.");
        assert!(result
            .alignments
            .iter()
            .all(|a| a.kind == AlignmentKind::Unpaired && a.template_index.is_none()));
        assert_eq!(result.metrics.changed_sentences, 2);
        // each empty template side still counts as one blank sentence
        assert_eq!(result.metrics.total_template_sentences, 2);
        assert_eq!(result.metrics.total_report_sentences, 2);
        assert_eq!(result.metrics.percent_changed, 100.0);
        assert!(has_uppercase_sentence(&result.text));
    }

    #[test]
    fn test_huge_window_does_not_overflow() {
        let config = EngineConfig::new(0.9, 0.9, usize::MAX).unwrap();
        let result = compare_documents(
            "Uno dos tres.\n\nCuatro cinco seis.",
            "Uno dos tres.\n\nAlgo muy distinto aqui.",
            &config,
        );
        assert_eq!(result.alignments[0].kind, AlignmentKind::Positional);
        assert_eq!(result.alignments[1].kind, AlignmentKind::BestMatch);
        // no overlap anywhere, so the earliest template paragraph wins
        assert_eq!(result.alignments[1].template_index, Some(0));
        assert_eq!(result.alignments[1].cursor, 1);
        assert_eq!(result.metrics.changed_sentences, 1);
    }

    #[test]
    fn test_blank_report_paragraph_passes_through() {
        let config = EngineConfig::default();
        let result = compare_documents("Texto.", "\n\nTexto.", &config);
        assert_eq!(result.alignments[0].kind, AlignmentKind::Passthrough);
        assert_eq!(result.alignments[0].cursor, 0);
        assert_eq!(result.alignments[1].kind, AlignmentKind::Positional);
        assert_eq!(result.text, "\n\nTexto.");
    }

    #[test]
    fn test_report_longer_than_template() {
        let config = EngineConfig::new(0.9, 0.9, 1).unwrap();
        let template = "Alfa beta.\n\nGamma delta.";
        let report = "Alfa beta.\n\nGamma delta.\n\nOtra cosa.\n\nGamma delta epsilon.";
        let result = compare_documents(template, report, &config);
        assert_eq!(result.alignments[1].cursor, 2);
        let last = result.alignments.last().unwrap();
        assert_eq!(last.kind, AlignmentKind::BestMatch);
        assert_eq!(last.template_index, Some(1));
        assert_eq!(last.cursor, 2);
    }
}
