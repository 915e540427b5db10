//! Core data types for ReportDiff
//!
//! This module defines the shared types used across the comparison pipeline:
//! edit scripts, engine configuration, per-paragraph statistics, document-level
//! results and the batch result records written by the export stage.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::PathBuf;

/// Kind of a single edit operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiffTag {
    /// Items present (approximately) unchanged on both sides
    Equal,
    /// Items only present in the target
    Insert,
    /// Items only present in the source
    Delete,
    /// A deleted source run immediately followed by an inserted target run
    Replace,
}

/// One operation of an edit script
///
/// `source` and `target` are half-open index ranges into the two sequences
/// handed to the differ. Over a whole script the ranges partition both
/// sequences in increasing order, with no gaps or overlaps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditOp {
    pub tag: DiffTag,
    pub source: Range<usize>,
    pub target: Range<usize>,
}

impl EditOp {
    pub fn new(tag: DiffTag, source: Range<usize>, target: Range<usize>) -> Self {
        Self {
            tag,
            source,
            target,
        }
    }

    /// Number of source items covered by this op
    pub fn source_len(&self) -> usize {
        self.source.end - self.source.start
    }

    /// Number of target items covered by this op
    pub fn target_len(&self) -> usize {
        self.target.end - self.target.start
    }
}

/// Sentence boundary strategy used by the segmenter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum SentenceSplitter {
    /// Unicode (UAX #29) sentence boundaries
    #[default]
    Unicode,
    /// Terminator-punctuation pattern (`.!?…` plus trailing whitespace)
    Pattern,
}

/// Default containment threshold for bidirectional coverage
pub const DEFAULT_CONTAINMENT_THRESHOLD: f64 = 0.9;
/// Default threshold for the blended Jaccard similarity
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.9;
/// Default half-width of the paragraph best-match window
pub const DEFAULT_WINDOW_SIZE: usize = 8;

/// Configuration for the comparison engine
///
/// Thresholds are the only tunables of the engine. They are dimensionless
/// values in `(0, 1]`; the window size is a positive number of template
/// paragraphs searched on each side of the alignment cursor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Both directional coverages must reach this value for containment equality
    pub containment_threshold: f64,

    /// Blended word/bigram Jaccard score needed for similarity equality
    pub similarity_threshold: f64,

    /// Template paragraphs inspected on each side of the cursor when realigning
    pub window_size: usize,

    /// Sentence boundary strategy
    pub sentence_splitter: SentenceSplitter,
}

impl EngineConfig {
    /// Build a validated configuration
    pub fn new(
        containment_threshold: f64,
        similarity_threshold: f64,
        window_size: usize,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            containment_threshold,
            similarity_threshold,
            window_size,
            sentence_splitter: SentenceSplitter::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_splitter(mut self, splitter: SentenceSplitter) -> Self {
        self.sentence_splitter = splitter;
        self
    }

    /// Check that every tunable is inside its allowed range
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_threshold("containment_threshold", self.containment_threshold)?;
        check_threshold("similarity_threshold", self.similarity_threshold)?;
        if self.window_size == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        Ok(())
    }
}

fn check_threshold(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_nan() || value <= 0.0 || value > 1.0 {
        return Err(ConfigError::ThresholdOutOfRange { name, value });
    }
    Ok(())
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            containment_threshold: DEFAULT_CONTAINMENT_THRESHOLD,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            window_size: DEFAULT_WINDOW_SIZE,
            sentence_splitter: SentenceSplitter::Unicode,
        }
    }
}

/// Sentence counts for one compared paragraph pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceStats {
    pub report_sentences: usize,
    pub template_sentences: usize,
    pub changed_sentences: usize,
    /// `max(report, template)`, floored to 1
    pub denom: usize,
}

/// Annotated output of a single paragraph comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParagraphComparison {
    pub text: String,
    pub stats: SentenceStats,
}

/// Document-level change statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonMetrics {
    pub total_report_sentences: usize,
    pub total_template_sentences: usize,
    pub changed_sentences: usize,
    /// Percentage of changed sentences, rounded to two decimals
    pub percent_changed: f64,
}

/// How a report paragraph was paired with the template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlignmentKind {
    /// Blank paragraph copied through without comparison
    Passthrough,
    /// Matched the template paragraph under the cursor
    Positional,
    /// Won the windowed (or full) best-match search
    BestMatch,
    /// Compared against empty text because the template has no paragraphs
    Unpaired,
}

/// Pairing decision for one report paragraph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParagraphAlignment {
    pub report_index: usize,
    pub template_index: Option<usize>,
    pub kind: AlignmentKind,
    /// Alignment cursor after this paragraph was processed
    pub cursor: usize,
}

/// Result of comparing a template document against a report document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentComparison {
    /// Annotated report, paragraphs joined by a blank line
    pub text: String,
    pub metrics: ComparisonMetrics,
    pub alignments: Vec<ParagraphAlignment>,
}

/// A report file discovered during batch indexing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportEntry {
    /// Absolute path to the report
    pub path: PathBuf,

    /// Path relative to the batch root, used for artifact names
    pub relative_path: String,

    /// File size in bytes
    pub size: u64,

    /// Blake3 hash of the raw bytes (hex string)
    pub content_hash: String,
}

/// Configuration for a batch run (one template against many reports)
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub engine: EngineConfig,

    /// Glob patterns for report files/folders to skip
    pub exclude_patterns: Vec<String>,

    /// Base directory for automatic results (a run subfolder is created inside)
    pub results_base: PathBuf,

    /// Explicit JSONL output path
    pub output_jsonl: Option<PathBuf>,

    /// Explicit CSV summary path
    pub output_csv: Option<PathBuf>,

    /// Explicit HTML report path
    pub output_html: Option<PathBuf>,

    /// Explicit directory for patch artifacts
    pub output_dir: Option<PathBuf>,

    /// Show every row in the CLI table, not only changed reports
    pub verbose: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            exclude_patterns: Vec::new(),
            results_base: PathBuf::from("output"),
            output_jsonl: None,
            output_csv: None,
            output_html: None,
            output_dir: None,
            verbose: false,
        }
    }
}

/// Comparison of one report file against the batch template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportComparisonResult {
    /// Stable linked ID for cross-referencing artifacts
    ///
    /// Format: `<template_hash_prefix>:<report_hash_prefix>`
    pub linked_id: String,
    pub template_path: String,
    pub report_path: String,
    pub metrics: ComparisonMetrics,
    /// Annotated report text
    pub annotated: String,
    /// True if the report bytes equal the template bytes
    pub identical: bool,
}

/// Unified batch result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BatchResult {
    Compared(ReportComparisonResult),
    /// The report could not be read or decoded
    Error {
        report_path: String,
        error: String,
    },
}

impl BatchResult {
    pub fn report_path(&self) -> &str {
        match self {
            BatchResult::Compared(r) => &r.report_path,
            BatchResult::Error { report_path, .. } => report_path,
        }
    }

    pub fn percent_changed(&self) -> Option<f64> {
        match self {
            BatchResult::Compared(r) => Some(r.metrics.percent_changed),
            BatchResult::Error { .. } => None,
        }
    }
}

/// Summary statistics for a batch run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub reports_indexed: usize,
    pub reports_compared: usize,
    /// Reports with zero changed sentences
    pub unchanged_reports: usize,
    pub changed_reports: usize,
    pub error_reports: usize,
    pub average_percent_changed: f64,
    pub max_percent_changed: f64,
    pub total_changed_sentences: usize,
}
