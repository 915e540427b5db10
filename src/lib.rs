//! ReportDiff - approximate template-vs-report comparison library
//!
//! Compares a free-text report against the template it was written from and
//! marks what the author added or changed, tolerating small rewordings. The
//! same engine backs the CLI (single comparisons, live editor markup, report
//! casing) and the parallel batch runner.

pub mod align;
pub mod casing;
pub mod diff;
pub mod error;
pub mod export;
pub mod index;
pub mod metrics;
pub mod normalize;
pub mod render;
pub mod report;
pub mod segment;
pub mod session;
pub mod settings;
pub mod similarity;
pub mod types;

pub use align::compare_documents;
pub use error::ConfigError;
pub use render::{render_live, Markup};
pub use session::EditorSession;

use anyhow::{Context, Result};
use chrono::Local;
use log::{info, warn};
use rayon::prelude::*;
use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::export::{calculate_summary, export_all, write_report_artifacts};
use crate::index::{hash_file, index_reports, read_text};
use crate::report::generate_batch_report;
use crate::segment::{split_paragraphs, split_sentences};
use crate::types::{
    BatchConfig, BatchResult, BatchSummary, ComparisonMetrics, DocumentComparison, EngineConfig,
    ReportComparisonResult, ReportEntry,
};

/// Trait for reporting progress during long-running operations
pub trait ProgressReporter: Send + Sync {
    fn start(&self, total: u64, message: &str);
    fn inc(&self, delta: u64);
    fn finish(&self, message: &str);
}

/// A no-op progress reporter that does nothing
pub struct NoopProgressReporter;
impl ProgressReporter for NoopProgressReporter {
    fn start(&self, _total: u64, _message: &str) {}
    fn inc(&self, _delta: u64) {}
    fn finish(&self, _message: &str) {}
}

/// Everything a finished batch run produced
#[derive(Debug)]
pub struct BatchOutcome {
    pub results: Vec<BatchResult>,
    pub summary: BatchSummary,
    pub results_dir: PathBuf,
    pub exports: ExportPaths,
}

/// Files written by a batch run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub jsonl: PathBuf,
    pub csv: PathBuf,
    pub html: PathBuf,
    pub artifacts: PathBuf,
}

/// The template side of a batch, read and hashed once
struct TemplateDoc {
    display: String,
    text: String,
    hash: String,
}

/// Core comparison engine shared by every CLI command
pub struct ComparisonEngine<'a> {
    pub config: &'a BatchConfig,
    pub progress: Option<&'a dyn ProgressReporter>,
}

impl<'a> ComparisonEngine<'a> {
    pub fn new(config: &'a BatchConfig) -> Self {
        Self {
            config,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn ProgressReporter) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Compare two in-memory documents
    pub fn compare(&self, template: &str, report: &str) -> DocumentComparison {
        compare_documents(template, report, &self.config.engine)
    }

    /// Compare one template against every report under `reports_root`
    pub fn run_batch(&self, template_path: &Path, reports_root: &Path) -> Result<BatchOutcome> {
        self.config.engine.validate()?;

        let template = TemplateDoc {
            display: template_path.display().to_string(),
            text: read_text(template_path).context("Failed to read template")?,
            hash: hash_file(template_path).context("Failed to hash template")?,
        };

        let results_dir = ensure_results_dir(&self.config.results_base)?;
        let auto = get_auto_export_paths(&results_dir);
        let exports = ExportPaths {
            jsonl: self.config.output_jsonl.clone().unwrap_or(auto.jsonl),
            csv: self.config.output_csv.clone().unwrap_or(auto.csv),
            html: self.config.output_html.clone().unwrap_or(auto.html),
            artifacts: self.config.output_dir.clone().unwrap_or(auto.artifacts),
        };

        // Stage 1: index reports
        if let Some(p) = self.progress {
            p.start(0, "Indexing reports...");
        }
        let template_canonical = template_path.canonicalize().ok();
        let entries: Vec<ReportEntry> = index_reports(reports_root, &self.config.exclude_patterns)
            .context("Failed to index reports")?
            .into_iter()
            .filter(|e| e.path.canonicalize().ok() != template_canonical)
            .collect();

        // Stage 2: compare in parallel
        if let Some(p) = self.progress {
            p.start(entries.len() as u64, "Comparing reports...");
        }
        let results: Vec<BatchResult> = entries
            .par_iter()
            .map(|entry| {
                let result = self.compare_report(entry, &template, Some(exports.artifacts.as_path()));
                if let Some(p) = self.progress {
                    p.inc(1);
                }
                result
            })
            .collect();
        if let Some(p) = self.progress {
            p.finish("Comparison complete");
        }

        // Stage 3: export
        let summary = calculate_summary(&results, entries.len());
        export_all(
            &results,
            Some(exports.jsonl.as_path()),
            Some(exports.csv.as_path()),
        )?;
        generate_batch_report(
            &results,
            &summary,
            &template.display,
            &exports.html,
            Some(exports.artifacts.as_path()),
        )?;

        info!(
            "Batch complete: {} compared, {} changed, {} errors",
            summary.reports_compared, summary.changed_reports, summary.error_reports
        );

        Ok(BatchOutcome {
            results,
            summary,
            results_dir,
            exports,
        })
    }

    /// Compare a single indexed report against the template
    fn compare_report(
        &self,
        entry: &ReportEntry,
        template: &TemplateDoc,
        artifacts_dir: Option<&Path>,
    ) -> BatchResult {
        let linked_id = format!(
            "{}:{}",
            &template.hash[..16.min(template.hash.len())],
            &entry.content_hash[..16.min(entry.content_hash.len())]
        );

        // Quick check for byte-identical reports
        if entry.content_hash == template.hash {
            let annotated = split_paragraphs(&template.text).join("\n\n");
            write_artifacts(artifacts_dir, entry, template, &template.text, &annotated);
            return BatchResult::Compared(ReportComparisonResult {
                linked_id,
                template_path: template.display.clone(),
                report_path: entry.relative_path.clone(),
                metrics: identical_metrics(&template.text, &self.config.engine),
                annotated,
                identical: true,
            });
        }

        let report_text = match read_text(&entry.path) {
            Ok(text) => text,
            Err(e) => {
                warn!("Skipping {}: {:#}", entry.path.display(), e);
                return BatchResult::Error {
                    report_path: entry.relative_path.clone(),
                    error: format!("{:#}", e),
                };
            }
        };

        let comparison = compare_documents(&template.text, &report_text, &self.config.engine);

        write_artifacts(artifacts_dir, entry, template, &report_text, &comparison.text);

        BatchResult::Compared(ReportComparisonResult {
            linked_id,
            template_path: template.display.clone(),
            report_path: entry.relative_path.clone(),
            metrics: comparison.metrics,
            annotated: comparison.text,
            identical: false,
        })
    }
}

/// Write the patch and annotated text of one report; failures only cost the artifacts
fn write_artifacts(
    artifacts_dir: Option<&Path>,
    entry: &ReportEntry,
    template: &TemplateDoc,
    report_text: &str,
    annotated: &str,
) {
    let Some(dir) = artifacts_dir else {
        return;
    };
    if let Err(e) = write_report_artifacts(
        dir,
        &entry.relative_path,
        &template.display,
        &template.text,
        report_text,
        annotated,
    ) {
        warn!("Failed to write artifacts for {}: {:#}", entry.relative_path, e);
    }
}

/// Metrics of a document compared with itself, without running the differ
pub fn identical_metrics(text: &str, config: &EngineConfig) -> ComparisonMetrics {
    let sentences: usize = split_paragraphs(text)
        .iter()
        .filter(|p| !p.trim().is_empty())
        .map(|p| split_sentences(p, config.sentence_splitter).len())
        .sum();
    ComparisonMetrics {
        total_report_sentences: sentences,
        total_template_sentences: sentences,
        changed_sentences: 0,
        percent_changed: 0.0,
    }
}

/// Generate a short unique ID for the run
fn generate_run_id() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();

    let mut hasher = DefaultHasher::new();
    now.as_nanos().hash(&mut hasher);
    std::process::id().hash(&mut hasher);

    format!("{:08x}", hasher.finish() as u32)
}

/// Ensure the results directory exists and create a unique run subfolder
///
/// Creates a subfolder with format: `run_YYYYMMDD_HHMMSS_<unique-id>`
pub fn ensure_results_dir(base_path: &Path) -> Result<PathBuf> {
    if !base_path.exists() {
        fs::create_dir_all(base_path).context("Failed to create base output directory")?;
    }

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let run_folder = base_path.join(format!("run_{}_{}", timestamp, generate_run_id()));

    fs::create_dir_all(&run_folder).context("Failed to create run directory")?;
    Ok(run_folder)
}

/// Default export locations inside a run directory
pub fn get_auto_export_paths(run_dir: &Path) -> ExportPaths {
    ExportPaths {
        jsonl: run_dir.join("results.jsonl"),
        csv: run_dir.join("summary.csv"),
        html: run_dir.join("report.html"),
        artifacts: run_dir.join("artifacts"),
    }
}
