//! Batch result export
//!
//! - **JSONL**: one `BatchResult` per line, reloadable with
//!   [`load_results_from_jsonl`]
//! - **CSV**: one summary row per report
//! - **Artifacts**: per report, a unified patch of template vs report and the
//!   annotated text

use crate::types::{BatchResult, BatchSummary};
use anyhow::{Context, Result};
use serde::Serialize;
use similar::{Algorithm, ChangeTag, TextDiff};
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Write every export that has a destination
pub fn export_all(
    results: &[BatchResult],
    jsonl_path: Option<&Path>,
    csv_path: Option<&Path>,
) -> Result<()> {
    if let Some(path) = jsonl_path {
        export_jsonl(results, path)?;
    }
    if let Some(path) = csv_path {
        export_csv(results, path)?;
    }
    Ok(())
}

pub fn export_jsonl(results: &[BatchResult], path: &Path) -> Result<()> {
    ensure_parent(path)?;
    let file = File::create(path)
        .with_context(|| format!("Failed to create JSONL file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for result in results {
        serde_json::to_writer(&mut writer, result).context("Failed to serialize result")?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct CsvRow<'a> {
    report_path: &'a str,
    linked_id: &'a str,
    status: &'a str,
    report_sentences: Option<usize>,
    template_sentences: Option<usize>,
    changed_sentences: Option<usize>,
    percent_changed: Option<f64>,
    error: &'a str,
}

pub fn export_csv(results: &[BatchResult], path: &Path) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;

    for result in results {
        let row = match result {
            BatchResult::Compared(r) => CsvRow {
                report_path: &r.report_path,
                linked_id: &r.linked_id,
                status: status_label(result),
                report_sentences: Some(r.metrics.total_report_sentences),
                template_sentences: Some(r.metrics.total_template_sentences),
                changed_sentences: Some(r.metrics.changed_sentences),
                percent_changed: Some(r.metrics.percent_changed),
                error: "",
            },
            BatchResult::Error { report_path, error } => CsvRow {
                report_path,
                linked_id: "",
                status: status_label(result),
                report_sentences: None,
                template_sentences: None,
                changed_sentences: None,
                percent_changed: None,
                error,
            },
        };
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// `identical`, `unchanged`, `changed` or `error`
pub fn status_label(result: &BatchResult) -> &'static str {
    match result {
        BatchResult::Compared(r) if r.identical => "identical",
        BatchResult::Compared(r) if r.metrics.changed_sentences == 0 => "unchanged",
        BatchResult::Compared(_) => "changed",
        BatchResult::Error { .. } => "error",
    }
}

/// Aggregate figures over a finished batch
pub fn calculate_summary(results: &[BatchResult], reports_indexed: usize) -> BatchSummary {
    let mut summary = BatchSummary {
        reports_indexed,
        ..Default::default()
    };
    let mut percent_sum = 0.0;

    for result in results {
        match result {
            BatchResult::Compared(r) => {
                summary.reports_compared += 1;
                if r.metrics.changed_sentences == 0 {
                    summary.unchanged_reports += 1;
                } else {
                    summary.changed_reports += 1;
                }
                summary.total_changed_sentences += r.metrics.changed_sentences;
                percent_sum += r.metrics.percent_changed;
                summary.max_percent_changed =
                    summary.max_percent_changed.max(r.metrics.percent_changed);
            }
            BatchResult::Error { .. } => summary.error_reports += 1,
        }
    }

    if summary.reports_compared > 0 {
        summary.average_percent_changed = percent_sum / summary.reports_compared as f64;
    }
    summary
}

/// Artifact paths for one report, relative to the artifacts directory
///
/// The report's subfolders are kept, so `sub/x.txt` and `sub_x.txt` never
/// share an artifact.
pub fn artifact_names(relative_path: &str) -> (String, String) {
    let stem = artifact_stem(relative_path);
    (
        format!("patches/{}.patch", stem),
        format!("annotated/{}.txt", stem),
    )
}

fn artifact_stem(relative_path: &str) -> String {
    let stem = relative_path
        .split(|c: char| c == '/' || c == '\\')
        .filter(|part| !part.is_empty() && *part != ".")
        .map(|part| {
            if part == ".." {
                "_".to_string()
            } else {
                sanitize_for_filename(part)
            }
        })
        .collect::<Vec<_>>()
        .join("/");
    if stem.is_empty() {
        "report".to_string()
    } else {
        stem
    }
}

/// Write the patch and annotated text of one report
pub fn write_report_artifacts(
    artifacts_dir: &Path,
    relative_path: &str,
    template_name: &str,
    template_text: &str,
    report_text: &str,
    annotated: &str,
) -> Result<(PathBuf, PathBuf)> {
    let (patch_name, annotated_name) = artifact_names(relative_path);
    let patch_path = artifacts_dir.join(patch_name);
    let annotated_path = artifacts_dir.join(annotated_name);

    ensure_parent(&patch_path)?;
    ensure_parent(&annotated_path)?;

    let patch = unified_patch(template_name, relative_path, template_text, report_text);
    fs::write(&patch_path, patch)
        .with_context(|| format!("Failed to write patch: {}", patch_path.display()))?;
    fs::write(&annotated_path, annotated)
        .with_context(|| format!("Failed to write annotated text: {}", annotated_path.display()))?;

    Ok((patch_path, annotated_path))
}

/// Line-level unified diff of template vs report
pub fn unified_patch(old_name: &str, new_name: &str, old: &str, new: &str) -> String {
    let diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .diff_lines(old, new);

    let mut output = String::new();
    let _ = writeln!(output, "--- {}", old_name);
    let _ = writeln!(output, "+++ {}", new_name);

    for hunk in diff.unified_diff().context_radius(3).iter_hunks() {
        let _ = writeln!(output, "{}", hunk.header());
        for change in hunk.iter_changes() {
            let prefix = match change.tag() {
                ChangeTag::Delete => "-",
                ChangeTag::Insert => "+",
                ChangeTag::Equal => " ",
            };
            let _ = write!(output, "{}{}", prefix, change.value());
            if change.missing_newline() {
                output.push_str("\n\\ No newline at end of file\n");
            }
        }
    }

    output
}

/// Load results from a JSONL file
pub fn load_results_from_jsonl(path: &Path) -> Result<Vec<BatchResult>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let mut results = Vec::new();
    for line in content.lines() {
        if !line.trim().is_empty() {
            let result: BatchResult = serde_json::from_str(line)
                .with_context(|| format!("Failed to parse JSON line: {}", line))?;
            results.push(result);
        }
    }
    Ok(results)
}

/// Replace characters that are not valid in file names
pub fn sanitize_for_filename(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ComparisonMetrics, ReportComparisonResult};
    use tempfile::TempDir;

    fn compared(path: &str, changed: usize, percent: f64) -> BatchResult {
        BatchResult::Compared(ReportComparisonResult {
            linked_id: "aaaa:bbbb".to_string(),
            template_path: "plantilla.txt".to_string(),
            report_path: path.to_string(),
            metrics: ComparisonMetrics {
                total_report_sentences: 4,
                total_template_sentences: 4,
                changed_sentences: changed,
                percent_changed: percent,
            },
            annotated: "Texto.".to_string(),
            identical: false,
        })
    }

    fn sample() -> Vec<BatchResult> {
        vec![
            compared("a.txt", 0, 0.0),
            compared("b.txt", 2, 50.0),
            BatchResult::Error {
                report_path: "c.bin".to_string(),
                error: "Not valid UTF-8 text".to_string(),
            },
        ]
    }

    #[test]
    fn test_summary() {
        let summary = calculate_summary(&sample(), 3);
        assert_eq!(summary.reports_indexed, 3);
        assert_eq!(summary.reports_compared, 2);
        assert_eq!(summary.unchanged_reports, 1);
        assert_eq!(summary.changed_reports, 1);
        assert_eq!(summary.error_reports, 1);
        assert_eq!(summary.total_changed_sentences, 2);
        assert_eq!(summary.average_percent_changed, 25.0);
        assert_eq!(summary.max_percent_changed, 50.0);
    }

    #[test]
    fn test_jsonl_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out/results.jsonl");
        export_jsonl(&sample(), &path).unwrap();

        let loaded = load_results_from_jsonl(&path).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[1].report_path(), "b.txt");
        assert_eq!(loaded[1].percent_changed(), Some(50.0));
        assert!(matches!(loaded[2], BatchResult::Error { .. }));
    }

    #[test]
    fn test_csv_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("summary.csv");
        export_csv(&sample(), &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("report_path,linked_id,status"));
        assert!(lines[1].contains(",unchanged,"));
        assert!(lines[2].contains(",changed,"));
        assert!(lines[3].contains(",error,"));
    }

    #[test]
    fn test_unified_patch() {
        let patch = unified_patch(
            "plantilla.txt",
            "informe.txt",
            "Hígado normal.\nBazo normal.\n",
            "Hígado normal.\nBazo aumentado.\n",
        );
        assert!(patch.starts_with("--- plantilla.txt\n+++ informe.txt\n"));
        assert!(patch.contains("-Bazo normal.\n"));
        assert!(patch.contains("+Bazo aumentado.\n"));
        assert!(patch.contains(" Hígado normal.\n"));
    }

    #[test]
    fn test_report_artifacts() {
        let dir = TempDir::new().unwrap();
        let (patch, annotated) = write_report_artifacts(
            dir.path(),
            "sub/informe.txt",
            "plantilla.txt",
            "Uno.\n",
            "Dos.\n",
            "DOS.",
        )
        .unwrap();
        assert!(patch.ends_with("patches/sub/informe.txt.patch"));
        assert_eq!(fs::read_to_string(annotated).unwrap(), "DOS.");
    }

    #[test]
    fn test_artifact_names_keep_folders_apart() {
        assert_eq!(
            artifact_names("sub/x.txt"),
            ("patches/sub/x.txt.patch".to_string(), "annotated/sub/x.txt.txt".to_string())
        );
        assert_eq!(artifact_names("sub_x.txt").0, "patches/sub_x.txt.patch");
        assert_eq!(artifact_names("../a<b>.txt").0, "patches/_/a_b_.txt.patch");
        assert_eq!(artifact_names("").0, "patches/report.patch");
    }

    #[test]
    fn test_nested_and_flat_reports_do_not_collide() {
        let dir = TempDir::new().unwrap();
        let (nested_patch, nested_text) =
            write_report_artifacts(dir.path(), "sub/x.txt", "plantilla.txt", "A.\n", "B.\n", "B.")
                .unwrap();
        let (flat_patch, flat_text) =
            write_report_artifacts(dir.path(), "sub_x.txt", "plantilla.txt", "A.\n", "C.\n", "C.")
                .unwrap();

        assert_ne!(nested_patch, flat_patch);
        assert_ne!(nested_text, flat_text);
        assert_eq!(fs::read_to_string(nested_text).unwrap(), "B.");
        assert_eq!(fs::read_to_string(flat_text).unwrap(), "C.");
        assert!(fs::read_to_string(nested_patch).unwrap().contains("+B."));
        assert!(fs::read_to_string(flat_patch).unwrap().contains("+C."));
    }
}
