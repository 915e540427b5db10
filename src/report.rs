//! HTML report generation
//!
//! Self-contained pages (inline CSS and JS, no external assets):
//! - batch report: status chart, summary cards, sortable/filterable table and
//!   an annotated-text viewer per report
//! - single comparison page: metrics and annotated report
//! - live markup page: editor markup with added text and prior emphasis styled

use crate::export::{artifact_names, status_label};
use crate::render::{escape_html, Markup};
use crate::types::{BatchResult, BatchSummary, ComparisonMetrics, DocumentComparison};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Generate the batch HTML report
pub fn generate_batch_report(
    results: &[BatchResult],
    summary: &BatchSummary,
    template_path: &str,
    output_path: &Path,
    artifacts_dir: Option<&Path>,
) -> Result<()> {
    let href_base = artifacts_dir.map(|dir| artifact_href_base(output_path, dir));
    let html = build_batch_report(results, summary, template_path, href_base.as_deref());
    fs::write(output_path, html)
        .with_context(|| format!("Failed to write HTML report to {}", output_path.display()))
}

/// Link prefix of the artifacts folder as seen from the folder holding the HTML file
fn artifact_href_base(output_path: &Path, artifacts_dir: &Path) -> String {
    let html_dir = match output_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let located = artifacts_dir
        .strip_prefix(html_dir)
        .map(Path::to_path_buf)
        .ok()
        .or_else(|| {
            let html_dir = html_dir.canonicalize().ok()?;
            let artifacts = artifacts_dir.canonicalize().ok()?;
            artifacts.strip_prefix(&html_dir).ok().map(Path::to_path_buf)
        })
        .unwrap_or_else(|| {
            artifacts_dir
                .canonicalize()
                .unwrap_or_else(|_| artifacts_dir.to_path_buf())
        });

    let base = located.to_string_lossy().replace('\\', "/");
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        String::new()
    } else {
        format!("{}/", base)
    }
}

/// Generate the page for one template/report comparison
pub fn generate_comparison_page(
    template_name: &str,
    report_name: &str,
    comparison: &DocumentComparison,
    output_path: &Path,
) -> Result<()> {
    let html = build_comparison_page(template_name, report_name, comparison);
    fs::write(output_path, html)
        .with_context(|| format!("Failed to write HTML page to {}", output_path.display()))
}

fn build_batch_report(
    results: &[BatchResult],
    summary: &BatchSummary,
    template_path: &str,
    artifact_base: Option<&str>,
) -> String {
    let mut html = build_html_head("ReportDiff Batch Report");
    html.push_str(&format!(
        r#"
<body>
    <div class="container">
        <header>
            <h1>ReportDiff Batch Report</h1>
            <p class="subtitle">Template: <span class="path">{}</span></p>
        </header>
"#,
        escape_html(template_path)
    ));
    html.push_str(&build_dashboard(summary));
    html.push_str(&build_results_table(results, artifact_base));
    html.push_str(&build_viewer_modal());
    html.push_str(&build_viewer_data(results));
    html.push_str(BATCH_SCRIPT);
    html.push_str("    </div>\n</body>\n</html>\n");
    html
}

fn build_comparison_page(
    template_name: &str,
    report_name: &str,
    comparison: &DocumentComparison,
) -> String {
    let mut html = build_html_head("ReportDiff Comparison");
    html.push_str(&format!(
        r#"
<body>
    <div class="container">
        <header>
            <h1>ReportDiff Comparison</h1>
            <p class="subtitle"><span class="path">{}</span> vs <span class="path">{}</span></p>
        </header>
"#,
        escape_html(template_name),
        escape_html(report_name)
    ));
    html.push_str(&build_metric_cards(&comparison.metrics));
    html.push_str(&format!(
        "        <div class=\"panel\">\n            <pre class=\"annotated\">{}</pre>\n        </div>\n",
        escape_html(&comparison.text)
    ));
    html.push_str("    </div>\n</body>\n</html>\n");
    html
}

/// A standalone page showing live editor markup
pub fn markup_page(title: &str, markup: &Markup) -> String {
    let mut html = build_html_head(title);
    html.push_str(&format!(
        "\n<body>\n    <div class=\"container\">\n        <header><h1>{}</h1></header>\n        <div class=\"panel\">\n            <pre class=\"annotated\">{}</pre>\n        </div>\n    </div>\n</body>\n</html>\n",
        escape_html(title),
        markup.to_html()
    ));
    html
}

fn build_html_head(title: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="es">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{}</title>
    <style>{}</style>
</head>
"#,
        escape_html(title),
        STYLES
    )
}

const STYLES: &str = r#"
        :root {
            --bg-primary: #0d1117;
            --bg-secondary: #161b22;
            --bg-tertiary: #21262d;
            --text-primary: #c9d1d9;
            --text-secondary: #8b949e;
            --accent: #58a6ff;
            --success: #3fb950;
            --warning: #d29922;
            --danger: #f85149;
            --border: #30363d;
        }
        * { box-sizing: border-box; margin: 0; padding: 0; }
        body {
            font-family: -apple-system, 'Segoe UI', 'Noto Sans', Helvetica, Arial, sans-serif;
            background: var(--bg-primary);
            color: var(--text-primary);
            line-height: 1.6;
            padding: 2rem;
        }
        .container { max-width: 1400px; margin: 0 auto; }
        header { margin-bottom: 2rem; }
        h1 { font-size: 2rem; font-weight: 600; }
        .subtitle { color: var(--text-secondary); }
        .dashboard { display: flex; gap: 2rem; flex-wrap: wrap; margin-bottom: 2rem; }
        .pie-chart { width: 180px; height: 180px; border-radius: 50%; margin: 0 auto 1rem; }
        .legend-dot { display: inline-block; width: 12px; height: 12px; border-radius: 50%; margin-right: 0.5rem; }
        .legend-dot.unchanged { background: var(--success); }
        .legend-dot.changed { background: var(--warning); }
        .legend-dot.error { background: var(--danger); }
        .summary-grid {
            display: grid;
            grid-template-columns: repeat(auto-fit, minmax(180px, 1fr));
            gap: 1rem;
            flex: 1;
        }
        .panel, .summary-card, .pie-container {
            background: var(--bg-secondary);
            border: 1px solid var(--border);
            border-radius: 8px;
            padding: 1rem;
        }
        .summary-card .label {
            font-size: 0.75rem;
            color: var(--text-secondary);
            text-transform: uppercase;
            letter-spacing: 0.05em;
        }
        .summary-card .value { font-size: 1.75rem; font-weight: 600; }
        .value.success { color: var(--success); }
        .value.warning { color: var(--warning); }
        .value.danger { color: var(--danger); }
        .table-header { display: flex; justify-content: space-between; align-items: center; margin-bottom: 1rem; }
        .filter-input {
            background: var(--bg-tertiary);
            border: 1px solid var(--border);
            border-radius: 4px;
            padding: 0.5rem 0.75rem;
            color: var(--text-primary);
        }
        table { width: 100%; border-collapse: collapse; font-size: 0.875rem; }
        th, td { padding: 0.75rem 1rem; text-align: left; border-bottom: 1px solid var(--border); }
        th { background: var(--bg-tertiary); color: var(--text-secondary); cursor: pointer; user-select: none; }
        th.sorted-asc::after { content: ' ▲'; }
        th.sorted-desc::after { content: ' ▼'; }
        tr:hover { background: var(--bg-tertiary); }
        .badge { padding: 0.125rem 0.5rem; border-radius: 9999px; font-size: 0.75rem; }
        .badge.identical, .badge.unchanged { background: rgba(63, 185, 80, 0.2); color: var(--success); }
        .badge.changed { background: rgba(210, 153, 34, 0.2); color: var(--warning); }
        .badge.error { background: rgba(248, 81, 73, 0.2); color: var(--danger); }
        .change-bar {
            display: inline-block;
            width: 60px;
            height: 6px;
            background: var(--bg-tertiary);
            border-radius: 3px;
            overflow: hidden;
            vertical-align: middle;
            margin-right: 0.5rem;
        }
        .change-bar .fill { height: 100%; background: var(--warning); }
        .path { font-family: ui-monospace, Menlo, Consolas, monospace; font-size: 0.8125rem; }
        .btn {
            background: var(--accent);
            color: var(--bg-primary);
            border: none;
            border-radius: 4px;
            padding: 0.25rem 0.5rem;
            font-size: 0.75rem;
            cursor: pointer;
        }
        .annotated { white-space: pre-wrap; word-break: break-word; font-family: ui-monospace, Menlo, Consolas, monospace; }
        mark.add { background: rgba(63, 185, 80, 0.35); color: inherit; }
        strong.original-upper { color: var(--warning); }
        .modal-overlay {
            display: none;
            position: fixed;
            inset: 0;
            background: rgba(0, 0, 0, 0.8);
            padding: 2rem;
            overflow-y: auto;
        }
        .modal-overlay.active { display: flex; justify-content: center; }
        .modal { background: var(--bg-secondary); border-radius: 8px; width: 100%; max-width: 1000px; padding: 1rem; }
        .modal-header { display: flex; justify-content: space-between; margin-bottom: 1rem; }
        .modal-close { background: transparent; border: none; color: var(--text-secondary); font-size: 1.5rem; cursor: pointer; }
        a { color: var(--accent); text-decoration: none; }
    "#;

fn build_dashboard(summary: &BatchSummary) -> String {
    let total = (summary.reports_compared + summary.error_reports).max(1) as f64;
    let unchanged_deg = summary.unchanged_reports as f64 / total * 360.0;
    let changed_deg = unchanged_deg + summary.changed_reports as f64 / total * 360.0;

    format!(
        r#"
        <div class="dashboard">
            <div class="pie-container">
                <div class="pie-chart" style="background: conic-gradient(
                    var(--success) 0deg {unchanged_deg:.1}deg,
                    var(--warning) {unchanged_deg:.1}deg {changed_deg:.1}deg,
                    var(--danger) {changed_deg:.1}deg 360deg
                );"></div>
                <div><span class="legend-dot unchanged"></span>Unchanged ({unchanged})</div>
                <div><span class="legend-dot changed"></span>Changed ({changed})</div>
                <div><span class="legend-dot error"></span>Errors ({errors})</div>
            </div>
            <div class="summary-grid">
                <div class="summary-card"><div class="label">Reports Indexed</div><div class="value">{indexed}</div></div>
                <div class="summary-card"><div class="label">Compared</div><div class="value">{compared}</div></div>
                <div class="summary-card"><div class="label">Unchanged</div><div class="value success">{unchanged}</div></div>
                <div class="summary-card"><div class="label">Changed</div><div class="value warning">{changed}</div></div>
                <div class="summary-card"><div class="label">Errors</div><div class="value{error_class}">{errors}</div></div>
                <div class="summary-card"><div class="label">Avg Changed</div><div class="value">{avg:.2}%</div></div>
                <div class="summary-card"><div class="label">Max Changed</div><div class="value">{max:.2}%</div></div>
            </div>
        </div>
"#,
        unchanged = summary.unchanged_reports,
        changed = summary.changed_reports,
        errors = summary.error_reports,
        indexed = summary.reports_indexed,
        compared = summary.reports_compared,
        error_class = if summary.error_reports > 0 { " danger" } else { "" },
        avg = summary.average_percent_changed,
        max = summary.max_percent_changed,
    )
}

fn build_metric_cards(metrics: &ComparisonMetrics) -> String {
    format!(
        r#"
        <div class="summary-grid" style="margin-bottom: 2rem">
            <div class="summary-card"><div class="label">Report Sentences</div><div class="value">{}</div></div>
            <div class="summary-card"><div class="label">Template Sentences</div><div class="value">{}</div></div>
            <div class="summary-card"><div class="label">Changed Sentences</div><div class="value warning">{}</div></div>
            <div class="summary-card"><div class="label">Changed</div><div class="value">{:.2}%</div></div>
        </div>
"#,
        metrics.total_report_sentences,
        metrics.total_template_sentences,
        metrics.changed_sentences,
        metrics.percent_changed
    )
}

fn build_results_table(results: &[BatchResult], artifact_base: Option<&str>) -> String {
    let mut html = String::from(
        r#"
        <div class="panel">
            <div class="table-header">
                <h2>Reports</h2>
                <input type="text" class="filter-input" id="table-filter" placeholder="Filter reports...">
            </div>
            <table id="results-table">
                <thead>
                    <tr>
                        <th data-sort="status">Status</th>
                        <th data-sort="report">Report</th>
                        <th data-sort="sentences">Sentences</th>
                        <th data-sort="changed">Changed</th>
                        <th data-sort="percent">% Changed</th>
                        <th>Actions</th>
                    </tr>
                </thead>
                <tbody>
"#,
    );

    for (idx, result) in results.iter().enumerate() {
        let status = status_label(result);
        let row = match result {
            BatchResult::Compared(r) => {
                let links = artifact_base
                    .map(|base| {
                        let (patch, annotated) = artifact_names(&r.report_path);
                        format!(
                            r#" <a href="{0}{1}" target="_blank">patch</a> <a href="{0}{2}" target="_blank">text</a>"#,
                            escape_html(base),
                            escape_html(&patch),
                            escape_html(&annotated)
                        )
                    })
                    .unwrap_or_default();
                format!(
                    r#"                    <tr>
                        <td><span class="badge {status}">{status}</span></td>
                        <td class="path">{path}</td>
                        <td>{report} / {template}</td>
                        <td>{changed}</td>
                        <td><span class="change-bar"><span class="fill" style="width: {width:.0}%"></span></span>{percent:.2}%</td>
                        <td><button class="btn" onclick="showReport({idx})">View</button>{links}</td>
                    </tr>
"#,
                    path = escape_html(&r.report_path),
                    report = r.metrics.total_report_sentences,
                    template = r.metrics.total_template_sentences,
                    changed = r.metrics.changed_sentences,
                    width = r.metrics.percent_changed.min(100.0),
                    percent = r.metrics.percent_changed,
                )
            }
            BatchResult::Error { report_path, error } => format!(
                r#"                    <tr>
                        <td><span class="badge error">{status}</span></td>
                        <td class="path">{}</td>
                        <td colspan="4">{}</td>
                    </tr>
"#,
                escape_html(report_path),
                escape_html(error),
            ),
        };
        html.push_str(&row);
    }

    html.push_str("                </tbody>\n            </table>\n        </div>\n");
    html
}

fn build_viewer_modal() -> String {
    r#"
        <div class="modal-overlay" id="viewer-modal">
            <div class="modal">
                <div class="modal-header">
                    <h3 id="modal-title">Annotated report</h3>
                    <button class="modal-close" onclick="closeReport()">&times;</button>
                </div>
                <pre class="annotated" id="modal-body"></pre>
            </div>
        </div>
"#
    .to_string()
}

#[derive(Serialize)]
struct ViewerEntry<'a> {
    path: &'a str,
    text: &'a str,
}

/// Annotated texts embedded as JSON, indexed like the table rows
fn build_viewer_data(results: &[BatchResult]) -> String {
    let entries: Vec<ViewerEntry> = results
        .iter()
        .map(|result| match result {
            BatchResult::Compared(r) => ViewerEntry {
                path: &r.report_path,
                text: &r.annotated,
            },
            BatchResult::Error { report_path, error } => ViewerEntry {
                path: report_path,
                text: error,
            },
        })
        .collect();
    let json = serde_json::to_string(&entries).unwrap_or_else(|_| "[]".to_string());
    format!(
        "\n    <script>\n        const reportData = {};\n    </script>\n",
        script_safe(&json)
    )
}

/// Keep embedded JSON from closing the surrounding script element
fn script_safe(json: &str) -> String {
    json.replace("</", "<\\/")
}

const BATCH_SCRIPT: &str = r#"
    <script>
        document.querySelectorAll('th[data-sort]').forEach(th => {
            th.addEventListener('click', () => {
                const tbody = th.closest('table').querySelector('tbody');
                const rows = Array.from(tbody.querySelectorAll('tr'));
                const col = th.cellIndex;
                const isAsc = th.classList.contains('sorted-asc');
                th.closest('tr').querySelectorAll('th').forEach(h => h.classList.remove('sorted-asc', 'sorted-desc'));
                th.classList.add(isAsc ? 'sorted-desc' : 'sorted-asc');
                rows.sort((a, b) => {
                    const aVal = (a.cells[col] || {}).textContent || '';
                    const bVal = (b.cells[col] || {}).textContent || '';
                    const aNum = parseFloat(aVal), bNum = parseFloat(bVal);
                    if (!isNaN(aNum) && !isNaN(bNum)) return isAsc ? bNum - aNum : aNum - bNum;
                    return isAsc ? bVal.localeCompare(aVal) : aVal.localeCompare(bVal);
                });
                rows.forEach(row => tbody.appendChild(row));
            });
        });

        document.getElementById('table-filter').addEventListener('input', (e) => {
            const filter = e.target.value.toLowerCase();
            document.querySelectorAll('#results-table tbody tr').forEach(row => {
                row.style.display = row.textContent.toLowerCase().includes(filter) ? '' : 'none';
            });
        });

        function showReport(idx) {
            const entry = reportData[idx];
            document.getElementById('modal-title').textContent = entry.path;
            document.getElementById('modal-body').textContent = entry.text;
            document.getElementById('viewer-modal').classList.add('active');
        }

        function closeReport() {
            document.getElementById('viewer-modal').classList.remove('active');
        }

        document.addEventListener('keydown', (e) => { if (e.key === 'Escape') closeReport(); });
        document.getElementById('viewer-modal').addEventListener('click', (e) => {
            if (e.target.id === 'viewer-modal') closeReport();
        });
    </script>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::calculate_summary;
    use crate::render::render_live;
    use crate::types::ReportComparisonResult;
    use tempfile::TempDir;

    fn results() -> Vec<BatchResult> {
        vec![
            BatchResult::Compared(ReportComparisonResult {
                linked_id: "aaaa:bbbb".to_string(),
                template_path: "plantilla.txt".to_string(),
                report_path: "informes/<uno>.txt".to_string(),
                metrics: ComparisonMetrics {
                    total_report_sentences: 2,
                    total_template_sentences: 1,
                    changed_sentences: 1,
                    percent_changed: 50.0,
                },
                annotated: "Texto. NUEVO </script>".to_string(),
                identical: false,
            }),
            BatchResult::Error {
                report_path: "roto.bin".to_string(),
                error: "Not valid UTF-8 text".to_string(),
            },
        ]
    }

    #[test]
    fn test_batch_report_content() {
        let results = results();
        let summary = calculate_summary(&results, 2);
        let html = build_batch_report(&results, &summary, "plantilla.txt", Some("artifacts/"));

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("informes/&lt;uno&gt;.txt"));
        assert!(html.contains("50.00%"));
        assert!(html.contains("href=\"artifacts/patches/informes/_uno_.txt.patch\""));
        assert!(html.contains("Not valid UTF-8 text"));
        assert!(html.contains("showReport(0)"));
        // embedded text must not terminate the data script early
        assert!(!html.contains("NUEVO </script>"));
        assert!(html.contains("NUEVO <\\/script>"));
    }

    #[test]
    fn test_write_batch_report() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.html");
        let results = results();
        let summary = calculate_summary(&results, 2);
        generate_batch_report(&results, &summary, "plantilla.txt", &path, None).unwrap();
        let html = fs::read_to_string(&path).unwrap();
        assert!(html.contains("ReportDiff Batch Report"));
        assert!(!html.contains("patch</a>"));
    }

    #[test]
    fn test_artifact_links_are_relative_to_html() {
        assert_eq!(
            artifact_href_base(
                Path::new("output/run_1/report.html"),
                Path::new("output/run_1/artifacts")
            ),
            "artifacts/"
        );
        assert_eq!(
            artifact_href_base(Path::new("report.html"), Path::new("artifacts")),
            "artifacts/"
        );
        assert_eq!(
            artifact_href_base(Path::new("output/report.html"), Path::new("output")),
            ""
        );
    }

    #[test]
    fn test_artifact_links_outside_html_folder() {
        let dir = TempDir::new().unwrap();
        let artifacts = dir.path().join("artefactos");
        fs::create_dir_all(&artifacts).unwrap();
        let html_dir = dir.path().join("html");
        fs::create_dir_all(&html_dir).unwrap();

        let base = artifact_href_base(&html_dir.join("report.html"), &artifacts);
        let expected = artifacts.canonicalize().unwrap();
        assert_eq!(
            base,
            format!("{}/", expected.to_string_lossy().replace('\\', "/"))
        );
    }

    #[test]
    fn test_comparison_page_escapes_text() {
        let comparison = DocumentComparison {
            text: "Hígado normal. QUISTE <2 CM>.".to_string(),
            metrics: ComparisonMetrics {
                total_report_sentences: 2,
                total_template_sentences: 1,
                changed_sentences: 1,
                percent_changed: 50.0,
            },
            alignments: Vec::new(),
        };
        let html = build_comparison_page("plantilla.txt", "informe.txt", &comparison);
        assert!(html.contains("QUISTE &lt;2 CM&gt;."));
        assert!(html.contains("50.00%"));
    }

    #[test]
    fn test_markup_page() {
        let html = markup_page("Live", &render_live("Bazo normal.", "Bazo de tamaño normal."));
        assert!(html.contains("<mark class=\"add\"> de tamaño</mark>"));
    }
}
