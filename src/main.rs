//! ReportDiff - template vs report comparison tool (CLI)
//!
//! This is a thin CLI wrapper around the report_diff library.

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use report_diff::{
    export::{calculate_summary, load_results_from_jsonl, status_label},
    index::read_text,
    render::{Markup, SpanKind},
    report::{generate_batch_report, generate_comparison_page, markup_page},
    settings::{LastState, Settings},
    types::{
        BatchConfig, BatchResult, BatchSummary, ComparisonMetrics, EngineConfig,
        SentenceSplitter, DEFAULT_CONTAINMENT_THRESHOLD, DEFAULT_SIMILARITY_THRESHOLD,
        DEFAULT_WINDOW_SIZE,
    },
    ComparisonEngine, EditorSession, NoopProgressReporter, ProgressReporter,
};

/// ReportDiff - mark what a report adds or changes relative to its template
#[derive(Parser)]
#[command(name = "ReportDiff")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Comparison tunables
#[derive(Args, Clone)]
struct EngineArgs {
    /// Minimum coverage in both directions for containment equality
    #[arg(long, default_value_t = DEFAULT_CONTAINMENT_THRESHOLD)]
    containment: f64,

    /// Minimum blended word/bigram similarity for equality
    #[arg(long, default_value_t = DEFAULT_SIMILARITY_THRESHOLD)]
    similarity: f64,

    /// Template paragraphs searched on each side of the alignment cursor
    #[arg(long, default_value_t = DEFAULT_WINDOW_SIZE)]
    window: usize,

    /// Sentence boundary strategy
    #[arg(long, value_enum, default_value = "unicode")]
    splitter: SentenceSplitter,
}

impl EngineArgs {
    fn to_config(&self) -> Result<EngineConfig> {
        Ok(EngineConfig::new(self.containment, self.similarity, self.window)?
            .with_splitter(self.splitter))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compare one report against its template
    Compare {
        /// Template file
        template: PathBuf,

        /// Report file
        report: PathBuf,

        /// Print the full comparison (text, metrics, alignment) as JSON
        #[arg(long)]
        json: bool,

        /// Also write an HTML page with the annotated report
        #[arg(long)]
        html: Option<PathBuf>,

        /// Save both texts as the last-state snapshot
        #[arg(long)]
        save_state: Option<PathBuf>,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Recover the last saved report, or re-run its comparison
    Recover {
        /// Snapshot written by `compare --save-state`
        state: PathBuf,

        /// Compare the saved template and report instead of printing the report
        #[arg(long)]
        compare: bool,

        /// Write the recovered report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the comparison as JSON (with --compare)
        #[arg(long)]
        json: bool,

        /// Also write an HTML page (with --compare)
        #[arg(long)]
        html: Option<PathBuf>,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Show live editor markup of an edited text against its base
    Live {
        /// Base (frozen) text file
        base: PathBuf,

        /// Current (edited) text file
        current: PathBuf,

        /// Write the markup as an HTML page instead of printing it
        #[arg(long)]
        html: Option<PathBuf>,
    },

    /// Rewrite a text in report casing
    Case {
        /// Text file to rewrite
        file: PathBuf,

        /// Keep lines ending in ':' fully upper-case
        #[arg(long, default_value_t = true, action = ArgAction::Set)]
        keep_headings: bool,

        /// Settings file with words to keep upper-case
        #[arg(long)]
        settings: Option<PathBuf>,

        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show or edit the words report casing keeps upper-case
    Settings {
        /// Settings file
        file: PathBuf,

        /// Words to add (comma-separated)
        #[arg(long, value_delimiter = ',')]
        add: Vec<String>,

        /// Words to remove (comma-separated)
        #[arg(long, value_delimiter = ',')]
        remove: Vec<String>,

        /// Restore the default word list
        #[arg(long)]
        reset: bool,
    },

    /// Compare one template against every report in a folder
    Batch {
        /// Template file
        template: PathBuf,

        /// Report file or folder
        reports: PathBuf,

        /// Exclude patterns (glob syntax, e.g., "*.tmp", "drafts/")
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,

        /// Output JSONL file path
        #[arg(long)]
        out_jsonl: Option<PathBuf>,

        /// Output CSV summary path
        #[arg(long)]
        out_csv: Option<PathBuf>,

        /// Output HTML report path
        #[arg(long)]
        out_html: Option<PathBuf>,

        /// Output directory for patches and annotated texts
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Base directory for automatic results (each run creates a unique subfolder)
        #[arg(short = 'B', long, default_value = "output")]
        results_base: PathBuf,

        /// List every report, not only changed ones
        #[arg(short, long)]
        verbose: bool,

        /// No progress bar
        #[arg(short, long)]
        quiet: bool,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Generate the batch HTML report from saved results
    Report {
        /// Input JSONL file with batch results
        #[arg(short, long)]
        input: PathBuf,

        /// Output HTML file path
        #[arg(long)]
        html: PathBuf,

        /// Path to artifacts directory (for linking)
        #[arg(long)]
        artifacts: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Initialize logger (controlled by RUST_LOG env var)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compare {
            template,
            report,
            json,
            html,
            save_state,
            engine,
        } => run_compare(&template, &report, json, html.as_deref(), save_state.as_deref(), &engine)?,

        Commands::Recover {
            state,
            compare,
            output,
            json,
            html,
            engine,
        } => run_recover(
            &state,
            compare,
            output.as_deref(),
            json,
            html.as_deref(),
            &engine,
        )?,

        Commands::Live {
            base,
            current,
            html,
        } => run_live(&base, &current, html.as_deref())?,

        Commands::Case {
            file,
            keep_headings,
            settings,
            output,
        } => run_case(&file, keep_headings, settings.as_deref(), output.as_deref())?,

        Commands::Settings {
            file,
            add,
            remove,
            reset,
        } => run_settings(&file, &add, &remove, reset)?,

        Commands::Batch {
            template,
            reports,
            exclude,
            out_jsonl,
            out_csv,
            out_html,
            out_dir,
            results_base,
            verbose,
            quiet,
            engine,
        } => {
            let config = BatchConfig {
                engine: engine.to_config()?,
                exclude_patterns: exclude,
                results_base,
                output_jsonl: out_jsonl,
                output_csv: out_csv,
                output_html: out_html,
                output_dir: out_dir,
                verbose,
            };
            run_batch(&template, &reports, &config, quiet)?;
        }

        Commands::Report {
            input,
            html,
            artifacts,
        } => run_report(&input, &html, artifacts.as_deref())?,
    }

    Ok(())
}

/// CLI-specific progress reporter using indicatif
struct CliProgressReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliProgressReporter {
    fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }
}

impl ProgressReporter for CliProgressReporter {
    fn start(&self, total: u64, message: &str) {
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("█▓░"),
        );
        pb.set_message(message.to_string());
        if let Ok(mut bar) = self.bar.lock() {
            *bar = Some(pb);
        }
    }

    fn inc(&self, delta: u64) {
        if let Ok(bar) = self.bar.lock() {
            if let Some(ref pb) = *bar {
                pb.inc(delta);
            }
        }
    }

    fn finish(&self, message: &str) {
        if let Ok(bar) = self.bar.lock() {
            if let Some(ref pb) = *bar {
                pb.finish_with_message(message.to_string());
            }
        }
    }
}

fn run_compare(
    template_path: &Path,
    report_path: &Path,
    json: bool,
    html: Option<&Path>,
    save_state: Option<&Path>,
    engine: &EngineArgs,
) -> Result<()> {
    let template = read_text(template_path)?;
    let report = read_text(report_path)?;

    if let Some(path) = save_state {
        LastState::new(template.as_str(), report.as_str()).save(path)?;
    }
    show_comparison(
        &template_path.display().to_string(),
        &report_path.display().to_string(),
        &template,
        &report,
        json,
        html,
        engine,
    )
}

fn run_recover(
    state_path: &Path,
    compare: bool,
    output: Option<&Path>,
    json: bool,
    html: Option<&Path>,
    engine: &EngineArgs,
) -> Result<()> {
    if compare {
        let state = LastState::restore(state_path)
            .with_context(|| format!("No saved state in {}", state_path.display()))?;
        return show_comparison(
            "template (saved)",
            "report (saved)",
            &state.template,
            &state.report,
            json,
            html,
            engine,
        );
    }

    let report = LastState::recover_report(state_path)
        .with_context(|| format!("No report to recover in {}", state_path.display()))?;
    match output {
        Some(path) => {
            fs::write(path, &report)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{} Last report recovered to {}", style("✓").green(), path.display());
        }
        None => println!("{}", report),
    }
    Ok(())
}

fn show_comparison(
    template_name: &str,
    report_name: &str,
    template: &str,
    report: &str,
    json: bool,
    html: Option<&Path>,
    engine: &EngineArgs,
) -> Result<()> {
    let config = BatchConfig {
        engine: engine.to_config()?,
        ..Default::default()
    };
    let comparison = ComparisonEngine::new(&config).compare(template, report);

    if let Some(path) = html {
        generate_comparison_page(template_name, report_name, &comparison, path)?;
    }

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&comparison).context("Failed to serialize comparison")?
        );
        return Ok(());
    }

    println!("{}", style("ReportDiff").cyan().bold());
    println!("{}", style("═".repeat(60)).dim());
    println!("{}", comparison.text);
    println!("\n{}", style("Metrics").cyan().bold());
    println!("{}", style("─".repeat(60)).dim());
    display_metrics_table(&comparison.metrics);
    if let Some(path) = html {
        println!(
            "\n{} HTML written to {}",
            style("✓").green(),
            style(path.display()).white().bold()
        );
    }
    Ok(())
}

fn run_live(base_path: &Path, current_path: &Path, html: Option<&Path>) -> Result<()> {
    let base = read_text(base_path)?;
    let current = read_text(current_path)?;

    let mut session = EditorSession::open(base);
    let markup = session.render(&current);

    match html {
        Some(path) => {
            let title = format!("{} (live)", current_path.display());
            fs::write(path, markup_page(&title, &markup))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{} Markup written to {}", style("✓").green(), path.display());
        }
        None => println!("{}", styled_markup(&markup)),
    }
    Ok(())
}

/// Terminal rendering of live markup
fn styled_markup(markup: &Markup) -> String {
    markup
        .spans()
        .iter()
        .map(|span| match span.kind {
            SpanKind::Plain => span.text.clone(),
            SpanKind::NewEdit => style(&span.text).green().underlined().to_string(),
            SpanKind::PriorEmphasis => style(&span.text).yellow().bold().to_string(),
        })
        .collect()
}

fn run_case(
    file: &Path,
    keep_headings: bool,
    settings_path: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let text = read_text(file)?;
    let settings = settings_path.map(Settings::load).unwrap_or_default();

    let session = EditorSession::open(text.as_str());
    let cased = session.normalize_case(&text, keep_headings, &settings);

    match output {
        Some(path) => fs::write(path, cased)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{}", cased),
    }
    Ok(())
}

fn run_settings(file: &Path, add: &[String], remove: &[String], reset: bool) -> Result<()> {
    let mut settings = if reset {
        Settings::default()
    } else {
        Settings::load(file)
    };

    let before = settings.clone();
    settings
        .excluded_words
        .extend(Settings::from_words(add).excluded_words);
    for word in Settings::from_words(remove).excluded_words {
        settings.excluded_words.remove(&word);
    }

    if reset || settings != before {
        settings.save(file)?;
        println!("{} Settings saved to {}", style("✓").green(), file.display());
    }

    println!(
        "{} {}",
        style("Preserved words:").dim(),
        settings
            .excluded_words
            .iter()
            .map(|w| w.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(())
}

fn run_batch(template: &Path, reports: &Path, config: &BatchConfig, quiet: bool) -> Result<()> {
    println!("{}", style("ReportDiff").cyan().bold());
    println!("{}", style("═".repeat(60)).dim());

    let cli_progress = CliProgressReporter::new();
    let progress: &dyn ProgressReporter = if quiet {
        &NoopProgressReporter
    } else {
        &cli_progress
    };

    let engine = ComparisonEngine::new(config).with_progress(progress);
    let outcome = engine.run_batch(template, reports)?;

    println!("\n{}", style("Results Summary").cyan().bold());
    println!("{}", style("─".repeat(60)).dim());
    display_summary_table(&outcome.summary);

    if !outcome.results.is_empty() {
        println!("\n{}", style("Reports").cyan().bold());
        println!("{}", style("─".repeat(60)).dim());
        display_results_table(&outcome.results, config.verbose);
    }

    println!("\n{}", style("Exports").cyan().bold());
    println!("{}", style("─".repeat(60)).dim());
    let results_dir = outcome
        .results_dir
        .canonicalize()
        .unwrap_or_else(|_| outcome.results_dir.clone());
    println!(
        "  {} {}",
        style("Results Directory:").dim(),
        style(results_dir.display()).white().bold()
    );
    println!(
        "  {} {}",
        style("HTML Report:").dim(),
        style(outcome.exports.html.display()).white()
    );

    println!("\n{}", style("✓ Complete").green().bold());
    Ok(())
}

fn run_report(input: &Path, html: &Path, artifacts: Option<&Path>) -> Result<()> {
    println!("{}", style("ReportDiff Report Generator").cyan().bold());
    println!("{}", style("═".repeat(60)).dim());

    println!("\nLoading results from {}...", input.display());
    let results = load_results_from_jsonl(input)?;
    println!("  Loaded {} results", style(results.len()).green());

    let template = results
        .iter()
        .find_map(|r| match r {
            BatchResult::Compared(c) => Some(c.template_path.clone()),
            BatchResult::Error { .. } => None,
        })
        .unwrap_or_default();
    let summary = calculate_summary(&results, results.len());

    generate_batch_report(&results, &summary, &template, html, artifacts)?;
    println!("\n{} Report generated: {}", style("✓").green(), html.display());
    Ok(())
}

fn display_metrics_table(metrics: &ComparisonMetrics) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS);
    table.set_header(vec![
        Cell::new("Metric").fg(Color::Cyan),
        Cell::new("Value").fg(Color::Cyan),
    ]);
    table.add_row(vec![
        Cell::new("Report sentences"),
        Cell::new(metrics.total_report_sentences),
    ]);
    table.add_row(vec![
        Cell::new("Template sentences"),
        Cell::new(metrics.total_template_sentences),
    ]);
    table.add_row(vec![
        Cell::new("Changed sentences"),
        Cell::new(metrics.changed_sentences).fg(Color::Yellow),
    ]);
    table.add_row(vec![
        Cell::new("Changed"),
        Cell::new(format!("{:.2}%", metrics.percent_changed)).fg(change_color(metrics.percent_changed)),
    ]);
    println!("{table}");
}

/// Display summary statistics table
fn display_summary_table(summary: &BatchSummary) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS);

    table.set_header(vec![
        Cell::new("Metric").fg(Color::Cyan),
        Cell::new("Value").fg(Color::Cyan),
        Cell::new("Status").fg(Color::Cyan),
    ]);

    table.add_row(vec![
        Cell::new("Reports Compared"),
        Cell::new(summary.reports_compared).fg(Color::White),
        Cell::new(""),
    ]);

    let unchanged_status = if summary.unchanged_reports == summary.reports_compared
        && summary.reports_compared > 0
    {
        "✓ All follow the template"
    } else {
        ""
    };
    table.add_row(vec![
        Cell::new("Unchanged"),
        Cell::new(summary.unchanged_reports).fg(Color::Green),
        Cell::new(unchanged_status).fg(Color::Green),
    ]);

    let changed_status = if summary.changed_reports > 0 {
        "≠ Review needed"
    } else {
        ""
    };
    table.add_row(vec![
        Cell::new("Changed"),
        Cell::new(summary.changed_reports).fg(Color::Yellow),
        Cell::new(changed_status).fg(Color::Yellow),
    ]);

    let error_color = if summary.error_reports > 0 {
        Color::Red
    } else {
        Color::White
    };
    let error_status = if summary.error_reports > 0 {
        "✗ Check logs"
    } else {
        ""
    };
    table.add_row(vec![
        Cell::new("Errors"),
        Cell::new(summary.error_reports).fg(error_color),
        Cell::new(error_status).fg(error_color),
    ]);

    table.add_row(vec![
        Cell::new("Avg Changed"),
        Cell::new(format!("{:.2}%", summary.average_percent_changed))
            .fg(change_color(summary.average_percent_changed)),
        Cell::new(change_bar(summary.average_percent_changed))
            .fg(change_color(summary.average_percent_changed)),
    ]);
    table.add_row(vec![
        Cell::new("Max Changed"),
        Cell::new(format!("{:.2}%", summary.max_percent_changed))
            .fg(change_color(summary.max_percent_changed)),
        Cell::new(change_bar(summary.max_percent_changed))
            .fg(change_color(summary.max_percent_changed)),
    ]);

    println!("{table}");
}

fn change_color(percent: f64) -> Color {
    if percent <= 10.0 {
        Color::Green
    } else if percent <= 50.0 {
        Color::Yellow
    } else {
        Color::Red
    }
}

/// Create a visual change bar
fn change_bar(percent: f64) -> String {
    let filled = ((percent / 10.0).round() as usize).min(10);
    format!("[{}{}]", "█".repeat(filled), "░".repeat(10 - filled))
}

/// Display per-report rows, most changed first
fn display_results_table(results: &[BatchResult], verbose: bool) {
    let mut rows: Vec<&BatchResult> = results
        .iter()
        .filter(|r| verbose || !matches!(status_label(r), "unchanged" | "identical"))
        .collect();
    rows.sort_by(|a, b| {
        b.percent_changed()
            .unwrap_or(f64::MAX)
            .partial_cmp(&a.percent_changed().unwrap_or(f64::MAX))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    if rows.is_empty() {
        println!(
            "  {} No changed reports. Use --verbose to list all",
            style("✓").green()
        );
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS);
    table.set_header(vec!["Report", "Status", "Sentences", "Changed", "% Changed"]);

    let limit = if verbose { rows.len() } else { 15.min(rows.len()) };
    for result in rows.iter().take(limit) {
        match result {
            BatchResult::Compared(r) => {
                table.add_row(vec![
                    Cell::new(truncate_path(&r.report_path, 40)),
                    Cell::new(status_label(result)),
                    Cell::new(format!(
                        "{} / {}",
                        r.metrics.total_report_sentences, r.metrics.total_template_sentences
                    )),
                    Cell::new(r.metrics.changed_sentences),
                    Cell::new(format!("{:.2}%", r.metrics.percent_changed))
                        .fg(change_color(r.metrics.percent_changed)),
                ]);
            }
            BatchResult::Error { report_path, error } => {
                table.add_row(vec![
                    Cell::new(truncate_path(report_path, 40)),
                    Cell::new("error").fg(Color::Red),
                    Cell::new(truncate_path(error, 30)).fg(Color::Red),
                    Cell::new("-"),
                    Cell::new("-"),
                ]);
            }
        }
    }
    if rows.len() > limit {
        println!("{table}");
        println!(
            "  {} ({} more...) Use --verbose to list all",
            style("...").dim(),
            rows.len() - limit
        );
        return;
    }
    println!("{table}");
}

/// Truncate a path for display
fn truncate_path(path: &str, max_len: usize) -> String {
    let count = path.chars().count();
    if count <= max_len {
        path.to_string()
    } else {
        let tail: String = path.chars().skip(count - max_len + 3).collect();
        format!("...{}", tail)
    }
}
