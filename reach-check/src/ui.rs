//! Display logic for the reach-check CLI.
//!
//! Result lines are printed as probes settle: plain text by default, colored
//! lines with a progress prefix in `--pretty` mode, and newline-delimited JSON
//! with `--json`. Uses only the `console` crate for styling.

use console::{pad_str, style, Alignment};
use reach_check_lib::{Domain, ProbeResult, ProgressEvent, ProgressReporter, Summary};
use serde::Serialize;

/// How results are rendered on stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Plain,
    Pretty,
    Json,
}

/// One line of `--json` output.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JsonLine<'a> {
    Result(&'a ProgressEvent),
    Summary {
        total: usize,
        checked: usize,
        accessible: usize,
        blocked: usize,
        cancelled: bool,
        elapsed_ms: u64,
    },
}

impl<'a> JsonLine<'a> {
    pub fn summary(summary: &Summary) -> Self {
        JsonLine::Summary {
            total: summary.total,
            checked: summary.checked,
            accessible: summary.accessible,
            blocked: summary.blocked,
            cancelled: summary.cancelled,
            elapsed_ms: summary.elapsed.as_millis() as u64,
        }
    }
}

/// Progress reporter that prints every settled domain.
pub struct ResultPrinter {
    mode: OutputMode,
    blocked_only: bool,
}

impl ResultPrinter {
    pub fn new(mode: OutputMode, blocked_only: bool) -> Self {
        Self { mode, blocked_only }
    }

    /// Print the closing summary for the run.
    pub fn finish(&self, summary: &Summary) {
        match self.mode {
            OutputMode::Json => print_json(&JsonLine::summary(summary)),
            OutputMode::Pretty => {
                println!();
                print_summary(summary);
            }
            OutputMode::Plain => {
                println!();
                println!("{}", format_summary_line(summary));
            }
        }
    }
}

impl ProgressReporter for ResultPrinter {
    fn on_result(&mut self, event: &ProgressEvent) {
        if self.blocked_only && event.result.is_accessible() {
            return;
        }

        match self.mode {
            OutputMode::Json => print_json(&JsonLine::Result(event)),
            OutputMode::Pretty => print_result(event),
            OutputMode::Plain => println!("{}", format_plain_line(event)),
        }
    }
}

fn print_json(line: &JsonLine<'_>) {
    match serde_json::to_string(line) {
        Ok(json) => println!("{}", json),
        Err(e) => tracing::warn!(error = %e, "failed to serialize output line"),
    }
}

// ── Header ───────────────────────────────────────────────────────────────────

/// Print a styled header at the start of a pretty run.
pub fn print_header(file: &str, domain_count: usize, concurrency: usize, strict: bool) {
    println!(
        "{} {} {}",
        style("reach-check").bold(),
        style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim(),
        style(format!(
            "- Checking {} domain{} from {}",
            domain_count,
            if domain_count == 1 { "" } else { "s" },
            file
        ))
        .dim(),
    );

    let mut meta_parts = vec![format!("Concurrency: {}", concurrency)];
    if strict {
        meta_parts.push("Strict status".to_string());
    }
    println!("{}", style(meta_parts.join(" | ")).dim());
    println!();
}

// ── Single result line ───────────────────────────────────────────────────────

/// Format a result for plain output, e.g. `example.com accessible`.
pub fn format_plain_line(event: &ProgressEvent) -> String {
    format!("{} {}", event.domain, event.result)
}

/// Format the `[checked/total] pct%` prefix of a pretty result line.
pub fn format_progress_prefix(event: &ProgressEvent) -> String {
    format!("[{}/{}] {:>3}%", event.checked, event.total, event.percent())
}

/// Print a single result with colors and alignment.
pub fn print_result(event: &ProgressEvent) {
    let domain_width = 40;
    let padded_domain = pad_str(event.domain.as_str(), domain_width, Alignment::Left, Some(".."));
    let status = match event.result {
        ProbeResult::Accessible => style("ACCESSIBLE").green().bold(),
        ProbeResult::Blocked => style("BLOCKED").red().bold(),
    };

    println!(
        "  {} {}  {}",
        style(format_progress_prefix(event)).dim(),
        style(&padded_domain).white(),
        status,
    );
}

// ── Dry run ──────────────────────────────────────────────────────────────────

/// Print the domains a run would check, one per line.
pub fn print_domains(domains: &[Domain]) {
    for domain in domains {
        println!("{}", domain);
    }
}

// ── Summary ──────────────────────────────────────────────────────────────────

/// Format the unstyled one-line summary.
pub fn format_summary_line(summary: &Summary) -> String {
    let mut line = format!(
        "{} of {} domain{} checked in {:.1}s: {} accessible, {} blocked",
        summary.checked,
        summary.total,
        if summary.total == 1 { "" } else { "s" },
        summary.elapsed.as_secs_f64(),
        summary.accessible,
        summary.blocked,
    );
    if summary.cancelled {
        line.push_str(" (cancelled)");
    }
    line
}

/// Print the final summary bar with colored counts.
pub fn print_summary(summary: &Summary) {
    println!(
        "  {}",
        style("────────────────────────────────────────────────────").dim()
    );
    println!(
        "  {}/{} domain{} in {:.1}s  {}  {}  {}  {}",
        style(summary.checked).bold(),
        summary.total,
        if summary.total == 1 { "" } else { "s" },
        summary.elapsed.as_secs_f64(),
        style("|").dim(),
        style(format!("{} accessible", summary.accessible)).green(),
        style("|").dim(),
        style(format!("{} blocked", summary.blocked)).red(),
    );
    if summary.cancelled {
        println!(
            "  {}",
            style(format!(
                "Cancelled, {} domain{} not checked",
                summary.total - summary.checked,
                if summary.total - summary.checked == 1 { "" } else { "s" }
            ))
            .yellow()
        );
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
