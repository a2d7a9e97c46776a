//! Plain-text rendering for run outcomes, submissions, reports and history.

use std::collections::BTreeSet;

use chulseok_core::collab::RunLogEntry;
use chulseok_core::normalize::week_label;
use chulseok_core::{AttendanceReport, RunOutcome, ValidationReport, WeeklySubmissions};

const MAX_LIST_ITEMS: usize = 20;

// ── Public API ──

pub fn print_outcome(outcome: &RunOutcome) {
    let status = if outcome.success { "ok" } else { "FAILED" };
    println!("=== run {} ({status}) ===", outcome.run_id);
    println!();

    println!("Summary");
    println!("  {:<18} {}", "posts", outcome.summary.total_posts);
    println!("  {:<18} {}", "weeks", outcome.summary.weeks_processed);
    println!("  {:<18} {}", "participants", outcome.summary.participants.len());
    println!("  {:<18} {}", "updated cells", outcome.summary.updated_cells);
    if let Some(err) = &outcome.error {
        println!("  {:<18} {}", "error", err);
    }
    println!();

    if !outcome.updates.is_empty() {
        println!("Updates ({}):", outcome.updates.len());
        for line in truncated(outcome.updates.iter().map(|u| format!("{} ← {}", u.address, u.value))) {
            println!("  {line}");
        }
        println!();
    }

    if !outcome.warnings.is_empty() {
        println!("Unresolved ({}):", outcome.warnings.len());
        for line in truncated(outcome.warnings.iter().map(ToString::to_string)) {
            println!("  {line}");
        }
        println!();
    }
}

pub fn print_submissions(submissions: &WeeklySubmissions) {
    println!(
        "=== {} submissions over {} weeks ===",
        submissions.submission_count(),
        submissions.week_count()
    );
    for line in submission_lines(submissions) {
        println!("  {line}");
    }
    println!();
}

pub fn print_issues(report: &ValidationReport) {
    if report.passed() {
        println!("Validation passed");
        return;
    }
    println!("Validation issues ({}):", report.issues.len());
    for issue in &report.issues {
        println!("  - {issue}");
    }
}

pub fn print_report(report: &AttendanceReport) {
    if report.weeks.is_empty() {
        println!("(no weeks with submissions)");
        return;
    }
    for line in report_lines(report) {
        println!("{line}");
    }
}

pub fn print_unregistered(names: &BTreeSet<&str>) {
    if names.is_empty() {
        return;
    }
    println!();
    println!("Not on roster ({}):", names.len());
    for line in truncated(names.iter().map(|n| n.to_string())) {
        println!("  {line}");
    }
}

pub fn print_history(runs: &[RunLogEntry]) {
    if runs.is_empty() {
        println!("(no runs recorded)");
        return;
    }
    for run in runs {
        println!("{}", history_line(run));
    }
}

// ── Line builders ──

fn submission_lines(submissions: &WeeklySubmissions) -> Vec<String> {
    submissions
        .iter()
        .map(|(week, names)| {
            let names: Vec<&str> = names.iter().map(String::as_str).collect();
            format!("{:<8} {}", week_label(week), names.join(", "))
        })
        .collect()
}

fn report_lines(report: &AttendanceReport) -> Vec<String> {
    let mut header = format!("{:<16}", "nickname");
    for week in &report.weeks {
        header.push_str(&format!(" {:>5}", week_label(*week)));
    }
    header.push_str("   rate");

    let mut lines = vec![header];
    for row in &report.rows {
        let mut line = format!("{:<16}", row.nickname);
        for week in &report.weeks {
            let mark = row.weeks.get(week).map_or("-", |s| s.mark());
            line.push_str(&format!(" {mark:>5}"));
        }
        line.push_str(&format!(" {:>6}", percent(row.rate())));
        lines.push(line);
    }
    lines
}

fn history_line(run: &RunLogEntry) -> String {
    let started = run.started_at.format("%Y-%m-%d %H:%M:%S");
    let state = match (run.is_complete(), run.success) {
        (false, _) => "incomplete",
        (true, true) => "ok",
        (true, false) => "failed",
    };
    let mut line = format!("{started}  {:<10} {}", state, run.run_id);
    if let Some(results) = &run.results {
        line.push_str(&format!(
            "  posts={} weeks={} cells={}",
            results.total_posts, results.weeks_processed, results.updated_cells
        ));
    }
    if let Some(err) = &run.error {
        line.push_str(&format!("  error: {err}"));
    }
    line
}

fn percent(rate: f64) -> String {
    format!("{:.0}%", rate * 100.0)
}

fn truncated(items: impl ExactSizeIterator<Item = String>) -> Vec<String> {
    let total = items.len();
    let mut lines: Vec<String> = items.take(MAX_LIST_ITEMS).collect();
    if total > MAX_LIST_ITEMS {
        lines.push(format!("... and {} more", total - MAX_LIST_ITEMS));
    }
    lines
}
