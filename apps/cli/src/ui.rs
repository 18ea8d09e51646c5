//! Terminal rendering for estimates and batch reports.

use colored::Colorize;
use prism_core::batch::is_known_model;
use prism_core::{BatchReport, BatchState, CostEstimate, JobOutcome};
use std::time::Duration;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Render a cost estimate as a breakdown table.
pub fn render_estimate(estimate: &CostEstimate, default_model: &str) {
    println!("{}", "Cost Estimate".bold());
    println!("{RULE}");
    println!("Default model: {}", default_model.cyan());
    println!("Jobs: {}  Images: {}", estimate.total_jobs, estimate.total_images);
    println!();

    for entry in &estimate.breakdown {
        let kind = if entry.is_edit { "edit" } else { "generate" };
        let pricing_note = if is_known_model(&entry.model) { "" } else { "  (default pricing)" };
        println!(
            "  {:<24} {:<8} {:>4} jobs {:>4} images  {}{}",
            entry.model,
            kind,
            entry.job_count,
            entry.image_count,
            format_cost_range(entry.cost_min, entry.cost_max),
            pricing_note.yellow()
        );
    }

    println!();
    println!(
        "Estimated total: {}",
        format_cost_range(estimate.estimated_cost_min, estimate.estimated_cost_max).bold()
    );
}

/// Render the summary report after a batch run.
pub fn render_summary(report: &BatchReport) {
    println!();
    match report.state {
        BatchState::Completed => println!("{}", "Batch Execution Complete".bold()),
        BatchState::TimedOut => println!("{}", "Batch Execution Timed Out".bold().yellow()),
    }
    println!("{RULE}");

    let total = report.total();
    println!("Total Jobs: {}", total);
    println!(
        "Succeeded: {} ({:.1}%)",
        report.succeeded.to_string().green(),
        percent(report.succeeded, total)
    );
    println!("Failed: {} ({:.1}%)", report.failed.to_string().red(), percent(report.failed, total));
    println!(
        "Cancelled: {} ({:.1}%)",
        report.cancelled.to_string().yellow(),
        percent(report.cancelled, total)
    );
    println!("Total Duration: {}", format_duration(Duration::from_millis(report.duration_ms)));
    println!(
        "Estimated Cost: {}",
        format_cost_range(report.estimate.estimated_cost_min, report.estimate.estimated_cost_max)
    );

    let problems: Vec<_> = report.results.iter().filter(|r| !r.outcome.is_completed()).collect();
    if !problems.is_empty() {
        println!("\nUnfinished Jobs:");
        for result in problems {
            match &result.outcome {
                JobOutcome::Failed { last_error, attempts, .. } => {
                    let error = last_error.red();
                    println!("  #{}: {} (after {} attempts)", result.index, error, attempts);
                }
                JobOutcome::Cancelled { reason } => {
                    println!("  #{}: cancelled ({})", result.index, reason.yellow());
                }
                JobOutcome::Completed { .. } => {}
            }
        }
    }

    let saved: usize = report
        .results
        .iter()
        .map(|r| match &r.outcome {
            JobOutcome::Completed { output_paths, .. } => output_paths.len(),
            _ => 0,
        })
        .sum();
    if saved > 0 {
        println!("\nImages saved: {}", saved);
    }
}

fn percent(part: usize, total: usize) -> f64 {
    if total > 0 { (part as f64 / total as f64) * 100.0 } else { 0.0 }
}

/// Format a cost range, collapsing it when both ends match.
fn format_cost_range(min: f64, max: f64) -> String {
    if (max - min).abs() < f64::EPSILON {
        format!("${:.3}", min)
    } else {
        format!("${:.3} - ${:.3}", min, max)
    }
}

/// Format duration as human-readable string.
fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let minutes = total_secs / 60;
    let seconds = total_secs % 60;

    if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else if total_secs > 0 {
        format!("{}s", seconds)
    } else {
        format!("{}ms", duration.as_millis())
    }
}
