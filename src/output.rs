use std::error::Error;

use console::Style;

use crate::improvement::ApplyOutcome;
use crate::mutants::MutationRecord;
use crate::orchestrator::{ItemOutcome, PipelineError, RunStats};
use crate::report::ReportTotals;

pub fn print_error(msg: &str) {
    let style = Style::new().red().bold();
    eprintln!("{} {}", style.apply_to("✗"), msg);
}

pub fn print_success(msg: &str) {
    let style = Style::new().green().bold();
    println!("{} {}", style.apply_to("✓"), msg);
}

pub fn print_warning(msg: &str) {
    let style = Style::new().yellow().bold();
    println!("{} {}", style.apply_to("!"), msg);
}

pub fn print_info(msg: &str) {
    let dim = Style::new().dim();
    println!("  {} {}", dim.apply_to("·"), msg);
}

pub fn print_banner(repo_url: &str, provider: &str, base_branch: &str) {
    let bold = Style::new().bold();
    println!("{}", bold.apply_to("=== Mutant Killer ==="));
    println!("Repository: {repo_url}");
    println!("Provider: {provider}");
    println!("Base branch: {base_branch}");
    println!();
}

pub fn print_step(number: usize, title: &str) {
    let style = Style::new().cyan().bold();
    println!("{} {}", style.apply_to(format!("Step {number}:")), title);
}

pub fn print_mutant_header(index: usize, total: usize, m: &MutationRecord) {
    let ref_style = Style::new().cyan().bold();
    let dim = Style::new().dim();
    println!(
        "{} {}",
        ref_style.apply_to(format!("--- Mutant {index}/{total} ---")),
        m.class,
    );
    println!(
        "  {} {} (line {})",
        dim.apply_to("method"),
        m.method,
        m.line
    );
    println!("  {} {}", dim.apply_to("type"), m.mutator_description());
}

pub fn print_preview(preview: &str) {
    println!();
    for line in preview.lines() {
        if line.starts_with("- ") {
            println!("{}", Style::new().red().apply_to(line));
        } else if line.starts_with("+ ") {
            println!("{}", Style::new().green().apply_to(line));
        } else {
            println!("{line}");
        }
    }
}

pub fn print_outcome(outcome: &ItemOutcome) {
    match outcome {
        ItemOutcome::Previewed => print_success("Fix generated (dry run)"),
        ItemOutcome::Applied(ApplyOutcome::Created(path)) => {
            print_success(&format!("Created {}", path.display()))
        }
        ItemOutcome::Applied(ApplyOutcome::Merged(path)) => {
            print_success(&format!("Applied test improvement to {}", path.display()))
        }
        ItemOutcome::Applied(ApplyOutcome::AlreadyPresent(path)) => {
            print_warning(&format!("Test already present in {}, left unchanged", path.display()))
        }
        ItemOutcome::Applied(ApplyOutcome::Skipped) => print_success("Fix generated"),
        ItemOutcome::Published { branch, url } => {
            print_success(&format!("PR created: {url}"));
            print_info(&format!("branch {branch}"));
        }
    }
}

pub fn print_failure(err: &PipelineError, verbose: bool) {
    print_error(&format!("Error - {err}"));
    if verbose {
        let mut source = err.source();
        while let Some(cause) = source {
            print_info(&format!("caused by: {cause}"));
            source = cause.source();
        }
    }
}

/// Final counts. `publishing` selects change-request wording over local fixes.
pub fn print_summary(stats: &RunStats, publishing: bool, dry_run: bool) {
    let bold = Style::new().bold();
    println!("{}", bold.apply_to("=== Summary ==="));
    println!("Mutants processed: {}", stats.processed);
    if dry_run {
        println!("Fixes generated: {}", stats.succeeded);
    } else if publishing {
        println!("PRs created: {}", stats.succeeded);
    } else {
        println!("Improvements: {}", stats.succeeded);
    }
    println!("Failures: {}", stats.failed);
    if dry_run {
        let dim = Style::new().dim();
        let note = if publishing {
            "(dry run - no PRs created)"
        } else {
            "(dry run - no changes applied)"
        };
        println!("{}", dim.apply_to(note));
    }
}

pub fn print_totals(totals: &ReportTotals) {
    println!("Total mutations: {}", totals.total);
    println!("Survived: {}", totals.survived);
    println!("Killed: {}", totals.killed);
}

pub fn print_mutation_listing(records: &[&MutationRecord], all: bool, verbose: bool) {
    if records.is_empty() {
        print_success("No surviving mutants. Your tests are strong.");
        return;
    }
    let bold = Style::new().bold();
    let heading = if all { "All Mutants" } else { "Surviving Mutants" };
    println!("{}", bold.apply_to(format!("=== {heading} ===")));

    let status_style = |m: &MutationRecord| {
        if m.survived() {
            Style::new().yellow().bold()
        } else if m.killed() {
            Style::new().green()
        } else {
            Style::new().dim()
        }
    };
    let dim = Style::new().dim();
    for &m in records {
        println!(
            "  {} {}",
            status_style(m).apply_to(format!("[{}]", m.status.as_str())),
            m.human_readable(),
        );
        if verbose {
            println!("      {} {}", dim.apply_to("mutator"), m.mutator_id);
            if let Some(desc) = &m.description {
                println!("      {} {}", dim.apply_to("description"), desc);
            }
            if let Some(file) = &m.source_file_hint {
                println!("      {} {}", dim.apply_to("source file"), file);
            }
            if let Some(test) = &m.killing_test_id {
                println!("      {} {}", dim.apply_to("killed by"), test);
            }
        }
    }
}
