//! Console reporting for scenario results

use colored::Colorize;

use crate::assertions::{preview, FailureKind};

use super::runner::{RunSummary, ScenarioResult};

/// Body bytes shown in verbose output before truncating
const VERBOSE_BODY_LIMIT: usize = 4096;

/// Print one scenario's outcome
pub fn print_result(result: &ScenarioResult, verbose: bool) {
    let elapsed = format!("({} ms)", result.duration.as_millis());

    if result.passed {
        println!(
            "  {} {} {}",
            "✓".green(),
            result.id().white(),
            elapsed.dimmed()
        );
    } else {
        println!(
            "  {} {} {}",
            "✗".red(),
            result.id().white().bold(),
            elapsed.dimmed()
        );
    }

    if verbose {
        if let Some(description) = &result.description {
            println!("      {}", description.dimmed());
        }
        print_exchange(result);
    }

    if let Some(error) = &result.error {
        println!(
            "      {} {}",
            format!("[{}]", error.kind()).yellow(),
            error
        );
    }

    for failure in &result.failures {
        let tag = match failure.kind {
            FailureKind::Assertion => "[assertion]".yellow(),
            FailureKind::Schema => "[schema]".magenta(),
        };
        println!("      {} {}", tag, failure);
    }

    for (name, value) in &result.extracted {
        println!("      {}: {}", name.cyan(), preview(value));
    }
}

/// Method, URI, status and body, mirroring the request/response log
fn print_exchange(result: &ScenarioResult) {
    if let Some(request) = &result.request {
        println!("      {} {}", "Request method:".dimmed(), request.method);
        println!("      {} {}", "Request URI:".dimmed(), request.url);
        if let Some(body) = &request.body {
            println!("      {} {}", "Request body:".dimmed(), body);
        }
    }

    if let Some(response) = &result.response {
        println!("      {} {}", "Status code:".dimmed(), response.status);
        let mut body = response.text();
        if body.len() > VERBOSE_BODY_LIMIT {
            let mut cut = VERBOSE_BODY_LIMIT;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
            body.push_str(" …");
        }
        println!("      {}", "Response body:".dimmed());
        for line in body.lines() {
            println!("        {}", line);
        }
    }
}

/// Print the run totals
pub fn print_summary(summary: &RunSummary) {
    let total = summary.results.len();
    let passed = summary.passed();
    let failed = summary.failed();
    let elapsed = format!("in {:.2}s", summary.duration.as_secs_f64());

    println!();
    if failed == 0 {
        println!(
            "{} {} {}",
            "✓".green().bold(),
            format!("{} of {} scenarios passed", passed, total).green().bold(),
            elapsed.dimmed()
        );
    } else {
        println!(
            "{} {} {}",
            "✗".red().bold(),
            format!("{} of {} scenarios failed", failed, total).red().bold(),
            elapsed.dimmed()
        );
        for result in summary.results.iter().filter(|r| !r.passed) {
            println!("    {}", result.id().red());
        }
    }
}
