use anyhow::Result;
use colored::Colorize;
use std::time::Duration;

use crate::tester::ScenarioResult;

pub fn generate_console_report(results: &[ScenarioResult], total_duration: Duration) {
    println!();
    println!("{}", "📊 Draw Engine QA Summary".bright_cyan().bold());
    println!("{}", "=========================".cyan());

    let total_runs = results.len();
    let passed_runs = results.iter().filter(|r| r.passed).count();
    let failed_runs = total_runs - passed_runs;

    println!("Total runs: {total_runs}");
    println!("Passed: {}", passed_runs.to_string().green());
    println!("Failed: {}", failed_runs.to_string().red());
    #[allow(clippy::cast_precision_loss)]
    let success_rate = (passed_runs as f64 / total_runs as f64) * 100.0;
    println!("Success rate: {success_rate:.1}%");
    println!("Total time: {total_duration:?}");
    println!();

    for result in results {
        let status = if result.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };

        println!(
            "{} {} (seed {})",
            status,
            result.scenario_name.bold(),
            result.seed
        );
        println!(
            "   Iterations: {}/{} successful",
            result.successful_iterations, result.iterations_run
        );
        println!("   Average time: {:?}", result.average_duration);

        if !result.failures.is_empty() {
            println!("   Failures:");
            for failure in &result.failures {
                println!("     • {}", failure.red());
            }
        }
        println!();
    }
}

pub fn generate_json_report(results: &[ScenarioResult]) -> Result<String> {
    Ok(serde_json::to_string_pretty(results)?)
}

#[must_use]
pub fn generate_markdown_report(results: &[ScenarioResult]) -> String {
    let mut out = String::from("# Rollcall Draw Engine QA Results\n\n");

    let total_runs = results.len();
    let passed_runs = results.iter().filter(|r| r.passed).count();

    out.push_str("## Summary\n\n");
    out.push_str(&format!("- **Total runs**: {total_runs}\n"));
    out.push_str(&format!("- **Passed**: {passed_runs}\n"));
    out.push_str(&format!("- **Failed**: {}\n\n", total_runs - passed_runs));

    out.push_str("## Detailed Results\n\n");
    for result in results {
        let status = if result.passed { "✅" } else { "❌" };
        out.push_str(&format!(
            "### {status} {} (seed {})\n\n",
            result.scenario_name, result.seed
        ));
        out.push_str(&format!(
            "- **Iterations**: {}/{} successful\n",
            result.successful_iterations, result.iterations_run
        ));
        out.push_str(&format!(
            "- **Average time**: {:?}\n",
            result.average_duration
        ));
        if !result.failures.is_empty() {
            out.push_str("- **Failures**:\n");
            for failure in &result.failures {
                out.push_str(&format!("  - {failure}\n"));
            }
        }
        out.push('\n');
    }

    out
}
