mod reports;
mod scenario;
mod storage;
mod tester;

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use log::info;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use rollcall_game::{DataLoader, Roster};
use scenario::{SCENARIOS, get_scenario};
use storage::{EmbeddedDataLoader, FsDataLoader};
use tester::{LogicTester, ScenarioResult};

#[derive(Debug, Parser)]
#[command(name = "rollcall-tester", version = "0.1.0")]
#[command(about = "Scripted QA runs for the Rollcall draw engine")]
struct Args {
    /// Scenarios to run (comma-separated)
    #[arg(long, default_value = "smoke")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to run (comma-separated integers)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of iterations per scenario and seed
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Roster JSON path (defaults to the embedded fixture)
    #[arg(long)]
    data: Option<PathBuf>,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.list_scenarios {
        list_scenarios();
        return Ok(());
    }

    let roster = load_roster(args.data.as_deref())?;
    info!("roster loaded: {} characters", roster.len());

    let seeds = parse_seeds(&args.seeds)?;
    let names = split_csv(&args.scenarios);
    let tester = LogicTester::new(args.verbose);

    let started = Instant::now();
    let mut results: Vec<ScenarioResult> = Vec::new();
    for name in &names {
        let Some(scenario) = get_scenario(name) else {
            bail!("unknown scenario: {name} (try --list-scenarios)");
        };
        results.extend(tester.run_scenario(scenario, &roster, &seeds, args.iterations));
    }
    let total_duration = started.elapsed();

    match args.report.as_str() {
        "json" => emit(&args.output, &reports::generate_json_report(&results)?)?,
        "markdown" => emit(&args.output, &reports::generate_markdown_report(&results))?,
        _ => reports::generate_console_report(&results, total_duration),
    }

    let failed = results.iter().filter(|r| !r.passed).count();
    if failed > 0 {
        bail!("{failed} scenario run(s) failed");
    }
    Ok(())
}

fn list_scenarios() {
    println!("{}", "Available scenarios:".bold());
    for scenario in SCENARIOS {
        println!("  {:<20} {}", scenario.name.bright_white(), scenario.description);
    }
}

fn load_roster(data: Option<&std::path::Path>) -> Result<Roster> {
    match data {
        Some(path) => FsDataLoader::new(path)
            .load_roster()
            .with_context(|| format!("failed to load roster from {}", path.display())),
        None => EmbeddedDataLoader
            .load_roster()
            .context("embedded fixture roster is invalid"),
    }
}

fn parse_seeds(raw: &str) -> Result<Vec<u64>> {
    let mut seeds = Vec::new();
    for token in split_csv(raw) {
        let seed: u64 = token
            .parse()
            .with_context(|| format!("unrecognized seed token: {token}"))?;
        seeds.push(seed);
    }
    if seeds.is_empty() {
        seeds.push(1337);
    }
    Ok(seeds)
}

fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn emit(output: &Option<PathBuf>, body: &str) -> Result<()> {
    match output {
        Some(path) => fs::write(path, body)
            .with_context(|| format!("failed to write report to {}", path.display())),
        None => {
            println!("{body}");
            Ok(())
        }
    }
}
