use anyhow::{Context, Result};
use cgt_core::{Engine, parse_file, validate};
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;

mod commands;
use commands::{Commands, OutputFormat};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: &Commands) -> Result<()> {
    match command {
        Commands::Parse { file } => {
            let transactions = parse_file(file).with_context(|| format!("parsing {}", file.display()))?;
            println!("{}", serde_json::to_string_pretty(&transactions)?);
            Ok(())
        }
        Commands::Validate { file } => {
            let transactions = parse_file(file).with_context(|| format!("parsing {}", file.display()))?;
            let result = validate(&transactions);
            println!("{}", serde_json::to_string_pretty(&result)?);
            if result.is_valid() { Ok(()) } else { anyhow::bail!("{} error(s) found", result.errors.len()) }
        }
        Commands::Report { file, year, format } => run_report(file, *year, *format),
    }
}

fn run_report(file: &Path, year: i32, format: OutputFormat) -> Result<()> {
    let transactions = parse_file(file).with_context(|| format!("parsing {}", file.display()))?;

    let validation = validate(&transactions);
    if !validation.is_valid() {
        for error in &validation.errors {
            eprintln!("{error}");
        }
        anyhow::bail!("{} validation error(s), aborting", validation.errors.len());
    }

    let fx_cache = cgt_money::load_default_cache().context("loading bundled FX rates")?;
    let oracle = cgt_money::fx::MonthlyOracle(&fx_cache);
    let mut engine = Engine::new(&oracle);
    for tx in &transactions {
        engine.add_transaction(tx).with_context(|| format!("ingesting {:?} on {}", tx.action, tx.date))?;
    }
    let report = engine.calculate(year)?;

    match format {
        OutputFormat::Plain => print!("{}", cgt_formatter_plain::format(&report)?),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}
