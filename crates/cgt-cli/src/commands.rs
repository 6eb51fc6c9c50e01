use clap::{Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse a transaction feed and print it back out as normalized JSON
    Parse {
        /// Input file path (a JSON array of transactions)
        file: PathBuf,
    },
    /// Validate a transaction feed without calculating a report
    Validate {
        /// Input file path (a JSON array of transactions)
        file: PathBuf,
    },
    /// Calculate the chargeable gain/loss for a UK tax year
    Report {
        /// Input file path (a JSON array of transactions)
        file: PathBuf,

        /// Tax year start (e.g. 2023 for 2023/24)
        #[arg(long, default_value = "2023")]
        year: i32,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
        format: OutputFormat,
    },
}
