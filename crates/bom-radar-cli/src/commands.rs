use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "bom-radar")]
#[command(about = "Flags new and rare component/material pairs in BOM archives", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to an optional Config.toml in the working directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Analyze both archives, write the report and merge the incoming batch
    Run {
        /// Leave both archives untouched
        #[arg(long)]
        no_merge: bool,
    },
    /// Analyze both archives and write the report only
    Report,
    /// Print or export pair metrics of the combined corpus
    Metrics {
        /// Write all metrics to this CSV file instead of printing
        #[arg(long, value_name = "PATH")]
        csv: Option<PathBuf>,
        /// Number of rows to print
        #[arg(long, default_value_t = 20)]
        top: usize,
    },
    /// Print or export mined association rules
    Rules {
        /// Write all rules to this CSV file instead of printing
        #[arg(long, value_name = "PATH")]
        csv: Option<PathBuf>,
        /// Number of rules to print
        #[arg(long, default_value_t = 20)]
        top: usize,
    },
    /// Print configuration values
    PrintConfig,
}
