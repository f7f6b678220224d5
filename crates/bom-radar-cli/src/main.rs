mod commands;
mod logging;
mod progress;

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::process;

use anyhow::{Context, Result};
use bom_radar_core::config::{self, AppConfig};
use bom_radar_core::report::{write_metrics_csv, write_rules_csv};
use bom_radar_core::{RunEngine, RunOptions};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use progress::CliReporter;
use tracing::{error, info};

fn main() {
    dotenv().ok();

    let _guard = logging::init_logger();

    let args = Cli::parse();

    let loaded = match &args.config {
        Some(path) => config::load_configuration_file(path),
        None => config::load_configuration(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let outcome = match args.command {
        Some(Commands::Run { no_merge }) => run(
            &config,
            RunOptions {
                write_report: true,
                merge: !no_merge,
            },
        ),
        Some(Commands::Report) => run(
            &config,
            RunOptions {
                write_report: true,
                merge: false,
            },
        ),
        Some(Commands::Metrics { csv, top }) => metrics(&config, csv.as_deref(), top),
        Some(Commands::Rules { csv, top }) => rules(&config, csv.as_deref(), top),
        Some(Commands::PrintConfig) => print_config(&config),
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    };

    if let Err(err) = outcome {
        error!("Error: {:#}", err);
        process::exit(1);
    }
}

fn run(config: &AppConfig, options: RunOptions) -> Result<()> {
    let engine = RunEngine::new(config.clone());
    let reporter = CliReporter::new();
    let result = engine.run(&reporter, &options)?;

    println!();
    info!(
        "Load: {}, Analysis: {}, Report: {}, Merge: {}",
        format!("{:.2}s", result.load_duration.as_secs_f64()).green(),
        format!("{:.2}s", result.analysis_duration.as_secs_f64()).green(),
        format!("{:.2}s", result.report_duration.as_secs_f64()).green(),
        format!("{:.2}s", result.merge_duration.as_secs_f64()).green(),
    );
    info!(
        "{} historical and {} incoming records across {} files",
        format!("{}", result.historical_records).cyan(),
        format!("{}", result.incoming_records).cyan(),
        format!("{}", result.total_files).cyan(),
    );
    info!(
        "{} pairs, {} new, {} rules",
        format!("{}", result.pairs).cyan(),
        format!("{}", result.new_pairs).red(),
        format!("{}", result.rules).cyan(),
    );
    if !result.skipped.is_empty() {
        info!(
            "{} entries skipped (see the 7_Skipped sheet)",
            format!("{}", result.skipped.len()).yellow()
        );
    }
    if let Some(merge) = &result.merge {
        info!(
            "Historical archive: {} entries, {} added, {} folded; {} left in incoming",
            merge.historical_entries,
            format!("{}", merge.incoming_added).green(),
            merge.incoming_folded,
            merge.incoming_retained,
        );
    }

    Ok(())
}

fn metrics(config: &AppConfig, csv: Option<&Path>, top: usize) -> Result<()> {
    let engine = RunEngine::new(config.clone());
    let reporter = CliReporter::new();
    let corpus = engine.load(&reporter)?;
    let analysis = engine.analyze(&corpus, &reporter)?;
    let ranked = analysis.metrics.ranked();

    if let Some(path) = csv {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        write_metrics_csv(BufWriter::new(file), &ranked)?;
        info!("{} metrics rows written to {}", ranked.len(), path.display());
        return Ok(());
    }

    println!(
        "{:<16} {:<24} {:>6} {:>6} {:>9} {:>9} {:>9}",
        "Component".bold(),
        "Material".bold(),
        "Count".bold(),
        "Total".bold(),
        "Support".bold(),
        "Conf".bold(),
        "Sum".bold(),
    );
    for m in ranked.iter().take(top) {
        println!(
            "{:<16} {:<24} {:>6} {:>6} {:>9.5} {:>9.5} {:>9.5}",
            m.component,
            m.material,
            m.count,
            m.component_total_files,
            m.support,
            m.confidence,
            m.support_confidence_sum,
        );
    }
    println!(
        "{} of {} pairs over {} files",
        ranked.len().min(top),
        ranked.len(),
        analysis.metrics.total_files()
    );
    Ok(())
}

fn rules(config: &AppConfig, csv: Option<&Path>, top: usize) -> Result<()> {
    let engine = RunEngine::new(config.clone());
    let reporter = CliReporter::new();
    let corpus = engine.load(&reporter)?;
    let analysis = engine.analyze(&corpus, &reporter)?;
    let rules = &analysis.mining.rules;

    if let Some(path) = csv {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        write_rules_csv(BufWriter::new(file), rules)?;
        info!("{} rules written to {}", rules.len(), path.display());
        return Ok(());
    }

    if rules.is_empty() {
        println!("{}", "No rules reached the configured thresholds".yellow());
        return Ok(());
    }
    let mut strongest: Vec<_> = rules.iter().collect();
    strongest.sort_by(|a, b| b.lift.total_cmp(&a.lift));
    for rule in strongest.into_iter().take(top) {
        println!(
            "{} {} {}  support {:.4}  confidence {:.4}  lift {}",
            rule.antecedent.key().cyan(),
            "=>".dimmed(),
            rule.consequent.key().cyan(),
            rule.support,
            rule.confidence,
            format!("{:.3}", rule.lift).green(),
        );
    }
    if let Some(sampling) = &analysis.mining.sampling {
        info!(
            "Sampled mining: {} of {} rows over {} files",
            sampling.rows_kept, sampling.rows_in, sampling.files_sampled
        );
    }
    Ok(())
}

fn print_config(config: &AppConfig) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
