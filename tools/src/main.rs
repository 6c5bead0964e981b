//! feature-runner: headless feature derivation for transfer records.
//!
//! Usage:
//!   feature-runner --input data/clean.csv --output data/features.csv
//!   feature-runner --input data/clean.csv --output data/features.csv \
//!       --risk-config data/transfer_types.json

use anyhow::Result;
use riskfeat_core::{config::RiskConfig, engine::FeatureEngine, features::FEATURE_COLUMNS, io};
use std::env;
use std::time::Instant;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let input = parse_arg(&args, "--input", "data/clean.csv");
    let output = parse_arg(&args, "--output", "data/features.csv");
    let risk_config = args
        .windows(2)
        .find(|w| w[0] == "--risk-config")
        .map(|w| w[1].as_str());

    println!("feature-runner");
    println!("  input:       {input}");
    println!("  output:      {output}");
    println!(
        "  risk-config: {}",
        risk_config.unwrap_or("(built-in test tables)")
    );
    println!();

    let config = match risk_config {
        Some(path) => RiskConfig::load(path)?,
        None => {
            log::warn!("no --risk-config given, using built-in test tables");
            RiskConfig::default_test()
        }
    };

    let started = Instant::now();
    let table = io::read_records(input)?;
    let engine = FeatureEngine::new(config);
    let features = engine.run(&table.schema, &table.records);
    io::write_features(output, &table, &features)?;

    print_summary(&table, features.len(), started);
    Ok(())
}

fn print_summary(table: &io::InputTable, feature_rows: usize, started: Instant) {
    let partitions =
        riskfeat_core::partition::partition_records(&table.schema, &table.records);
    println!("=== RUN SUMMARY ===");
    println!("  rows in:         {}", table.records.len());
    println!("  rows out:        {feature_rows}");
    println!(
        "  columns out:     {}",
        table.headers.len() + FEATURE_COLUMNS.len()
    );
    println!("  partitions:      {}", partitions.partitions.len());
    println!("  ungrouped rows:  {}", partitions.ungrouped.len());
    println!("  customers:       {}", partitions.customer_groups().len());
    println!("  elapsed:         {:.2?}", started.elapsed());
}

fn parse_arg<'a>(args: &'a [String], flag: &str, default: &'a str) -> &'a str {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
        .unwrap_or(default)
}
