use anyhow::{Context, Result};
use std::path::PathBuf;

use store_locator::config::Config;
use store_locator::geocode::Enricher;
use store_locator::storage::{JsonLinesReader, JsonLinesWriter};

pub async fn geocode(
    config: Config,
    input: PathBuf,
    output: PathBuf,
    skip_malformed: bool,
) -> Result<()> {
    config.validate().context("Invalid configuration")?;

    println!("Starting geocoding");
    println!("==================");
    println!("  Provider: {}", config.geocoder.base_url);
    println!("  Input: {}", input.display());
    println!("  Output: {}", output.display());

    let enricher = Enricher::from_config(&config)?;

    let reader = JsonLinesReader::open(&input)
        .with_context(|| format!("Failed to open input file: {}", input.display()))?;
    let mut writer = JsonLinesWriter::create(&output)
        .with_context(|| format!("Failed to create output file: {}", output.display()))?;

    let stats = enricher.run(reader, &mut writer, skip_malformed).await?;

    println!();
    println!("Geocoding Summary");
    println!("=================");
    println!("  Records written: {}", stats.records);
    println!("  Located: {} ({:.1}%)", stats.located, stats.hit_rate());
    println!("  Not found: {}", stats.not_found);
    println!("  Failed lookups: {}", stats.failed);
    println!("  Without address: {}", stats.missing_address);
    if skip_malformed {
        println!("  Skipped lines: {}", stats.skipped_lines);
    }

    Ok(())
}
