use anyhow::{Context, Result};
use std::path::PathBuf;
use url::Url;

use store_locator::config::Config;
use store_locator::crawler::StoreCrawler;
use store_locator::storage::JsonLinesWriter;
use store_locator::utils::extract_domain;

pub async fn crawl(config: Config, output: PathBuf) -> Result<()> {
    println!("Starting store directory crawl");
    println!("==============================");

    let crawler = StoreCrawler::from_config(&config)?;
    let start = Url::parse(&config.crawler.start_url)
        .with_context(|| format!("Invalid start URL: {}", config.crawler.start_url))?;

    let host = extract_domain(start.as_str())?;
    println!("  Directory: {host}");
    println!("  Output: {}", output.display());

    let mut writer = JsonLinesWriter::create(&output)
        .with_context(|| format!("Failed to create output file: {}", output.display()))?;

    let stats = crawler
        .run(start, |record| writer.write_record(&record))
        .await
        .context("Failed to write store record")?;

    println!();
    println!("Crawl Summary");
    println!("=============");
    println!("  Pages visited: {}", stats.pages_visited());
    println!("  Links followed: {}", stats.links_followed);
    println!("  Records written: {}", stats.records_emitted);
    println!("  Failed branches: {}", stats.failed_branches);
    println!("  Error rate: {:.1}%", stats.error_rate());
    println!("  Duration: {:.1}s", stats.duration_secs);

    Ok(())
}
