//! Store directory crawling
//!
//! This module walks the store directory breadth-first: the root page links
//! to subdivisions, subdivisions to cities, cities to store pages. Pages on a
//! level are fetched concurrently; a failed page drops only its own branch.

pub mod fetcher;
pub mod links;

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use std::time::Instant;
use url::Url;

use crate::config::Config;
use crate::crawler::fetcher::{PageFetcher, PageSource};
use crate::crawler::links::LinkExtractor;
use crate::models::{CrawlLevel, CrawlStats, StoreRecord};
use crate::parser::StoreParser;
use crate::utils::error::CrawlerError;

/// Outcome of visiting one page
#[derive(Debug)]
pub enum Visit {
    /// Listing page: links to follow at the next level
    Links(Vec<Url>),
    /// Store page: the extracted record
    Store(StoreRecord),
}

/// Store directory crawler
pub struct StoreCrawler<S> {
    /// Page source (HTTP fetcher in production)
    source: S,

    /// Store page parser
    parser: StoreParser,

    /// Listing page link extractor
    links: LinkExtractor,

    /// Maximum pages in flight at once
    max_concurrent: usize,
}

impl StoreCrawler<PageFetcher> {
    /// Create a crawler backed by the HTTP fetcher
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate().context("Invalid configuration")?;

        let fetcher = PageFetcher::from_config(config).context("Failed to create HTTP client")?;
        let links = LinkExtractor::new(config.crawler.allowed_domains.clone());

        Ok(Self::new(
            fetcher,
            links,
            config.crawler.max_concurrent_requests,
        ))
    }
}

impl<S: PageSource> StoreCrawler<S> {
    /// Create a new crawler instance
    pub fn new(source: S, links: LinkExtractor, max_concurrent: usize) -> Self {
        Self {
            source,
            parser: StoreParser::new(),
            links,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Fetch one page and process it according to its level
    ///
    /// # Errors
    ///
    /// Returns `CrawlerError::Fetch` when the page cannot be fetched and
    /// `CrawlerError::Extract` when a store page is structurally broken.
    pub async fn visit(&self, level: CrawlLevel, url: &Url) -> Result<Visit, CrawlerError> {
        let page = self.source.fetch_page(url).await?;

        if level.is_leaf() {
            let record = self.parser.parse(&page.html, page.url.as_str())?;
            Ok(Visit::Store(record))
        } else {
            Ok(Visit::Links(self.links.extract_links(&page.html, &page.url)))
        }
    }

    /// Crawl the directory from `start`, handing each store record to `emit`
    ///
    /// Records are emitted as soon as their page is parsed, in no particular
    /// order. Branch failures are logged and counted; only an `emit` failure
    /// aborts the crawl.
    pub async fn run<F, E>(&self, start: Url, mut emit: F) -> std::result::Result<CrawlStats, E>
    where
        F: FnMut(StoreRecord) -> std::result::Result<(), E>,
    {
        let started = Instant::now();
        let mut stats = CrawlStats::default();
        let mut level = CrawlLevel::Root;
        let mut frontier = vec![start];

        loop {
            tracing::info!(level = %level, pages = frontier.len(), "Crawling level");

            let mut visits = stream::iter(frontier)
                .map(move |url| async move {
                    let result = self.visit(level, &url).await;
                    (url, result)
                })
                .buffer_unordered(self.max_concurrent);

            let mut next = Vec::new();
            while let Some((url, result)) = visits.next().await {
                match result {
                    Ok(Visit::Links(links)) => {
                        if links.is_empty() {
                            tracing::debug!(level = %level, url = %url, "No directory links on page");
                        }
                        stats.listing_pages += 1;
                        stats.links_followed += links.len() as u32;
                        next.extend(links);
                    }
                    Ok(Visit::Store(record)) => {
                        tracing::debug!(url = %record.url, store_id = ?record.store_id, "Extracted store");
                        emit(record)?;
                        stats.records_emitted += 1;
                    }
                    Err(e) => {
                        tracing::warn!(level = %level, url = %url, error = %e, "Dropping branch");
                        stats.failed_branches += 1;
                    }
                }
            }

            match level.next() {
                Some(child) if !next.is_empty() => {
                    level = child;
                    frontier = next;
                }
                _ => break,
            }
        }

        stats.set_duration(started.elapsed());

        tracing::info!(
            listing_pages = stats.listing_pages,
            records = stats.records_emitted,
            failed_branches = stats.failed_branches,
            duration_secs = stats.duration_secs,
            "Crawl finished"
        );

        Ok(stats)
    }
}
