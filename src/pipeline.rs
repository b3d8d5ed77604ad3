use chrono::Local;
use std::sync::Arc;
use tracing::info;

use crate::cleaner::clean_dir;
use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::fetcher::Fetcher;
use crate::merger::merge_dir;
use crate::models::{CleanReport, ConvertReport, FetchReport, MergeReport, ResourceLink};
use crate::parsers::scan_links;
use crate::resolver::{Resolver, Vocabulary};
use crate::storage::{CacheStore, JsonCacheStore};
use crate::tabular::{convert_dir, WorkbookDecoder};
use crate::utils::http::{create_client, fetch_bytes};

/// Fetches the directory page and lists the spreadsheet links on it.
pub async fn discover(client: &reqwest::Client, config: &Config) -> Result<Vec<ResourceLink>> {
    info!("Fetching directory page {}", config.directory_url);
    let body = fetch_bytes(client, &config.directory_url).await?;

    let links = scan_links(&body, &config.directory_url, &config.link_suffix)?;
    info!("Found {} {} links", links.len(), config.link_suffix);
    Ok(links)
}

/// Downloads new or changed spreadsheets and persists the freshness cache.
pub async fn run_fetch(config: &Config) -> Result<FetchReport> {
    info!("--- Fetch started at {} ---", Local::now().format("%Y-%m-%d %H:%M:%S"));

    let vocabulary = Vocabulary::load(&config.vocabulary_path)?;
    let resolver = Arc::new(Resolver::new(vocabulary));

    tokio::fs::create_dir_all(&config.download_dir)
        .await
        .map_err(|e| PipelineError::file(&config.download_dir, e))?;

    let client = create_client(config)?;
    let links = discover(&client, config).await?;

    let store = JsonCacheStore::new(&config.cache_path);
    let cache = store.load().await?;

    let fetcher = Fetcher::from_config(client, resolver, config);
    let (report, cache) = fetcher.fetch_all(links, cache).await;

    store.save(&cache).await?;
    report.log_summary();
    Ok(report)
}

pub fn run_convert(config: &Config) -> Result<ConvertReport> {
    let report = convert_dir(
        &WorkbookDecoder,
        &config.download_dir,
        &config.convert_dir,
        &config.link_suffix,
    )?;
    report.log_summary();
    Ok(report)
}

pub fn run_clean(config: &Config) -> Result<CleanReport> {
    let report = clean_dir(
        &config.convert_dir,
        &config.clean_dir,
        config.short_record_policy,
    )?;
    report.log_summary();
    Ok(report)
}

pub fn run_merge(config: &Config) -> Result<MergeReport> {
    let report = merge_dir(&config.clean_dir, &config.master_path)?;
    report.log_summary();
    Ok(report)
}

/// Every stage in order; stops at the first fatal error.
pub async fn run_all(config: &Config) -> Result<()> {
    run_fetch(config).await?;
    run_convert(config)?;
    run_clean(config)?;
    run_merge(config)?;
    Ok(())
}
