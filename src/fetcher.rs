use futures::future::join_all;
use reqwest::Client;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::models::{FetchOutcome, FetchReport, LinkReport, ResourceLink};
use crate::resolver::Resolver;
use crate::storage::FreshnessCache;
use crate::utils::http::download_to;

/// Downloads every discovered spreadsheet that is not already fresh.
pub struct Fetcher {
    client: Client,
    resolver: Arc<Resolver>,
    download_dir: PathBuf,
    suffix: String,
    concurrency: usize,
}

/// Links that write to the same file, handled one after another in page order.
struct Job {
    target: PathBuf,
    links: Vec<ResourceLink>,
}

impl Fetcher {
    pub fn new(
        client: Client,
        resolver: Arc<Resolver>,
        download_dir: impl Into<PathBuf>,
        suffix: impl Into<String>,
        concurrency: usize,
    ) -> Self {
        Self {
            client,
            resolver,
            download_dir: download_dir.into(),
            suffix: suffix.into(),
            concurrency: concurrency.max(1),
        }
    }

    pub fn from_config(client: Client, resolver: Arc<Resolver>, config: &Config) -> Self {
        Self::new(
            client,
            resolver,
            config.download_dir.clone(),
            config.link_suffix.clone(),
            config.concurrency,
        )
    }

    /// Runs one unit of work per target file, at most `concurrency` at a time,
    /// and waits for all of them before handing the cache back.
    ///
    /// Failures are recorded in the report and never stop other downloads.
    pub async fn fetch_all(
        &self,
        links: Vec<ResourceLink>,
        cache: FreshnessCache,
    ) -> (FetchReport, FreshnessCache) {
        let mut report = FetchReport::default();
        let jobs = self.plan(links, &mut report);

        info!(
            "Fetching {} files with up to {} concurrent downloads",
            jobs.len(),
            self.concurrency
        );

        let cache = Arc::new(Mutex::new(cache));
        let semaphore = Arc::new(Semaphore::new(self.concurrency));

        let mut pending = Vec::with_capacity(jobs.len());
        let handles: Vec<_> = jobs
            .into_iter()
            .map(|job| {
                pending.push(job.locators());

                let client = self.client.clone();
                let cache = cache.clone();
                let semaphore = semaphore.clone();

                tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await.ok();
                    job.run(&client, &cache).await
                })
            })
            .collect();

        for (locators, result) in pending.into_iter().zip(join_all(handles).await) {
            absorb_task_result(&mut report, locators, result);
        }
        report.sort();

        let cache = match Arc::try_unwrap(cache) {
            Ok(cache) => cache.into_inner(),
            Err(shared) => shared.lock().await.clone(),
        };

        (report, cache)
    }

    /// Resolves names and groups links by target path.
    ///
    /// A repeated locator is fetched once. Distinct locators that resolve to
    /// the same bank share a job, so the file ends up holding the last link
    /// in page order, across runs as well.
    fn plan(&self, links: Vec<ResourceLink>, report: &mut FetchReport) -> Vec<Job> {
        let mut seen = HashSet::new();
        let mut by_target: HashMap<PathBuf, usize> = HashMap::new();
        let mut jobs: Vec<Job> = Vec::new();

        for link in links {
            if !seen.insert(link.locator.clone()) {
                debug!("Skipping repeated link {}", link.locator);
                report.push(link.index, link.locator, FetchOutcome::Duplicate);
                continue;
            }

            let name = match self.resolver.resolve(&link.context) {
                Ok(name) => name,
                Err(e) => {
                    debug!("Skipping {}: {}", link.locator, e);
                    report.push(
                        link.index,
                        link.locator,
                        FetchOutcome::Unresolved {
                            reason: e.to_string(),
                        },
                    );
                    continue;
                }
            };

            let target = self
                .download_dir
                .join(format!("{}{}", name.sanitized(), self.suffix));

            match by_target.get(&target).copied() {
                Some(i) => {
                    warn!(
                        "{} also resolves to {}; later links overwrite earlier ones",
                        link.locator, name
                    );
                    jobs[i].links.push(link);
                }
                None => {
                    by_target.insert(target.clone(), jobs.len());
                    jobs.push(Job {
                        target,
                        links: vec![link],
                    });
                }
            }
        }

        jobs
    }
}

/// Adds a finished job's reports, or marks all of its links failed if the
/// task died before returning them.
fn absorb_task_result(
    report: &mut FetchReport,
    locators: Vec<(usize, String)>,
    result: Result<Vec<LinkReport>, JoinError>,
) {
    match result {
        Ok(reports) => report.extend(reports),
        Err(e) => {
            error!("Fetch task failed: {}", e);
            for (index, locator) in locators {
                report.push(
                    index,
                    locator,
                    FetchOutcome::Failed {
                        reason: format!("fetch task failed: {}", e),
                    },
                );
            }
        }
    }
}

impl Job {
    fn locators(&self) -> Vec<(usize, String)> {
        self.links
            .iter()
            .map(|link| (link.index, link.locator.clone()))
            .collect()
    }

    /// Once one link in the group has written (or tried to write) the file,
    /// every later link is fetched even if cached, so the file always ends up
    /// with the last link in page order.
    async fn run(self, client: &Client, cache: &Mutex<FreshnessCache>) -> Vec<LinkReport> {
        let mut reports = Vec::with_capacity(self.links.len());
        let mut overwritten = false;

        for link in self.links {
            let outcome = fetch_link(client, cache, &link, &self.target, overwritten).await;
            if outcome != FetchOutcome::Fresh {
                overwritten = true;
            }
            reports.push(LinkReport {
                index: link.index,
                locator: link.locator,
                outcome,
            });
        }

        reports
    }
}

async fn fetch_link(
    client: &Client,
    cache: &Mutex<FreshnessCache>,
    link: &ResourceLink,
    target: &Path,
    force: bool,
) -> FetchOutcome {
    if !force && cache.lock().await.is_fresh(&link.locator) {
        debug!("{} already downloaded, skipping", link.locator);
        return FetchOutcome::Fresh;
    }

    match download_to(client, &link.locator, target).await {
        Ok(token) => {
            cache.lock().await.record(link.locator.clone(), token.clone());
            info!("Downloaded {}", link.locator);
            FetchOutcome::Downloaded {
                path: target.to_path_buf(),
                token,
            }
        }
        Err(e) => {
            warn!("Failed to download {}: {}", link.locator, e);
            FetchOutcome::Failed {
                reason: e.to_string(),
            }
        }
    }
}
