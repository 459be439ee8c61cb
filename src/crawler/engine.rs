//! Crawl engine - worker pool orchestration
//!
//! This module drives a crawl from start to finish:
//! - Restoring prior state from the checkpoint store, or seeding the frontier
//! - Running a fixed pool of workers that fetch, extract and re-enqueue links
//! - Writing periodic and final checkpoints
//! - Handling stop requests and reporting progress to the observer

use crate::checkpoint::{Checkpoint, CheckpointSchedule, CheckpointStore, FileCheckpointStore};
use crate::config::{validate, Config, CrawlerConfig};
use crate::crawler::fetcher::{Fetcher, HttpFetcher};
use crate::crawler::frontier::{Claim, Frontier, Lease};
use crate::crawler::observer::{CrawlEvent, CrawlObserver, TracingObserver};
use crate::crawler::parser::{HtmlLinkExtractor, LinkExtractor};
use crate::{url as urls, CrawlError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinSet;
use url::Url;

/// Totals for one crawl run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Pages fetched successfully
    pub fetched: usize,

    /// URLs whose fetch timed out, failed or returned a non-2xx status
    pub failed: usize,

    /// Popped URLs that were already visited
    pub skipped: usize,

    /// Size of the visited set when the crawl ended
    pub visited: usize,

    /// URLs still pending when the crawl ended (non-zero only after a stop)
    pub pending: usize,

    /// True if the frontier drained, false if the crawl was stopped
    pub drained: bool,

    /// Checkpoints written successfully, including the final one
    pub checkpoints: usize,
}

/// Requests a cooperative stop of a running crawl
///
/// Workers stop popping new URLs; in-flight fetches finish or time out.
#[derive(Debug, Clone)]
pub struct StopHandle {
    stop: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    /// Asks the crawl to stop
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }
}

/// The crawl engine
///
/// Owns the collaborators a crawl needs. Each call to [`CrawlEngine::run`]
/// builds a fresh frontier, restored from the checkpoint store if one is set.
pub struct CrawlEngine {
    config: CrawlerConfig,
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn LinkExtractor>,
    observer: Arc<dyn CrawlObserver>,
    checkpoints: Option<Arc<dyn CheckpointStore>>,
    stop: Arc<watch::Sender<bool>>,
}

impl CrawlEngine {
    /// Creates an engine without checkpointing that reports to the tracing log
    pub fn new(
        config: CrawlerConfig,
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn LinkExtractor>,
    ) -> Self {
        let (stop, _) = watch::channel(false);
        Self {
            config,
            fetcher,
            extractor,
            observer: Arc::new(TracingObserver),
            checkpoints: None,
            stop: Arc::new(stop),
        }
    }

    /// Builds an HTTP crawler from a full configuration
    ///
    /// Uses [`HttpFetcher`] and [`HtmlLinkExtractor`], and a
    /// [`FileCheckpointStore`] when checkpointing is enabled.
    pub fn from_config(config: &Config) -> Result<Self> {
        validate(config)?;

        let fetcher = HttpFetcher::new(&config.user_agent)?;
        let engine = Self::new(
            config.crawler.clone(),
            Arc::new(fetcher),
            Arc::new(HtmlLinkExtractor),
        );

        if config.checkpoint.enabled {
            let store = FileCheckpointStore::new(config.checkpoint.path.clone());
            Ok(engine.with_checkpoint_store(Arc::new(store)))
        } else {
            Ok(engine)
        }
    }

    /// Replaces the observer receiving crawl events
    pub fn with_observer(mut self, observer: Arc<dyn CrawlObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Enables checkpointing through the given store
    pub fn with_checkpoint_store(mut self, store: Arc<dyn CheckpointStore>) -> Self {
        self.checkpoints = Some(store);
        self
    }

    /// Returns a handle that can stop a running crawl from another task
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            stop: Arc::clone(&self.stop),
        }
    }

    /// Runs a crawl to completion
    ///
    /// If the checkpoint store holds a non-empty frontier, the crawl resumes
    /// from it and `seed` is ignored. Otherwise `seed` must be an http(s) URL
    /// and becomes the only initial frontier entry.
    ///
    /// Returns once the frontier is drained, or once a stop was requested and
    /// all in-flight work has finished. Per-URL failures never end the crawl.
    pub async fn run(&self, seed: &str) -> Result<CrawlSummary> {
        let restored = self.restore().await?;
        let frontier = self.seed_frontier(restored, seed)?;

        let ctx = Arc::new(CrawlContext::new(self, frontier));
        let workers = self.config.workers.max(1);
        let start_time = Instant::now();

        tracing::info!(
            "Starting crawl with {} workers ({} pending, {} already visited)",
            workers,
            ctx.frontier.stats().pending,
            ctx.frontier.stats().visited
        );

        let mut stop_rx = self.stop.subscribe();
        let mut tasks = JoinSet::new();
        for id in 0..workers {
            tasks.spawn(Arc::clone(&ctx).run_worker(id));
        }

        let drained = tokio::select! {
            _ = ctx.frontier.await_drained() => true,
            _ = stop_rx.wait_for(|stop| *stop) => false,
        };

        if drained {
            tracing::info!("Frontier drained, stopping workers");
        } else {
            tracing::info!("Stop requested, waiting for in-flight fetches");
        }
        ctx.frontier.close();

        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                tracing::error!("{}", CrawlError::Worker(e.to_string()));
            }
        }
        self.stop.send_replace(false);

        ctx.checkpoint().await;

        let stats = ctx.frontier.stats();
        let summary = CrawlSummary {
            fetched: ctx.fetched.load(Ordering::SeqCst),
            failed: ctx.failed.load(Ordering::SeqCst),
            skipped: ctx.skipped.load(Ordering::SeqCst),
            visited: stats.visited,
            pending: stats.pending,
            drained,
            checkpoints: ctx.checkpoints_written.load(Ordering::SeqCst),
        };

        tracing::info!(
            "Crawl finished in {:.2?}: {} fetched, {} failed, {} pending",
            start_time.elapsed(),
            summary.fetched,
            summary.failed,
            summary.pending
        );

        self.observer.observe(CrawlEvent::Completed {
            fetched: summary.fetched,
            drained,
        });

        Ok(summary)
    }

    async fn restore(&self) -> Result<Checkpoint> {
        let Some(store) = &self.checkpoints else {
            return Ok(Checkpoint::default());
        };

        let store = Arc::clone(store);
        tokio::task::spawn_blocking(move || store.restore())
            .await
            .map_err(|e| CrawlError::Worker(e.to_string()))
    }

    fn seed_frontier(&self, restored: Checkpoint, seed: &str) -> Result<Frontier> {
        if restored.has_pending_work() {
            tracing::info!(
                "Resuming crawl from checkpoint ({} pending), ignoring seed {}",
                restored.frontier.len(),
                seed
            );
            return Ok(Frontier::restore(restored));
        }

        let seed_url = urls::validate_seed(seed).map_err(|source| CrawlError::InvalidSeed {
            url: seed.to_string(),
            source,
        })?;

        let frontier = Frontier::restore(restored);
        if frontier.is_visited(seed_url.as_str()) {
            tracing::warn!(
                "Seed {} was already crawled by a previous run; clear the checkpoint to crawl it again",
                seed_url
            );
        }
        frontier.push(seed_url.to_string());

        Ok(frontier)
    }
}

/// State shared by all workers of one run
struct CrawlContext {
    frontier: Frontier,
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn LinkExtractor>,
    observer: Arc<dyn CrawlObserver>,
    checkpoints: Option<Arc<dyn CheckpointStore>>,
    schedule: CheckpointSchedule,
    checkpoint_lock: Mutex<()>,
    fetch_timeout: Duration,
    fetched: AtomicUsize,
    failed: AtomicUsize,
    skipped: AtomicUsize,
    checkpoints_written: AtomicUsize,
}

impl CrawlContext {
    fn new(engine: &CrawlEngine, frontier: Frontier) -> Self {
        Self {
            frontier,
            fetcher: Arc::clone(&engine.fetcher),
            extractor: Arc::clone(&engine.extractor),
            observer: Arc::clone(&engine.observer),
            checkpoints: engine.checkpoints.clone(),
            schedule: CheckpointSchedule::new(engine.config.checkpoint_interval),
            checkpoint_lock: Mutex::new(()),
            fetch_timeout: engine.config.fetch_timeout(),
            fetched: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            checkpoints_written: AtomicUsize::new(0),
        }
    }

    async fn run_worker(self: Arc<Self>, id: usize) {
        tracing::debug!("Worker {} started", id);
        while let Some(lease) = self.frontier.next().await {
            self.process(lease).await;
        }
        tracing::debug!("Worker {} finished", id);
    }

    /// Processes one leased URL end to end
    async fn process(&self, lease: Lease<'_>) {
        let visited = match self.frontier.claim(&lease) {
            Claim::Fresh { visited } => visited,
            Claim::AlreadyVisited => {
                tracing::trace!("Skipping already visited {}", lease.url());
                self.skipped.fetch_add(1, Ordering::SeqCst);
                return;
            }
        };

        self.crawl_page(lease.url()).await;
        lease.mark_done();

        if self.schedule.crossed(visited) {
            self.checkpoint().await;
        }
    }

    async fn crawl_page(&self, url: &str) {
        tracing::debug!("Fetching {}", url);

        let result =
            tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch(url, self.fetch_timeout))
                .await;

        let page = match result {
            Err(_) => {
                tracing::warn!("Timed out fetching {} after {:?}", url, self.fetch_timeout);
                self.failed.fetch_add(1, Ordering::SeqCst);
                return;
            }
            Ok(Err(e)) => {
                tracing::warn!("Failed to fetch {}: {}", url, e);
                self.failed.fetch_add(1, Ordering::SeqCst);
                return;
            }
            Ok(Ok(page)) if !page.is_success() => {
                tracing::warn!("HTTP {} for {}", page.status_code, url);
                self.failed.fetch_add(1, Ordering::SeqCst);
                return;
            }
            Ok(Ok(page)) => page,
        };

        // Relative links resolve against where the page ended up after redirects
        let base = match Url::parse(&page.url).or_else(|_| Url::parse(url)) {
            Ok(base) => base,
            Err(e) => {
                tracing::warn!("Cannot resolve links of {}: {}", url, e);
                self.failed.fetch_add(1, Ordering::SeqCst);
                return;
            }
        };

        let links: Vec<String> = self
            .extractor
            .extract_links(&page.body)
            .iter()
            .filter_map(|href| urls::normalize(&base, href))
            .map(String::from)
            .collect();
        let found = links.len();
        let queued = self.frontier.push_unvisited(links);

        let fetched = self.fetched.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!("Fetched {}: {} links, {} new", url, found, queued);

        self.observer.observe(CrawlEvent::UrlFetched {
            url: url.to_string(),
        });
        self.observer.observe(CrawlEvent::Progress {
            count: fetched,
            total: self.frontier.stats().known(),
        });
    }

    /// Snapshots the frontier and writes it to the checkpoint store
    ///
    /// Writes are serialized so a later snapshot is never overwritten by an
    /// earlier one. Failures are logged and the crawl continues.
    async fn checkpoint(&self) {
        let Some(store) = &self.checkpoints else {
            return;
        };

        let _guard = self.checkpoint_lock.lock().await;
        let checkpoint = self.frontier.snapshot();
        let (visited, pending) = (checkpoint.visited.len(), checkpoint.frontier.len());

        let store = Arc::clone(store);
        match tokio::task::spawn_blocking(move || store.snapshot(&checkpoint)).await {
            Ok(Ok(())) => {
                self.checkpoints_written.fetch_add(1, Ordering::SeqCst);
                tracing::info!("Checkpoint saved: {} visited, {} pending", visited, pending);
            }
            Ok(Err(e)) => tracing::error!("Failed to write checkpoint: {}", e),
            Err(e) => tracing::error!("Checkpoint task failed: {}", e),
        }
    }
}
