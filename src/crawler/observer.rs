//! Crawl progress events and observers

/// Progress events emitted by the crawl engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlEvent {
    /// A page was fetched successfully and its links were queued
    UrlFetched { url: String },

    /// Running totals after a successful fetch
    ///
    /// `count` is pages fetched during this run; `total` is every URL known so
    /// far (visited plus pending).
    Progress { count: usize, total: usize },

    /// The crawl finished; `drained` is false if it ended on a stop request
    Completed { fetched: usize, drained: bool },
}

/// Receives crawl events, typically to display them
///
/// Called from worker tasks, so implementations should return quickly.
pub trait CrawlObserver: Send + Sync {
    fn observe(&self, event: CrawlEvent);
}

impl<F> CrawlObserver for F
where
    F: Fn(CrawlEvent) + Send + Sync,
{
    fn observe(&self, event: CrawlEvent) {
        self(event)
    }
}

/// Observer that writes events to the tracing log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl CrawlObserver for TracingObserver {
    fn observe(&self, event: CrawlEvent) {
        match event {
            CrawlEvent::UrlFetched { url } => tracing::info!("Found: {}", url),
            CrawlEvent::Progress { count, total } => {
                tracing::debug!("Progress: {} fetched, {} known", count, total)
            }
            CrawlEvent::Completed { fetched, drained } => {
                if drained {
                    tracing::info!("Crawling complete: {} pages fetched", fetched);
                } else {
                    tracing::info!("Crawling stopped: {} pages fetched", fetched);
                }
            }
        }
    }
}
