use crate::extractor::chain::DetailResolver;
use crate::extractor::fetcher::PageFetcher;
use crate::extractor::provider::ListingExtractor;
use crate::extractor::types::{ChainTask, EpisodeLink};
use crate::extractor::{ExtractError, Result};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{info, warn};

/// User-facing message when the remote model keeps rejecting for quota
pub const RATE_LIMIT_WAIT_MESSAGE: &str = "تجاوزت حد خدمة التحليل. يرجى الانتظار دقيقة ثم المحاولة مجدداً.";

/// User-facing message when every proxy attempt was blocked
pub const FETCH_BLOCKED_MESSAGE: &str =
    "فشل جلب الرابط بعد عدة محاولات بروكسي. الموقع قد يكون محمياً ضد الاستخراج الآلي، جرب لصق الـ HTML يدوياً.";

/// Scheduler configuration
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Worker count for the bounded batch mode
    pub concurrency: usize,
    /// Start-up stagger between the first workers of a batch
    pub stagger: Duration,
    /// Pause between items in strict-sequential mode
    pub sequential_delay: Duration,
    /// Pause between episodes while walking a next-link chain
    pub serial_delay: Duration,
    /// Pause between episodes while walking a numbered segment
    pub segment_delay: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency: 3,
            stagger: Duration::from_millis(500),
            sequential_delay: Duration::from_secs(2),
            serial_delay: Duration::from_secs(3),
            segment_delay: Duration::from_millis(2500),
        }
    }
}

/// Episode-number → URL map accumulated across one walk.
///
/// Grids on later pages sometimes relabel earlier episodes, so the first
/// discovered URL for a number is kept and later writes are ignored.
#[derive(Debug, Default)]
pub struct SessionLinkMemory {
    links: BTreeMap<u32, String>,
}

impl SessionLinkMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a URL for an episode number unless one is already known
    pub fn remember(&mut self, number: u32, url: impl Into<String>) {
        self.links.entry(number).or_insert_with(|| url.into());
    }

    /// Record every discovered link whose number falls inside `range`
    pub fn absorb(&mut self, links: &[EpisodeLink], range: RangeInclusive<u32>) {
        for link in links {
            if range.contains(&link.number) {
                self.remember(link.number, link.url.as_str());
            }
        }
    }

    #[must_use]
    pub fn url_for(&self, number: u32) -> Option<&str> {
        self.links.get(&number).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// Batch and walk orchestration over a detail resolver.
///
/// Every mode isolates per-page outcomes in `ChainTask` rows and honors a
/// cooperative stop flag; sequencing modes additionally guard against
/// next-link loops.
pub struct BatchScheduler {
    resolver: Arc<dyn DetailResolver>,
    config: SchedulerConfig,
    stop: Arc<AtomicBool>,
}

impl BatchScheduler {
    pub fn new(resolver: Arc<dyn DetailResolver>) -> Self {
        Self {
            resolver,
            config: SchedulerConfig::default(),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Builder pattern: override the configuration
    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Handle for requesting a stop from another task
    #[must_use]
    pub fn stop_signal(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    fn begin_run(&self) {
        self.stop.store(false, Ordering::SeqCst);
    }

    /// Resolve a batch of URLs with a bounded worker pool.
    ///
    /// Results come back in input order, failures isolated per row. The
    /// first workers after the leader are staggered so a fresh batch does
    /// not fire every request in the same instant.
    pub async fn run_batch(&self, urls: &[String]) -> Vec<ChainTask> {
        self.begin_run();
        if urls.is_empty() {
            return Vec::new();
        }

        let tasks: Mutex<Vec<ChainTask>> = Mutex::new(
            urls.iter()
                .map(|url| ChainTask::new(url.trim()))
                .collect(),
        );
        let next_index = AtomicUsize::new(0);
        let worker_count = self.config.concurrency.min(urls.len()).max(1);
        info!(total = urls.len(), workers = worker_count, "Starting batch run");

        let workers = (0..worker_count).map(|_| async {
            loop {
                if self.is_stopped() {
                    break;
                }
                let idx = next_index.fetch_add(1, Ordering::SeqCst);
                if idx >= urls.len() {
                    break;
                }

                update_task(&tasks, idx, ChainTask::into_processing);
                if idx > 0 && idx < self.config.concurrency {
                    tokio::time::sleep(self.config.stagger).await;
                }

                let url = { tasks.lock()[idx].input_url.clone() };
                match self.resolver.resolve_detail(&url).await {
                    Ok(result) => update_task(&tasks, idx, |t| t.into_success(result)),
                    Err(e) => {
                        warn!(url, error = %e, "Batch item failed");
                        let message = normalize_error(&e);
                        update_task(&tasks, idx, |t| t.into_failed(message));
                    }
                }
            }
        });
        futures::future::join_all(workers).await;

        tasks.into_inner()
    }

    /// Resolve URLs one at a time with a fixed pause between items.
    ///
    /// A failed item never stops the run; a stop request leaves the
    /// remaining rows pending.
    pub async fn run_sequential(&self, urls: &[String]) -> Vec<ChainTask> {
        self.begin_run();
        let mut tasks: Vec<ChainTask> = urls.iter().map(|url| ChainTask::new(url.trim())).collect();

        for (i, slot) in tasks.iter_mut().enumerate() {
            if self.is_stopped() {
                info!(processed = i, "Sequential run stopped on request");
                break;
            }
            if i > 0 {
                tokio::time::sleep(self.config.sequential_delay).await;
            }

            let task = slot.clone().into_processing();
            let url = task.input_url.clone();
            *slot = match self.resolver.resolve_detail(&url).await {
                Ok(result) => task.into_success(result),
                Err(e) => {
                    warn!(url, error = %e, "Sequential item failed");
                    task.into_failed(normalize_error(&e))
                }
            };
        }

        tasks
    }

    /// Walk a next-episode chain starting from `start_url` until the chain
    /// ends, a page fails, a loop is detected, or a stop is requested.
    pub async fn run_serial(&self, start_url: &str) -> Vec<ChainTask> {
        self.begin_run();
        let mut tasks = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut current = start_url.trim().to_string();
        let mut count = 0usize;

        while !self.is_stopped() {
            if !visited.insert(current.clone()) {
                warn!(url = current, "Next-link loop detected, stopping walk");
                break;
            }
            count += 1;
            if count > 1 {
                tokio::time::sleep(self.config.serial_delay).await;
            }

            let task = ChainTask::new(current.as_str()).into_processing();
            match self.resolver.resolve_detail(&current).await {
                Ok(result) => {
                    let next = result
                        .next_episode_url
                        .clone()
                        .filter(|n| n.starts_with("http") && *n != current);
                    tasks.push(task.into_success(result));
                    match next {
                        Some(n) => current = n,
                        None => {
                            info!(episodes = count, "Serial walk reached the end of the chain");
                            break;
                        }
                    }
                }
                Err(e) => {
                    warn!(url = current, error = %e, "Serial walk stopped on failure");
                    tasks.push(task.into_failed(normalize_error(&e)));
                    break;
                }
            }
        }

        tasks
    }

    /// Walk episodes `range` starting from `start_url`.
    ///
    /// Each page's episode grid feeds the session memory; the next page is
    /// the remembered URL for the following number when one exists, the
    /// page's explicit next link otherwise. The walk stops when neither is
    /// available or the range is exhausted.
    pub async fn run_segment(
        &self,
        start_url: &str,
        range: RangeInclusive<u32>,
    ) -> Result<Vec<ChainTask>> {
        let (start, end) = (*range.start(), *range.end());
        if start > end {
            return Err(ExtractError::InvalidInput(format!(
                "episode range start {start} exceeds end {end}"
            )));
        }

        self.begin_run();
        let mut memory = SessionLinkMemory::new();
        memory.remember(start, start_url.trim());
        let mut visited: HashSet<String> = HashSet::new();
        let mut tasks = Vec::new();
        let mut current_url = start_url.trim().to_string();
        let mut current = start;

        while current <= end && !self.is_stopped() {
            if !visited.insert(current_url.clone()) {
                warn!(url = current_url, "Next-link loop detected, stopping walk");
                break;
            }
            if current > start {
                tokio::time::sleep(self.config.segment_delay).await;
            }

            let task = ChainTask::new(current_url.as_str()).into_processing();
            match self.resolver.resolve_detail(&current_url).await {
                Ok(result) => {
                    memory.absorb(&result.episode_links, start..=end);
                    let next = memory
                        .url_for(current + 1)
                        .map(str::to_string)
                        .or_else(|| result.next_episode_url.clone());
                    tasks.push(task.into_success(result));
                    match next {
                        Some(n) if current < end => {
                            current_url = n;
                            current += 1;
                        }
                        _ => {
                            info!(episode = current, "Segment walk has no way forward, stopping");
                            break;
                        }
                    }
                }
                Err(e) => {
                    warn!(url = current_url, error = %e, "Segment walk stopped on failure");
                    tasks.push(task.into_failed(normalize_error(&e)));
                    break;
                }
            }
        }

        Ok(tasks)
    }
}

/// Listing pipeline: fetch a category page, pull its detail links, resolve
/// them as one bounded batch.
pub struct ListingPipeline {
    fetcher: Arc<dyn PageFetcher>,
    listing: Arc<dyn ListingExtractor>,
    scheduler: BatchScheduler,
}

/// Outcome of one listing run
#[derive(Debug)]
pub struct ListingRun {
    pub category_title: Option<String>,
    pub tasks: Vec<ChainTask>,
}

impl ListingPipeline {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        listing: Arc<dyn ListingExtractor>,
        scheduler: BatchScheduler,
    ) -> Self {
        Self {
            fetcher,
            listing,
            scheduler,
        }
    }

    pub async fn run(&self, listing_url: &str) -> Result<ListingRun> {
        let html = self.fetcher.fetch_html(listing_url).await?;
        let page = self.listing.extract_listing(&html).await?;
        if page.links.is_empty() {
            return Err(ExtractError::NotFound(format!(
                "no detail links found on listing page {listing_url}"
            )));
        }

        info!(links = page.links.len(), "Listing page resolved, starting batch");
        let tasks = self.scheduler.run_batch(&page.links).await;
        Ok(ListingRun {
            category_title: page.category_title,
            tasks,
        })
    }
}

/// Map an error to the message shown on a failed task row
fn normalize_error(error: &ExtractError) -> String {
    if error.is_rate_limited() {
        return RATE_LIMIT_WAIT_MESSAGE.to_string();
    }
    match error {
        ExtractError::FetchExhausted { .. } => FETCH_BLOCKED_MESSAGE.to_string(),
        other => other.to_string(),
    }
}

fn update_task(tasks: &Mutex<Vec<ChainTask>>, idx: usize, f: impl FnOnce(ChainTask) -> ChainTask) {
    let mut guard = tasks.lock();
    let task = guard[idx].clone();
    guard[idx] = f(task);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::types::EpisodeLink;

    #[test]
    fn test_memory_first_write_wins() {
        let mut memory = SessionLinkMemory::new();
        memory.remember(3, "https://a/3");
        memory.remember(3, "https://b/3");

        assert_eq!(memory.url_for(3), Some("https://a/3"));
        assert_eq!(memory.len(), 1);
    }

    #[test]
    fn test_memory_absorb_respects_range() {
        let links = vec![
            EpisodeLink::new(1, "https://s/1"),
            EpisodeLink::new(5, "https://s/5"),
            EpisodeLink::new(9, "https://s/9"),
        ];
        let mut memory = SessionLinkMemory::new();
        memory.absorb(&links, 2..=6);

        assert!(memory.url_for(1).is_none());
        assert_eq!(memory.url_for(5), Some("https://s/5"));
        assert!(memory.url_for(9).is_none());
    }

    #[test]
    fn test_rate_limit_errors_get_localized_message() {
        let error = ExtractError::RateLimited("429 RESOURCE_EXHAUSTED".to_string());
        assert_eq!(normalize_error(&error), RATE_LIMIT_WAIT_MESSAGE);

        let error = ExtractError::FetchExhausted {
            url: "https://x".to_string(),
            attempts: 8,
        };
        assert_eq!(normalize_error(&error), FETCH_BLOCKED_MESSAGE);

        let error = ExtractError::Parse("bad json".to_string());
        assert!(normalize_error(&error).contains("bad json"));
    }
}
