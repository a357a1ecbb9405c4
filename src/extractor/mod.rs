mod aggregator;
mod chain;
mod cloner;
mod fetcher;
mod parser;
mod provider;
mod scheduler;
mod types;


pub use aggregator::{
    ClonedLinkRow, DOWNLOAD_COLUMNS, EpisodeRow, MovieRow, ResultAggregator, SERVER_COLUMNS,
    SeriesSheet, WorkbookExport, clean_sheet_name, normalize_group_key,
};
pub use chain::{ChainResolver, DetailResolver};
pub use cloner::{
    CloneRunner, ClonerConfig, LinkCloner, RenameRules, UploadHistory, UploadRecord, UqloadCloner,
};
pub use fetcher::{
    DEFAULT_PROXIES, FetcherConfig, PageFetcher, ProxyFetcher, ReqwestTransport, Transport,
    TransportResponse,
};
pub use provider::{
    GeminiService, HeuristicExtractor, HttpClient, InferenceService, ListingExtractor, ListingPage,
    MediaExtractor, RemoteConfig, RemoteExtractor,
};
pub use scheduler::{
    BatchScheduler, FETCH_BLOCKED_MESSAGE, ListingPipeline, ListingRun, RATE_LIMIT_WAIT_MESSAGE,
    SchedulerConfig, SessionLinkMemory,
};
pub use types::{
    ChainTask, CloneOutcome, CloneStatus, EpisodeLink, ExtractionResult, MediaType, ServerLink,
    TaskStatus,
};

use std::sync::Arc;

/// Extractor result type
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Extractor error types
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("All proxy attempts for {url} exhausted after {attempts} tries")]
    FetchExhausted { url: String, attempts: usize },

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Service error: {status} - {message}")]
    Service { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractError {
    /// Whether this failure is a quota rejection worth waiting out
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::RateLimited(_) => true,
            Self::Service { status, message } => {
                *status == 429
                    || message.contains("429")
                    || message.contains("RESOURCE_EXHAUSTED")
                    || message.contains("Quota")
            }
            _ => false,
        }
    }
}

/// Create a default extraction scheduler.
///
/// With an API key the pipeline extracts through the remote model; without
/// one it falls back to the offline heuristic extractor.
#[must_use]
pub fn create_default_engine(api_key: Option<&str>) -> BatchScheduler {
    let fetcher: Arc<dyn PageFetcher> = Arc::new(ProxyFetcher::default());
    let extractor: Arc<dyn MediaExtractor> = match api_key {
        Some(key) => Arc::new(RemoteExtractor::new(Arc::new(GeminiService::new(key)))),
        None => Arc::new(HeuristicExtractor::new()),
    };
    let resolver = Arc::new(ChainResolver::new(fetcher, extractor));

    BatchScheduler::new(resolver)
}
