//! Crawl-and-extract engine for media pages.
//!
//! The pipeline fetches pages through rotating CORS proxies, extracts
//! structured media data with either a heuristic parser or a remote model,
//! enriches results from auxiliary player/download pages, and schedules
//! batches and episode walks. Results can be aggregated into an
//! export-ready workbook model or cloned to a file-hosting account.

pub mod extractor;

pub use extractor::{ExtractError, Result, create_default_engine};

/// Install the global tracing subscriber, filtered through `RUST_LOG`
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
