use crate::extractor::Result;
use crate::extractor::fetcher::PageFetcher;
use crate::extractor::provider::MediaExtractor;
use crate::extractor::types::{ExtractionResult, ServerLink};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Detail-resolution seam consumed by the batch scheduler
#[async_trait]
pub trait DetailResolver: Send + Sync {
    /// Fetch a detail page and produce its fully enriched result
    async fn resolve_detail(&self, url: &str) -> Result<ExtractionResult>;
}

/// Fetch → extract → enrich pipeline for a single detail page.
///
/// Detail pages on these sites often delegate playback and downloads to
/// auxiliary pages. After the primary extraction the resolver follows both
/// in parallel; an enrichment failure degrades the result instead of
/// failing the whole page.
pub struct ChainResolver {
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn MediaExtractor>,
}

impl ChainResolver {
    pub fn new(fetcher: Arc<dyn PageFetcher>, extractor: Arc<dyn MediaExtractor>) -> Self {
        Self { fetcher, extractor }
    }

    async fn fetch_and_extract(&self, url: &str) -> Result<ExtractionResult> {
        let html = self.fetcher.fetch_html(url).await?;
        self.extractor.extract(&html, Some(url)).await
    }

    /// Follow the player page when the detail page declared one or listed
    /// no servers. A non-empty server list from the player page replaces
    /// the primary list wholesale.
    async fn watch_servers_from_player(
        &self,
        page_url: &str,
        primary: &ExtractionResult,
    ) -> Option<Vec<ServerLink>> {
        if !primary.needs_watch_enrichment() {
            return None;
        }
        let target = primary.watch_page_url.as_deref().unwrap_or(page_url);
        debug!(url = target, "Following player page");

        match self.fetch_and_extract(target).await {
            Ok(aux) if !aux.watch_servers.is_empty() => Some(aux.watch_servers),
            Ok(_) => None,
            Err(e) => {
                warn!(url = page_url, error = %e, "Player page enrichment failed");
                None
            }
        }
    }

    /// Follow the download page when one was declared and the primary list
    /// is thin. Its links are appended, never replacing what the detail
    /// page already had.
    async fn download_links_from_page(
        &self,
        page_url: &str,
        primary: &ExtractionResult,
    ) -> Option<Vec<ServerLink>> {
        if !primary.needs_download_enrichment() {
            return None;
        }
        let target = primary.download_page_url.as_deref()?;
        debug!(url = target, "Following download page");

        match self.fetch_and_extract(target).await {
            Ok(aux) if !aux.download_links.is_empty() => Some(aux.download_links),
            Ok(_) => None,
            Err(e) => {
                warn!(url = page_url, error = %e, "Download page enrichment failed");
                None
            }
        }
    }
}

#[async_trait]
impl DetailResolver for ChainResolver {
    async fn resolve_detail(&self, url: &str) -> Result<ExtractionResult> {
        let mut result = self.fetch_and_extract(url).await?;

        let (watch, downloads) = tokio::join!(
            self.watch_servers_from_player(url, &result),
            self.download_links_from_page(url, &result),
        );

        if let Some(servers) = watch {
            result.watch_servers = servers;
        }
        if let Some(links) = downloads {
            result.download_links.extend(links);
        }

        Ok(result)
    }
}
