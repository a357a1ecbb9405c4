use crate::extractor::{Result, types::ExtractionResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Detail-page links harvested from a category/listing page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingPage {
    pub category_title: Option<String>,
    pub links: Vec<String>,
}

/// Core trait for structured page extractors
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Extractor identifier (e.g., "heuristic", "remote")
    fn id(&self) -> &'static str;

    /// Extract structured media data from an already-fetched page.
    ///
    /// `source_url` is the page the HTML came from; implementations may use
    /// it as a numbering fallback and must tolerate `None`.
    async fn extract(&self, html: &str, source_url: Option<&str>) -> Result<ExtractionResult>;
}

/// Trait for extractors that can pull detail links out of listing pages
#[async_trait]
pub trait ListingExtractor: Send + Sync {
    async fn extract_listing(&self, html: &str) -> Result<ListingPage>;
}

/// Raw structured-generation seam under the remote extractor
#[async_trait]
pub trait InferenceService: Send + Sync {
    /// Run one structured-output generation and return the raw JSON text
    async fn generate(&self, system_instruction: &str, parts: &[&str]) -> Result<String>;
}
