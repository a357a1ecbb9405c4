use super::traits::MediaExtractor;
use crate::extractor::types::ExtractionResult;
use crate::extractor::{Result, parser};
use async_trait::async_trait;

/// Zero-cost extractor backed entirely by pre-compiled patterns.
///
/// Works offline on the fetched HTML and never talks to a remote model,
/// which makes it the default for serial walks where per-page model calls
/// would burn quota.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicExtractor;

impl HeuristicExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MediaExtractor for HeuristicExtractor {
    fn id(&self) -> &'static str {
        "heuristic"
    }

    async fn extract(&self, html: &str, source_url: Option<&str>) -> Result<ExtractionResult> {
        Ok(parser::extract(html, source_url))
    }
}
