use super::http::HttpClient;
use super::traits::{InferenceService, ListingExtractor, ListingPage, MediaExtractor};
use crate::extractor::types::{EpisodeLink, ExtractionResult, MediaType, ServerLink};
use crate::extractor::{ExtractError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const DETAIL_SYSTEM_PROMPT: &str = "You are an expert cinema web scraper.
CRITICAL RULES:
1. A 'Watch Server' or 'Player' MUST be a video link (iframe, embed, or .mp4).
2. THE VIDEO PRESENT ON THE PAGE IS THE LIVE VIEWING SERVER.
3. DO NOT include image URLs (.jpg, .png) in 'watchServers'. Images are NOT viewing servers.
4. Find the direct MP4/M3U8 video file URL inside player scripts and put it in 'activeVideoUrl'.
5. Find the actual link inside the big red 'Download Episode' (تحميل الحلقة) button and put it in 'mainDownloadButtonUrl'.
6. Return valid JSON only.";

const DETAIL_USER_PROMPT: &str =
    "Extract data. The video file is the LIVE VIEWING SERVER. The red button is the download link.";

const LISTING_SYSTEM_PROMPT: &str = "Identify movie links only.";
const LISTING_USER_PROMPT: &str = "Find detail page URLs.";

/// Remote extractor configuration
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Character budget for detail-page HTML sent to the model
    pub detail_budget: usize,
    /// Character budget for listing-page HTML
    pub listing_budget: usize,
    /// Retries after a rate-limit rejection
    pub max_retries: usize,
    /// Retry `k` sleeps `k × retry_unit` before firing
    pub retry_unit: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            detail_budget: 800_000,
            listing_budget: 600_000,
            max_retries: 3,
            retry_unit: Duration::from_secs(2),
        }
    }
}

/// Gemini-style REST backend for the remote extractor
pub struct GeminiService {
    http: HttpClient,
    api_key: String,
    model: String,
}

impl GeminiService {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: HttpClient::new("https://generativelanguage.googleapis.com/v1beta"),
            api_key: api_key.into(),
            model: "gemini-2.5-flash".to_string(),
        }
    }

    /// Builder pattern: override the model name
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl InferenceService for GeminiService {
    async fn generate(&self, system_instruction: &str, parts: &[&str]) -> Result<String> {
        let endpoint = format!(
            "/models/{}:generateContent?key={}",
            self.model, self.api_key
        );
        let body = json!({
            "system_instruction": { "parts": [{ "text": system_instruction }] },
            "contents": [{
                "parts": parts.iter().map(|text| json!({ "text": text })).collect::<Vec<_>>()
            }],
            "generationConfig": { "response_mime_type": "application/json" }
        });

        let response: Value = self.http.post_json(&endpoint, &body).await?;
        response
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .map(|text| text.trim().to_string())
            .ok_or_else(|| ExtractError::Parse("Model response carried no text part".to_string()))
    }
}

/// Watch server or download link as the model reports it
#[derive(Debug, Deserialize)]
struct RemoteServer {
    name: String,
    url: String,
    quality: Option<String>,
}

impl From<RemoteServer> for ServerLink {
    fn from(server: RemoteServer) -> Self {
        let link = ServerLink::new(server.name, server.url);
        match server.quality {
            Some(q) => link.with_quality(q),
            None => link,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RemoteEpisode {
    number: String,
    url: Option<String>,
}

/// Detail-page payload in the model's structured-output schema
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteMedia {
    title: String,
    series_title: Option<String>,
    season_number: Option<f64>,
    episode_number: Option<f64>,
    #[serde(rename = "type")]
    media_type: Option<String>,
    #[serde(default)]
    watch_servers: Vec<RemoteServer>,
    #[serde(default)]
    download_links: Vec<RemoteServer>,
    active_video_url: Option<String>,
    main_download_button_url: Option<String>,
    download_page_url: Option<String>,
    watch_page_url: Option<String>,
    next_episode_url: Option<String>,
    #[serde(default)]
    episodes: Vec<RemoteEpisode>,
    #[serde(default)]
    gallery: Vec<String>,
}

impl RemoteMedia {
    fn into_result(self) -> ExtractionResult {
        let media_type = match self.media_type.as_deref() {
            Some("Series") => MediaType::Series,
            _ => MediaType::Movie,
        };

        // Episode numbers arrive as strings; keep the first entry per number
        let mut episode_links: Vec<EpisodeLink> = Vec::new();
        for episode in self.episodes {
            if let (Ok(number), Some(url)) = (episode.number.trim().parse::<u32>(), episode.url)
                && !episode_links.iter().any(|e| e.number == number)
            {
                episode_links.push(EpisodeLink::new(number, url));
            }
        }
        episode_links.sort_by_key(|e| e.number);

        ExtractionResult {
            title: self.title,
            series_title: self.series_title,
            season_number: self.season_number.map(|n| n as u32),
            episode_number: self.episode_number.map(|n| n as u32),
            media_type,
            watch_servers: self.watch_servers.into_iter().map(Into::into).collect(),
            download_links: self.download_links.into_iter().map(Into::into).collect(),
            active_video_url: self.active_video_url,
            main_download_url: self.main_download_button_url,
            watch_page_url: self.watch_page_url,
            download_page_url: self.download_page_url,
            next_episode_url: self.next_episode_url,
            episode_links,
            gallery: self.gallery,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteListing {
    category_title: Option<String>,
    #[serde(default)]
    links: Vec<String>,
}

/// Extractor backed by a remote structured-output model.
///
/// Rate-limit rejections are retried with a linearly growing pause; any
/// other failure surfaces immediately.
pub struct RemoteExtractor {
    service: Arc<dyn InferenceService>,
    config: RemoteConfig,
}

impl RemoteExtractor {
    pub fn new(service: Arc<dyn InferenceService>) -> Self {
        Self {
            service,
            config: RemoteConfig::default(),
        }
    }

    /// Builder pattern: override the configuration
    pub fn with_config(mut self, config: RemoteConfig) -> Self {
        self.config = config;
        self
    }

    async fn generate_with_retry(&self, system: &str, parts: &[&str]) -> Result<String> {
        let mut attempt = 0;
        loop {
            match self.service.generate(system, parts).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_rate_limited() && attempt < self.config.max_retries => {
                    attempt += 1;
                    warn!(attempt, "Model rate limited, backing off");
                    tokio::time::sleep(self.config.retry_unit * attempt as u32).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl MediaExtractor for RemoteExtractor {
    fn id(&self) -> &'static str {
        "remote"
    }

    async fn extract(&self, html: &str, _source_url: Option<&str>) -> Result<ExtractionResult> {
        let clipped = truncate_chars(html, self.config.detail_budget);
        debug!(chars = clipped.chars().count(), "Sending detail page to model");

        let text = self
            .generate_with_retry(DETAIL_SYSTEM_PROMPT, &[DETAIL_USER_PROMPT, clipped])
            .await?;
        let payload: RemoteMedia = serde_json::from_str(&text)
            .map_err(|e| ExtractError::Parse(format!("Model returned invalid JSON: {e}")))?;

        Ok(payload.into_result())
    }
}

#[async_trait]
impl ListingExtractor for RemoteExtractor {
    async fn extract_listing(&self, html: &str) -> Result<ListingPage> {
        let clipped = truncate_chars(html, self.config.listing_budget);

        let text = self
            .generate_with_retry(LISTING_SYSTEM_PROMPT, &[LISTING_USER_PROMPT, clipped])
            .await?;
        let payload: RemoteListing = serde_json::from_str(&text)
            .map_err(|e| ExtractError::Parse(format!("Model returned invalid JSON: {e}")))?;

        Ok(ListingPage {
            category_title: payload.category_title,
            links: payload.links,
        })
    }
}

/// Clip to at most `budget` characters without splitting a code point
fn truncate_chars(text: &str, budget: usize) -> &str {
    match text.char_indices().nth(budget) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("abcdef", 4), "abcd");
        assert_eq!(truncate_chars("abc", 10), "abc");
        // Multi-byte characters count as one
        assert_eq!(truncate_chars("مرحبا", 3), "مرح");
    }

    #[test]
    fn test_remote_media_maps_into_result() {
        let text = r#"{
            "title": "Dark Season 2 Episode 8",
            "seriesTitle": "Dark",
            "seasonNumber": 2,
            "episodeNumber": 8,
            "type": "Series",
            "watchServers": [{ "name": "Vidmoly", "url": "https://v.example/e/1", "quality": "1080p" }],
            "downloadLinks": [{ "name": "MEGA", "url": "https://mega.nz/f/1" }],
            "episodes": [
                { "number": "2", "url": "https://s.example/ep-2" },
                { "number": "1", "url": "https://s.example/ep-1" },
                { "number": "2", "url": "https://s.example/ep-2-dup" }
            ]
        }"#;
        let payload: RemoteMedia = serde_json::from_str(text).unwrap();
        let result = payload.into_result();

        assert_eq!(result.media_type, MediaType::Series);
        assert_eq!(result.season_number, Some(2));
        assert_eq!(result.watch_servers[0].display_name(), "Vidmoly (1080p)");
        let numbers: Vec<u32> = result.episode_links.iter().map(|e| e.number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(result.episode_links[1].url, "https://s.example/ep-2");
    }
}
