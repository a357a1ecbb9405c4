use serde::{Deserialize, Serialize};

/// Media classification for an extracted page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MediaType {
    #[default]
    Movie,
    Series,
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Movie => write!(f, "movie"),
            Self::Series => write!(f, "series"),
        }
    }
}

/// A named watch server or download link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerLink {
    /// Display name (server label or host-derived)
    pub name: String,
    /// Target URL
    pub url: String,
    /// Quality marker if known (e.g. "1080p")
    pub quality: Option<String>,
}

impl ServerLink {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            quality: None,
        }
    }

    /// Builder pattern: set quality
    pub fn with_quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = Some(quality.into());
        self
    }

    /// Name with the quality suffix appended, for display/export
    #[must_use]
    pub fn display_name(&self) -> String {
        match &self.quality {
            Some(q) => format!("{} ({q})", self.name),
            None => self.name.clone(),
        }
    }
}

/// A discovered episode-number → URL pair from an episode grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeLink {
    pub number: u32,
    pub url: String,
}

impl EpisodeLink {
    pub fn new(number: u32, url: impl Into<String>) -> Self {
        Self {
            number,
            url: url.into(),
        }
    }
}

/// Canonical output of one detail-page extraction chain.
///
/// Mutable while the chain enriches it from auxiliary pages, immutable once
/// handed to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Display title, canonical form for series:
    /// `"<Series> Season <S> Episode <E>[: <extra>]"`
    pub title: String,
    /// Base series name when known
    pub series_title: Option<String>,
    pub season_number: Option<u32>,
    pub episode_number: Option<u32>,
    pub media_type: MediaType,
    /// Ordered watch servers (capped at one authoritative entry per page)
    pub watch_servers: Vec<ServerLink>,
    /// Ordered download links
    pub download_links: Vec<ServerLink>,
    /// Direct MP4/M3U8/MPD file found inside the player markup
    pub active_video_url: Option<String>,
    /// Target of the prominent "Download Episode" button
    pub main_download_url: Option<String>,
    /// Separate player page, when the detail page delegates playback
    pub watch_page_url: Option<String>,
    /// Separate download page, when the detail page delegates downloads
    pub download_page_url: Option<String>,
    /// Explicit "next episode" link from the page
    pub next_episode_url: Option<String>,
    /// Episode grid harvested from the page, deduplicated by number,
    /// sorted ascending
    pub episode_links: Vec<EpisodeLink>,
    /// Image URLs found on the page
    pub gallery: Vec<String>,
}

impl Default for ExtractionResult {
    fn default() -> Self {
        Self {
            title: String::new(),
            series_title: None,
            season_number: None,
            episode_number: None,
            media_type: MediaType::Movie,
            watch_servers: Vec::new(),
            download_links: Vec::new(),
            active_video_url: None,
            main_download_url: None,
            watch_page_url: None,
            download_page_url: None,
            next_episode_url: None,
            episode_links: Vec::new(),
            gallery: Vec::new(),
        }
    }
}

impl ExtractionResult {
    /// Whether the chain still needs a player-page follow-up
    #[must_use]
    pub fn needs_watch_enrichment(&self) -> bool {
        self.watch_page_url.is_some() || self.watch_servers.is_empty()
    }

    /// Whether the chain still needs a download-page follow-up
    #[must_use]
    pub fn needs_download_enrichment(&self) -> bool {
        self.download_page_url.is_some() && self.download_links.len() < 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_link_display_name() {
        let plain = ServerLink::new("Vidmoly", "https://vidmoly.to/e/x");
        assert_eq!(plain.display_name(), "Vidmoly");

        let with_quality = plain.with_quality("1080p");
        assert_eq!(with_quality.display_name(), "Vidmoly (1080p)");
    }

    #[test]
    fn test_needs_watch_enrichment() {
        let mut result = ExtractionResult::default();
        assert!(result.needs_watch_enrichment());

        result.watch_servers.push(ServerLink::new("S1", "https://a/1"));
        assert!(!result.needs_watch_enrichment());

        result.watch_page_url = Some("https://a/watch".to_string());
        assert!(result.needs_watch_enrichment());
    }

    #[test]
    fn test_needs_download_enrichment() {
        let mut result = ExtractionResult {
            download_page_url: Some("https://a/dl".to_string()),
            ..Default::default()
        };
        assert!(result.needs_download_enrichment());

        result.download_links.push(ServerLink::new("D1", "https://d/1"));
        result.download_links.push(ServerLink::new("D2", "https://d/2"));
        assert!(!result.needs_download_enrichment());

        // No declared download page means no follow-up even with zero links
        result.download_page_url = None;
        result.download_links.clear();
        assert!(!result.needs_download_enrichment());
    }
}
