use super::patterns::PATTERNS;
use crate::extractor::types::{EpisodeLink, ExtractionResult, MediaType, ServerLink};

/// Fallback title when nothing on the page looks like one
const UNKNOWN_TITLE: &str = "عنوان غير معروف";

/// Synthetic server name for a raw video file found in the player markup
const DIRECT_VIDEO_SERVER: &str = "Direct Video";

/// Name for the target of the prominent download button
const MAIN_DOWNLOAD_NAME: &str = "Download Episode";

/// Hosts that are download mirrors even when the anchor text says nothing
const DOWNLOAD_HOSTS: &[&str] = &[
    "mega.nz",
    "mediafire",
    "1fichier",
    "uptobox",
    "tahmil",
    "download",
    "gdrive",
    "drive.google",
];

const MAX_WATCH_SERVERS: usize = 1;
const MAX_DOWNLOAD_LINKS: usize = 30;

/// Extract structured media data from a raw HTML document.
///
/// Pure and idempotent: the same `html` and `source_url` always yield the
/// same result, and nothing is fetched. `source_url` is only consulted as a
/// fallback for the episode number when the title carries none.
#[must_use]
pub fn extract(html: &str, source_url: Option<&str>) -> ExtractionResult {
    let raw_title = cleaned_raw_title(html);

    // Title wins over URL for the episode number
    let mut episode_number = PATTERNS
        .episode_in_title
        .captures(&raw_title)
        .and_then(|c| c[1].parse::<u32>().ok());
    if episode_number.is_none()
        && let Some(url) = source_url
    {
        episode_number = PATTERNS
            .episode_in_url
            .captures(url)
            .or_else(|| PATTERNS.episode_url_trailing.captures(url))
            .and_then(|c| c[1].parse::<u32>().ok());
    }

    let season_number = PATTERNS
        .season_in_title
        .captures(&raw_title)
        .and_then(|c| c[1].parse::<u32>().ok());

    let series_title = base_series_title(&raw_title);
    let content_part = content_part(&raw_title, &series_title);

    let mut title = format!(
        "{series_title} Season {} Episode {}",
        season_number.unwrap_or(1),
        episode_number.unwrap_or(1)
    );
    if !content_part.is_empty() {
        title.push_str(": ");
        title.push_str(&content_part);
    }

    let mut watch_servers: Vec<ServerLink> = Vec::new();
    let mut download_links: Vec<ServerLink> = Vec::new();

    // Raw video file inside player scripts beats any listed server
    let active_video_url = [
        &PATTERNS.video_file_assign,
        &PATTERNS.video_url_assign,
        &PATTERNS.video_src_assign,
        &PATTERNS.video_source_tag,
    ]
    .iter()
    .find_map(|p| p.captures(html).map(|c| c[1].to_string()));
    if let Some(url) = &active_video_url
        && watch_servers.is_empty()
    {
        watch_servers.push(ServerLink::new(DIRECT_VIDEO_SERVER, url));
    }

    // Episode grid, deduplicated by number
    let mut episode_links: Vec<EpisodeLink> = Vec::new();
    for caps in PATTERNS.episode_anchor.captures_iter(html) {
        if let Ok(number) = caps[2].parse::<u32>()
            && !episode_links.iter().any(|e| e.number == number)
        {
            episode_links.push(EpisodeLink::new(number, &caps[1]));
        }
    }
    episode_links.sort_by_key(|e| e.number);

    // Alternative watch servers from data attributes, only when nothing
    // authoritative was found yet
    for caps in PATTERNS.server_data_attr.captures_iter(html) {
        let url = &caps[1];
        if PATTERNS.image_ext.is_match(url) {
            continue;
        }
        if watch_servers.is_empty() && !watch_servers.iter().any(|s| s.url == *url) {
            let label = strip_tags(&caps[2]);
            let name = if label.is_empty() {
                host_label(url)
            } else {
                label
            };
            watch_servers.push(ServerLink::new(name, url));
        }
    }

    // Download links and the prominent download button
    let mut main_download_url: Option<String> = None;
    for caps in PATTERNS.anchor.captures_iter(html) {
        let url = &caps[1];
        if PATTERNS.image_ext.is_match(url) {
            continue;
        }
        let full = caps[0].to_lowercase();
        let text = strip_tags(&caps[2]).to_lowercase();

        let is_main_button = text.contains("تحميل الحلقة")
            || text.contains("download episode")
            || (text.contains("تحميل") && full.contains("btn-danger"));
        if is_main_button && main_download_url.is_none() {
            main_download_url = Some(url.to_string());
            if !download_links.iter().any(|d| d.url == *url) {
                download_links.push(ServerLink::new(MAIN_DOWNLOAD_NAME, url));
            }
        }

        let is_download = is_download_host(url)
            || text.contains("download")
            || text.contains("تحميل")
            || text.contains("direct")
            || text.contains("مباشر");
        if is_download && !download_links.iter().any(|d| d.url == *url) {
            download_links.push(ServerLink::new(host_label(url), url));
        }
    }

    let next_episode_url = PATTERNS
        .next_explicit
        .captures(html)
        .or_else(|| PATTERNS.next_class.captures(html))
        .map(|c| c[1].to_string());

    watch_servers.truncate(MAX_WATCH_SERVERS);
    download_links.truncate(MAX_DOWNLOAD_LINKS);

    ExtractionResult {
        title,
        series_title: (!series_title.is_empty()).then_some(series_title),
        season_number,
        episode_number,
        media_type: MediaType::Series,
        watch_servers,
        download_links,
        active_video_url,
        main_download_url,
        watch_page_url: None,
        download_page_url: None,
        next_episode_url,
        episode_links,
        gallery: Vec::new(),
    }
}

/// First matching title source, with site-brand noise and separators removed
fn cleaned_raw_title(html: &str) -> String {
    let sources = [
        &PATTERNS.title_h1,
        &PATTERNS.title_tag,
        &PATTERNS.og_title,
        &PATTERNS.itemprop_name,
    ];
    for pattern in sources {
        if let Some(caps) = pattern.captures(html) {
            let text = strip_tags(&caps[1]);
            if !text.is_empty() {
                let cleaned = PATTERNS.title_noise.replace_all(&text, "");
                return cleaned.replace('-', "").trim().to_string();
            }
        }
    }
    UNKNOWN_TITLE.to_string()
}

/// Series name: the raw title minus numbering tokens, cut at the first
/// separator, whitespace collapsed
fn base_series_title(raw_title: &str) -> String {
    let stripped = PATTERNS.episode_token.replace_all(raw_title, "");
    let stripped = PATTERNS.season_token.replace_all(&stripped, "");
    let head = stripped
        .split([':', '|', '-'])
        .next()
        .unwrap_or_default();
    head.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extra descriptive text after the last separator, dropped when it just
/// repeats the series name or is too short to mean anything
fn content_part(raw_title: &str, series_title: &str) -> String {
    let part = if raw_title.contains(':') {
        raw_title.rsplit(':').next().unwrap_or_default().trim()
    } else if raw_title.contains('-') {
        let mut parts = raw_title.split('-');
        if parts.clone().count() > 1 {
            parts.next_back().unwrap_or_default().trim()
        } else {
            ""
        }
    } else {
        ""
    };
    if part == series_title || part.chars().count() < 3 {
        String::new()
    } else {
        part.to_string()
    }
}

fn is_download_host(url: &str) -> bool {
    if PATTERNS.image_ext.is_match(url) {
        return false;
    }
    let lower = url.to_lowercase();
    DOWNLOAD_HOSTS.iter().any(|h| lower.contains(h))
}

/// Short uppercase label derived from the URL host, e.g. "VIDMOLY"
fn host_label(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .and_then(|host| {
            host.trim_start_matches("www.")
                .split('.')
                .next()
                .map(str::to_uppercase)
        })
        .filter(|label| !label.is_empty())
        .unwrap_or_else(|| "SERVER".to_string())
}

fn strip_tags(fragment: &str) -> String {
    PATTERNS.tag.replace_all(fragment, "").trim().to_string()
}
