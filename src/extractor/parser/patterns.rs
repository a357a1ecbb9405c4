use regex::Regex;
use std::sync::LazyLock;

/// Pre-compiled regex patterns for raw-HTML extraction
pub struct Patterns {
    // Title sources (ordered by preference)
    pub title_h1: Regex,
    pub title_tag: Regex,
    pub og_title: Regex,
    pub itemprop_name: Regex,

    // Site-brand and boilerplate words stripped from raw titles
    pub title_noise: Regex,

    // Season/episode numbering (Arabic and English token variants)
    pub episode_in_title: Regex,
    pub episode_in_url: Regex,
    pub episode_url_trailing: Regex, // trailing "-N" or "-N/" segment
    pub season_in_title: Regex,
    pub episode_token: Regex, // strip variant: token + number
    pub season_token: Regex,

    // Direct video file assignments inside player scripts/markup
    pub video_file_assign: Regex, // file: "https://...mp4"
    pub video_url_assign: Regex,  // url: "https://...m3u8"
    pub video_src_assign: Regex,  // src = "https://...mpd"
    pub video_source_tag: Regex,  // <source src="...">

    // Link harvesting
    pub episode_anchor: Regex,   // anchor whose text carries an episode number
    pub server_data_attr: Regex, // data-watch/data-url/... on list/button/anchor
    pub anchor: Regex,           // any absolute-href anchor with visible text
    pub tag: Regex,              // inner-markup stripper
    pub image_ext: Regex,        // URLs that are images, never servers

    // Explicit next-episode navigation
    pub next_explicit: Regex,
    pub next_class: Regex,
}

impl Patterns {
    pub fn new() -> Self {
        Self {
            title_h1: Regex::new(r"(?is)<h1[^>]*>\s*(.*?)\s*</h1>").expect("Invalid title_h1 regex"),
            title_tag: Regex::new(r"(?is)<title>(.*?)</title>").expect("Invalid title_tag regex"),
            og_title: Regex::new(r#"(?i)property="og:title"\s+content="(.*?)""#)
                .expect("Invalid og_title regex"),
            itemprop_name: Regex::new(r#"(?is)itemprop="name"[^>]*>\s*(.*?)\s*<"#)
                .expect("Invalid itemprop_name regex"),

            title_noise: Regex::new(r"(?i)مشاهدة|تحميل|مترجم|اون لاين|اونلاين|وي سيما|ماي سيما")
                .expect("Invalid title_noise regex"),

            episode_in_title: Regex::new(r"(?i)(?:الحلقة#|الحلقه|الحلقة|Episode|EP#|Ep|E)\s*(\d+)")
                .expect("Invalid episode_in_title regex"),
            episode_in_url: Regex::new(r"(?i)(?:episode-|episode|حلقة|حلقه|ep#|ep|e)\s*(\d+)")
                .expect("Invalid episode_in_url regex"),
            episode_url_trailing: Regex::new(r"-(\d+)(?:/|$)")
                .expect("Invalid episode_url_trailing regex"),
            season_in_title: Regex::new(r"(?i)(?:الموسم|Season|S)\s*(\d+)")
                .expect("Invalid season_in_title regex"),
            episode_token: Regex::new(r"(?i)(?:الحلقة#|الحلقه|الحلقة|Episode|EP#|Ep|E)\s*\d+")
                .expect("Invalid episode_token regex"),
            season_token: Regex::new(r"(?i)(?:الموسم|Season|S)\s*\d+")
                .expect("Invalid season_token regex"),

            video_file_assign: Regex::new(
                r#"(?i)["']?file["']?\s*[:=]\s*["'](https?://[^"']+\.(?:mp4|m3u8|mpd)(?:\?[^"']*)?)["']"#,
            )
            .expect("Invalid video_file_assign regex"),
            video_url_assign: Regex::new(
                r#"(?i)["']?url["']?\s*[:=]\s*["'](https?://[^"']+\.(?:mp4|m3u8|mpd)(?:\?[^"']*)?)["']"#,
            )
            .expect("Invalid video_url_assign regex"),
            video_src_assign: Regex::new(
                r#"(?i)src\s*[:=]\s*["'](https?://[^"']+\.(?:mp4|m3u8|mpd)(?:\?[^"']*)?)["']"#,
            )
            .expect("Invalid video_src_assign regex"),
            video_source_tag: Regex::new(
                r#"(?i)<source[^>]*src=["'](https?://[^"']+\.(?:mp4|m3u8|mpd)(?:\?[^"']*)?)["']"#,
            )
            .expect("Invalid video_source_tag regex"),

            episode_anchor: Regex::new(
                r#"(?is)<a[^>]*href=["'](https?://[^"']+)["'][^>]*>.*?(?:EP#|الحلقة#|الحلقه|الحلقة|Episode|Ep|E)\s*(\d+).*?</a>"#,
            )
            .expect("Invalid episode_anchor regex"),
            server_data_attr: Regex::new(
                r#"(?is)(?:data-watch|data-url|data-link|data-src|data-video)=["'](https?://[^"']+)["'][^>]*>(.*?)</(?:li|button|a)>"#,
            )
            .expect("Invalid server_data_attr regex"),
            anchor: Regex::new(r#"(?is)<a[^>]*href=["'](https?://[^"']+)["'][^>]*>(.*?)</a>"#)
                .expect("Invalid anchor regex"),
            tag: Regex::new(r"<[^>]*>").expect("Invalid tag regex"),
            image_ext: Regex::new(r"(?i)\.(?:jpg|jpeg|png|webp|gif|svg|bmp)$")
                .expect("Invalid image_ext regex"),

            next_explicit: Regex::new(
                r#"(?i)href=["'](https?://[^"']+)["'][^>]*>\s*(?:الحلقة التالية|Next Episode|التالية)\s*</a>"#,
            )
            .expect("Invalid next_explicit regex"),
            next_class: Regex::new(r#"(?i)class=["']next["'][^>]*href=["'](https?://[^"']+)["']"#)
                .expect("Invalid next_class regex"),
        }
    }
}

impl Default for Patterns {
    fn default() -> Self {
        Self::new()
    }
}

/// Global singleton for patterns
pub static PATTERNS: LazyLock<Patterns> = LazyLock::new(Patterns::new);
