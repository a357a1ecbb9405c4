use crate::extractor::types::{CloneOutcome, ExtractionResult, MediaType};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;

/// Fixed column counts of the export layout
pub const SERVER_COLUMNS: usize = 8;
pub const DOWNLOAD_COLUMNS: usize = 2;

const MAX_SHEET_NAME_CHARS: usize = 30;
const COLLISION_STEM_CHARS: usize = 25;
const FALLBACK_SHEET_NAME: &str = "Series";

static SEASON_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:season|موسم|s)\s*\d+").expect("Invalid season token regex")
});
static EPISODE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:episode|ep|حلقة|e)\s*\d+").expect("Invalid episode token regex")
});
static SEASON_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:season|موسم|s)\s*(\d+)").expect("Invalid season number regex")
});
static EPISODE_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:episode|ep|حلقة|e)\s*(\d+)").expect("Invalid episode number regex")
});
static TRAILING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s(\d+)$").expect("Invalid trailing number regex"));
static NON_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^0-9A-Za-z_\x{0600}-\x{06FF}]").expect("Invalid non-word regex")
});
static SEASON_TAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:season|موسم|s)\s*\d+.*$").expect("Invalid season tail regex")
});
static EPISODE_TAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:episode|ep|حلقة|e)\s*\d+.*$").expect("Invalid episode tail regex")
});
static SHEET_FORBIDDEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[:/\\?*\[\]]").expect("Invalid sheet chars regex"));

/// One movie row: title plus fixed server/download columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieRow {
    pub title: String,
    /// Exactly [`SERVER_COLUMNS`] entries, empty string for a missing server
    pub servers: Vec<String>,
    /// Exactly [`DOWNLOAD_COLUMNS`] entries
    pub downloads: Vec<String>,
}

/// One episode row inside a series sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeRow {
    pub season: u32,
    pub episode: u32,
    pub servers: Vec<String>,
    pub downloads: Vec<String>,
}

/// One sheet holding every episode of a grouped series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesSheet {
    pub name: String,
    pub rows: Vec<EpisodeRow>,
}

/// Spreadsheet-shaped view over a set of extraction results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkbookExport {
    pub movies: Vec<MovieRow>,
    pub series: Vec<SeriesSheet>,
}

/// One row of the cloner export, input order preserved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClonedLinkRow {
    pub url: String,
    pub download_url: String,
    pub quality: String,
    pub original_source: String,
}

/// Groups extraction results into an export-ready workbook model.
///
/// Movies land on a single sheet; series episodes are grouped by a
/// normalized series key so spelling variants of the same show share one
/// sheet, sorted season then episode.
pub struct ResultAggregator;

impl ResultAggregator {
    #[must_use]
    pub fn aggregate(results: &[ExtractionResult]) -> WorkbookExport {
        let mut movies = Vec::new();
        let mut groups: Vec<(String, String, Vec<&ExtractionResult>)> = Vec::new();

        for result in results {
            match result.media_type {
                MediaType::Movie => movies.push(MovieRow {
                    title: result.title.clone(),
                    servers: column_urls(&result.watch_servers, SERVER_COLUMNS),
                    downloads: column_urls(&result.download_links, DOWNLOAD_COLUMNS),
                }),
                MediaType::Series => {
                    // The extractor's series title beats re-deriving one
                    let label = result.series_title.as_deref().unwrap_or(&result.title);
                    let key = normalize_group_key(label);
                    match groups.iter_mut().find(|(k, _, _)| *k == key) {
                        Some((_, _, items)) => items.push(result),
                        None => groups.push((key, clean_sheet_name(label), vec![result])),
                    }
                }
            }
        }

        let mut used_names: HashSet<String> = HashSet::new();
        let series = groups
            .into_iter()
            .map(|(_, display, items)| {
                let mut rows: Vec<EpisodeRow> = items
                    .into_iter()
                    .map(|item| {
                        let (season, episode) = numbering(item);
                        EpisodeRow {
                            season,
                            episode,
                            servers: column_urls(&item.watch_servers, SERVER_COLUMNS),
                            downloads: column_urls(&item.download_links, DOWNLOAD_COLUMNS),
                        }
                    })
                    .collect();
                rows.sort_by_key(|row| (row.season, row.episode));

                SeriesSheet {
                    name: unique_sheet_name(&display, &mut used_names),
                    rows,
                }
            })
            .collect();

        WorkbookExport { movies, series }
    }

    /// Rows for the cloner export. Every outcome keeps its row so row `N`
    /// stays episode `N`, failed clones included with empty URLs.
    #[must_use]
    pub fn cloner_rows(outcomes: &[CloneOutcome]) -> Vec<ClonedLinkRow> {
        outcomes
            .iter()
            .map(|o| ClonedLinkRow {
                url: o.watch_url.clone().unwrap_or_default(),
                download_url: o.download_url.clone().unwrap_or_default(),
                quality: "HD".to_string(),
                original_source: o.original_url.clone(),
            })
            .collect()
    }
}

fn column_urls(links: &[crate::extractor::types::ServerLink], width: usize) -> Vec<String> {
    (0..width)
        .map(|i| links.get(i).map(|l| l.url.clone()).unwrap_or_default())
        .collect()
}

/// Canonical grouping key: numbering tokens dropped, Arabic letter
/// variants folded, punctuation collapsed to spaces
#[must_use]
pub fn normalize_group_key(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = SEASON_TOKEN.replace_all(&lowered, "");
    let stripped = EPISODE_TOKEN.replace_all(&stripped, "");
    let folded: String = stripped
        .chars()
        .map(|c| match c {
            'أ' | 'إ' | 'آ' => 'ا',
            'ى' => 'ي',
            'ة' => 'ه',
            other => other,
        })
        .collect();
    let spaced = NON_WORD.replace_all(&folded, " ");
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Human-readable sheet name: numbering tail dropped, characters the
/// sheet format forbids removed, clipped to the format's length cap
#[must_use]
pub fn clean_sheet_name(title: &str) -> String {
    let clean = SEASON_TAIL.replace_all(title, "");
    let clean = EPISODE_TAIL.replace_all(&clean, "");
    let clean = SHEET_FORBIDDEN.replace_all(&clean, "");
    let clipped: String = clean.trim().chars().take(MAX_SHEET_NAME_CHARS).collect();
    if clipped.is_empty() {
        FALLBACK_SHEET_NAME.to_string()
    } else {
        clipped
    }
}

fn unique_sheet_name(display: &str, used: &mut HashSet<String>) -> String {
    let base = if display.trim().is_empty() {
        FALLBACK_SHEET_NAME.to_string()
    } else {
        display.trim().to_string()
    };

    let mut name = base.clone();
    let mut counter = 1;
    while used.contains(&name) {
        let stem: String = base.chars().take(COLLISION_STEM_CHARS).collect();
        name = format!("{stem}_{counter}");
        counter += 1;
    }
    used.insert(name.clone());
    name
}

/// Season/episode for a row: extractor numbers first, then numbers parsed
/// back out of the title, then 1
fn numbering(result: &ExtractionResult) -> (u32, u32) {
    let lowered = result.title.to_lowercase();

    let season = result.season_number.unwrap_or_else(|| {
        SEASON_NUMBER
            .captures(&lowered)
            .and_then(|c| c[1].parse().ok())
            .unwrap_or(1)
    });
    let episode = result.episode_number.unwrap_or_else(|| {
        EPISODE_NUMBER
            .captures(&lowered)
            .and_then(|c| c[1].parse().ok())
            .or_else(|| {
                TRAILING_NUMBER
                    .captures(&lowered)
                    .and_then(|c| c[1].parse().ok())
            })
            .unwrap_or(1)
    });

    (season.max(1), episode.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_folds_arabic_variants() {
        assert_eq!(
            normalize_group_key("مسلسل قيامة أرطغرل الحلقة 5"),
            normalize_group_key("مسلسل قيامة ارطغرل الحلقة 9")
        );
    }

    #[test]
    fn test_normalize_drops_numbering_tokens() {
        assert_eq!(
            normalize_group_key("Dark Season 2 Episode 8"),
            normalize_group_key("Dark Season 1 Episode 1")
        );
    }

    #[test]
    fn test_clean_sheet_name_strips_forbidden_chars() {
        assert_eq!(clean_sheet_name("My Show: The [Best]?"), "My Show The Best");
        assert_eq!(clean_sheet_name("Dark Season 2 Episode 8"), "Dark");
        assert_eq!(clean_sheet_name(""), "Series");
    }

    #[test]
    fn test_unique_sheet_name_suffixes_collisions() {
        let mut used = HashSet::new();
        assert_eq!(unique_sheet_name("Dark", &mut used), "Dark");
        assert_eq!(unique_sheet_name("Dark", &mut used), "Dark_1");
        assert_eq!(unique_sheet_name("Dark", &mut used), "Dark_2");
    }
}
