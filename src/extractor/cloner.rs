use crate::extractor::types::{CloneOutcome, CloneStatus};
use crate::extractor::{ExtractError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{debug, info, warn};

const DEFAULT_IGNORED_KEYWORDS: &[&str] = &[
    "EgyBest",
    "ArabSeed",
    "Cima4u",
    "MyCima",
    "WeCima",
    "Akwam",
    "Shahid4u",
    "Cima Now CoM",
    "CimaNow",
    "www.",
    ".com",
    ".net",
    ".org",
];

const DEFAULT_PREFIX: &str = "Cinematix_";
const HISTORY_CAP: usize = 100;

static BRACKET_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[.*?\]").expect("Invalid bracket regex"));

/// Filename branding rules applied when renaming cloned files.
///
/// Keyword patterns are compiled once at construction.
#[derive(Debug, Clone)]
pub struct RenameRules {
    prefix: String,
    keyword_patterns: Vec<Regex>,
}

impl Default for RenameRules {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX, DEFAULT_IGNORED_KEYWORDS.iter().copied())
    }
}

impl RenameRules {
    pub fn new(
        prefix: impl Into<String>,
        ignored_keywords: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Self {
        let keyword_patterns = ignored_keywords
            .into_iter()
            .filter(|k| !k.as_ref().is_empty())
            .map(|k| {
                Regex::new(&format!("(?i){}", regex::escape(k.as_ref())))
                    .expect("Invalid keyword regex")
            })
            .collect();

        Self {
            prefix: prefix.into(),
            keyword_patterns,
        }
    }

    /// Scrub bracketed tags and competitor brands, then enforce the prefix
    #[must_use]
    pub fn brand_name(&self, original: &str) -> String {
        if original.is_empty() {
            return String::new();
        }

        let mut name = BRACKET_TAG.replace_all(original, "").into_owned();
        for pattern in &self.keyword_patterns {
            name = pattern.replace_all(&name, "").into_owned();
        }

        let name = name
            .trim_matches(|c: char| c.is_whitespace() || matches!(c, '.' | '_' | '-'))
            .to_string();

        if !self.prefix.is_empty()
            && !name.to_lowercase().starts_with(&self.prefix.to_lowercase())
        {
            format!("{}{name}", self.prefix)
        } else {
            name
        }
    }
}

/// One completed upload kept in the local history file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRecord {
    pub name: String,
    pub url: String,
    pub download_url: String,
    pub date: DateTime<Utc>,
}

/// Newest-first JSON file of recent uploads, capped at [`HISTORY_CAP`]
#[derive(Debug)]
pub struct UploadHistory {
    path: PathBuf,
    records: Vec<UploadRecord>,
}

impl UploadHistory {
    /// Load history from `path`; a missing or unreadable file starts empty
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = std::fs::read_to_string(&path)
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok())
            .unwrap_or_default();
        Self { path, records }
    }

    /// Prepend a record, drop anything beyond the cap, persist
    pub fn record(&mut self, record: UploadRecord) -> anyhow::Result<()> {
        self.records.insert(0, record);
        self.records.truncate(HISTORY_CAP);
        self.save()
    }

    fn save(&self) -> anyhow::Result<()> {
        let text = serde_json::to_string_pretty(&self.records)?;
        std::fs::write(&self.path, text)?;
        Ok(())
    }

    #[must_use]
    pub fn records(&self) -> &[UploadRecord] {
        &self.records
    }
}

/// File-cloning seam: copy one remote link to the hosting account.
///
/// Implementations report every outcome as a row, never as an error, so a
/// batch keeps its one-row-per-input shape.
#[async_trait]
pub trait LinkCloner: Send + Sync {
    async fn clone_link(&self, url: &str) -> CloneOutcome;
}

/// Cloner configuration
#[derive(Debug, Clone)]
pub struct ClonerConfig {
    pub api_key: String,
    /// API command domain
    pub api_base: String,
    /// Viewing/embed domain, used to build the returned links
    pub view_base: String,
    /// CORS proxy prefix for API calls
    pub proxy: String,
    /// Wait before the first poll when the upload reply has no file code
    pub initial_poll_wait: Duration,
    pub poll_interval: Duration,
    pub poll_attempts: usize,
    pub rules: RenameRules,
}

impl ClonerConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: "https://uqload.com".to_string(),
            view_base: "https://uqload.cx".to_string(),
            proxy: "https://corsproxy.io/?".to_string(),
            initial_poll_wait: Duration::from_secs(10),
            poll_interval: Duration::from_secs(5),
            poll_attempts: 3,
            rules: RenameRules::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    status: u16,
    result: Option<UploadResult>,
}

#[derive(Debug, Deserialize)]
struct UploadResult {
    #[serde(alias = "filecode")]
    file_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    status: u16,
    result: Option<ListResult>,
}

#[derive(Debug, Deserialize, Default)]
struct ListResult {
    #[serde(default)]
    files: Vec<RemoteFile>,
}

#[derive(Debug, Deserialize)]
struct RemoteFile {
    file_code: String,
    name: String,
}

/// Uqload remote-upload client.
///
/// The upload command usually returns the new file code immediately; when
/// it does not, the account file list is polled until the file shows up.
/// Fresh clones are renamed to the branded form and logged to the local
/// upload history.
pub struct UqloadCloner {
    config: ClonerConfig,
    client: reqwest::Client,
    history: Option<Mutex<UploadHistory>>,
}

impl UqloadCloner {
    pub fn new(config: ClonerConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("Cinematex/0.1.0")
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            config,
            client,
            history: None,
        }
    }

    /// Builder pattern: persist successful clones to an upload history
    pub fn with_history(mut self, history: UploadHistory) -> Self {
        self.history = Some(Mutex::new(history));
        self
    }

    async fn api_get<T: DeserializeOwned>(&self, target: &str) -> Result<T> {
        let url = format!("{}{}", self.config.proxy, urlencoding::encode(target));
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(ExtractError::Network)?;
        response
            .json::<T>()
            .await
            .map_err(|e| ExtractError::Parse(format!("JSON parse error: {e}")))
    }

    async fn list_files(&self) -> Result<Vec<RemoteFile>> {
        let target = format!(
            "{}/api/file/list?key={}&page=1",
            self.config.api_base, self.config.api_key
        );
        let response: ListResponse = self.api_get(&target).await?;
        if response.status != 200 {
            return Err(ExtractError::Service {
                status: response.status,
                message: "file list rejected".to_string(),
            });
        }
        Ok(response.result.unwrap_or_default().files)
    }

    /// Rename a fresh clone to its branded form. A failed rename keeps the
    /// old name instead of failing the clone.
    async fn rename(&self, file_code: &str, current_name: &str) -> String {
        let branded = self.config.rules.brand_name(current_name);
        if branded == current_name {
            return branded;
        }

        debug!(file_code, from = current_name, to = branded, "Renaming clone");
        let target = format!(
            "{}/api/file/rename?key={}&file_code={}&name={}",
            self.config.api_base,
            self.config.api_key,
            file_code,
            urlencoding::encode(&branded)
        );
        match self.api_get::<serde_json::Value>(&target).await {
            Ok(_) => branded,
            Err(e) => {
                warn!(file_code, error = %e, "Rename failed, keeping original name");
                current_name.to_string()
            }
        }
    }

    fn record_upload(&self, name: &str, watch_url: &str, download_url: &str) {
        if let Some(history) = &self.history
            && let Err(e) = history.lock().record(UploadRecord {
                name: name.to_string(),
                url: watch_url.to_string(),
                download_url: download_url.to_string(),
                date: Utc::now(),
            })
        {
            warn!(error = %e, "Failed to persist upload history");
        }
    }

    fn success_outcome(&self, original: &str, code: &str, message: &str) -> CloneOutcome {
        let watch_url = format!("{}/embed-{code}.html", self.config.view_base);
        let download_url = format!("{}/{code}.html", self.config.view_base);
        CloneOutcome {
            original_url: original.to_string(),
            status: CloneStatus::Success,
            new_code: Some(code.to_string()),
            watch_url: Some(watch_url),
            download_url: Some(download_url),
            message: Some(message.to_string()),
        }
    }

    async fn finish_clone(&self, original: &str, code: &str, name: &str, message: &str) -> CloneOutcome {
        let final_name = self.rename(code, name).await;
        let outcome = self.success_outcome(original, code, message);
        if let (Some(watch), Some(download)) = (&outcome.watch_url, &outcome.download_url) {
            self.record_upload(&final_name, watch, download);
        }
        outcome
    }
}

#[async_trait]
impl LinkCloner for UqloadCloner {
    async fn clone_link(&self, url: &str) -> CloneOutcome {
        if self.config.api_key.is_empty() {
            return CloneOutcome::failed(url, "مفتاح API غير موجود");
        }
        if !url.contains("uqload") {
            return CloneOutcome::skipped(url, "ليس رابط Uqload");
        }

        info!(url, "Starting clone");
        let target = format!(
            "{}/api/upload/url?key={}&url={}",
            self.config.api_base,
            self.config.api_key,
            urlencoding::encode(url)
        );
        let upload: UploadResponse = match self.api_get(&target).await {
            Ok(response) => response,
            Err(e) => {
                warn!(url, error = %e, "Upload command failed");
                return CloneOutcome::failed(url, "خطأ في الاتصال");
            }
        };

        let code = (upload.status == 200)
            .then_some(upload.result)
            .flatten()
            .and_then(|r| r.file_code);

        // Fast track: the upload reply already carries the file code
        if let Some(code) = code {
            let name = match self.list_files().await {
                Ok(files) => files
                    .into_iter()
                    .find(|f| f.file_code == code)
                    .map(|f| f.name),
                Err(e) => {
                    warn!(error = %e, "Metadata fetch failed, skipping rename");
                    None
                }
            };
            let name = name.unwrap_or_else(|| format!("File {code}"));
            return self
                .finish_clone(url, &code, &name, "تم النسخ (Fast Track)")
                .await;
        }

        // Slow track: poll the file list until the clone appears
        debug!(url, "No file code in reply, polling file list");
        tokio::time::sleep(self.config.initial_poll_wait).await;

        for attempt in 1..=self.config.poll_attempts {
            match self.list_files().await {
                Ok(files) if !files.is_empty() => {
                    // Newest file first
                    let latest = &files[0];
                    return self
                        .finish_clone(
                            url,
                            &latest.file_code.clone(),
                            &latest.name.clone(),
                            "تم النسخ وإعادة التسمية",
                        )
                        .await;
                }
                Ok(_) => debug!(attempt, "File list still empty"),
                Err(e) => warn!(attempt, error = %e, "Poll attempt failed"),
            }
            if attempt < self.config.poll_attempts {
                tokio::time::sleep(self.config.poll_interval).await;
            }
        }

        CloneOutcome::failed(url, "تم الرفع ولكن تأخر الرد")
    }
}

/// Strictly sequential clone batch with a pause between items.
///
/// Output rows match input order one-to-one, failures included.
pub struct CloneRunner {
    cloner: Arc<dyn LinkCloner>,
    delay: Duration,
}

impl CloneRunner {
    pub fn new(cloner: Arc<dyn LinkCloner>) -> Self {
        Self {
            cloner,
            delay: Duration::from_secs(1),
        }
    }

    /// Builder pattern: override the inter-item pause
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub async fn run(&self, urls: &[String]) -> Vec<CloneOutcome> {
        let mut outcomes = Vec::with_capacity(urls.len());
        for (i, url) in urls.iter().enumerate() {
            outcomes.push(self.cloner.clone_link(url).await);
            if i + 1 < urls.len() {
                tokio::time::sleep(self.delay).await;
            }
        }
        outcomes
    }
}
