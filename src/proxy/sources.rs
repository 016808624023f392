//! Candidate sources: flat files, directory trees and remote listings
//!
//! Every loader returns raw `address:port` strings. Deduplication and
//! classification happen later in [`crate::proxy::ProxyParser`].

use crate::Result;
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Default timeout for listing requests in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default user agent for listing requests
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

static TEXTAREA_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<textarea[^>]*>(.*?)</textarea>").expect("Invalid textarea regex")
});

static ROW_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<tr[^>]*>(.*?)</tr>").expect("Invalid table row regex"));

static CELL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<td[^>]*>(.*?)</td>").expect("Invalid table cell regex"));

static TAG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]*>").expect("Invalid tag regex"));

/// Read every trimmed line of a text file. A missing file yields nothing.
pub fn load_from_txt<P: AsRef<Path>>(path: P) -> Vec<String> {
    let path = path.as_ref();
    match fs::read_to_string(path) {
        Ok(content) => content.lines().map(|l| l.trim().to_string()).collect(),
        Err(e) => {
            warn!("cannot read {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

/// Read every `*.txt` file below `dir`, recursively
pub fn load_from_folder<P: AsRef<Path>>(dir: P) -> Vec<String> {
    let mut proxies = Vec::new();
    walk_txt_files(dir.as_ref(), &mut proxies);
    proxies
}

fn walk_txt_files(dir: &Path, proxies: &mut Vec<String>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("cannot read directory {}: {}", dir.display(), e);
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            walk_txt_files(&path, proxies);
        } else if path.extension().is_some_and(|ext| ext == "txt") {
            proxies.extend(load_from_txt(&path));
        }
    }
}

/// JSON body served by listing APIs
#[derive(Debug, Deserialize)]
struct ApiPayload {
    #[serde(default)]
    data: Vec<ApiEntry>,
}

#[derive(Debug, Deserialize)]
struct ApiEntry {
    #[serde(default)]
    ip: String,
    #[serde(default)]
    port: ApiPort,
}

#[derive(Debug, Deserialize, Default)]
#[serde(untagged)]
enum ApiPort {
    Text(String),
    Number(u64),
    #[default]
    Missing,
}

impl ApiPort {
    fn as_string(&self) -> Option<String> {
        match self {
            ApiPort::Text(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            ApiPort::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Extract `ip:port` pairs from a JSON listing body
pub fn parse_json(body: &str) -> Vec<String> {
    let payload: ApiPayload = match serde_json::from_str(body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("cannot decode listing JSON: {}", e);
            return Vec::new();
        }
    };

    payload
        .data
        .into_iter()
        .filter(|entry| !entry.ip.is_empty())
        .filter_map(|entry| Some(format!("{}:{}", entry.ip, entry.port.as_string()?)))
        .collect()
}

/// Extract addresses from an HTML listing.
///
/// Every `<textarea>` line containing a colon is taken as is. Table rows
/// contribute `host:port` from their first two cells when the host contains
/// a dot and the port is non-empty.
pub fn parse_html(body: &str) -> Vec<String> {
    let mut proxies: Vec<String> = TEXTAREA_REGEX
        .captures_iter(body)
        .flat_map(|cap| parse_plain(&cap[1]))
        .collect();

    proxies.extend(ROW_REGEX.captures_iter(body).filter_map(|row| {
        let mut cells = CELL_REGEX.captures_iter(&row[1]).map(|cell| cell_text(&cell[1]));
        let host = cells.next()?;
        let port = cells.next()?;
        if host.contains('.') && !port.is_empty() {
            Some(format!("{}:{}", host, port))
        } else {
            None
        }
    }));

    proxies
}

fn cell_text(cell: &str) -> String {
    TAG_REGEX.replace_all(cell, "").trim().to_string()
}

/// Every trimmed line of a plain-text listing that contains a colon
pub fn parse_plain(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter(|line| line.contains(':'))
        .map(str::to_string)
        .collect()
}

/// Configuration for remote listing fetches
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Timeout for each listing request
    pub timeout: Duration,
    /// User agent for listing requests
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl SourceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }
}

/// Fetches candidate lists from remote listing services
pub struct SourceLoader {
    client: Client,
}

impl SourceLoader {
    pub fn new() -> Result<Self> {
        Self::with_config(SourceConfig::default())
    }

    pub fn with_config(config: SourceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { client })
    }

    /// Fetch one listing, picking the parser from its content type
    pub async fn fetch_from_api(&self, url: &str) -> Result<Vec<String>> {
        let response = self.client.get(url).send().await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_lowercase();
        let body = response.text().await?;

        let proxies = if content_type.contains("application/json") {
            parse_json(&body)
        } else if content_type.contains("text/html") {
            parse_html(&body)
        } else {
            parse_plain(&body)
        };
        Ok(proxies)
    }

    /// Fetch every listing URL named in `path`, skipping blanks and `#`
    /// comments. Failed listings are logged and skipped.
    pub async fn load_from_apis<P: AsRef<Path>>(&self, path: P) -> Vec<String> {
        let mut proxies = Vec::new();

        for link in load_from_txt(path) {
            if link.is_empty() || link.starts_with('#') {
                continue;
            }
            match self.fetch_from_api(&link).await {
                Ok(found) => {
                    info!("found {} proxies from {}", found.len(), link);
                    proxies.extend(found);
                }
                Err(e) => warn!("cannot fetch {}: {}", link, e),
            }
        }

        proxies
    }
}
