//! Proxy data models

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Protocol a candidate is expected to speak, derived from its port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProxyType {
    Http,
    Socks4,
    Socks5,
    #[default]
    Unknown,
}

impl ProxyType {
    /// Tags that get their own output file
    pub const PERSISTED: [ProxyType; 3] = [ProxyType::Http, ProxyType::Socks4, ProxyType::Socks5];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyType::Http => "http",
            ProxyType::Socks4 => "socks4",
            ProxyType::Socks5 => "socks5",
            ProxyType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ProxyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProxyType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "http" => Ok(ProxyType::Http),
            "socks4" => Ok(ProxyType::Socks4),
            "socks5" => Ok(ProxyType::Socks5),
            _ => Err(anyhow!(
                "Invalid proxy type: {}. Use: http, socks4, socks5",
                s
            )),
        }
    }
}

/// A deduplicated `address:port` string awaiting validation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Candidate {
    pub address: String,
    pub proxy_type: ProxyType,
}

impl Candidate {
    pub fn new(address: impl Into<String>, proxy_type: ProxyType) -> Self {
        Self {
            address: address.into(),
            proxy_type,
        }
    }

    /// Proxy URL used to route a client through this candidate.
    ///
    /// SOCKS4 candidates are dialed with SOCKS5 negotiation. SOCKS targets
    /// are resolved by the proxy (`socks5h`), not locally.
    pub fn url(&self) -> String {
        match self.proxy_type {
            ProxyType::Socks4 | ProxyType::Socks5 => format!("socks5h://{}", self.address),
            ProxyType::Http | ProxyType::Unknown => format!("http://{}", self.address),
        }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.address, self.proxy_type)
    }
}

/// Result of a single probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub candidate: Candidate,
    pub success: bool,
    pub error: Option<String>,
}

impl ProbeOutcome {
    pub fn working(candidate: Candidate) -> Self {
        Self {
            candidate,
            success: true,
            error: None,
        }
    }

    pub fn failed(candidate: Candidate, error: impl Into<String>) -> Self {
        Self {
            candidate,
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Final figures of a completed run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub checked: usize,
    pub working: usize,
    pub elapsed: Duration,
    /// Directory holding the results, absent when nothing succeeded
    pub output_dir: Option<PathBuf>,
}

impl RunSummary {
    /// Average throughput in probes per second
    pub fn speed(&self) -> f64 {
        throughput(self.checked, self.elapsed)
    }
}

/// Lower bound on elapsed seconds when computing a rate
pub(crate) const MIN_ELAPSED_SECS: f64 = 0.001;

pub(crate) fn throughput(checked: usize, elapsed: Duration) -> f64 {
    checked as f64 / elapsed.as_secs_f64().max(MIN_ELAPSED_SECS)
}
