//! Bounded concurrent proxy checker

use crate::proxy::aggregator::ResultAggregator;
use crate::proxy::classifier::Classifier;
use crate::proxy::models::{Candidate, ProbeOutcome, ProxyType, RunSummary};
use crate::proxy::parser::ProxyParser;
use crate::proxy::report::ProgressReporter;
use crate::Result;
use anyhow::bail;
use futures::future::BoxFuture;
use futures::FutureExt;
use log::{debug, error, info};
use reqwest::{Client, Proxy as ReqwestProxy, StatusCode};
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Default timeout for proxy checks in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 4;

/// Default number of concurrent checks
const DEFAULT_CONCURRENCY: usize = 200;

/// Default URL to test proxies against
const DEFAULT_TEST_URL: &str = "https://www.google.com";

/// Default directory under which timestamped result directories are created
const DEFAULT_OUTPUT_ROOT: &str = "results";

/// Configuration for proxy checker
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// Timeout for each proxy check
    pub timeout: Duration,
    /// Maximum number of checks in flight
    pub concurrency: usize,
    /// URL to test proxies against
    pub test_url: String,
    /// Only check candidates of this protocol
    pub protocol_filter: Option<ProxyType>,
    /// Suppress the progress line
    pub silent: bool,
    /// Where result directories are created
    pub output_root: PathBuf,
    pub classifier: Classifier,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            concurrency: DEFAULT_CONCURRENCY,
            test_url: DEFAULT_TEST_URL.to_string(),
            protocol_filter: None,
            silent: false,
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
            classifier: Classifier::default(),
        }
    }
}

impl CheckerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_test_url(mut self, url: String) -> Self {
        self.test_url = url;
        self
    }

    pub fn with_protocol_filter(mut self, filter: Option<ProxyType>) -> Self {
        self.protocol_filter = filter;
        self
    }

    pub fn with_silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    pub fn with_output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.output_root = root.into();
        self
    }

    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            bail!("concurrency must be greater than zero");
        }
        if self.timeout.is_zero() {
            bail!("probe timeout must be greater than zero");
        }
        Ok(())
    }

    /// Number of probes allowed in flight, capped at what a semaphore can hold
    pub fn permits(&self) -> usize {
        self.concurrency.min(Semaphore::MAX_PERMITS)
    }
}

/// A single bounded-time attempt to reach the test target through a candidate
pub trait Probe: Send + Sync {
    fn probe<'a>(&'a self, candidate: &'a Candidate) -> BoxFuture<'a, ProbeOutcome>;
}

/// Probe that issues a real GET through the candidate with reqwest
#[derive(Debug, Clone)]
pub struct HttpProbe {
    timeout: Duration,
    test_url: String,
}

impl HttpProbe {
    pub fn new(timeout: Duration, test_url: String) -> Self {
        Self { timeout, test_url }
    }

    /// Create a reqwest client routed through the candidate
    fn create_client(&self, candidate: &Candidate) -> Result<Client> {
        let reqwest_proxy = ReqwestProxy::all(candidate.url())?;

        let client = Client::builder()
            .proxy(reqwest_proxy)
            .timeout(self.timeout)
            .pool_max_idle_per_host(0)
            .build()?;

        Ok(client)
    }

    async fn check(&self, candidate: &Candidate) -> ProbeOutcome {
        let client = match self.create_client(candidate) {
            Ok(client) => client,
            Err(e) => return ProbeOutcome::failed(candidate.clone(), e.to_string()),
        };

        match tokio::time::timeout(self.timeout, client.get(&self.test_url).send()).await {
            Ok(Ok(response)) if response.status() == StatusCode::OK => {
                ProbeOutcome::working(candidate.clone())
            }
            Ok(Ok(response)) => ProbeOutcome::failed(
                candidate.clone(),
                format!("HTTP status: {}", response.status()),
            ),
            Ok(Err(e)) => ProbeOutcome::failed(candidate.clone(), e.to_string()),
            Err(_) => ProbeOutcome::failed(candidate.clone(), "timed out"),
        }
    }
}

impl Probe for HttpProbe {
    fn probe<'a>(&'a self, candidate: &'a Candidate) -> BoxFuture<'a, ProbeOutcome> {
        Box::pin(self.check(candidate))
    }
}

/// Proxy checker driving probes under a fixed concurrency ceiling
#[derive(Clone)]
pub struct ProxyChecker {
    config: CheckerConfig,
    probe: Arc<dyn Probe>,
}

impl ProxyChecker {
    /// Create a new proxy checker with default configuration
    pub fn new() -> Self {
        Self::with_config(CheckerConfig::default())
    }

    /// Create a new proxy checker that probes over the network
    pub fn with_config(config: CheckerConfig) -> Self {
        let probe = HttpProbe::new(config.timeout, config.test_url.clone());
        Self::with_probe(config, probe)
    }

    /// Create a proxy checker with a custom probe
    pub fn with_probe<P: Probe + 'static>(config: CheckerConfig, probe: P) -> Self {
        Self {
            config,
            probe: Arc::new(probe),
        }
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// Deduplicate, classify and filter raw `address:port` strings
    pub fn prepare<I, S>(&self, raw: I) -> Vec<Candidate>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ProxyParser::build_candidates(raw, self.config.protocol_filter, &self.config.classifier)
    }

    /// Prepare raw strings and check the resulting candidates
    pub async fn run<I, S>(&self, raw: I) -> Result<RunSummary>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let candidates = self.prepare(raw);
        self.check_candidates(candidates).await
    }

    /// Probe every candidate exactly once with at most `concurrency` probes
    /// in flight, returning only after all of them have been recorded.
    pub async fn check_candidates(&self, candidates: Vec<Candidate>) -> Result<RunSummary> {
        self.config.validate()?;

        info!(
            "checking {} candidates with {} workers",
            candidates.len(),
            self.config.permits()
        );

        let aggregator = Arc::new(ResultAggregator::new(
            candidates.len(),
            self.config.output_root.clone(),
            ProgressReporter::new(self.config.silent),
        ));
        let semaphore = Arc::new(Semaphore::new(self.config.permits()));
        let mut tasks = JoinSet::new();

        for candidate in candidates {
            let permit = Arc::clone(&semaphore).acquire_owned().await?;
            let probe = Arc::clone(&self.probe);
            let aggregator = Arc::clone(&aggregator);

            tasks.spawn(async move {
                let outcome = run_probe(probe.as_ref(), candidate).await;
                aggregator.record(&outcome);
                drop(permit);
            });

            while let Some(joined) = tasks.try_join_next() {
                log_join(joined);
            }
        }

        while let Some(joined) = tasks.join_next().await {
            log_join(joined);
        }

        let summary = aggregator.finish();
        info!(
            "done: {} of {} working in {:.2}s",
            summary.working,
            summary.total,
            summary.elapsed.as_secs_f64()
        );
        Ok(summary)
    }
}

impl Default for ProxyChecker {
    fn default() -> Self {
        Self::new()
    }
}

/// Run one probe, turning a panic into a failed outcome
async fn run_probe(probe: &dyn Probe, candidate: Candidate) -> ProbeOutcome {
    let result = AssertUnwindSafe(probe.probe(&candidate)).catch_unwind().await;
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(_) => ProbeOutcome::failed(candidate, "probe panicked"),
    };

    if let Some(ref e) = outcome.error {
        debug!("{} failed: {}", outcome.candidate, e);
    }
    outcome
}

fn log_join(joined: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        error!("probe task failed: {}", e);
    }
}
