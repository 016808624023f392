use futures::future::BoxFuture;
use proxy_sweep::{Candidate, CheckerConfig, Probe, ProbeOutcome, ProxyChecker, ProxyType};
use rand::Rng;
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn temp_root() -> PathBuf {
    std::env::temp_dir().join(format!("proxy-sweep-it-{}", uuid::Uuid::new_v4()))
}

fn config(root: &PathBuf, concurrency: usize) -> CheckerConfig {
    CheckerConfig::new()
        .with_concurrency(concurrency)
        .with_silent(true)
        .with_output_root(root)
}

/// Succeeds for a fixed set of addresses after an optional fixed or random
/// delay, tracking how many probes run at once
#[derive(Default)]
struct StubProbe {
    good: HashSet<String>,
    fixed_delay_ms: u64,
    max_delay_ms: u64,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
}

impl StubProbe {
    fn new(good: &[&str]) -> Self {
        Self {
            good: good.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn with_fixed_delay_ms(mut self, ms: u64) -> Self {
        self.fixed_delay_ms = ms;
        self
    }

    fn with_max_delay_ms(mut self, ms: u64) -> Self {
        self.max_delay_ms = ms;
        self
    }
}

impl Probe for StubProbe {
    fn probe<'a>(&'a self, candidate: &'a Candidate) -> BoxFuture<'a, ProbeOutcome> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let mut delay = self.fixed_delay_ms;
            if self.max_delay_ms > 0 {
                delay += rand::thread_rng().gen_range(0..=self.max_delay_ms);
            }
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if self.good.contains(&candidate.address) {
                ProbeOutcome::working(candidate.clone())
            } else {
                ProbeOutcome::failed(candidate.clone(), "stub refused")
            }
        })
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn end_to_end_one_of_three() {
    let root = temp_root();
    let checker = ProxyChecker::with_probe(config(&root, 200), StubProbe::new(&["good:8080"]));

    let summary = checker
        .run(["good:8080", "bad1:8080", "bad2:1080"])
        .await
        .unwrap();

    assert_eq!(summary.total, 3);
    assert_eq!(summary.checked, 3);
    assert_eq!(summary.working, 1);

    let dir = summary.output_dir.clone().unwrap();
    assert_eq!(fs::read_to_string(dir.join("http.txt")).unwrap(), "good:8080\n");
    assert_eq!(fs::read_to_string(dir.join("socks5.txt")).unwrap(), "");
    assert_eq!(fs::read_to_string(dir.join("socks4.txt")).unwrap(), "");

    let log = fs::read_to_string(dir.join("summary.log")).unwrap();
    assert!(log.contains("Total: 3\n"));
    assert!(log.contains("Working: 1\n"));
    assert!(log.contains("Time: "));

    fs::remove_dir_all(&root).unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn every_candidate_probed_exactly_once() {
    let root = temp_root();
    let raw: Vec<String> = (0..500).map(|i| format!("10.0.{}.{}:8080", i / 250, i % 250)).collect();
    let probe = StubProbe::new(&[]);
    let calls = probe.calls.clone();
    let checker = ProxyChecker::with_probe(config(&root, 16), probe);

    // Every address twice: duplicates must not be probed again
    let summary = checker.run(raw.iter().chain(raw.iter())).await.unwrap();

    assert_eq!(summary.total, 500);
    assert_eq!(summary.checked, 500);
    assert_eq!(calls.load(Ordering::SeqCst), 500);
    assert!(summary.output_dir.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrency_fills_but_never_exceeds_ceiling() {
    for ceiling in [1, 3, 10] {
        let root = temp_root();
        let raw: Vec<String> = (0..ceiling * 4).map(|i| format!("10.1.0.{}:3128", i)).collect();
        let probe = StubProbe::new(&[]).with_fixed_delay_ms(50);
        let peak = probe.peak.clone();
        let checker = ProxyChecker::with_probe(config(&root, ceiling), probe);

        let summary = checker.run(&raw).await.unwrap();

        assert_eq!(summary.checked, ceiling * 4);
        assert_eq!(peak.load(Ordering::SeqCst), ceiling, "ceiling {}", ceiling);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn aggregation_is_consistent_under_random_delays() {
    let root = temp_root();
    let raw: Vec<String> = (0..300).map(|i| format!("10.2.{}.{}:1080", i / 200, i % 200)).collect();
    let good: Vec<&str> = raw.iter().step_by(7).map(String::as_str).collect();
    let probe = StubProbe::new(&good).with_max_delay_ms(10);
    let checker = ProxyChecker::with_probe(config(&root, 32), probe);

    let summary = checker.run(&raw).await.unwrap();

    assert_eq!(summary.checked, 300);
    assert_eq!(summary.working, good.len());

    let dir = summary.output_dir.unwrap();
    let written = fs::read_to_string(dir.join("socks5.txt")).unwrap();
    let written: HashSet<&str> = written.lines().collect();
    assert_eq!(written, good.iter().copied().collect::<HashSet<_>>());
    assert_eq!(fs::read_dir(&root).unwrap().count(), 1);

    fs::remove_dir_all(&root).unwrap();
}

#[tokio::test]
async fn no_successes_leaves_no_output() {
    let root = temp_root();
    let checker = ProxyChecker::with_probe(config(&root, 4), StubProbe::new(&[]));

    let summary = checker.run(["1.1.1.1:80", "2.2.2.2:1080"]).await.unwrap();

    assert_eq!(summary.working, 0);
    assert!(summary.output_dir.is_none());
    assert!(!root.exists());
}

#[tokio::test]
async fn filter_limits_probed_candidates() {
    let root = temp_root();
    let probe = StubProbe::new(&["2.2.2.2:1080", "1.1.1.1:80"]);
    let calls = probe.calls.clone();
    let checker = ProxyChecker::with_probe(
        config(&root, 4).with_protocol_filter(Some(ProxyType::Socks5)),
        probe,
    );

    let summary = checker
        .run(["1.1.1.1:80", "2.2.2.2:1080", "3.3.3.3:1081"])
        .await
        .unwrap();

    assert_eq!(summary.total, 1);
    assert_eq!(summary.working, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let dir = summary.output_dir.unwrap();
    assert_eq!(fs::read_to_string(dir.join("socks5.txt")).unwrap(), "2.2.2.2:1080\n");
    assert_eq!(fs::read_to_string(dir.join("http.txt")).unwrap(), "");

    fs::remove_dir_all(&root).unwrap();
}
