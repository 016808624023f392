//! Shared run state and lazily provisioned output files

use crate::proxy::models::{Candidate, ProbeOutcome, ProxyType, RunSummary};
use crate::proxy::report::{write_summary, ProgressReporter};
use crate::Result;
use chrono::Local;
use log::{error, info, warn};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Name of the summary file inside a results directory
pub const SUMMARY_FILE: &str = "summary.log";

/// Per-protocol result files plus the summary log of one run
struct OutputSinks {
    dir: PathBuf,
    files: HashMap<ProxyType, BufWriter<File>>,
    summary: Option<BufWriter<File>>,
}

impl OutputSinks {
    /// Create `<root>/<timestamp>/` and open every output file in it.
    ///
    /// Only a failure to create the directory is an error; a file that cannot
    /// be opened is left out and its results go unrecorded.
    fn provision(root: &Path) -> Result<Self> {
        let dir = root.join(Local::now().format("%Y-%m-%d_%H-%M-%S").to_string());
        fs::create_dir_all(&dir)?;

        let mut files = HashMap::new();
        for proxy_type in ProxyType::PERSISTED {
            let path = dir.join(format!("{}.txt", proxy_type));
            match File::create(&path) {
                Ok(file) => {
                    files.insert(proxy_type, BufWriter::new(file));
                }
                Err(e) => warn!("cannot create {}: {}", path.display(), e),
            }
        }

        let summary_path = dir.join(SUMMARY_FILE);
        let summary = match File::create(&summary_path) {
            Ok(file) => Some(BufWriter::new(file)),
            Err(e) => {
                warn!("cannot create {}: {}", summary_path.display(), e);
                None
            }
        };

        Ok(Self { dir, files, summary })
    }

    fn append(&mut self, candidate: &Candidate) {
        if let Some(file) = self.files.get_mut(&candidate.proxy_type) {
            if let Err(e) = writeln!(file, "{}", candidate.address) {
                warn!("cannot record {}: {}", candidate.address, e);
            }
        }
    }

    fn close(mut self, summary: &RunSummary) {
        if let Some(mut file) = self.summary.take() {
            if let Err(e) = write_summary(&mut file, summary) {
                warn!("cannot write summary: {}", e);
            }
        }
        for (proxy_type, file) in self.files.iter_mut() {
            if let Err(e) = file.flush() {
                warn!("cannot flush {} results: {}", proxy_type, e);
            }
        }
    }
}

/// Lifecycle of the output files
enum Sinks {
    /// Nothing has succeeded yet
    Pending,
    Ready(OutputSinks),
    /// Provisioning was attempted and failed; successes are not persisted
    Unavailable,
    /// The run has finished
    Closed,
}

/// Counters and sinks of a run, guarded by the aggregator's lock
struct RunState {
    total_to_check: usize,
    total_checked: usize,
    success_count: usize,
    started: Instant,
    sinks: Sinks,
}

/// Point-in-time copy of the run counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub total: usize,
    pub checked: usize,
    pub working: usize,
    pub elapsed: Duration,
    /// Whether provisioning of the output files has happened
    pub output_ready: bool,
}

/// Fan-in point for probe outcomes.
///
/// All mutation goes through one lock, so counters stay consistent regardless
/// of how outcomes interleave.
pub struct ResultAggregator {
    state: Mutex<RunState>,
    output_root: PathBuf,
    reporter: ProgressReporter,
}

impl ResultAggregator {
    pub fn new(total: usize, output_root: impl Into<PathBuf>, reporter: ProgressReporter) -> Self {
        Self {
            state: Mutex::new(RunState {
                total_to_check: total,
                total_checked: 0,
                success_count: 0,
                started: Instant::now(),
                sinks: Sinks::Pending,
            }),
            output_root: output_root.into(),
            reporter,
        }
    }

    fn lock(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record one outcome. Must be called exactly once per candidate.
    pub fn record(&self, outcome: &ProbeOutcome) {
        let mut state = self.lock();
        state.total_checked += 1;
        debug_assert!(state.total_checked <= state.total_to_check);

        if outcome.success {
            if matches!(state.sinks, Sinks::Pending) {
                state.sinks = match OutputSinks::provision(&self.output_root) {
                    Ok(sinks) => {
                        info!("writing results to {}", sinks.dir.display());
                        Sinks::Ready(sinks)
                    }
                    Err(e) => {
                        error!(
                            "cannot create results directory under {}: {}",
                            self.output_root.display(),
                            e
                        );
                        Sinks::Unavailable
                    }
                };
            }
            state.success_count += 1;
            if let Sinks::Ready(sinks) = &mut state.sinks {
                sinks.append(&outcome.candidate);
            }
        }

        self.reporter.report(
            state.total_checked,
            state.total_to_check,
            state.success_count,
            state.started.elapsed(),
        );
    }

    pub fn progress(&self) -> Progress {
        let state = self.lock();
        Progress {
            total: state.total_to_check,
            checked: state.total_checked,
            working: state.success_count,
            elapsed: state.started.elapsed(),
            output_ready: !matches!(state.sinks, Sinks::Pending),
        }
    }

    /// Close the run: write the summary if anything was provisioned, flush
    /// and close every file, and return the final figures.
    pub fn finish(&self) -> RunSummary {
        let mut state = self.lock();
        let sinks = std::mem::replace(&mut state.sinks, Sinks::Closed);

        let mut summary = RunSummary {
            total: state.total_to_check,
            checked: state.total_checked,
            working: state.success_count,
            elapsed: state.started.elapsed(),
            output_dir: None,
        };

        if summary.checked != summary.total {
            warn!(
                "checked {} of {} candidates before finishing",
                summary.checked, summary.total
            );
        }

        if let Sinks::Ready(sinks) = sinks {
            summary.output_dir = Some(sinks.dir.clone());
            sinks.close(&summary);
        }

        self.reporter.finish();
        summary
    }
}
