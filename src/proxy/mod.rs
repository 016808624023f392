//! Proxy module for classifying and checking proxies
//!
//! This module provides functionality for:
//! - Classifying `address:port` candidates by port number
//! - Deduplicating and filtering the candidate set
//! - Checking candidates under a bounded concurrency ceiling
//! - Aggregating results into per-protocol files and a summary
//! - Loading candidates from files, folders and listing services

pub mod aggregator;
pub mod checker;
pub mod classifier;
pub mod models;
pub mod parser;
pub mod report;
pub mod sources;

pub use aggregator::{Progress, ResultAggregator};
pub use checker::{CheckerConfig, HttpProbe, Probe, ProxyChecker};
pub use classifier::{classify, Classifier};
pub use models::{Candidate, ProbeOutcome, ProxyType, RunSummary};
pub use parser::ProxyParser;
pub use report::ProgressReporter;
pub use sources::{SourceConfig, SourceLoader};
