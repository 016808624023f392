//! Proxy Sweep - bounded concurrent proxy validator
//!
//! Takes a large list of untrusted `address:port` candidates, classifies
//! them as HTTP or SOCKS by port, and checks each one by fetching a known
//! test target through it. Working proxies are written per protocol into a
//! timestamped results directory.

pub mod proxy;

pub use proxy::*;

/// Application result type
pub type Result<T> = anyhow::Result<T>;
