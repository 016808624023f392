//! Candidate set builder: deduplication and protocol filtering

use crate::proxy::classifier::Classifier;
use crate::proxy::models::{Candidate, ProxyType};
use std::collections::HashSet;

/// Builds the candidate set fed to the checker
pub struct ProxyParser;

impl ProxyParser {
    /// Classify a single raw line.
    ///
    /// Empty, colon-free and malformed lines yield `None`.
    pub fn parse_line(line: &str, classifier: &Classifier) -> Option<Candidate> {
        let line = line.trim();
        if line.is_empty() || !line.contains(':') {
            return None;
        }

        match classifier.classify(line) {
            ProxyType::Unknown => None,
            proxy_type => Some(Candidate::new(line, proxy_type)),
        }
    }

    /// Deduplicate raw strings and keep only those matching `filter`, if any.
    ///
    /// The order of the returned candidates is unspecified.
    pub fn build_candidates<I, S>(
        raw: I,
        filter: Option<ProxyType>,
        classifier: &Classifier,
    ) -> Vec<Candidate>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();

        raw.into_iter()
            .filter_map(|line| Self::parse_line(line.as_ref(), classifier))
            .filter(|c| filter.map_or(true, |f| c.proxy_type == f))
            .filter(|c| seen.insert(c.address.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(raw: &[&str], filter: Option<ProxyType>) -> Vec<Candidate> {
        ProxyParser::build_candidates(raw.iter().copied(), filter, &Classifier::default())
    }

    #[test]
    fn test_parse_line() {
        let c = ProxyParser::parse_line("  192.168.1.1:1080 ", &Classifier::default()).unwrap();
        assert_eq!(c.address, "192.168.1.1:1080");
        assert_eq!(c.proxy_type, ProxyType::Socks5);
    }

    #[test]
    fn test_parse_empty_or_colon_free() {
        let classifier = Classifier::default();
        assert!(ProxyParser::parse_line("", &classifier).is_none());
        assert!(ProxyParser::parse_line("   ", &classifier).is_none());
        assert!(ProxyParser::parse_line("192.168.1.1", &classifier).is_none());
        assert!(ProxyParser::parse_line("192.168.1.1:", &classifier).is_none());
    }

    #[test]
    fn test_deduplication() {
        let candidates = build(&["1.1.1.1:80", "1.1.1.1:80", "2.2.2.2:1080"], None);
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn test_deduplication_ignores_surrounding_whitespace() {
        let candidates = build(&["1.1.1.1:80", " 1.1.1.1:80\r"], None);
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn test_filter_socks5() {
        let candidates = build(
            &["1.1.1.1:80", "2.2.2.2:1080", "3.3.3.3:1081", "4.4.4.4:1080", "bogus"],
            Some(ProxyType::Socks5),
        );
        assert_eq!(candidates.len(), 2);
        assert!(candidates.iter().all(|c| c.proxy_type == ProxyType::Socks5));
    }

    #[test]
    fn test_filter_parsed_case_insensitively() {
        let filter = "SOCKS4".parse::<ProxyType>().ok();
        let candidates = build(&["1.1.1.1:80", "3.3.3.3:1081"], filter);
        assert_eq!(candidates, vec![Candidate::new("3.3.3.3:1081", ProxyType::Socks4)]);
    }
}
