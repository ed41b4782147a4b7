// src/aggregator.rs
use crate::error::{Result, SubScoutError};
use crate::types::{HostEntry, SourceStatistics};
use crate::utils;
use log::debug;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};

/// Outcome of feeding one candidate into the aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acceptance {
    /// First time this host was seen; it enters the accepted set.
    New(HostEntry),
    /// Already accepted; only the attribution was extended.
    Duplicate,
    /// Out of scope or malformed; counted against the source's stats.
    Rejected,
    /// Dropped by the match/filter policy.
    Filtered,
}

/// Per-domain validation, normalisation, deduplication and source
/// attribution. Single-writer: only the enumeration loop touches it.
pub struct Aggregator {
    domain: String,
    unique: HashMap<String, HostEntry>,
    attribution: HashMap<String, BTreeSet<String>>,
    skipped: HashMap<String, usize>,
    match_regexes: Vec<Regex>,
    filter_regexes: Vec<Regex>,
}

impl Aggregator {
    pub fn new(
        domain: &str,
        match_patterns: &[String],
        filter_patterns: &[String],
    ) -> Result<Self> {
        Ok(Self {
            domain: domain.to_string(),
            unique: HashMap::new(),
            attribution: HashMap::new(),
            skipped: HashMap::new(),
            match_regexes: compile_patterns(match_patterns)?,
            filter_regexes: compile_patterns(filter_patterns)?,
        })
    }

    /// Feeds one raw candidate from `source` through normalisation, scope
    /// and well-formedness checks, the match/filter policy and the
    /// first-seen-wins dedup gate.
    pub fn accept(&mut self, source: &str, raw_value: &str) -> Acceptance {
        let host = utils::normalize_host(raw_value);

        if !utils::in_scope(&host, &self.domain) || !utils::is_valid_host(&host) {
            *self.skipped.entry(source.to_string()).or_default() += 1;
            return Acceptance::Rejected;
        }

        if !self.matches_policy(&host) {
            return Acceptance::Filtered;
        }

        let sources = self.attribution.entry(host.clone()).or_default();
        if sources.insert(source.to_string()) {
            debug!("[{}] {}", source, host);
        }

        if self.unique.contains_key(&host) {
            *self.skipped.entry(source.to_string()).or_default() += 1;
            return Acceptance::Duplicate;
        }

        let entry = HostEntry {
            domain: self.domain.clone(),
            host: host.clone(),
            source: source.to_string(),
        };
        self.unique.insert(host, entry.clone());
        Acceptance::New(entry)
    }

    fn matches_policy(&self, host: &str) -> bool {
        if self.filter_regexes.iter().any(|re| re.is_match(host)) {
            return false;
        }
        if !self.match_regexes.is_empty() {
            return self.match_regexes.iter().any(|re| re.is_match(host));
        }
        true
    }

    pub fn contains(&self, host: &str) -> bool {
        self.unique.contains_key(host)
    }

    pub fn len(&self) -> usize {
        self.unique.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unique.is_empty()
    }

    pub fn hosts(&self) -> Vec<String> {
        self.unique.keys().cloned().collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = &HostEntry> {
        self.unique.values()
    }

    pub fn attribution(&self) -> &HashMap<String, BTreeSet<String>> {
        &self.attribution
    }

    pub fn into_parts(self) -> (HashMap<String, HostEntry>, HashMap<String, BTreeSet<String>>) {
        (self.unique, self.attribution)
    }

    /// Subtracts rejected and duplicate contributions from each source's
    /// reported result count, so statistics reflect accepted contributions
    /// only.
    pub fn reconcile(&self, stats: &mut HashMap<String, SourceStatistics>) {
        for (source, count) in &self.skipped {
            if let Some(entry) = stats.get_mut(source) {
                entry.results = entry.results.saturating_sub(*count);
            }
        }
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|e| SubScoutError::Config(format!("invalid regex '{}': {}", p, e)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregator() -> Aggregator {
        Aggregator::new("example.com", &[], &[]).unwrap()
    }

    fn stats_with(source: &str, results: usize) -> HashMap<String, SourceStatistics> {
        let mut stats = HashMap::new();
        stats.insert(
            source.to_string(),
            SourceStatistics {
                results,
                ..SourceStatistics::default()
            },
        );
        stats
    }

    #[test]
    fn test_simple_passive_acceptance() {
        // crt.sh style input: multi-line name_value entries plus a wildcard.
        let mut agg = aggregator();
        for raw in ["a.example.com", "b.example.com", "*.example.com"] {
            agg.accept("crtsh", raw);
        }

        let mut hosts = agg.hosts();
        hosts.sort();
        assert_eq!(hosts, vec!["a.example.com", "b.example.com", "example.com"]);
        for host in hosts {
            assert_eq!(
                agg.attribution()[&host],
                BTreeSet::from(["crtsh".to_string()])
            );
        }
    }

    #[test]
    fn test_cross_source_dedup_and_stats() {
        let mut agg = aggregator();
        assert!(matches!(
            agg.accept("s1", "api.example.com"),
            Acceptance::New(_)
        ));
        assert_eq!(agg.accept("s2", "api.example.com"), Acceptance::Duplicate);
        assert!(matches!(
            agg.accept("s2", "www.example.com"),
            Acceptance::New(_)
        ));

        assert_eq!(agg.len(), 2);
        assert_eq!(
            agg.attribution()["api.example.com"],
            BTreeSet::from(["s1".to_string(), "s2".to_string()])
        );
        assert_eq!(
            agg.attribution()["www.example.com"],
            BTreeSet::from(["s2".to_string()])
        );

        // s2 emitted two results but only one was accepted.
        let mut stats = stats_with("s2", 2);
        stats.insert(
            "s1".to_string(),
            SourceStatistics {
                results: 1,
                ..SourceStatistics::default()
            },
        );
        agg.reconcile(&mut stats);
        assert_eq!(stats["s2"].results, 1);
        assert_eq!(stats["s1"].results, 1);
    }

    #[test]
    fn test_out_of_scope_host_rejected() {
        let mut agg = aggregator();
        assert_eq!(agg.accept("s1", "notrelated.other.com"), Acceptance::Rejected);
        assert!(matches!(
            agg.accept("s1", "api.example.com"),
            Acceptance::New(_)
        ));

        assert_eq!(agg.hosts(), vec!["api.example.com"]);
        let mut stats = stats_with("s1", 2);
        agg.reconcile(&mut stats);
        assert_eq!(stats["s1"].results, 1);
    }

    #[test]
    fn test_malformed_host_rejected() {
        let mut agg = aggregator();
        assert_eq!(agg.accept("s1", "bad_label.example.com"), Acceptance::Rejected);
        assert_eq!(agg.accept("s1", "-bad.example.com"), Acceptance::Rejected);
        assert!(agg.is_empty());
    }

    #[test]
    fn test_normalisation_variants_collapse() {
        let mut agg = aggregator();
        assert!(matches!(
            agg.accept("s1", "https://a.example.com/path"),
            Acceptance::New(_)
        ));
        assert_eq!(agg.accept("s1", "  a.example.com  "), Acceptance::Duplicate);
        assert_eq!(agg.accept("s1", "*.a.example.com"), Acceptance::Duplicate);
        assert_eq!(agg.len(), 1);
        assert!(agg.contains("a.example.com"));
    }

    #[test]
    fn test_filter_policy_drops_silently() {
        let mut agg =
            Aggregator::new("example.com", &[], &[r"^dev\.".to_string()]).unwrap();
        assert_eq!(agg.accept("s1", "dev.example.com"), Acceptance::Filtered);
        assert!(matches!(
            agg.accept("s1", "api.example.com"),
            Acceptance::New(_)
        ));

        // Policy drops do not count against the source.
        let mut stats = stats_with("s1", 2);
        agg.reconcile(&mut stats);
        assert_eq!(stats["s1"].results, 2);
        assert!(!agg.attribution().contains_key("dev.example.com"));
    }

    #[test]
    fn test_match_policy_keeps_only_matching() {
        let mut agg =
            Aggregator::new("example.com", &[r"^api\.".to_string()], &[]).unwrap();
        assert!(matches!(
            agg.accept("s1", "api.example.com"),
            Acceptance::New(_)
        ));
        assert_eq!(agg.accept("s1", "www.example.com"), Acceptance::Filtered);
        assert_eq!(agg.len(), 1);
    }

    #[test]
    fn test_bad_regex_is_config_error() {
        assert!(matches!(
            Aggregator::new("example.com", &["[".to_string()], &[]),
            Err(SubScoutError::Config(_))
        ));
    }

    #[test]
    fn test_attribution_keys_equal_accepted_set() {
        let mut agg = aggregator();
        for (source, raw) in [
            ("s1", "a.example.com"),
            ("s2", "a.example.com"),
            ("s2", "b.example.com"),
            ("s1", "elsewhere.org"),
        ] {
            agg.accept(source, raw);
        }

        let mut accepted = agg.hosts();
        accepted.sort();
        let mut attributed: Vec<_> = agg.attribution().keys().cloned().collect();
        attributed.sort();
        assert_eq!(accepted, attributed);
        assert!(agg.attribution().values().all(|s| !s.is_empty()));
    }
}
