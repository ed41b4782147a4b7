// src/recursive.rs
use std::collections::HashSet;

pub const SOURCE_NAME: &str = "recursive";

const COMMON_PREFIXES: &[&str] = &[
    "api", "admin", "test", "dev", "staging", "prod", "www", "mail", "ftp", "secure", "internal",
    "private", "public", "beta", "alpha", "demo",
];

/// Seeds deeper-level candidates from discovered second-level names: for a
/// known `x.y.domain` the first label `x` yields `prefix.x.domain`
/// candidates. The expander itself never recurses; the aggregator's unique
/// map breaks any cycle.
pub struct RecursiveExpander;

impl RecursiveExpander {
    pub fn new() -> Self {
        Self
    }

    pub fn candidates(&self, domain: &str, known_hosts: &[String]) -> Vec<String> {
        let suffix = format!(".{}", domain);
        let known: HashSet<&str> = known_hosts.iter().map(String::as_str).collect();

        let mut second_levels = HashSet::new();
        for host in known_hosts {
            if !host.ends_with(&suffix) {
                continue;
            }
            if let Some(label) = host.split('.').next() {
                if !label.is_empty() {
                    second_levels.insert(format!("{}.{}", label, domain));
                }
            }
        }

        let mut seeds: Vec<_> = second_levels.into_iter().collect();
        seeds.sort();

        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for seed in seeds {
            for prefix in COMMON_PREFIXES {
                let candidate = format!("{}.{}", prefix, seed);
                if !known.contains(candidate.as_str()) && seen.insert(candidate.clone()) {
                    candidates.push(candidate);
                }
            }
        }

        candidates
    }
}

impl Default for RecursiveExpander {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(hosts: &[&str]) -> Vec<String> {
        RecursiveExpander::new().candidates(
            "example.com",
            &hosts.iter().map(|h| h.to_string()).collect::<Vec<_>>(),
        )
    }

    #[test]
    fn test_prefixes_applied_to_first_label() {
        let found = candidates(&["app.example.com"]);
        assert!(found.contains(&"api.app.example.com".to_string()));
        assert!(found.contains(&"dev.app.example.com".to_string()));
        assert_eq!(found.len(), COMMON_PREFIXES.len());
    }

    #[test]
    fn test_deep_hosts_collapse_to_second_level() {
        // api.cdn.example.com seeds cdn.example.com via its first label.
        let found = candidates(&["x.cdn.example.com", "y.cdn.example.com"]);
        assert!(found.contains(&"api.x.example.com".to_string()));
        assert!(found.contains(&"api.y.example.com".to_string()));
    }

    #[test]
    fn test_known_hosts_not_requeued() {
        let found = candidates(&["app.example.com", "api.app.example.com"]);
        assert!(!found.contains(&"api.app.example.com".to_string()));
        assert!(found.contains(&"dev.app.example.com".to_string()));
    }

    #[test]
    fn test_out_of_scope_ignored() {
        assert!(candidates(&["other.org"]).is_empty());
    }
}
