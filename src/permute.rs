// src/permute.rs
use std::collections::HashSet;

pub const SOURCE_NAME: &str = "permutation";

const COMMON_WORDS: &[&str] = &[
    "admin", "api", "app", "auth", "backup", "beta", "blog", "cdn", "chat", "cms", "dashboard",
    "db", "demo", "dev", "docs", "email", "ftp", "git", "help", "img", "internal", "lab", "mail",
    "mobile", "new", "old", "portal", "prod", "secure", "shop", "stage", "static", "support",
    "test", "vpn", "web", "wiki", "www", "assets", "cache", "cloud", "data", "files", "forum",
    "home", "media", "news", "office", "panel", "proxy", "search", "server", "store", "upload",
    "video",
];

const SMALL_NUMBERS: &[&str] = &[
    "1", "2", "3", "01", "02", "03", "2020", "2021", "2022", "2023", "2024", "2025",
];

const ENVIRONMENTS: &[&str] = &[
    "dev", "test", "stage", "staging", "prod", "production", "beta", "alpha", "demo", "uat",
];

const REGIONS: &[&str] = &["us", "eu", "asia", "uk", "ca", "au", "de", "fr", "jp", "cn"];

const SEPARATORS: &[&str] = &["-", "_", ""];

/// Mutates already-discovered names into synthetic candidates. Pure: no
/// I/O, no DNS; the output feeds the same validation machinery as brute
/// force.
pub struct PermutationGenerator;

impl PermutationGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Candidates derived from every known host under `domain`, deduplicated
    /// by candidate string in first-seen order. Hosts not under the apex are
    /// ignored.
    pub fn generate(&self, domain: &str, known_hosts: &[String]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        let suffix = format!(".{}", domain);

        for host in known_hosts {
            let Some(label) = host.strip_suffix(&suffix) else {
                continue;
            };
            if label.is_empty() {
                continue;
            }

            for token_set in [COMMON_WORDS, SMALL_NUMBERS, ENVIRONMENTS, REGIONS] {
                for token in token_set {
                    for sep in SEPARATORS {
                        push_unique(
                            &mut seen,
                            &mut candidates,
                            format!("{}{}{}.{}", token, sep, label, domain),
                        );
                        push_unique(
                            &mut seen,
                            &mut candidates,
                            format!("{}{}{}.{}", label, sep, token, domain),
                        );
                    }
                }
            }

            for n in 1..=10 {
                push_unique(
                    &mut seen,
                    &mut candidates,
                    format!("{}{}.{}", label, n, domain),
                );
                push_unique(
                    &mut seen,
                    &mut candidates,
                    format!("{}-{}.{}", label, n, domain),
                );
            }
        }

        candidates
    }
}

impl Default for PermutationGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn push_unique(seen: &mut HashSet<String>, candidates: &mut Vec<String>, candidate: String) {
    if seen.insert(candidate.clone()) {
        candidates.push(candidate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate(hosts: &[&str]) -> Vec<String> {
        PermutationGenerator::new().generate(
            "example.com",
            &hosts.iter().map(|h| h.to_string()).collect::<Vec<_>>(),
        )
    }

    #[test]
    fn test_word_permutations_both_directions() {
        let candidates = generate(&["api.example.com"]);
        assert!(candidates.contains(&"api-dev.example.com".to_string()));
        assert!(candidates.contains(&"dev-api.example.com".to_string()));
        assert!(candidates.contains(&"api_dev.example.com".to_string()));
        assert!(candidates.contains(&"devapi.example.com".to_string()));
    }

    #[test]
    fn test_numeric_suffixes() {
        let candidates = generate(&["api.example.com"]);
        for n in 1..=10 {
            assert!(candidates.contains(&format!("api{}.example.com", n)));
            assert!(candidates.contains(&format!("api-{}.example.com", n)));
        }
    }

    #[test]
    fn test_environment_and_region_tokens() {
        let candidates = generate(&["api.example.com"]);
        assert!(candidates.contains(&"staging-api.example.com".to_string()));
        assert!(candidates.contains(&"api-uat.example.com".to_string()));
        assert!(candidates.contains(&"eu-api.example.com".to_string()));
        assert!(candidates.contains(&"api-jp.example.com".to_string()));
    }

    #[test]
    fn test_out_of_scope_hosts_ignored() {
        assert!(generate(&["other.org", "example.com"]).is_empty());
    }

    #[test]
    fn test_candidates_are_unique() {
        // "dev" appears in COMMON_WORDS and ENVIRONMENTS; overlapping seeds
        // must not duplicate candidates.
        let candidates = generate(&["api.example.com", "web.example.com"]);
        let unique: HashSet<_> = candidates.iter().collect();
        assert_eq!(unique.len(), candidates.len());
    }

    #[test]
    fn test_generator_is_pure() {
        let first = generate(&["api.example.com"]);
        let second = generate(&["api.example.com"]);
        assert_eq!(first, second);
    }
}
