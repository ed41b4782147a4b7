// src/utils.rs
use rand::Rng;
use regex::Regex;
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Normalises a raw candidate emitted by a source into a bare hostname.
/// Strips scheme, path, wildcard prefix, stray bullet characters and
/// surrounding whitespace/dots, and lower-cases ASCII. Idempotent.
pub fn normalize_host(raw: &str) -> String {
    let mut host = raw.trim().to_ascii_lowercase();
    host.retain(|c| c != '\u{2022}');

    for scheme in ["https://", "http://"] {
        if let Some(rest) = host.strip_prefix(scheme) {
            host = rest.to_string();
            break;
        }
    }

    host = host.trim_start_matches('/').to_string();
    if let Some(idx) = host.find('/') {
        host.truncate(idx);
    }

    while let Some(rest) = host.strip_prefix("*.") {
        host = rest.to_string();
    }

    host.trim().trim_matches('.').to_string()
}

/// Checks whether `host` is in scope for `domain`: the apex itself or
/// anything ending in `.domain`.
pub fn in_scope(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{}", domain))
}

/// Syntactic DNS-name validation: 253 chars total, labels of 1-63
/// alphanumeric-or-hyphen characters that neither start nor end with a
/// hyphen.
pub fn is_valid_host(host: &str) -> bool {
    if host.is_empty() || host.len() > 253 {
        return false;
    }

    for label in host.split('.') {
        if label.is_empty() || label.len() > 63 {
            return false;
        }
        if !label
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return false;
        }
        if label.starts_with('-') || label.ends_with('-') {
            return false;
        }
    }

    true
}

/// Builds the extraction regex for hostnames under `domain`. Requires at
/// least one label before the apex.
pub fn subdomain_regex(domain: &str) -> Result<Regex, regex::Error> {
    let pattern = format!(
        r"(?i)(?:^|[^a-zA-Z0-9.-])((?:[a-zA-Z0-9](?:[a-zA-Z0-9-]{{0,61}}[a-zA-Z0-9])?\.)+{})",
        regex::escape(domain)
    );
    Regex::new(&pattern)
}

/// Scrapes every hostname under `domain` out of a text blob. Used by the
/// HTML-scrape and code-search adapters.
pub fn extract_subdomains(text: &str, domain: &str) -> Vec<String> {
    let re = match subdomain_regex(domain) {
        Ok(re) => re,
        Err(_) => return Vec::new(),
    };

    let mut seen = HashSet::new();
    let mut found = Vec::new();
    for cap in re.captures_iter(text) {
        if let Some(m) = cap.get(1) {
            let candidate = m.as_str().to_ascii_lowercase();
            if candidate != domain && !candidate.contains("..") && seen.insert(candidate.clone()) {
                found.push(candidate);
            }
        }
    }

    found
}

/// Random lowercase alphanumeric label, used for wildcard probing.
pub fn random_label(length: usize) -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

pub fn read_lines<P: AsRef<Path>>(path: P) -> io::Result<Vec<String>> {
    let file = File::open(path)?;
    BufReader::new(file).lines().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("*.example.com"), "example.com");
        assert_eq!(
            normalize_host("https://a.example.com/path"),
            "a.example.com"
        );
        assert_eq!(normalize_host("  a.example.com  "), "a.example.com");
        assert_eq!(normalize_host("HTTP://API.Example.Com"), "api.example.com");
        assert_eq!(normalize_host("a.example.com."), "a.example.com");
        assert_eq!(normalize_host("/a.example.com"), "a.example.com");
    }

    #[test]
    fn test_normalize_host_idempotent() {
        for raw in [
            "*.example.com",
            "https://a.example.com/path",
            "  mail.example.com  ",
            "\u{2022}cdn.example.com",
        ] {
            let once = normalize_host(raw);
            assert_eq!(normalize_host(&once), once);
        }
    }

    #[test]
    fn test_is_valid_host() {
        assert!(is_valid_host("example.com"));
        assert!(is_valid_host("a.example.com"));
        assert!(is_valid_host("a-1.example.com"));
        assert!(!is_valid_host(""));
        assert!(!is_valid_host("-a.example.com"));
        assert!(!is_valid_host("a-.example.com"));
        assert!(!is_valid_host("a..example.com"));
        assert!(!is_valid_host(&format!("{}.example.com", "a".repeat(64))));
        assert!(!is_valid_host("under_score.example.com"));
    }

    #[test]
    fn test_in_scope() {
        assert!(in_scope("example.com", "example.com"));
        assert!(in_scope("a.example.com", "example.com"));
        assert!(!in_scope("notexample.com", "example.com"));
        assert!(!in_scope("example.com.evil.org", "example.com"));
    }

    #[test]
    fn test_extract_subdomains() {
        let text = "found api.example.com and http://test.example.com/x in logs";
        let subs = extract_subdomains(text, "example.com");
        assert!(subs.contains(&"api.example.com".to_string()));
        assert!(subs.contains(&"test.example.com".to_string()));
        assert_eq!(subs.len(), 2);
    }

    #[test]
    fn test_extract_requires_label_before_apex() {
        // The bare apex is deliberately never captured by the extraction
        // regex; only names with at least one extra label match.
        let subs = extract_subdomains("see example.com and www.example.com", "example.com");
        assert_eq!(subs, vec!["www.example.com".to_string()]);
    }

    #[test]
    fn test_random_label() {
        let label = random_label(12);
        assert_eq!(label.len(), 12);
        assert!(label
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        assert_ne!(random_label(12), random_label(12));
    }
}
