// src/wordlist.rs
use crate::config::ActiveConfig;
use log::warn;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Fallback labels used when no custom wordlist is supplied.
pub const DEFAULT_WORDLIST: &[&str] = &[
    "www", "mail", "ftp", "localhost", "webmail", "smtp", "pop", "pop3", "imap", "ns1", "ns2",
    "ns3", "ns4", "ns5", "admin", "administrator", "api", "app", "apps", "blog", "cdn", "cpanel",
    "dev", "development", "docs", "forum", "help", "img", "images", "m", "mobile", "mx", "mx1",
    "mx2", "news", "old", "portal", "secure", "shop", "sql", "ssl", "stage", "staging", "static",
    "stats", "status", "test", "testing", "vpn", "web", "webdisk", "whm", "ww1", "ww2", "email",
    "demo", "beta", "alpha", "preview", "pre", "prod", "production", "live", "server", "server1",
    "server2", "host", "host1", "host2", "s1", "s2", "s3", "s4", "s5", "intranet", "extranet",
    "internal", "backup", "db", "database", "mysql", "postgres", "redis", "search", "proxy",
    "gateway", "gw", "monitor", "monitoring", "metrics", "grafana", "kibana", "jenkins", "ci",
    "git", "gitlab", "registry", "auth", "sso", "oauth", "login", "signin", "account", "dashboard",
    "panel", "control", "console", "media", "assets", "files", "upload", "download", "cache",
    "chat", "support", "helpdesk", "wiki", "store", "cart", "checkout", "pay", "payment",
    "billing", "crm", "cms", "exchange", "owa", "autodiscover", "lyncdiscover", "remote", "cloud",
    "k8s", "docker", "vault", "ldap", "ntp", "sip", "voip", "tv", "video", "my", "svn", "lab",
    "labs", "sandbox", "uat", "qa", "edge", "origin", "us", "eu", "asia", "uk", "de", "fr", "jp",
];

/// Loads the brute-force wordlist with the documented precedence: explicit
/// file, then directory scan, then URL downloads, falling back to the
/// built-in list when nothing else yielded words. First-seen order is kept
/// while deduplicating.
pub async fn load(config: &ActiveConfig) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut words = Vec::new();

    if let Some(path) = &config.wordlist {
        match read_words(path) {
            Ok(loaded) => merge(&mut words, &mut seen, loaded),
            Err(e) => warn!("could not load wordlist {}: {}", path.display(), e),
        }
    }

    if let Some(dir) = &config.wordlist_dir {
        merge(&mut words, &mut seen, read_directory(dir));
    }

    for url in &config.wordlist_urls {
        merge(&mut words, &mut seen, download(url).await);
    }

    if words.is_empty() {
        merge(
            &mut words,
            &mut seen,
            DEFAULT_WORDLIST.iter().map(|w| w.to_string()).collect(),
        );
    }

    words
}

fn merge(words: &mut Vec<String>, seen: &mut HashSet<String>, incoming: Vec<String>) {
    for word in incoming {
        if seen.insert(word.clone()) {
            words.push(word);
        }
    }
}

fn read_words(path: &Path) -> std::io::Result<Vec<String>> {
    let contents = fs::read_to_string(path)?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

fn read_directory(dir: &Path) -> Vec<String> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("could not read wordlist directory {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut paths: Vec<_> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| matches!(ext, "txt" | "list" | "wordlist"))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();

    let mut words = Vec::new();
    for path in paths {
        match read_words(&path) {
            Ok(mut loaded) => words.append(&mut loaded),
            Err(e) => warn!("could not load wordlist {}: {}", path.display(), e),
        }
    }
    words
}

async fn download(url: &str) -> Vec<String> {
    let response = match reqwest::get(url).await {
        Ok(r) => r,
        Err(e) => {
            warn!("could not download wordlist from {}: {}", url, e);
            return Vec::new();
        }
    };

    if !response.status().is_success() {
        warn!(
            "HTTP {} when downloading wordlist from {}",
            response.status(),
            url
        );
        return Vec::new();
    }

    match response.text().await {
        Ok(body) => body
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect(),
        Err(e) => {
            warn!("error reading wordlist from {}: {}", url, e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ActiveConfig;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[tokio::test]
    async fn test_builtin_fallback() {
        let words = load(&ActiveConfig::default()).await;
        assert!(!words.is_empty());
        assert!(words.contains(&"www".to_string()));
        // Built-in list is already unique.
        let unique: HashSet<_> = words.iter().collect();
        assert_eq!(unique.len(), words.len());
    }

    #[tokio::test]
    async fn test_file_takes_precedence_and_skips_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "words.txt", "# comment\napi\n\nmail\napi\n");

        let config = ActiveConfig {
            wordlist: Some(path),
            ..ActiveConfig::default()
        };
        let words = load(&config).await;
        assert_eq!(words, vec!["api", "mail"]);
    }

    #[tokio::test]
    async fn test_directory_scan_filters_extensions() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a.txt", "alpha\n");
        write_file(dir.path(), "b.list", "beta\n");
        write_file(dir.path(), "c.wordlist", "gamma\n");
        write_file(dir.path(), "ignored.json", "delta\n");

        let config = ActiveConfig {
            wordlist_dir: Some(dir.path().to_path_buf()),
            ..ActiveConfig::default()
        };
        let words = load(&config).await;
        assert_eq!(words, vec!["alpha", "beta", "gamma"]);
    }

    #[tokio::test]
    async fn test_file_and_directory_merge_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(dir.path(), "first.ignored", "api\nmail\n");
        let listdir = tempfile::tempdir().unwrap();
        write_file(listdir.path(), "extra.txt", "mail\nvpn\n");

        let config = ActiveConfig {
            wordlist: Some(file),
            wordlist_dir: Some(listdir.path().to_path_buf()),
            ..ActiveConfig::default()
        };
        let words = load(&config).await;
        assert_eq!(words, vec!["api", "mail", "vpn"]);
    }
}
