// src/cache.rs
use crate::error::{Result, SubScoutError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Disk-backed result cache, one JSON file per `(apex, source)` pair. The
/// filename is the hex MD5 of `apex:source`, matching the historical
/// on-disk format. Expired entries are purged on read; writes replace
/// atomically via write-then-rename so readers never see a torn file.
pub struct Cache {
    dir: PathBuf,
    ttl: Duration,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    domain: String,
    results: Vec<String>,
    timestamp: DateTime<Utc>,
    source: String,
}

impl Cache {
    pub fn new(dir: PathBuf, ttl: Duration) -> Result<Self> {
        fs::create_dir_all(&dir).map_err(|e| {
            SubScoutError::Config(format!(
                "failed to create cache directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        Ok(Self { dir, ttl })
    }

    fn entry_path(&self, domain: &str, source: &str) -> PathBuf {
        let digest = md5::compute(format!("{}:{}", domain, source));
        self.dir.join(format!("{:x}.json", digest))
    }

    /// Cached results for `(domain, source)`, or None on miss or expiry.
    pub fn get(&self, domain: &str, source: &str) -> Option<Vec<String>> {
        let path = self.entry_path(domain, source);
        let data = fs::read_to_string(&path).ok()?;
        let entry: CacheEntry = serde_json::from_str(&data).ok()?;

        let age = Utc::now().signed_duration_since(entry.timestamp);
        if age.num_seconds() < 0 || age.num_seconds() as u64 > self.ttl.as_secs() {
            let _ = fs::remove_file(&path);
            return None;
        }

        Some(entry.results)
    }

    pub fn set(&self, domain: &str, source: &str, results: &[String]) -> Result<()> {
        let entry = CacheEntry {
            domain: domain.to_string(),
            results: results.to_vec(),
            timestamp: Utc::now(),
            source: source.to_string(),
        };

        let data = serde_json::to_vec_pretty(&entry)
            .map_err(|e| SubScoutError::Output(format!("failed to serialise cache entry: {}", e)))?;

        let path = self.entry_path(domain, source);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, data)
            .map_err(|e| SubScoutError::Output(format!("failed to write cache entry: {}", e)))?;
        fs::rename(&tmp, &path)
            .map_err(|e| SubScoutError::Output(format!("failed to replace cache entry: {}", e)))?;

        Ok(())
    }

    /// Removes every expired entry; tolerates files that are not ours.
    pub fn purge_expired(&self) -> usize {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return 0;
        };

        let mut purged = 0;
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Ok(data) = fs::read_to_string(&path) else {
                continue;
            };
            let Ok(parsed) = serde_json::from_str::<CacheEntry>(&data) else {
                continue;
            };
            let age = Utc::now().signed_duration_since(parsed.timestamp);
            if age.num_seconds() >= 0 && age.num_seconds() as u64 > self.ttl.as_secs() {
                if fs::remove_file(&path).is_ok() {
                    purged += 1;
                }
            }
        }
        purged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_round_trip_within_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path().to_path_buf(), Duration::from_secs(3600)).unwrap();

        let stored = results(&["a.example.com", "b.example.com"]);
        cache.set("example.com", "crtsh", &stored).unwrap();
        assert_eq!(cache.get("example.com", "crtsh"), Some(stored));
    }

    #[test]
    fn test_expired_entry_is_a_miss_and_purged() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path().to_path_buf(), Duration::from_secs(0)).unwrap();

        cache
            .set("example.com", "crtsh", &results(&["a.example.com"]))
            .unwrap();
        std::thread::sleep(Duration::from_millis(1100));
        assert_eq!(cache.get("example.com", "crtsh"), None);
        // The reader removed the stale file.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_keys_are_per_domain_and_source() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path().to_path_buf(), Duration::from_secs(3600)).unwrap();

        cache
            .set("example.com", "crtsh", &results(&["a.example.com"]))
            .unwrap();
        assert_eq!(cache.get("example.com", "wayback"), None);
        assert_eq!(cache.get("other.org", "crtsh"), None);
    }

    #[test]
    fn test_set_replaces_previous_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path().to_path_buf(), Duration::from_secs(3600)).unwrap();

        cache
            .set("example.com", "crtsh", &results(&["a.example.com"]))
            .unwrap();
        cache
            .set("example.com", "crtsh", &results(&["b.example.com"]))
            .unwrap();
        assert_eq!(
            cache.get("example.com", "crtsh"),
            Some(results(&["b.example.com"]))
        );
    }

    #[test]
    fn test_purge_expired() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path().to_path_buf(), Duration::from_secs(0)).unwrap();
        cache
            .set("example.com", "crtsh", &results(&["a.example.com"]))
            .unwrap();
        std::thread::sleep(Duration::from_millis(1100));
        assert_eq!(cache.purge_expired(), 1);
    }
}
