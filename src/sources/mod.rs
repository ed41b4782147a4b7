// src/sources/mod.rs
use crate::config::SourceSelection;
use crate::error::{Result, SubScoutError};
use crate::session::Session;
use crate::types::{SourceInfo, SourceResult, SourceStatistics};
use async_trait::async_trait;
use log::warn;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::mpsc;

mod alienvault;
mod anubis;
mod bufferover;
mod c99;
mod certspotter;
mod chaos;
mod commoncrawl;
mod crtsh;
mod digitorus;
mod dnsdumpster;
mod github;
mod hackertarget;
mod netlas;
mod rapiddns;
mod securitytrails;
mod shodan;
mod sitedossier;
mod threatcrowd;
mod urlscan;
mod virustotal;
mod wayback;

pub use alienvault::AlienVaultSource;
pub use anubis::AnubisSource;
pub use bufferover::BufferOverSource;
pub use c99::C99Source;
pub use certspotter::CertSpotterSource;
pub use chaos::ChaosSource;
pub use commoncrawl::CommonCrawlSource;
pub use crtsh::CrtShSource;
pub use digitorus::DigitorusSource;
pub use dnsdumpster::DnsDumpsterSource;
pub use github::GitHubSource;
pub use hackertarget::HackerTargetSource;
pub use netlas::NetlasSource;
pub use rapiddns::RapidDnsSource;
pub use securitytrails::SecurityTrailsSource;
pub use shodan::ShodanSource;
pub use sitedossier::SiteDossierSource;
pub use threatcrowd::ThreatCrowdSource;
pub use urlscan::UrlScanSource;
pub use virustotal::VirusTotalSource;
pub use wayback::WaybackSource;

/// One passive provider integration. `run` streams results into the supplied
/// channel and must terminate promptly once the receiver is dropped; the
/// stream closes when the sender goes out of scope, exactly once.
#[async_trait]
pub trait Source: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_default(&self) -> bool {
        true
    }

    fn has_recursive_support(&self) -> bool {
        false
    }

    fn needs_key(&self) -> bool {
        false
    }

    fn add_api_keys(&self, _keys: Vec<String>) {}

    fn stats(&self) -> &StatsCell;

    fn statistics(&self) -> SourceStatistics {
        self.stats().snapshot()
    }

    fn info(&self) -> SourceInfo {
        SourceInfo {
            name: self.name(),
            is_default: self.is_default(),
            needs_key: self.needs_key(),
            has_recursive_support: self.has_recursive_support(),
        }
    }

    async fn run(&self, domain: &str, session: Arc<Session>, tx: mpsc::Sender<SourceResult>);
}

/// Counters owned by a single source. The source's run task is the only
/// writer of results/errors; elapsed is written by the agent once the stream
/// closes.
#[derive(Debug, Default)]
pub struct StatsCell {
    results: AtomicUsize,
    errors: AtomicUsize,
    elapsed_ms: AtomicU64,
}

impl StatsCell {
    pub fn add_result(&self) {
        self.results.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_elapsed(&self, elapsed: Duration) {
        self.elapsed_ms
            .store(elapsed.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.results.store(0, Ordering::Relaxed);
        self.errors.store(0, Ordering::Relaxed);
        self.elapsed_ms.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SourceStatistics {
        SourceStatistics {
            results: self.results.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            elapsed: Duration::from_millis(self.elapsed_ms.load(Ordering::Relaxed)),
        }
    }
}

/// Credential list for one source, rotated round-robin per request so quota
/// spreads across keys.
#[derive(Debug, Default)]
pub struct ApiKeyRing {
    keys: RwLock<Vec<String>>,
    cursor: AtomicUsize,
}

impl ApiKeyRing {
    pub fn add(&self, mut keys: Vec<String>) {
        self.keys.write().unwrap().append(&mut keys);
    }

    pub fn is_empty(&self) -> bool {
        self.keys.read().unwrap().is_empty()
    }

    pub fn next_key(&self) -> Option<String> {
        let keys = self.keys.read().unwrap();
        if keys.is_empty() {
            return None;
        }
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % keys.len();
        Some(keys[idx].clone())
    }
}

/// Sends one candidate downstream, counting it. Returns false when the
/// consumer has gone away and the adapter should stop.
pub(crate) async fn emit_subdomain(
    tx: &mpsc::Sender<SourceResult>,
    stats: &StatsCell,
    source: &'static str,
    value: String,
) -> bool {
    if tx.send(SourceResult::subdomain(source, value)).await.is_ok() {
        stats.add_result();
        true
    } else {
        false
    }
}

pub(crate) async fn emit_error(
    tx: &mpsc::Sender<SourceResult>,
    stats: &StatsCell,
    source: &'static str,
    error: SubScoutError,
) {
    stats.add_error();
    let _ = tx.send(SourceResult::error(source, error)).await;
}

pub const ALL_SOURCE_NAMES: &[&str] = &[
    "alienvault",
    "anubis",
    "bufferover",
    "c99",
    "certspotter",
    "chaos",
    "commoncrawl",
    "crtsh",
    "digitorus",
    "dnsdumpster",
    "github",
    "hackertarget",
    "netlas",
    "rapiddns",
    "securitytrails",
    "shodan",
    "sitedossier",
    "threatcrowd",
    "urlscan",
    "virustotal",
    "wayback",
];

pub fn create_source(name: &str) -> Option<Arc<dyn Source>> {
    let source: Arc<dyn Source> = match name.to_ascii_lowercase().as_str() {
        "alienvault" => Arc::new(AlienVaultSource::new()),
        "anubis" => Arc::new(AnubisSource::new()),
        "bufferover" => Arc::new(BufferOverSource::new()),
        "c99" => Arc::new(C99Source::new()),
        "certspotter" => Arc::new(CertSpotterSource::new()),
        "chaos" => Arc::new(ChaosSource::new()),
        "commoncrawl" => Arc::new(CommonCrawlSource::new()),
        "crtsh" => Arc::new(CrtShSource::new()),
        "digitorus" => Arc::new(DigitorusSource::new()),
        "dnsdumpster" => Arc::new(DnsDumpsterSource::new()),
        "github" => Arc::new(GitHubSource::new()),
        "hackertarget" => Arc::new(HackerTargetSource::new()),
        "netlas" => Arc::new(NetlasSource::new()),
        "rapiddns" => Arc::new(RapidDnsSource::new()),
        "securitytrails" => Arc::new(SecurityTrailsSource::new()),
        "shodan" => Arc::new(ShodanSource::new()),
        "sitedossier" => Arc::new(SiteDossierSource::new()),
        "threatcrowd" => Arc::new(ThreatCrowdSource::new()),
        "urlscan" => Arc::new(UrlScanSource::new()),
        "virustotal" => Arc::new(VirusTotalSource::new()),
        "wayback" => Arc::new(WaybackSource::new()),
        _ => return None,
    };
    Some(source)
}

pub fn all_sources() -> Vec<Arc<dyn Source>> {
    ALL_SOURCE_NAMES
        .iter()
        .filter_map(|name| create_source(name))
        .collect()
}

/// Applies the include/exclude/all/recursive filters and injects provider
/// keys. Key-requiring sources without a key stay selected and surface the
/// problem as an error result when run.
pub fn select_sources(
    selection: &SourceSelection,
    api_keys: &std::collections::HashMap<String, Vec<String>>,
) -> Result<Vec<Arc<dyn Source>>> {
    let mut selected: Vec<Arc<dyn Source>> = if selection.use_all {
        all_sources()
    } else if !selection.sources.is_empty() {
        let mut picked = Vec::new();
        for name in &selection.sources {
            match create_source(name) {
                Some(source) => picked.push(source),
                None => warn!("there is no source with the name: {}", name),
            }
        }
        picked
    } else {
        all_sources()
            .into_iter()
            .filter(|s| s.is_default())
            .collect()
    };

    selected.retain(|s| !selection.exclude.iter().any(|e| e == s.name()));

    if selection.recursive_only {
        selected.retain(|s| s.has_recursive_support());
    }

    if selected.is_empty() {
        return Err(SubScoutError::Config(
            "no sources selected for this search".to_string(),
        ));
    }

    for source in &selected {
        if source.needs_key() {
            if let Some(keys) = api_keys.get(source.name()) {
                source.add_api_keys(keys.clone());
            }
        }
    }

    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_create_source() {
        assert!(create_source("crtsh").is_some());
        assert!(create_source("CrtSh").is_some());
        assert!(create_source("nosuchsource").is_none());
    }

    #[test]
    fn test_all_names_resolve() {
        for name in ALL_SOURCE_NAMES {
            let source = create_source(name).unwrap();
            assert_eq!(source.name(), *name);
        }
    }

    #[test]
    fn test_default_selection_excludes_non_default() {
        let selected = select_sources(&SourceSelection::default(), &HashMap::new()).unwrap();
        assert!(selected.iter().all(|s| s.is_default()));
        assert!(selected.len() < ALL_SOURCE_NAMES.len());
    }

    #[test]
    fn test_use_all_selection() {
        let selection = SourceSelection {
            use_all: true,
            ..SourceSelection::default()
        };
        let selected = select_sources(&selection, &HashMap::new()).unwrap();
        assert_eq!(selected.len(), ALL_SOURCE_NAMES.len());
    }

    #[test]
    fn test_exclude_removes_source() {
        let selection = SourceSelection {
            use_all: true,
            exclude: vec!["crtsh".to_string()],
            ..SourceSelection::default()
        };
        let selected = select_sources(&selection, &HashMap::new()).unwrap();
        assert!(selected.iter().all(|s| s.name() != "crtsh"));
    }

    #[test]
    fn test_recursive_only_filter() {
        let selection = SourceSelection {
            use_all: true,
            recursive_only: true,
            ..SourceSelection::default()
        };
        let selected = select_sources(&selection, &HashMap::new()).unwrap();
        assert!(!selected.is_empty());
        assert!(selected.iter().all(|s| s.has_recursive_support()));
    }

    #[test]
    fn test_empty_selection_is_config_error() {
        let selection = SourceSelection {
            sources: vec!["nosuchsource".to_string()],
            ..SourceSelection::default()
        };
        assert!(matches!(
            select_sources(&selection, &HashMap::new()),
            Err(SubScoutError::Config(_))
        ));
    }

    #[test]
    fn test_key_injection() {
        let selection = SourceSelection {
            sources: vec!["shodan".to_string()],
            ..SourceSelection::default()
        };
        let mut keys = HashMap::new();
        keys.insert("shodan".to_string(), vec!["k1".to_string()]);
        let selected = select_sources(&selection, &keys).unwrap();
        assert_eq!(selected.len(), 1);
    }

    #[test]
    fn test_api_key_ring_round_robin() {
        let ring = ApiKeyRing::default();
        assert!(ring.next_key().is_none());

        ring.add(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(ring.next_key().unwrap(), "a");
        assert_eq!(ring.next_key().unwrap(), "b");
        assert_eq!(ring.next_key().unwrap(), "a");
    }

    #[test]
    fn test_stats_cell_snapshot() {
        let cell = StatsCell::default();
        cell.add_result();
        cell.add_result();
        cell.add_error();
        cell.set_elapsed(Duration::from_millis(1500));

        let snap = cell.snapshot();
        assert_eq!(snap.results, 2);
        assert_eq!(snap.errors, 1);
        assert_eq!(snap.elapsed, Duration::from_millis(1500));
    }
}
