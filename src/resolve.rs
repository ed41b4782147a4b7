// src/resolve.rs
use crate::config::ResolverConfig;
use crate::error::{Result, SubScoutError};
use crate::types::{HostEntry, ResolvedHost};
use crate::utils;
use log::info;
use rand::Rng;
use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::{Arc, RwLock};
use tokio::sync::{mpsc, Semaphore};
use trust_dns_resolver::config::{
    NameServerConfig, Protocol, ResolverConfig as DnsResolverConfig, ResolverOpts,
};
use trust_dns_resolver::TokioAsyncResolver;

const WILDCARD_PROBES: usize = 3;

/// One resolution attempt, streamed back to the enumeration loop.
#[derive(Debug)]
pub enum Resolution {
    Resolved(ResolvedHost),
    Failed { host: String, error: SubScoutError },
}

/// Concurrent DNS lookups against the configured recursive resolvers, with
/// per-apex wildcard fingerprinting. The fingerprint is written once by
/// `init_wildcards` and read by every worker afterwards.
pub struct ResolverPool {
    resolver: TokioAsyncResolver,
    semaphore: Arc<Semaphore>,
    wildcard: RwLock<HashSet<IpAddr>>,
    fingerprinted: RwLock<Option<String>>,
}

impl ResolverPool {
    pub fn new(config: &ResolverConfig) -> Result<Self> {
        let resolver = if config.use_system_resolver {
            TokioAsyncResolver::tokio_from_system_conf().map_err(|e| {
                SubScoutError::Resolution(format!("failed to create system resolver: {}", e))
            })?
        } else {
            let mut resolver_config = DnsResolverConfig::new();
            for ns in &config.nameservers {
                let socket_addr = SocketAddr::from_str(ns).map_err(|e| {
                    SubScoutError::Config(format!("invalid nameserver address {}: {}", ns, e))
                })?;
                resolver_config.add_name_server(NameServerConfig {
                    socket_addr,
                    protocol: Protocol::Udp,
                    tls_dns_name: None,
                    trust_negative_responses: false,
                    bind_addr: None,
                });
            }

            let mut opts = ResolverOpts::default();
            opts.timeout = config.timeout;
            opts.attempts = 2;

            TokioAsyncResolver::tokio(resolver_config, opts)
        };

        Ok(Self {
            resolver,
            semaphore: Arc::new(Semaphore::new(config.threads)),
            wildcard: RwLock::new(HashSet::new()),
            fingerprinted: RwLock::new(None),
        })
    }

    /// Probes random non-existent labels under `domain` and records the
    /// union of the answers as the apex's wildcard fingerprint. Idempotent
    /// per apex; a new apex refreshes the fingerprint.
    pub async fn init_wildcards(&self, domain: &str) {
        if self.fingerprinted.read().unwrap().as_deref() == Some(domain) {
            return;
        }

        let mut fingerprint = HashSet::new();
        for _ in 0..WILDCARD_PROBES {
            let length = rand::thread_rng().gen_range(10..=12);
            let probe = format!("{}.{}", utils::random_label(length), domain);
            if let Ok(addresses) = self.lookup(&probe).await {
                fingerprint.extend(addresses);
            }
        }

        if !fingerprint.is_empty() {
            info!(
                "detected wildcard DNS for {} with {} address(es)",
                domain,
                fingerprint.len()
            );
        }

        *self.wildcard.write().unwrap() = fingerprint;
        *self.fingerprinted.write().unwrap() = Some(domain.to_string());
    }

    pub fn wildcard_fingerprint(&self) -> HashSet<IpAddr> {
        self.wildcard.read().unwrap().clone()
    }

    /// A host whose every address is in the fingerprint is considered
    /// wildcard-induced.
    pub fn is_wildcard(&self, addresses: &[IpAddr]) -> bool {
        let fingerprint = self.wildcard.read().unwrap();
        !fingerprint.is_empty()
            && !addresses.is_empty()
            && addresses.iter().all(|ip| fingerprint.contains(ip))
    }

    fn subtract_wildcard(&self, addresses: Vec<IpAddr>) -> Vec<IpAddr> {
        let fingerprint = self.wildcard.read().unwrap();
        addresses
            .into_iter()
            .filter(|ip| !fingerprint.contains(ip))
            .collect()
    }

    /// Bounded-concurrency A/AAAA lookup.
    pub async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| SubScoutError::Resolution(e.to_string()))?;

        self.resolver
            .lookup_ip(host)
            .await
            .map(|lookup| lookup.iter().collect())
            .map_err(|e| SubScoutError::Resolution(format!("{}: {}", host, e)))
    }

    /// Brute/permutation semantics: NXDOMAIN, timeouts and wildcard-only
    /// answers all collapse into a silent drop.
    pub async fn validate(&self, candidate: &str) -> Option<Vec<IpAddr>> {
        let addresses = self.lookup(candidate).await.ok()?;
        let remaining = self.subtract_wildcard(addresses);
        if remaining.is_empty() {
            None
        } else {
            Some(remaining)
        }
    }

    /// Aggregator semantics: failures are reported, wildcard-induced hosts
    /// are dropped from the resolved set.
    async fn resolve_entry(&self, entry: HostEntry) -> Resolution {
        match self.lookup(&entry.host).await {
            Ok(addresses) => {
                if self.is_wildcard(&addresses) {
                    Resolution::Failed {
                        host: entry.host,
                        error: SubScoutError::Resolution("wildcard-induced".to_string()),
                    }
                } else {
                    Resolution::Resolved(ResolvedHost {
                        host: entry.host,
                        addresses,
                        source: entry.source,
                    })
                }
            }
            Err(error) => Resolution::Failed {
                host: entry.host,
                error,
            },
        }
    }

    /// Spawns the worker side of the pool: host entries in, resolutions out,
    /// in no particular order. The result stream closes once the task sender
    /// is dropped and all in-flight lookups finish.
    pub fn start(self: Arc<Self>) -> (mpsc::Sender<HostEntry>, mpsc::Receiver<Resolution>) {
        let (task_tx, mut task_rx) = mpsc::channel::<HostEntry>(256);
        let (result_tx, result_rx) = mpsc::channel::<Resolution>(256);

        let pool = self;
        tokio::spawn(async move {
            while let Some(entry) = task_rx.recv().await {
                let pool = Arc::clone(&pool);
                let result_tx = result_tx.clone();
                tokio::spawn(async move {
                    let resolution = pool.resolve_entry(entry).await;
                    let _ = result_tx.send(resolution).await;
                });
            }
        });

        (task_tx, result_rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolverConfig;

    fn pool() -> ResolverPool {
        ResolverPool::new(&ResolverConfig::default()).unwrap()
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn pool_with_fingerprint(addresses: &[&str]) -> ResolverPool {
        let pool = pool();
        *pool.wildcard.write().unwrap() = addresses.iter().map(|a| ip(a)).collect();
        *pool.fingerprinted.write().unwrap() = Some("example.com".to_string());
        pool
    }

    #[tokio::test]
    async fn test_is_wildcard_requires_subset() {
        let pool = pool_with_fingerprint(&["1.2.3.4"]);
        assert!(pool.is_wildcard(&[ip("1.2.3.4")]));
        assert!(!pool.is_wildcard(&[ip("9.9.9.9")]));
        // Mixed answers carry at least one genuine address.
        assert!(!pool.is_wildcard(&[ip("1.2.3.4"), ip("9.9.9.9")]));
    }

    #[tokio::test]
    async fn test_empty_fingerprint_never_wildcard() {
        let pool = pool();
        assert!(!pool.is_wildcard(&[ip("1.2.3.4")]));
    }

    #[tokio::test]
    async fn test_subtract_wildcard() {
        let pool = pool_with_fingerprint(&["1.2.3.4", "5.6.7.8"]);
        let remaining =
            pool.subtract_wildcard(vec![ip("1.2.3.4"), ip("9.9.9.9"), ip("5.6.7.8")]);
        assert_eq!(remaining, vec![ip("9.9.9.9")]);
        assert!(pool.subtract_wildcard(vec![ip("1.2.3.4")]).is_empty());
    }

    #[tokio::test]
    async fn test_invalid_nameserver_is_config_error() {
        let config = ResolverConfig {
            nameservers: vec!["not-an-address".to_string()],
            ..ResolverConfig::default()
        };
        assert!(matches!(
            ResolverPool::new(&config),
            Err(SubScoutError::Config(_))
        ));
    }
}
