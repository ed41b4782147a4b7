// src/engine.rs
use crate::agent::PassiveAgent;
use crate::aggregator::{Acceptance, Aggregator};
use crate::brute::{self, BruteForcer};
use crate::cache::Cache;
use crate::config::{self, Config};
use crate::error::{Result, SubScoutError};
use crate::output::{self, OutputManager};
use crate::permute::{self, PermutationGenerator};
use crate::recursive::{self, RecursiveExpander};
use crate::resolve::{Resolution, ResolverPool};
use crate::session::Session;
use crate::sources::{self, Source};
use crate::types::{DomainReport, HostEntry, ResolvedHost, SourceResultKind, SourceStatistics};
use crate::{utils, wordlist};
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::timeout;

/// Invoked synchronously from the enumeration loop for every accepted host;
/// must return quickly.
pub type ResultCallback = Box<dyn Fn(&HostEntry) + Send + Sync>;

#[derive(Debug, Default)]
pub struct RunSummary {
    pub domains: usize,
    pub total_hosts: usize,
    pub duration: Duration,
}

/// Per-domain pipeline driver: passive fan-out into the aggregator,
/// optional resolution with wildcard suppression, then the active stages,
/// finally the output handoff.
pub struct SubScoutEngine {
    config: Config,
    sources: Vec<Arc<dyn Source>>,
    cache: Option<Arc<Cache>>,
    output: OutputManager,
    on_result: Option<ResultCallback>,
}

impl SubScoutEngine {
    pub fn new(mut config: Config) -> Result<Self> {
        config::extend_keys_from_env(&mut config.api_keys, sources::ALL_SOURCE_NAMES);

        let selected = sources::select_sources(&config.selection, &config.api_keys)?;
        info!("initialized {} sources", selected.len());

        let cache = match &config.cache {
            Some(cache_config) => Some(Arc::new(Cache::new(
                cache_config.dir.clone(),
                cache_config.ttl,
            )?)),
            None => None,
        };

        let output = OutputManager::new(config.output.clone())?;

        Ok(Self {
            config,
            sources: selected,
            cache,
            output,
            on_result: None,
        })
    }

    pub fn set_result_callback(&mut self, callback: ResultCallback) {
        self.on_result = Some(callback);
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Enumerates every domain in turn. Single-domain failures are logged
    /// and skipped; only output-sink errors abort the run.
    pub async fn run(&mut self, domains: Vec<String>) -> Result<RunSummary> {
        if domains.is_empty() {
            return Err(SubScoutError::Config("no domains provided".to_string()));
        }

        let started = Instant::now();
        let mut summary = RunSummary::default();

        for domain in domains {
            match self.enumerate_domain(&domain).await {
                Ok(report) => {
                    summary.domains += 1;
                    summary.total_hosts += report.hosts.len();
                    self.output.write_report(&report)?;
                    if self.config.output.statistics {
                        output::print_statistics(&report.domain, &report.stats);
                    }
                    info!(
                        "found {} subdomains for {} in {:.2}s",
                        report.hosts.len(),
                        report.domain,
                        report.duration.as_secs_f64()
                    );
                }
                Err(e) => {
                    error!("enumeration failed for {}: {}", domain, e);
                }
            }
        }

        summary.duration = started.elapsed();
        Ok(summary)
    }

    /// Runs the full pipeline for one apex and returns the accepted set with
    /// attribution, resolutions and reconciled per-source statistics.
    pub async fn enumerate_domain(&self, domain: &str) -> Result<DomainReport> {
        let domain = domain.trim().trim_end_matches('.').to_ascii_lowercase();
        if domain.split('.').count() < 2 || !utils::is_valid_host(&domain) {
            return Err(SubScoutError::InvalidDomain(domain));
        }

        info!("enumerating subdomains for {}", domain);
        let started = Instant::now();

        let session = Arc::new(Session::new(&self.config)?);
        let mut aggregator = Aggregator::new(
            &domain,
            &self.config.match_patterns,
            &self.config.filter_patterns,
        )?;
        let mut resolved: HashMap<String, ResolvedHost> = HashMap::new();

        let pool = if self.config.remove_wildcard || self.config.active.any_enabled() {
            Some(Arc::new(ResolverPool::new(&self.config.resolver)?))
        } else {
            None
        };

        let mut resolution_channels = None;
        if self.config.remove_wildcard {
            let pool = pool.as_ref().unwrap();
            pool.init_wildcards(&domain).await;
            resolution_channels = Some(Arc::clone(pool).start());
        }

        // Passive phase: merged stream in, aggregator out. New hosts go to
        // the resolver when wildcard removal is on, otherwise straight to
        // the callback.
        let agent = PassiveAgent::new(self.sources.clone(), self.cache.clone());
        let mut merged = agent.enumerate(
            &domain,
            Arc::clone(&session),
            self.config.max_enumeration_time,
        );

        while let Some(result) = merged.recv().await {
            match result.kind {
                SourceResultKind::Error(e) => {
                    if e.is_auth_failure() {
                        warn!("[{}] authentication failed: {}", result.source, e);
                    } else if e.is_rate_limited() {
                        warn!("[{}] rate limited: {}", result.source, e);
                    } else {
                        warn!("[{}] {}", result.source, e);
                    }
                }
                SourceResultKind::Subdomain(value) => {
                    if let Acceptance::New(entry) = aggregator.accept(&result.source, &value) {
                        match &resolution_channels {
                            Some((task_tx, _)) => {
                                let _ = task_tx.send(entry).await;
                            }
                            None => {
                                if let Some(callback) = &self.on_result {
                                    callback(&entry);
                                }
                            }
                        }
                    }
                }
            }
        }

        let mut stats = agent.statistics();
        aggregator.reconcile(&mut stats);

        // Drain the resolver: wildcard-induced hosts never reach the
        // resolved set.
        if let Some((task_tx, mut result_rx)) = resolution_channels.take() {
            drop(task_tx);
            while let Some(resolution) = result_rx.recv().await {
                match resolution {
                    Resolution::Resolved(host) => {
                        if !resolved.contains_key(&host.host) {
                            if let Some(callback) = &self.on_result {
                                callback(&HostEntry {
                                    domain: domain.clone(),
                                    host: host.host.clone(),
                                    source: host.source.clone(),
                                });
                            }
                            resolved.insert(host.host.clone(), host);
                        }
                    }
                    Resolution::Failed { host, error } => {
                        warn!("could not resolve {}: {}", host, error);
                    }
                }
            }
        }

        if self.config.active.any_enabled() {
            self.run_active_stages(
                &domain,
                started,
                pool.as_ref().unwrap(),
                &mut aggregator,
                &mut resolved,
                &mut stats,
            )
            .await;
        }

        let mut hosts: Vec<HostEntry> = if self.config.remove_wildcard {
            aggregator
                .entries()
                .filter(|entry| resolved.contains_key(&entry.host))
                .cloned()
                .collect()
        } else {
            aggregator.entries().cloned().collect()
        };
        hosts.sort_by(|a, b| a.host.cmp(&b.host));

        let (_, attribution) = aggregator.into_parts();

        Ok(DomainReport {
            domain,
            hosts,
            attribution,
            resolved,
            stats,
            duration: started.elapsed(),
        })
    }

    /// Brute force, permutation and recursive expansion run in sequence,
    /// sharing the aggregator, the resolver pool and what is left of the
    /// run deadline. Their outputs arrive pre-resolved and wildcard
    /// filtered.
    async fn run_active_stages(
        &self,
        domain: &str,
        run_started: Instant,
        pool: &Arc<ResolverPool>,
        aggregator: &mut Aggregator,
        resolved: &mut HashMap<String, ResolvedHost>,
        stats: &mut HashMap<String, SourceStatistics>,
    ) {
        let threads = self.config.active.threads;

        if self.config.active.brute_force {
            let Some(deadline) = self.remaining_time(run_started) else {
                warn!("skipping brute force for {}: deadline exhausted", domain);
                return;
            };

            let words = wordlist::load(&self.config.active).await;
            let (tx, rx) = mpsc::channel(256);
            let forcer = BruteForcer::new(Arc::clone(pool), threads);
            let stage_domain = domain.to_string();
            tokio::spawn(async move {
                let _ = timeout(deadline, forcer.enumerate(&stage_domain, &words, tx)).await;
            });
            self.consume_stage(rx, brute::SOURCE_NAME, aggregator, resolved, stats)
                .await;
        }

        if self.config.active.permutations {
            let Some(deadline) = self.remaining_time(run_started) else {
                warn!("skipping permutations for {}: deadline exhausted", domain);
                return;
            };

            let candidates = PermutationGenerator::new().generate(domain, &aggregator.hosts());
            debug!("generated {} permutation candidates", candidates.len());

            let (tx, rx) = mpsc::channel(256);
            let stage_pool = Arc::clone(pool);
            let stage_domain = domain.to_string();
            tokio::spawn(async move {
                let _ = timeout(
                    deadline,
                    brute::validate_candidates(
                        stage_pool,
                        &stage_domain,
                        threads,
                        permute::SOURCE_NAME,
                        candidates,
                        tx,
                    ),
                )
                .await;
            });
            self.consume_stage(rx, permute::SOURCE_NAME, aggregator, resolved, stats)
                .await;
        }

        if self.config.active.recursive && self.config.active.max_depth > 0 {
            let Some(deadline) = self.remaining_time(run_started) else {
                warn!(
                    "skipping recursive expansion for {}: deadline exhausted",
                    domain
                );
                return;
            };

            let candidates = RecursiveExpander::new().candidates(domain, &aggregator.hosts());
            debug!("generated {} recursive candidates", candidates.len());

            let (tx, rx) = mpsc::channel(256);
            let stage_pool = Arc::clone(pool);
            let stage_domain = domain.to_string();
            tokio::spawn(async move {
                let _ = timeout(
                    deadline,
                    brute::validate_candidates(
                        stage_pool,
                        &stage_domain,
                        threads,
                        recursive::SOURCE_NAME,
                        candidates,
                        tx,
                    ),
                )
                .await;
            });
            self.consume_stage(rx, recursive::SOURCE_NAME, aggregator, resolved, stats)
                .await;
        }
    }

    async fn consume_stage(
        &self,
        mut rx: mpsc::Receiver<ResolvedHost>,
        stage: &'static str,
        aggregator: &mut Aggregator,
        resolved: &mut HashMap<String, ResolvedHost>,
        stats: &mut HashMap<String, SourceStatistics>,
    ) {
        let stage_started = Instant::now();
        let mut accepted = 0;

        while let Some(host) = rx.recv().await {
            if let Acceptance::New(entry) = aggregator.accept(&host.source, &host.host) {
                accepted += 1;
                resolved.insert(entry.host.clone(), host);
                if let Some(callback) = &self.on_result {
                    callback(&entry);
                }
            }
        }

        info!("{} stage accepted {} new hosts", stage, accepted);
        stats.insert(
            stage.to_string(),
            SourceStatistics {
                results: accepted,
                errors: 0,
                elapsed: stage_started.elapsed(),
            },
        );
    }

    fn remaining_time(&self, run_started: Instant) -> Option<Duration> {
        let remaining = self
            .config
            .max_enumeration_time
            .saturating_sub(run_started.elapsed());
        if remaining.is_zero() {
            None
        } else {
            Some(remaining)
        }
    }
}
