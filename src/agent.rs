// src/agent.rs
use crate::cache::Cache;
use crate::session::Session;
use crate::sources::Source;
use crate::types::{SourceResult, SourceResultKind, SourceStatistics};
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::timeout;

/// Drives the selected passive sources against one domain and fans their
/// streams into a single merged channel. The merged channel closes once
/// every source stream has closed; the run-wide deadline bounds each source
/// task, so a source that never finishes is cut off at the deadline.
pub struct PassiveAgent {
    sources: Vec<Arc<dyn Source>>,
    cache: Option<Arc<Cache>>,
}

impl PassiveAgent {
    pub fn new(sources: Vec<Arc<dyn Source>>, cache: Option<Arc<Cache>>) -> Self {
        Self { sources, cache }
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Starts one task per source and returns the merged result stream.
    pub fn enumerate(
        &self,
        domain: &str,
        session: Arc<Session>,
        max_enumeration_time: Duration,
    ) -> mpsc::Receiver<SourceResult> {
        let capacity = std::cmp::max(256, self.sources.len() * 4);
        let (tx, rx) = mpsc::channel(capacity);

        for source in &self.sources {
            let source = Arc::clone(source);
            let session = Arc::clone(&session);
            let tx = tx.clone();
            let domain = domain.to_string();
            let cache = self.cache.clone();

            tokio::spawn(async move {
                source.stats().reset();
                let started = Instant::now();

                let outcome = timeout(
                    max_enumeration_time,
                    run_source(&source, &domain, session, tx.clone(), cache),
                )
                .await;

                source.stats().set_elapsed(started.elapsed());
                if outcome.is_err() {
                    source.stats().add_error();
                    warn!("[{}] deadline exceeded for {}", source.name(), domain);
                }

                // The task's sender is released only after the counters are
                // final, so the merged stream closing implies every source's
                // statistics are complete.
                drop(tx);
            });
        }

        rx
    }

    /// Snapshot of every source's counters; meaningful once the merged
    /// stream has closed.
    pub fn statistics(&self) -> HashMap<String, SourceStatistics> {
        self.sources
            .iter()
            .map(|s| (s.name().to_string(), s.statistics()))
            .collect()
    }
}

/// Runs one source, short-circuiting through the cache when enabled. Fresh
/// results are written back on completion.
async fn run_source(
    source: &Arc<dyn Source>,
    domain: &str,
    session: Arc<Session>,
    tx: mpsc::Sender<SourceResult>,
    cache: Option<Arc<Cache>>,
) {
    let Some(cache) = cache else {
        source.run(domain, session, tx).await;
        return;
    };

    if let Some(hits) = cache.get(domain, source.name()) {
        debug!(
            "[{}] {} cached results for {}",
            source.name(),
            hits.len(),
            domain
        );
        for value in hits {
            source.stats().add_result();
            if tx
                .send(SourceResult::subdomain(source.name(), value))
                .await
                .is_err()
            {
                return;
            }
        }
        return;
    }

    // Tee the source's stream so fresh results can be written back.
    let (inner_tx, mut inner_rx) = mpsc::channel::<SourceResult>(64);
    let forward = async {
        let mut collected = Vec::new();
        while let Some(result) = inner_rx.recv().await {
            if let SourceResultKind::Subdomain(value) = &result.kind {
                collected.push(value.clone());
            }
            if tx.send(result).await.is_err() {
                break;
            }
        }
        collected
    };

    let ((), collected) = tokio::join!(source.run(domain, session, inner_tx), forward);

    if let Err(e) = cache.set(domain, source.name(), &collected) {
        warn!("[{}] failed to write cache: {}", source.name(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::SubScoutError;
    use crate::sources::{emit_error, emit_subdomain, StatsCell};
    use async_trait::async_trait;

    struct StubSource {
        name: &'static str,
        values: Vec<&'static str>,
        delay: Duration,
        stats: StatsCell,
    }

    impl StubSource {
        fn new(name: &'static str, values: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                name,
                values,
                delay: Duration::ZERO,
                stats: StatsCell::default(),
            })
        }

        fn slow(name: &'static str, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                name,
                values: vec!["late.example.com"],
                delay,
                stats: StatsCell::default(),
            })
        }
    }

    #[async_trait]
    impl Source for StubSource {
        fn name(&self) -> &'static str {
            self.name
        }

        fn stats(&self) -> &StatsCell {
            &self.stats
        }

        async fn run(
            &self,
            _domain: &str,
            _session: Arc<Session>,
            tx: mpsc::Sender<SourceResult>,
        ) {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            for value in &self.values {
                if !emit_subdomain(&tx, &self.stats, self.name, value.to_string()).await {
                    return;
                }
            }
        }
    }

    struct FailingSource {
        stats: StatsCell,
    }

    #[async_trait]
    impl Source for FailingSource {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn stats(&self) -> &StatsCell {
            &self.stats
        }

        async fn run(
            &self,
            _domain: &str,
            _session: Arc<Session>,
            tx: mpsc::Sender<SourceResult>,
        ) {
            emit_error(
                &tx,
                &self.stats,
                "failing",
                SubScoutError::HttpStatus { status: 503 },
            )
            .await;
        }
    }

    fn session() -> Arc<Session> {
        Arc::new(Session::new(&Config::default()).unwrap())
    }

    async fn drain(mut rx: mpsc::Receiver<SourceResult>) -> Vec<SourceResult> {
        let mut all = Vec::new();
        while let Some(result) = rx.recv().await {
            all.push(result);
        }
        all
    }

    #[tokio::test]
    async fn test_merged_stream_closes_after_all_sources() {
        let agent = PassiveAgent::new(
            vec![
                StubSource::new("s1", vec!["api.example.com"]),
                StubSource::new("s2", vec!["api.example.com", "www.example.com"]),
            ],
            None,
        );

        let rx = agent.enumerate("example.com", session(), Duration::from_secs(5));
        let results = drain(rx).await;
        assert_eq!(results.len(), 3);

        let stats = agent.statistics();
        assert_eq!(stats["s1"].results, 1);
        assert_eq!(stats["s2"].results, 2);
    }

    #[tokio::test]
    async fn test_errors_flow_through_merged_stream() {
        let agent = PassiveAgent::new(
            vec![Arc::new(FailingSource {
                stats: StatsCell::default(),
            })],
            None,
        );

        let rx = agent.enumerate("example.com", session(), Duration::from_secs(5));
        let results = drain(rx).await;
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0].kind, SourceResultKind::Error(_)));
        assert_eq!(agent.statistics()["failing"].errors, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_cuts_off_slow_source() {
        let agent = PassiveAgent::new(
            vec![
                StubSource::new("fast", vec!["a.example.com"]),
                StubSource::slow("slow", Duration::from_secs(600)),
            ],
            None,
        );

        let rx = agent.enumerate("example.com", session(), Duration::from_millis(100));
        let results = drain(rx).await;

        // Only the fast source's result arrives; the slow one was dropped at
        // the deadline and recorded as an error with zero results.
        assert_eq!(results.len(), 1);
        let stats = agent.statistics();
        assert_eq!(stats["fast"].results, 1);
        assert_eq!(stats["slow"].results, 0);
        assert_eq!(stats["slow"].errors, 1);
    }

    #[tokio::test]
    async fn test_cache_round_trip_through_agent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(
            Cache::new(dir.path().to_path_buf(), Duration::from_secs(3600)).unwrap(),
        );

        let agent = PassiveAgent::new(
            vec![StubSource::new("s1", vec!["api.example.com"])],
            Some(Arc::clone(&cache)),
        );
        let rx = agent.enumerate("example.com", session(), Duration::from_secs(5));
        assert_eq!(drain(rx).await.len(), 1);

        // Second run is served from the cache: an empty stub would emit
        // nothing, yet the cached value still arrives.
        let agent = PassiveAgent::new(
            vec![StubSource::new("s1", vec![])],
            Some(Arc::clone(&cache)),
        );
        let rx = agent.enumerate("example.com", session(), Duration::from_secs(5));
        let results = drain(rx).await;
        assert_eq!(results.len(), 1);
        match &results[0].kind {
            SourceResultKind::Subdomain(value) => assert_eq!(value, "api.example.com"),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
