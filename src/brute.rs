// src/brute.rs
use crate::resolve::ResolverPool;
use crate::types::ResolvedHost;
use futures::stream::{self, StreamExt};
use log::info;
use std::sync::Arc;
use tokio::sync::mpsc;

pub const SOURCE_NAME: &str = "brute";

/// Wordlist-driven candidate generation with DNS validation. Wildcard
/// answers are subtracted before a candidate is reported, so a wildcard
/// apex does not flood the results.
pub struct BruteForcer {
    pool: Arc<ResolverPool>,
    threads: usize,
}

impl BruteForcer {
    pub fn new(pool: Arc<ResolverPool>, threads: usize) -> Self {
        Self { pool, threads }
    }

    /// Resolves `word.domain` for every word, streaming the survivors. The
    /// output channel closes when the wordlist is exhausted or the receiver
    /// goes away.
    pub async fn enumerate(&self, domain: &str, words: &[String], tx: mpsc::Sender<ResolvedHost>) {
        info!(
            "brute forcing {} candidates against {}",
            words.len(),
            domain
        );

        let candidates: Vec<String> = words.iter().map(|word| format!("{}.{}", word, domain)).collect();

        validate_candidates(
            Arc::clone(&self.pool),
            domain,
            self.threads,
            SOURCE_NAME,
            candidates,
            tx,
        )
        .await;
    }
}

/// Shared validation path for the synthetic candidate stages (permutation
/// and recursive expansion): same resolver pool, same wildcard subtraction,
/// different source tag.
pub async fn validate_candidates(
    pool: Arc<ResolverPool>,
    domain: &str,
    threads: usize,
    source: &'static str,
    candidates: Vec<String>,
    tx: mpsc::Sender<ResolvedHost>,
) {
    pool.init_wildcards(domain).await;

    let pool = &pool;
    let mut validated = stream::iter(candidates.into_iter())
        .map(|candidate| validate_candidate(pool, candidate))
        .buffer_unordered(threads);

    while let Some(outcome) = validated.next().await {
        let Some((host, addresses)) = outcome else {
            continue;
        };
        let resolved = ResolvedHost {
            host,
            addresses,
            source: source.to_string(),
        };
        if tx.send(resolved).await.is_err() {
            return;
        }
    }
}

async fn validate_candidate(
    pool: &ResolverPool,
    candidate: String,
) -> Option<(String, Vec<std::net::IpAddr>)> {
    let addresses = pool.validate(&candidate).await?;
    Some((candidate, addresses))
}
