// src/sources/commoncrawl.rs
use crate::error::SubScoutError;
use crate::session::Session;
use crate::sources::{emit_error, emit_subdomain, Source, StatsCell};
use crate::types::SourceResult;
use crate::utils;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

// Recent crawls carry almost all of the coverage; older indexes add little
// beyond latency.
const MAX_INDEXES: usize = 3;

#[derive(Debug, Deserialize)]
struct CrawlIndex {
    #[serde(rename = "cdx-api")]
    cdx_api: String,
}

/// Common Crawl URL index: resolves the current crawl list, then queries
/// the newest CDX endpoints for archived URLs under the apex.
#[derive(Debug, Default)]
pub struct CommonCrawlSource {
    stats: StatsCell,
}

impl CommonCrawlSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Source for CommonCrawlSource {
    fn name(&self) -> &'static str {
        "commoncrawl"
    }

    fn is_default(&self) -> bool {
        false
    }

    fn stats(&self) -> &StatsCell {
        &self.stats
    }

    async fn run(&self, domain: &str, session: Arc<Session>, tx: mpsc::Sender<SourceResult>) {
        let response = match session
            .simple_get("https://index.commoncrawl.org/collinfo.json", self.name())
            .await
        {
            Ok(r) => r,
            Err(e) => return emit_error(&tx, &self.stats, self.name(), e).await,
        };

        let indexes: Vec<CrawlIndex> = match response.json().await {
            Ok(indexes) => indexes,
            Err(e) => {
                return emit_error(
                    &tx,
                    &self.stats,
                    self.name(),
                    SubScoutError::JsonParse(e.to_string()),
                )
                .await
            }
        };

        let mut seen = HashSet::new();
        for index in indexes.iter().take(MAX_INDEXES) {
            let url = format!(
                "{}?url=*.{}&output=json&fl=url",
                index.cdx_api,
                urlencoding::encode(domain)
            );

            let body = match session.simple_get(&url, self.name()).await {
                Ok(response) => match response.text().await {
                    Ok(body) => body,
                    Err(e) => {
                        emit_error(&tx, &self.stats, self.name(), e.into()).await;
                        continue;
                    }
                },
                Err(e) => {
                    // One missing index is not fatal; try the next crawl.
                    emit_error(&tx, &self.stats, self.name(), e).await;
                    continue;
                }
            };

            for host in utils::extract_subdomains(&body, domain) {
                if seen.insert(host.clone())
                    && !emit_subdomain(&tx, &self.stats, self.name(), host).await
                {
                    return;
                }
            }
        }
    }
}
