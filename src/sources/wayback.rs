// src/sources/wayback.rs
use crate::error::SubScoutError;
use crate::session::Session;
use crate::sources::{emit_error, emit_subdomain, Source, StatsCell};
use crate::types::SourceResult;
use crate::utils;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Wayback Machine CDX index. Hostnames are scraped out of archived URLs;
/// the extraction regex needs at least one label before the apex, so the
/// bare apex itself never surfaces from this source.
#[derive(Debug, Default)]
pub struct WaybackSource {
    stats: StatsCell,
}

impl WaybackSource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn parse_rows(rows: Vec<Vec<String>>, domain: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut found = Vec::new();

    // First row is the CDX field header.
    for row in rows.into_iter().skip(1) {
        let Some(url) = row.first() else { continue };
        for host in utils::extract_subdomains(url, domain) {
            if seen.insert(host.clone()) {
                found.push(host);
            }
        }
    }

    found
}

#[async_trait]
impl Source for WaybackSource {
    fn name(&self) -> &'static str {
        "wayback"
    }

    fn stats(&self) -> &StatsCell {
        &self.stats
    }

    async fn run(&self, domain: &str, session: Arc<Session>, tx: mpsc::Sender<SourceResult>) {
        let url = format!(
            "https://web.archive.org/cdx/search/cdx?url=*.{}/*&output=json&collapse=urlkey&fl=original",
            domain
        );

        let response = match session.simple_get(&url, self.name()).await {
            Ok(r) => r,
            Err(e) => return emit_error(&tx, &self.stats, self.name(), e).await,
        };

        let rows: Vec<Vec<String>> = match response.json().await {
            Ok(rows) => rows,
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

        for host in parse_rows(rows, domain) {
            if !emit_subdomain(&tx, &self.stats, self.name(), host).await {
                return;
            }
        }
    }
}
