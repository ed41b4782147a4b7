// src/sources/sitedossier.rs
use crate::session::Session;
use crate::sources::{emit_error, emit_subdomain, Source, StatsCell};
use crate::types::SourceResult;
use crate::utils;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

// Listings page 100 entries at a time; the tail is rarely worth the crawl.
const MAX_PAGES: usize = 10;
const PAGE_STEP: usize = 100;

/// Sitedossier parent-domain listing, paginated by entry offset.
#[derive(Debug, Default)]
pub struct SiteDossierSource {
    stats: StatsCell,
}

impl SiteDossierSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Source for SiteDossierSource {
    fn name(&self) -> &'static str {
        "sitedossier"
    }

    fn is_default(&self) -> bool {
        false
    }

    fn stats(&self) -> &StatsCell {
        &self.stats
    }

    async fn run(&self, domain: &str, session: Arc<Session>, tx: mpsc::Sender<SourceResult>) {
        let mut seen = HashSet::new();

        for page in 0..MAX_PAGES {
            let offset = page * PAGE_STEP + 1;
            let url = format!(
                "http://www.sitedossier.com/parentdomain/{}/{}",
                domain, offset
            );

            let body = match session.simple_get(&url, self.name()).await {
                Ok(response) => match response.text().await {
                    Ok(body) => body,
                    Err(e) => return emit_error(&tx, &self.stats, self.name(), e.into()).await,
                },
                Err(e) => return emit_error(&tx, &self.stats, self.name(), e).await,
            };

            let mut new_on_page = 0;
            for host in utils::extract_subdomains(&body, domain) {
                if seen.insert(host.clone()) {
                    new_on_page += 1;
                    if !emit_subdomain(&tx, &self.stats, self.name(), host).await {
                        return;
                    }
                }
            }

            // Short page or nothing new: the listing is exhausted.
            if new_on_page == 0 || !body.contains("Show next 100 items") {
                return;
            }
        }
    }
}
