// src/sources/rapiddns.rs
use crate::session::Session;
use crate::sources::{emit_error, emit_subdomain, Source, StatsCell};
use crate::types::SourceResult;
use crate::utils;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// RapidDNS subdomain listing. No API, so hostnames are regex-extracted
/// straight out of the HTML table.
#[derive(Debug, Default)]
pub struct RapidDnsSource {
    stats: StatsCell,
}

impl RapidDnsSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Source for RapidDnsSource {
    fn name(&self) -> &'static str {
        "rapiddns"
    }

    fn stats(&self) -> &StatsCell {
        &self.stats
    }

    async fn run(&self, domain: &str, session: Arc<Session>, tx: mpsc::Sender<SourceResult>) {
        let url = format!("https://rapiddns.io/subdomain/{}?full=1", domain);

        let response = match session.simple_get(&url, self.name()).await {
            Ok(r) => r,
            Err(e) => return emit_error(&tx, &self.stats, self.name(), e).await,
        };

        let body = match response.text().await {
            Ok(t) => t,
            Err(e) => return emit_error(&tx, &self.stats, self.name(), e.into()).await,
        };

        for host in utils::extract_subdomains(&body, domain) {
            if !emit_subdomain(&tx, &self.stats, self.name(), host).await {
                return;
            }
        }
    }
}
