// src/sources/digitorus.rs
use crate::session::Session;
use crate::sources::{emit_error, emit_subdomain, Source, StatsCell};
use crate::types::SourceResult;
use crate::utils;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Digitorus certificate details, scraped from the page body.
#[derive(Debug, Default)]
pub struct DigitorusSource {
    stats: StatsCell,
}

impl DigitorusSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Source for DigitorusSource {
    fn name(&self) -> &'static str {
        "digitorus"
    }

    fn has_recursive_support(&self) -> bool {
        true
    }

    fn stats(&self) -> &StatsCell {
        &self.stats
    }

    async fn run(&self, domain: &str, session: Arc<Session>, tx: mpsc::Sender<SourceResult>) {
        let url = format!("https://certificatedetails.com/{}", domain);

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
