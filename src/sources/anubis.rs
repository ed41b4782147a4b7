// src/sources/anubis.rs
use crate::error::SubScoutError;
use crate::session::Session;
use crate::sources::{emit_error, emit_subdomain, Source, StatsCell};
use crate::types::SourceResult;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Anubis database (jldc.me). Response is a plain JSON array of hostnames.
#[derive(Debug, Default)]
pub struct AnubisSource {
    stats: StatsCell,
}

impl AnubisSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Source for AnubisSource {
    fn name(&self) -> &'static str {
        "anubis"
    }

    fn stats(&self) -> &StatsCell {
        &self.stats
    }

    async fn run(&self, domain: &str, session: Arc<Session>, tx: mpsc::Sender<SourceResult>) {
        let url = format!("https://jldc.me/anubis/subdomains/{}", domain);

        let response = match session.simple_get(&url, self.name()).await {
            Ok(r) => r,
            Err(e) => return emit_error(&tx, &self.stats, self.name(), e).await,
        };

        let hosts: Vec<String> = match response.json().await {
            Ok(hosts) => hosts,
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

        for host in hosts {
            if !emit_subdomain(&tx, &self.stats, self.name(), host).await {
                return;
            }
        }
    }
}
