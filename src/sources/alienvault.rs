// src/sources/alienvault.rs
use crate::error::SubScoutError;
use crate::session::Session;
use crate::sources::{emit_error, emit_subdomain, Source, StatsCell};
use crate::types::SourceResult;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Deserialize)]
struct OtxResponse {
    #[serde(default)]
    passive_dns: Vec<OtxRecord>,
}

#[derive(Debug, Deserialize)]
struct OtxRecord {
    #[serde(default)]
    hostname: String,
}

/// AlienVault OTX passive DNS.
#[derive(Debug, Default)]
pub struct AlienVaultSource {
    stats: StatsCell,
}

impl AlienVaultSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Source for AlienVaultSource {
    fn name(&self) -> &'static str {
        "alienvault"
    }

    fn stats(&self) -> &StatsCell {
        &self.stats
    }

    async fn run(&self, domain: &str, session: Arc<Session>, tx: mpsc::Sender<SourceResult>) {
        let url = format!(
            "https://otx.alienvault.com/api/v1/indicators/domain/{}/passive_dns",
            domain
        );

        let response = match session.simple_get(&url, self.name()).await {
            Ok(r) => r,
            Err(e) => return emit_error(&tx, &self.stats, self.name(), e).await,
        };

        let parsed: OtxResponse = match response.json().await {
            Ok(parsed) => parsed,
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
        for record in parsed.passive_dns {
            if !record.hostname.is_empty() && seen.insert(record.hostname.clone()) {
                if !emit_subdomain(&tx, &self.stats, self.name(), record.hostname).await {
                    return;
                }
            }
        }
    }
}
