// src/sources/chaos.rs
use crate::error::SubScoutError;
use crate::session::Session;
use crate::sources::{emit_error, emit_subdomain, ApiKeyRing, Source, StatsCell};
use crate::types::SourceResult;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Deserialize)]
struct ChaosResponse {
    #[serde(default)]
    subdomains: Vec<String>,
}

/// ProjectDiscovery Chaos dataset.
#[derive(Debug, Default)]
pub struct ChaosSource {
    keys: ApiKeyRing,
    stats: StatsCell,
}

impl ChaosSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Source for ChaosSource {
    fn name(&self) -> &'static str {
        "chaos"
    }

    fn has_recursive_support(&self) -> bool {
        true
    }

    fn needs_key(&self) -> bool {
        true
    }

    fn add_api_keys(&self, keys: Vec<String>) {
        self.keys.add(keys);
    }

    fn stats(&self) -> &StatsCell {
        &self.stats
    }

    async fn run(&self, domain: &str, session: Arc<Session>, tx: mpsc::Sender<SourceResult>) {
        let Some(api_key) = self.keys.next_key() else {
            let error = SubScoutError::ApiKey(self.name().to_string());
            return emit_error(&tx, &self.stats, self.name(), error).await;
        };

        let url = format!("https://dns.projectdiscovery.io/dns/{}/subdomains", domain);
        let request = session.client.get(&url).header("Authorization", api_key);

        let response = match session.send_with_retry(request, self.name()).await {
            Ok(r) => r,
            Err(e) => return emit_error(&tx, &self.stats, self.name(), e).await,
        };

        let parsed: ChaosResponse = match response.json().await {
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

        for label in parsed.subdomains {
            let host = if label.ends_with(&format!(".{}", domain)) {
                label
            } else {
                format!("{}.{}", label, domain)
            };
            if !emit_subdomain(&tx, &self.stats, self.name(), host).await {
                return;
            }
        }
    }
}
