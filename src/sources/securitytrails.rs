// src/sources/securitytrails.rs
use crate::error::SubScoutError;
use crate::session::Session;
use crate::sources::{emit_error, emit_subdomain, ApiKeyRing, Source, StatsCell};
use crate::types::SourceResult;
use async_trait::async_trait;
use log::warn;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Deserialize)]
struct SecurityTrailsResponse {
    #[serde(default)]
    subdomains: Vec<String>,
    meta: Option<SecurityTrailsMeta>,
    subdomain_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SecurityTrailsMeta {
    limit_reached: Option<bool>,
}

/// SecurityTrails domain API. Subdomains come back as bare labels.
#[derive(Debug, Default)]
pub struct SecurityTrailsSource {
    keys: ApiKeyRing,
    stats: StatsCell,
}

impl SecurityTrailsSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Source for SecurityTrailsSource {
    fn name(&self) -> &'static str {
        "securitytrails"
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

        let url = format!(
            "https://api.securitytrails.com/v1/domain/{}/subdomains",
            domain
        );
        let request = session.client.get(&url).header("APIKEY", api_key);

        let response = match session.send_with_retry(request, self.name()).await {
            Ok(r) => r,
            Err(e) => return emit_error(&tx, &self.stats, self.name(), e).await,
        };

        let parsed: SecurityTrailsResponse = match response.json().await {
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

        if let Some(meta) = &parsed.meta {
            if meta.limit_reached == Some(true) {
                warn!(
                    "[{}] result limit reached, total subdomains: {:?}",
                    self.name(),
                    parsed.subdomain_count
                );
            }
        }

        for label in parsed.subdomains {
            let host = format!("{}.{}", label, domain);
            if !emit_subdomain(&tx, &self.stats, self.name(), host).await {
                return;
            }
        }
    }
}
