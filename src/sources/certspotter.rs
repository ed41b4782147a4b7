// src/sources/certspotter.rs
use crate::error::SubScoutError;
use crate::session::Session;
use crate::sources::{emit_error, emit_subdomain, ApiKeyRing, Source, StatsCell};
use crate::types::SourceResult;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

const PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
struct Issuance {
    id: String,
    #[serde(default)]
    dns_names: Vec<String>,
}

/// Cert Spotter issuance log. Pages through issuances with the `after`
/// cursor until a short page arrives. Works anonymously; a token raises the
/// quota when present.
#[derive(Debug, Default)]
pub struct CertSpotterSource {
    keys: ApiKeyRing,
    stats: StatsCell,
}

impl CertSpotterSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Source for CertSpotterSource {
    fn name(&self) -> &'static str {
        "certspotter"
    }

    fn has_recursive_support(&self) -> bool {
        true
    }

    fn add_api_keys(&self, keys: Vec<String>) {
        self.keys.add(keys);
    }

    fn stats(&self) -> &StatsCell {
        &self.stats
    }

    async fn run(&self, domain: &str, session: Arc<Session>, tx: mpsc::Sender<SourceResult>) {
        let mut seen = HashSet::new();
        let mut after = String::new();

        loop {
            let mut url = format!(
                "https://api.certspotter.com/v1/issuances?domain={}&include_subdomains=true&expand=dns_names",
                domain
            );
            if !after.is_empty() {
                url.push_str(&format!("&after={}", after));
            }

            let mut request = session.client.get(&url);
            if let Some(token) = self.keys.next_key() {
                request = request.bearer_auth(token);
            }

            let response = match session.send_with_retry(request, self.name()).await {
                Ok(r) => r,
                Err(e) => return emit_error(&tx, &self.stats, self.name(), e).await,
            };

            let issuances: Vec<Issuance> = match response.json().await {
                Ok(issuances) => issuances,
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

            let page_len = issuances.len();
            for issuance in issuances {
                after = issuance.id;
                for name in issuance.dns_names {
                    if seen.insert(name.clone())
                        && !emit_subdomain(&tx, &self.stats, self.name(), name).await
                    {
                        return;
                    }
                }
            }

            if page_len < PAGE_SIZE {
                break;
            }
        }
    }
}
