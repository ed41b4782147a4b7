// src/sources/shodan.rs
use crate::error::SubScoutError;
use crate::session::Session;
use crate::sources::{emit_error, emit_subdomain, ApiKeyRing, Source, StatsCell};
use crate::types::SourceResult;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

const MAX_PAGES: u32 = 5;

#[derive(Debug, Deserialize)]
struct ShodanResponse {
    #[serde(default)]
    subdomains: Vec<String>,
    more: Option<bool>,
    error: Option<String>,
}

/// Shodan DNS database. Pages through the listing while `more` is set,
/// re-acquiring the rate token for every page.
#[derive(Debug, Default)]
pub struct ShodanSource {
    keys: ApiKeyRing,
    stats: StatsCell,
}

impl ShodanSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Source for ShodanSource {
    fn name(&self) -> &'static str {
        "shodan"
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
        if self.keys.is_empty() {
            let error = SubScoutError::ApiKey(self.name().to_string());
            return emit_error(&tx, &self.stats, self.name(), error).await;
        }

        let mut seen = HashSet::new();
        let mut page: u32 = 1;

        loop {
            let Some(api_key) = self.keys.next_key() else {
                return;
            };

            let url = format!("https://api.shodan.io/dns/domain/{}", domain);
            let page_number = page.to_string();
            let request = session
                .client
                .get(&url)
                .query(&[("key", api_key.as_str()), ("page", page_number.as_str())]);

            let response = match session.send_with_retry(request, self.name()).await {
                Ok(r) => r,
                Err(e) => return emit_error(&tx, &self.stats, self.name(), e).await,
            };

            let parsed: ShodanResponse = match response.json().await {
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

            if let Some(message) = parsed.error {
                let error = SubScoutError::Source {
                    source_name: self.name().to_string(),
                    message,
                };
                return emit_error(&tx, &self.stats, self.name(), error).await;
            }

            for label in parsed.subdomains {
                let host = format!("{}.{}", label, domain);
                if seen.insert(host.clone())
                    && !emit_subdomain(&tx, &self.stats, self.name(), host).await
                {
                    return;
                }
            }

            if parsed.more == Some(true) && page < MAX_PAGES {
                page += 1;
            } else {
                return;
            }
        }
    }
}
