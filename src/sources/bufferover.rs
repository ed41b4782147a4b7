// src/sources/bufferover.rs
use crate::error::SubScoutError;
use crate::session::Session;
use crate::sources::{emit_error, emit_subdomain, ApiKeyRing, Source, StatsCell};
use crate::types::SourceResult;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Deserialize)]
struct BufferOverResponse {
    #[serde(rename = "Results", default)]
    results: Vec<String>,
}

/// BufferOver TLS dataset. Result rows are comma-separated with the
/// hostname in the last field.
#[derive(Debug, Default)]
pub struct BufferOverSource {
    keys: ApiKeyRing,
    stats: StatsCell,
}

impl BufferOverSource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn host_from_row(row: &str) -> Option<&str> {
    let host = row.rsplit(',').next()?.trim();
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

#[async_trait]
impl Source for BufferOverSource {
    fn name(&self) -> &'static str {
        "bufferover"
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

        let url = format!("https://tls.bufferover.run/dns?q=.{}", domain);
        let response = match session
            .get(&url, &[("x-api-key", api_key.as_str())], self.name())
            .await
        {
            Ok(r) => r,
            Err(e) => return emit_error(&tx, &self.stats, self.name(), e).await,
        };

        let parsed: BufferOverResponse = match response.json().await {
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
        for row in &parsed.results {
            if let Some(host) = host_from_row(row) {
                if seen.insert(host.to_string())
                    && !emit_subdomain(&tx, &self.stats, self.name(), host.to_string()).await
                {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_from_row() {
        assert_eq!(
            host_from_row("1.2.3.4,abc123,,mail.example.com"),
            Some("mail.example.com")
        );
        assert_eq!(host_from_row("www.example.com"), Some("www.example.com"));
        assert_eq!(host_from_row("1.2.3.4,"), None);
    }
}
