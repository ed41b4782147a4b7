// src/sources/c99.rs
use crate::error::SubScoutError;
use crate::session::Session;
use crate::sources::{emit_error, emit_subdomain, ApiKeyRing, Source, StatsCell};
use crate::types::SourceResult;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Deserialize)]
struct C99Response {
    #[serde(default)]
    subdomains: Vec<C99Subdomain>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct C99Subdomain {
    #[serde(default)]
    subdomain: String,
}

/// c99.nl subdomain finder.
#[derive(Debug, Default)]
pub struct C99Source {
    keys: ApiKeyRing,
    stats: StatsCell,
}

impl C99Source {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Source for C99Source {
    fn name(&self) -> &'static str {
        "c99"
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
            "https://api.c99.nl/subdomainfinder?key={}&domain={}&json",
            api_key, domain
        );

        let response = match session.simple_get(&url, self.name()).await {
            Ok(r) => r,
            Err(e) => return emit_error(&tx, &self.stats, self.name(), e).await,
        };

        let parsed: C99Response = match response.json().await {
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

        for entry in parsed.subdomains {
            if !entry.subdomain.is_empty()
                && !emit_subdomain(&tx, &self.stats, self.name(), entry.subdomain).await
            {
                return;
            }
        }
    }
}
