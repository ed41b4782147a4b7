// src/sources/threatcrowd.rs
use crate::error::SubScoutError;
use crate::session::Session;
use crate::sources::{emit_error, emit_subdomain, Source, StatsCell};
use crate::types::SourceResult;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Deserialize)]
struct ThreatCrowdResponse {
    #[serde(default)]
    subdomains: Vec<String>,
}

/// ThreatCrowd domain report. The API is flaky these days, so the source is
/// not in the default set.
#[derive(Debug, Default)]
pub struct ThreatCrowdSource {
    stats: StatsCell,
}

impl ThreatCrowdSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Source for ThreatCrowdSource {
    fn name(&self) -> &'static str {
        "threatcrowd"
    }

    fn is_default(&self) -> bool {
        false
    }

    fn stats(&self) -> &StatsCell {
        &self.stats
    }

    async fn run(&self, domain: &str, session: Arc<Session>, tx: mpsc::Sender<SourceResult>) {
        let url = format!(
            "https://ci-www.threatcrowd.org/searchApi/v2/domain/report/?domain={}",
            domain
        );

        let response = match session.simple_get(&url, self.name()).await {
            Ok(r) => r,
            Err(e) => return emit_error(&tx, &self.stats, self.name(), e).await,
        };

        let parsed: ThreatCrowdResponse = match response.json().await {
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

        for host in parsed.subdomains {
            if !emit_subdomain(&tx, &self.stats, self.name(), host).await {
                return;
            }
        }
    }
}
