// src/sources/netlas.rs
use crate::error::SubScoutError;
use crate::session::Session;
use crate::sources::{emit_error, emit_subdomain, ApiKeyRing, Source, StatsCell};
use crate::types::SourceResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

const DOWNLOAD_CAP: i64 = 10000;

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: i64,
}

#[derive(Debug, Serialize)]
struct DownloadRequest {
    q: String,
    fields: Vec<String>,
    source_type: String,
    size: i64,
}

#[derive(Debug, Deserialize)]
struct DownloadItem {
    data: DownloadData,
}

#[derive(Debug, Deserialize)]
struct DownloadData {
    #[serde(default)]
    domain: String,
}

/// Netlas domain dataset: a count query sizes the follow-up bulk download.
#[derive(Debug, Default)]
pub struct NetlasSource {
    keys: ApiKeyRing,
    stats: StatsCell,
}

impl NetlasSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Source for NetlasSource {
    fn name(&self) -> &'static str {
        "netlas"
    }

    fn is_default(&self) -> bool {
        false
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

        let query = format!("domain:*.{} AND NOT domain:{}", domain, domain);
        let count_url = format!(
            "https://app.netlas.io/api/domains_count/?q={}",
            urlencoding::encode(&query)
        );
        let request = session
            .client
            .get(&count_url)
            .header("X-API-Key", api_key.as_str());

        let count = match session.send_with_retry(request, self.name()).await {
            Ok(response) => match response.json::<CountResponse>().await {
                Ok(parsed) => parsed.count.min(DOWNLOAD_CAP),
                Err(e) => {
                    return emit_error(
                        &tx,
                        &self.stats,
                        self.name(),
                        SubScoutError::JsonParse(e.to_string()),
                    )
                    .await
                }
            },
            Err(e) => return emit_error(&tx, &self.stats, self.name(), e).await,
        };

        if count == 0 {
            return;
        }

        let body = DownloadRequest {
            q: query,
            fields: vec!["domain".to_string()],
            source_type: "include".to_string(),
            size: count,
        };
        let request = session
            .client
            .post("https://app.netlas.io/api/domains/download/")
            .header("X-API-Key", api_key.as_str())
            .json(&body);

        let response = match session.send_with_retry(request, self.name()).await {
            Ok(r) => r,
            Err(e) => return emit_error(&tx, &self.stats, self.name(), e).await,
        };

        let items: Vec<DownloadItem> = match response.json().await {
            Ok(items) => items,
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

        for item in items {
            let host = item.data.domain.trim_end_matches('.').to_string();
            if !host.is_empty() && !emit_subdomain(&tx, &self.stats, self.name(), host).await {
                return;
            }
        }
    }
}
