// src/sources/virustotal.rs
use crate::error::SubScoutError;
use crate::session::Session;
use crate::sources::{emit_error, emit_subdomain, ApiKeyRing, Source, StatsCell};
use crate::types::SourceResult;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Deserialize)]
struct VirusTotalResponse {
    #[serde(default)]
    data: Vec<VirusTotalObject>,
    #[serde(default)]
    links: VirusTotalLinks,
}

#[derive(Debug, Deserialize)]
struct VirusTotalObject {
    id: String,
}

#[derive(Debug, Deserialize, Default)]
struct VirusTotalLinks {
    #[serde(rename = "next")]
    next: Option<String>,
}

/// VirusTotal v3 domain relationships. Follows the `links.next` cursor; the
/// 4/m default budget paces each page.
#[derive(Debug, Default)]
pub struct VirusTotalSource {
    keys: ApiKeyRing,
    stats: StatsCell,
}

impl VirusTotalSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Source for VirusTotalSource {
    fn name(&self) -> &'static str {
        "virustotal"
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
        if self.keys.is_empty() {
            let error = SubScoutError::ApiKey(self.name().to_string());
            return emit_error(&tx, &self.stats, self.name(), error).await;
        }

        let mut url = format!(
            "https://www.virustotal.com/api/v3/domains/{}/subdomains?limit=1000",
            domain
        );

        loop {
            let api_key = match self.keys.next_key() {
                Some(key) => key,
                None => return,
            };

            let request = session.client.get(&url).header("x-apikey", api_key);
            let response = match session.send_with_retry(request, self.name()).await {
                Ok(r) => r,
                Err(e) => return emit_error(&tx, &self.stats, self.name(), e).await,
            };

            let parsed: VirusTotalResponse = match response.json().await {
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

            for object in parsed.data {
                if !emit_subdomain(&tx, &self.stats, self.name(), object.id).await {
                    return;
                }
            }

            match parsed.links.next {
                Some(next) if !next.is_empty() => url = next,
                _ => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_pagination_cursor() {
        let parsed: VirusTotalResponse = serde_json::from_str(
            r#"{"data": [{"id": "a.example.com"}],
                "links": {"next": "https://www.virustotal.com/api/v3/x?cursor=abc"}}"#,
        )
        .unwrap();
        assert_eq!(parsed.data[0].id, "a.example.com");
        assert!(parsed.links.next.is_some());

        let last: VirusTotalResponse =
            serde_json::from_str(r#"{"data": [], "links": {}}"#).unwrap();
        assert!(last.links.next.is_none());
    }
}
