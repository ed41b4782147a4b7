// src/sources/github.rs
use crate::error::SubScoutError;
use crate::session::Session;
use crate::sources::{emit_error, emit_subdomain, ApiKeyRing, Source, StatsCell};
use crate::types::SourceResult;
use crate::utils;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

const RAW_FETCH_LIMIT: usize = 30;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    html_url: String,
    text_matches: Option<Vec<TextMatch>>,
}

#[derive(Debug, Deserialize)]
struct TextMatch {
    fragment: String,
}

/// GitHub code search. Hostnames are regex-extracted from text-match
/// fragments, then from a bounded number of raw file bodies. Slow and
/// token-hungry, so not part of the default set.
#[derive(Debug, Default)]
pub struct GitHubSource {
    keys: ApiKeyRing,
    stats: StatsCell,
}

impl GitHubSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Source for GitHubSource {
    fn name(&self) -> &'static str {
        "github"
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
        let Some(token) = self.keys.next_key() else {
            let error = SubScoutError::ApiKey(self.name().to_string());
            return emit_error(&tx, &self.stats, self.name(), error).await;
        };

        let url = format!(
            "https://api.github.com/search/code?q={}&sort=indexed&order=desc&per_page=100",
            urlencoding::encode(domain)
        );
        let request = session
            .client
            .get(&url)
            .header("Authorization", format!("token {}", token))
            .header("Accept", "application/vnd.github.v3.text-match+json");

        let response = match session.send_with_retry(request, self.name()).await {
            Ok(r) => r,
            Err(e) => return emit_error(&tx, &self.stats, self.name(), e).await,
        };

        let parsed: SearchResponse = match response.json().await {
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
        let mut raw_fetches = 0;

        for item in parsed.items {
            for text_match in item.text_matches.unwrap_or_default() {
                for host in utils::extract_subdomains(&text_match.fragment, domain) {
                    if seen.insert(host.clone())
                        && !emit_subdomain(&tx, &self.stats, self.name(), host).await
                    {
                        return;
                    }
                }
            }

            // Fragments are short; the raw file often carries more names.
            if item.html_url.contains("/blob/") && raw_fetches < RAW_FETCH_LIMIT {
                raw_fetches += 1;
                let raw_url = item
                    .html_url
                    .replace("github.com", "raw.githubusercontent.com")
                    .replace("/blob/", "/");

                let Ok(raw_response) = session.simple_get(&raw_url, self.name()).await else {
                    continue;
                };
                let Ok(body) = raw_response.text().await else {
                    continue;
                };

                for host in utils::extract_subdomains(&body, domain) {
                    if seen.insert(host.clone())
                        && !emit_subdomain(&tx, &self.stats, self.name(), host).await
                    {
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_response_decodes_text_matches() {
        let parsed: SearchResponse = serde_json::from_str(
            r#"{"items": [{
                "html_url": "https://github.com/x/y/blob/main/conf.yml",
                "text_matches": [{"fragment": "host: api.example.com"}]
            }]}"#,
        )
        .unwrap();

        let fragment = &parsed.items[0].text_matches.as_ref().unwrap()[0].fragment;
        assert_eq!(
            utils::extract_subdomains(fragment, "example.com"),
            vec!["api.example.com"]
        );
    }
}
