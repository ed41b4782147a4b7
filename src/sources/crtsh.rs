// src/sources/crtsh.rs
use crate::error::SubScoutError;
use crate::session::Session;
use crate::sources::{emit_error, emit_subdomain, Source, StatsCell};
use crate::types::SourceResult;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Deserialize)]
struct CrtShEntry {
    name_value: String,
}

/// Certificate-transparency search via crt.sh. `name_value` carries one or
/// more newline-separated SANs per certificate.
#[derive(Debug, Default)]
pub struct CrtShSource {
    stats: StatsCell,
}

impl CrtShSource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn parse_names(entries: Vec<CrtShEntry>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for entry in entries {
        for line in entry.name_value.lines() {
            let candidate = line.trim();
            if !candidate.is_empty() && seen.insert(candidate.to_string()) {
                names.push(candidate.to_string());
            }
        }
    }
    names
}

#[async_trait]
impl Source for CrtShSource {
    fn name(&self) -> &'static str {
        "crtsh"
    }

    fn has_recursive_support(&self) -> bool {
        true
    }

    fn stats(&self) -> &StatsCell {
        &self.stats
    }

    async fn run(&self, domain: &str, session: Arc<Session>, tx: mpsc::Sender<SourceResult>) {
        let url = format!("https://crt.sh/?q=%25.{}&output=json", domain);

        let response = match session.simple_get(&url, self.name()).await {
            Ok(r) => r,
            Err(e) => return emit_error(&tx, &self.stats, self.name(), e).await,
        };

        let text = match response.text().await {
            Ok(t) => t,
            Err(e) => return emit_error(&tx, &self.stats, self.name(), e.into()).await,
        };

        // crt.sh falls back to an HTML error page under load.
        let trimmed = text.trim_start();
        if trimmed.starts_with("<!DOCTYPE") || trimmed.starts_with("<html") {
            let error = SubScoutError::Source {
                source_name: self.name().to_string(),
                message: "received HTML response instead of JSON".to_string(),
            };
            return emit_error(&tx, &self.stats, self.name(), error).await;
        }

        if trimmed.is_empty() || trimmed == "[]" {
            return;
        }

        let entries: Vec<CrtShEntry> = match serde_json::from_str(&text) {
            Ok(entries) => entries,
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

        for name in parse_names(entries) {
            if !emit_subdomain(&tx, &self.stats, self.name(), name).await {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names_splits_and_dedupes() {
        let entries: Vec<CrtShEntry> = serde_json::from_str(
            r#"[
                {"name_value": "a.example.com\nb.example.com"},
                {"name_value": "*.example.com"},
                {"name_value": "a.example.com"}
            ]"#,
        )
        .unwrap();

        let names = parse_names(entries);
        assert_eq!(
            names,
            vec!["a.example.com", "b.example.com", "*.example.com"]
        );
    }
}
