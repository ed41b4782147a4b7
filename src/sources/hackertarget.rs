// src/sources/hackertarget.rs
use crate::error::SubScoutError;
use crate::session::Session;
use crate::sources::{emit_error, emit_subdomain, Source, StatsCell};
use crate::types::SourceResult;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// HackerTarget host search. Plain-text response, one `host,ip` pair per
/// line; quota exhaustion comes back as an error line in the body.
#[derive(Debug, Default)]
pub struct HackerTargetSource {
    stats: StatsCell,
}

impl HackerTargetSource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn parse_hosts(body: &str) -> Result<Vec<String>, String> {
    if body.contains("API count exceeded") || body.starts_with("error") {
        return Err(body.lines().next().unwrap_or("API error").to_string());
    }

    Ok(body
        .lines()
        .filter_map(|line| line.split(',').next())
        .map(str::trim)
        .filter(|host| !host.is_empty())
        .map(str::to_string)
        .collect())
}

#[async_trait]
impl Source for HackerTargetSource {
    fn name(&self) -> &'static str {
        "hackertarget"
    }

    fn has_recursive_support(&self) -> bool {
        true
    }

    fn stats(&self) -> &StatsCell {
        &self.stats
    }

    async fn run(&self, domain: &str, session: Arc<Session>, tx: mpsc::Sender<SourceResult>) {
        let url = format!("https://api.hackertarget.com/hostsearch/?q={}", domain);

        let response = match session.simple_get(&url, self.name()).await {
            Ok(r) => r,
            Err(e) => return emit_error(&tx, &self.stats, self.name(), e).await,
        };

        let text = match response.text().await {
            Ok(t) => t,
            Err(e) => return emit_error(&tx, &self.stats, self.name(), e.into()).await,
        };

        match parse_hosts(&text) {
            Ok(hosts) => {
                for host in hosts {
                    if !emit_subdomain(&tx, &self.stats, self.name(), host).await {
                        return;
                    }
                }
            }
            Err(message) => {
                let error = SubScoutError::Source {
                    source_name: self.name().to_string(),
                    message,
                };
                emit_error(&tx, &self.stats, self.name(), error).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hosts() {
        let body = "www.example.com,93.184.216.34\nmail.example.com,93.184.216.35\n";
        assert_eq!(
            parse_hosts(body).unwrap(),
            vec!["www.example.com", "mail.example.com"]
        );
    }

    #[test]
    fn test_parse_quota_error() {
        assert!(parse_hosts("API count exceeded - Increase Quota").is_err());
        assert!(parse_hosts("error check your search parameter").is_err());
    }
}
