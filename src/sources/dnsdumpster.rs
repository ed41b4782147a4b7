// src/sources/dnsdumpster.rs
use crate::error::SubScoutError;
use crate::session::Session;
use crate::sources::{emit_error, emit_subdomain, Source, StatsCell};
use crate::types::SourceResult;
use crate::utils;
use async_trait::async_trait;
use regex::Regex;
use std::sync::Arc;
use tokio::sync::mpsc;

const BASE_URL: &str = "https://dnsdumpster.com/";

/// DNSDumpster HTML form. Requires the CSRF token from the landing page
/// before the search form can be posted; results are scraped from the
/// response body.
#[derive(Debug, Default)]
pub struct DnsDumpsterSource {
    stats: StatsCell,
}

impl DnsDumpsterSource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn extract_csrf_token(body: &str) -> Option<String> {
    let re = Regex::new(r#"name="csrfmiddlewaretoken"\s+value="([^"]+)""#).ok()?;
    re.captures(body).map(|cap| cap[1].to_string())
}

#[async_trait]
impl Source for DnsDumpsterSource {
    fn name(&self) -> &'static str {
        "dnsdumpster"
    }

    fn stats(&self) -> &StatsCell {
        &self.stats
    }

    async fn run(&self, domain: &str, session: Arc<Session>, tx: mpsc::Sender<SourceResult>) {
        let landing = match session.simple_get(BASE_URL, self.name()).await {
            Ok(response) => match response.text().await {
                Ok(body) => body,
                Err(e) => return emit_error(&tx, &self.stats, self.name(), e.into()).await,
            },
            Err(e) => return emit_error(&tx, &self.stats, self.name(), e).await,
        };

        let Some(token) = extract_csrf_token(&landing) else {
            let error = SubScoutError::Source {
                source_name: self.name().to_string(),
                message: "could not extract CSRF token".to_string(),
            };
            return emit_error(&tx, &self.stats, self.name(), error).await;
        };

        let cookie = format!("csrftoken={}", token);
        let form = [
            ("csrfmiddlewaretoken", token.as_str()),
            ("targetip", domain),
            ("user", "free"),
        ];
        let headers = [("Referer", BASE_URL), ("Cookie", cookie.as_str())];

        let response = match session
            .post_form(BASE_URL, &form, &headers, self.name())
            .await
        {
            Ok(r) => r,
            Err(e) => return emit_error(&tx, &self.stats, self.name(), e).await,
        };

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return emit_error(&tx, &self.stats, self.name(), e.into()).await,
        };

        for host in utils::extract_subdomains(&body, domain) {
            if !emit_subdomain(&tx, &self.stats, self.name(), host).await {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_csrf_token() {
        let body = r#"<form><input type="hidden" name="csrfmiddlewaretoken" value="abc123DEF"></form>"#;
        assert_eq!(extract_csrf_token(body), Some("abc123DEF".to_string()));
        assert_eq!(extract_csrf_token("<form></form>"), None);
    }
}
