// src/session.rs
use crate::config::{Config, RateLimit};
use crate::error::{Result, SubScoutError};
use governor::{Quota, RateLimiter};
use rand::seq::SliceRandom;
use reqwest::Client;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

type DirectLimiter = governor::DefaultDirectRateLimiter;

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:122.0) Gecko/20100101 Firefox/122.0",
    "Mozilla/5.0 (X11; Linux x86_64; rv:122.0) Gecko/20100101 Firefox/122.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36 Edg/122.0.0.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_2_1) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
];

/// Per-domain network context shared by every source adapter: one pooled
/// HTTP client, the proxy, and the global/per-source rate budgets.
/// Immutable after construction.
pub struct Session {
    pub client: Client,
    rate_limiters: HashMap<String, Arc<DirectLimiter>>,
    global_limiter: Option<Arc<DirectLimiter>>,
    retry_attempts: u32,
    retry_delay_ms: u64,
}

impl Session {
    pub fn new(config: &Config) -> Result<Self> {
        let user_agent = Self::random_user_agent();

        let mut client_builder = Client::builder()
            .timeout(config.timeout)
            .user_agent(user_agent)
            .gzip(true)
            .deflate(true)
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10);

        if let Some(proxy_url) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| SubScoutError::Config(format!("invalid proxy URL: {}", e)))?;
            client_builder = client_builder.proxy(proxy);
        }

        let client = client_builder
            .build()
            .map_err(|e| SubScoutError::Config(format!("failed to build HTTP client: {}", e)))?;

        let mut rate_limiters = HashMap::new();
        for (source, limit) in &config.rate_limits {
            if let Some(quota) = Self::quota_for(limit) {
                rate_limiters.insert(source.clone(), Arc::new(RateLimiter::direct(quota)));
            }
        }

        let global_limiter = config
            .rate_limit
            .and_then(NonZeroU32::new)
            .map(|n| Arc::new(RateLimiter::direct(Quota::per_second(n))));

        Ok(Session {
            client,
            rate_limiters,
            global_limiter,
            retry_attempts: config.retry_attempts,
            retry_delay_ms: config.retry_delay_ms,
        })
    }

    fn quota_for(limit: &RateLimit) -> Option<Quota> {
        let period = limit.per / limit.requests;
        let quota = Quota::with_period(period)?;
        Some(quota.allow_burst(NonZeroU32::new(1).unwrap()))
    }

    fn random_user_agent() -> String {
        let mut rng = rand::thread_rng();
        USER_AGENTS
            .choose(&mut rng)
            .unwrap_or(&USER_AGENTS[0])
            .to_string()
    }

    /// Blocks until the source's token is available. Sources without a
    /// dedicated budget draw from the global one; with neither configured the
    /// call is free.
    pub async fn acquire_rate_token(&self, source: &str) {
        if let Some(limiter) = self.rate_limiters.get(source) {
            limiter.until_ready().await;
        } else if let Some(global) = &self.global_limiter {
            global.until_ready().await;
        }
    }

    pub async fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        source_name: &str,
    ) -> Result<reqwest::Response> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        self.send_with_retry(request, source_name).await
    }

    /// GET without extra headers; kept separate so adapters read naturally.
    pub async fn simple_get(&self, url: &str, source_name: &str) -> Result<reqwest::Response> {
        self.get(url, &[], source_name).await
    }

    pub async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
        headers: &[(&str, &str)],
        source_name: &str,
    ) -> Result<reqwest::Response> {
        let mut request = self.client.post(url).form(form);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        self.send_with_retry(request, source_name).await
    }

    /// Dispatches a prepared request with rate limiting and bounded retries.
    /// 429 and 5xx responses are retried with exponential backoff honouring
    /// `Retry-After`; any other non-2xx status is returned as a categorised
    /// `HttpStatus` error.
    pub async fn send_with_retry(
        &self,
        request_builder: reqwest::RequestBuilder,
        source_name: &str,
    ) -> Result<reqwest::Response> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            self.acquire_rate_token(source_name).await;

            let request = request_builder
                .try_clone()
                .ok_or_else(|| SubScoutError::Network("failed to clone request".to_string()))?;

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        if attempts >= self.retry_attempts {
                            return Err(SubScoutError::HttpStatus {
                                status: status.as_u16(),
                            });
                        }

                        let retry_after = response
                            .headers()
                            .get("Retry-After")
                            .and_then(|h| h.to_str().ok())
                            .and_then(|s| s.parse::<u64>().ok());

                        let delay = match retry_after {
                            Some(seconds) => Duration::from_secs(seconds),
                            None => {
                                let base = self.retry_delay_ms * 2u64.pow(attempts - 1);
                                let jitter = rand::random::<u64>() % (base / 4 + 1);
                                Duration::from_millis(base + jitter)
                            }
                        };

                        log::warn!(
                            "[{}] status {} - retrying in {:?} ({}/{})",
                            source_name,
                            status,
                            delay,
                            attempts,
                            self.retry_attempts
                        );
                        tokio::time::sleep(delay).await;
                    } else {
                        return Err(SubScoutError::HttpStatus {
                            status: status.as_u16(),
                        });
                    }
                }
                Err(e) => {
                    if attempts >= self.retry_attempts {
                        return Err(SubScoutError::Network(format!(
                            "request to {} failed after {} attempts: {}",
                            source_name, attempts, e
                        )));
                    }
                    log::warn!(
                        "[{}] network error: {} ({}/{})",
                        source_name,
                        e,
                        attempts,
                        self.retry_attempts
                    );
                    let delay = Duration::from_millis(self.retry_delay_ms * 2u64.pow(attempts - 1));
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_session_builds_from_default_config() {
        let session = Session::new(&Config::default()).unwrap();
        assert!(session.rate_limiters.contains_key("shodan"));
        assert!(session.rate_limiters.contains_key("github"));
        assert!(session.global_limiter.is_none());
    }

    #[test]
    fn test_global_limiter_configured() {
        let config = Config {
            rate_limit: Some(10),
            ..Config::default()
        };
        let session = Session::new(&config).unwrap();
        assert!(session.global_limiter.is_some());
    }

    #[test]
    fn test_invalid_proxy_is_config_error() {
        let config = Config {
            proxy: Some("::not a proxy::".to_string()),
            ..Config::default()
        };
        assert!(matches!(
            Session::new(&config),
            Err(SubScoutError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_source_token_is_free() {
        let session = Session::new(&Config::default()).unwrap();
        // Must not block: no per-source entry and no global limiter.
        session.acquire_rate_token("nosuchsource").await;
    }
}
