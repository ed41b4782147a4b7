// src/config.rs
use crate::cli::Args;
use crate::error::{Result, SubScoutError};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Everything the engine needs for a run. Immutable once built.
#[derive(Debug, Clone)]
pub struct Config {
    pub timeout: Duration,
    pub max_enumeration_time: Duration,
    pub proxy: Option<String>,
    pub rate_limit: Option<u32>,
    pub rate_limits: HashMap<String, RateLimit>,
    pub api_keys: HashMap<String, Vec<String>>,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    pub resolver: ResolverConfig,
    pub selection: SourceSelection,
    pub remove_wildcard: bool,
    pub active: ActiveConfig,
    pub cache: Option<CacheConfig>,
    pub match_patterns: Vec<String>,
    pub filter_patterns: Vec<String>,
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_enumeration_time: Duration::from_secs(600),
            proxy: None,
            rate_limit: None,
            rate_limits: default_rate_limits(),
            api_keys: HashMap::new(),
            retry_attempts: 3,
            retry_delay_ms: 500,
            resolver: ResolverConfig::default(),
            selection: SourceSelection::default(),
            remove_wildcard: false,
            active: ActiveConfig::default(),
            cache: None,
            match_patterns: Vec::new(),
            filter_patterns: Vec::new(),
            output: OutputConfig::default(),
        }
    }
}

/// A per-source request budget: `requests` tokens every `per`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimit {
    pub requests: u32,
    pub per: Duration,
}

impl RateLimit {
    pub fn per_second(requests: u32) -> Self {
        Self {
            requests,
            per: Duration::from_secs(1),
        }
    }

    pub fn per_minute(requests: u32) -> Self {
        Self {
            requests,
            per: Duration::from_secs(60),
        }
    }

    /// Parses a `<name>=<n>/<unit>` specification, unit one of s/m/h.
    pub fn parse_spec(spec: &str) -> Result<(String, RateLimit)> {
        let (name, rest) = spec
            .split_once('=')
            .ok_or_else(|| SubScoutError::Config(format!("invalid rate limit '{}'", spec)))?;
        let (count, unit) = rest
            .split_once('/')
            .ok_or_else(|| SubScoutError::Config(format!("invalid rate limit '{}'", spec)))?;

        let requests: u32 = count
            .parse()
            .map_err(|_| SubScoutError::Config(format!("invalid rate limit count '{}'", count)))?;
        if requests == 0 {
            return Err(SubScoutError::Config(format!(
                "rate limit for {} must be greater than 0",
                name
            )));
        }

        let per = match unit {
            "s" => Duration::from_secs(1),
            "m" => Duration::from_secs(60),
            "h" => Duration::from_secs(3600),
            other => {
                return Err(SubScoutError::Config(format!(
                    "unknown rate limit unit '{}'",
                    other
                )))
            }
        };

        Ok((
            name.trim().to_ascii_lowercase(),
            RateLimit { requests, per },
        ))
    }
}

/// Built-in budgets for providers known to throttle aggressively. Entries
/// for unknown source names are accepted but unused.
pub fn default_rate_limits() -> HashMap<String, RateLimit> {
    let mut limits = HashMap::new();
    limits.insert("github".to_string(), RateLimit::per_minute(83));
    limits.insert("securitytrails".to_string(), RateLimit::per_second(1));
    limits.insert("shodan".to_string(), RateLimit::per_second(1));
    limits.insert("virustotal".to_string(), RateLimit::per_minute(4));
    limits.insert("wayback".to_string(), RateLimit::per_minute(15));
    limits.insert("hackertarget".to_string(), RateLimit::per_second(2));
    limits.insert("chaos".to_string(), RateLimit::per_second(60));
    limits.insert("netlas".to_string(), RateLimit::per_second(1));
    limits
}

/// Which sources participate in a run.
#[derive(Debug, Clone, Default)]
pub struct SourceSelection {
    pub sources: Vec<String>,
    pub exclude: Vec<String>,
    pub use_all: bool,
    pub recursive_only: bool,
}

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub nameservers: Vec<String>,
    pub threads: usize,
    pub timeout: Duration,
    pub use_system_resolver: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            nameservers: vec![
                "8.8.8.8:53".to_string(),
                "8.8.4.4:53".to_string(),
                "1.1.1.1:53".to_string(),
                "1.0.0.1:53".to_string(),
            ],
            threads: 50,
            timeout: Duration::from_secs(5),
            use_system_resolver: false,
        }
    }
}

/// Toggles and tuning for the active stages.
#[derive(Debug, Clone)]
pub struct ActiveConfig {
    pub brute_force: bool,
    pub permutations: bool,
    pub recursive: bool,
    pub wordlist: Option<PathBuf>,
    pub wordlist_dir: Option<PathBuf>,
    pub wordlist_urls: Vec<String>,
    pub threads: usize,
    pub max_depth: usize,
}

impl Default for ActiveConfig {
    fn default() -> Self {
        Self {
            brute_force: false,
            permutations: false,
            recursive: false,
            wordlist: None,
            wordlist_dir: None,
            wordlist_urls: Vec::new(),
            threads: 50,
            max_depth: 1,
        }
    }
}

impl ActiveConfig {
    pub fn any_enabled(&self) -> bool {
        self.brute_force || self.permutations || self.recursive
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub dir: PathBuf,
    pub ttl: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub file: Option<PathBuf>,
    pub verbose: bool,
    pub silent: bool,
    pub collect_sources: bool,
    pub host_ip: bool,
    pub statistics: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Plain,
    Json,
}

/// Builds the engine configuration from parsed command-line flags, the
/// provider-config file and the environment.
pub fn build_config(args: &Args) -> Result<Config> {
    let mut config = Config {
        timeout: Duration::from_secs(args.timeout),
        max_enumeration_time: Duration::from_secs(args.max_enumeration_time * 60),
        proxy: args.proxy.clone(),
        rate_limit: args.rate_limit,
        remove_wildcard: args.remove_wildcard,
        match_patterns: args.match_patterns.clone(),
        filter_patterns: args.filter_patterns.clone(),
        ..Config::default()
    };

    for spec in &args.rate_limits {
        let (name, limit) = RateLimit::parse_spec(spec)?;
        config.rate_limits.insert(name, limit);
    }

    config.selection = SourceSelection {
        sources: lowercase_all(&args.sources),
        exclude: lowercase_all(&args.exclude_sources),
        use_all: args.use_all_sources,
        recursive_only: args.recursive_only,
    };

    if !args.resolvers.is_empty() {
        config.resolver.nameservers = args.resolvers.clone();
    }
    config.resolver.threads = args.active_threads;

    config.active = ActiveConfig {
        brute_force: args.brute_force,
        permutations: args.permutations,
        recursive: args.recursive,
        wordlist: args.wordlist.clone(),
        wordlist_dir: args.wordlist_dir.clone(),
        wordlist_urls: args.wordlist_urls.clone(),
        threads: args.active_threads,
        max_depth: args.max_depth,
    };

    if args.cache {
        let dir = args
            .cache_dir
            .clone()
            .or_else(default_cache_dir)
            .ok_or_else(|| SubScoutError::Config("cannot determine cache directory".to_string()))?;
        config.cache = Some(CacheConfig {
            dir,
            ttl: Duration::from_secs(args.cache_ttl * 3600),
        });
    }

    config.api_keys = load_provider_keys(args.provider_config.as_deref())?;

    config.output = OutputConfig {
        format: if args.json {
            OutputFormat::Json
        } else {
            OutputFormat::Plain
        },
        file: args.output_file.clone(),
        verbose: args.verbose,
        silent: args.silent,
        collect_sources: args.collect_sources,
        host_ip: args.host_ip,
        statistics: args.stats,
    };

    validate_config(&config)?;
    Ok(config)
}

fn lowercase_all(names: &[String]) -> Vec<String> {
    names.iter().map(|n| n.trim().to_ascii_lowercase()).collect()
}

/// Loads the provider-config YAML: top-level keys are source names, values
/// are lists of opaque credentials. A missing file is an empty table.
pub fn load_provider_keys(path: Option<&Path>) -> Result<HashMap<String, Vec<String>>> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match default_provider_config_path() {
            Some(p) => p,
            None => return Ok(HashMap::new()),
        },
    };

    if !path.exists() {
        return Ok(HashMap::new());
    }

    let contents = std::fs::read_to_string(&path).map_err(|e| {
        SubScoutError::Config(format!("failed to read {}: {}", path.display(), e))
    })?;

    let keys: HashMap<String, Vec<String>> = serde_yaml::from_str(&contents).map_err(|e| {
        SubScoutError::Config(format!("failed to parse {}: {}", path.display(), e))
    })?;

    Ok(keys
        .into_iter()
        .map(|(name, values)| (name.to_ascii_lowercase(), values))
        .collect())
}

/// Extends the key table from `<NAME>_API_KEY` environment variables for the
/// given source names. A `.env` file in the working directory is honoured.
pub fn extend_keys_from_env(keys: &mut HashMap<String, Vec<String>>, source_names: &[&str]) {
    if Path::new(".env").exists() {
        dotenv::dotenv().ok();
    }

    for name in source_names {
        let var = format!("{}_API_KEY", name.to_ascii_uppercase());
        if let Ok(value) = env::var(&var) {
            if !value.trim().is_empty() {
                keys.entry(name.to_string())
                    .or_default()
                    .push(value.trim().to_string());
            }
        }
    }
}

fn default_provider_config_path() -> Option<PathBuf> {
    let home = env::var_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("subscout")
            .join("provider-config.yaml"),
    )
}

fn default_cache_dir() -> Option<PathBuf> {
    let home = env::var_os("HOME")?;
    Some(PathBuf::from(home).join(".cache").join("subscout"))
}

fn validate_config(config: &Config) -> Result<()> {
    if config.timeout.as_secs() == 0 {
        return Err(SubScoutError::Config(
            "timeout must be greater than 0".to_string(),
        ));
    }

    if config.max_enumeration_time.as_secs() == 0 {
        return Err(SubScoutError::Config(
            "max enumeration time must be greater than 0".to_string(),
        ));
    }

    if config.resolver.threads == 0 || config.active.threads == 0 {
        return Err(SubScoutError::Config(
            "thread count must be greater than 0".to_string(),
        ));
    }

    if config.resolver.nameservers.is_empty() && !config.resolver.use_system_resolver {
        return Err(SubScoutError::Config(
            "no nameservers configured and system resolver is disabled".to_string(),
        ));
    }

    if let Some(limit) = config.rate_limit {
        if limit == 0 {
            return Err(SubScoutError::Config(
                "global rate limit must be greater than 0".to_string(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rate_limit_spec() {
        let (name, limit) = RateLimit::parse_spec("github=83/m").unwrap();
        assert_eq!(name, "github");
        assert_eq!(limit.requests, 83);
        assert_eq!(limit.per, Duration::from_secs(60));

        let (name, limit) = RateLimit::parse_spec("shodan=1/s").unwrap();
        assert_eq!(name, "shodan");
        assert_eq!(limit, RateLimit::per_second(1));

        let (_, limit) = RateLimit::parse_spec("slowapi=10/h").unwrap();
        assert_eq!(limit.per, Duration::from_secs(3600));
    }

    #[test]
    fn test_parse_rate_limit_spec_rejects_garbage() {
        assert!(RateLimit::parse_spec("github").is_err());
        assert!(RateLimit::parse_spec("github=83").is_err());
        assert!(RateLimit::parse_spec("github=0/m").is_err());
        assert!(RateLimit::parse_spec("github=x/m").is_err());
        assert!(RateLimit::parse_spec("github=83/fortnight").is_err());
    }

    #[test]
    fn test_default_rate_limits_cover_restricted_providers() {
        let limits = default_rate_limits();
        assert_eq!(limits["github"], RateLimit::per_minute(83));
        assert_eq!(limits["securitytrails"], RateLimit::per_second(1));
        assert_eq!(limits["virustotal"], RateLimit::per_minute(4));
        assert_eq!(limits["hackertarget"], RateLimit::per_second(2));
    }

    #[test]
    fn test_validate_config() {
        let mut config = Config::default();
        assert!(validate_config(&config).is_ok());

        config.timeout = Duration::from_secs(0);
        assert!(validate_config(&config).is_err());
        config.timeout = Duration::from_secs(30);

        config.resolver.threads = 0;
        assert!(validate_config(&config).is_err());
        config.resolver.threads = 50;

        config.rate_limit = Some(0);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_extend_keys_from_env() {
        let mut keys = HashMap::new();
        keys.insert("shodan".to_string(), vec!["from-file".to_string()]);

        env::set_var("SHODAN_API_KEY", "from-env");
        extend_keys_from_env(&mut keys, &["shodan", "virustotal"]);
        env::remove_var("SHODAN_API_KEY");

        assert_eq!(keys["shodan"], vec!["from-file", "from-env"]);
        assert!(!keys.contains_key("virustotal"));
    }

    #[test]
    fn test_missing_provider_config_is_empty() {
        let keys = load_provider_keys(Some(Path::new("/nonexistent/provider.yaml"))).unwrap();
        assert!(keys.is_empty());
    }
}
