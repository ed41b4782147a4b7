// src/cli.rs
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "subscout",
    version,
    about = "Fast subdomain enumeration combining passive sources with active DNS techniques",
    long_about = "SubScout discovers subdomains of a target apex by querying passive \
intelligence sources concurrently, then optionally expanding the result set with \
wordlist brute force, permutations and recursive enumeration, with DNS-based \
wildcard filtering."
)]
pub struct Args {
    /// Target domains to enumerate
    #[arg(short = 'd', long = "domain", value_name = "DOMAIN", value_delimiter = ',')]
    pub domain: Vec<String>,

    /// File containing a list of target domains
    #[arg(short = 'l', long = "list", value_name = "FILE")]
    pub domains_file: Option<PathBuf>,

    /// Write results to file instead of stdout
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_file: Option<PathBuf>,

    /// JSON Lines output
    #[arg(long = "json")]
    pub json: bool,

    /// Include all sources that reported each host (JSON output)
    #[arg(long = "collect-sources")]
    pub collect_sources: bool,

    /// Include resolved IP addresses in the output
    #[arg(long = "ip")]
    pub host_ip: bool,

    /// Sources to use (comma separated)
    #[arg(short = 's', long = "sources", value_delimiter = ',')]
    pub sources: Vec<String>,

    /// Sources to exclude (comma separated)
    #[arg(long = "exclude-sources", value_delimiter = ',')]
    pub exclude_sources: Vec<String>,

    /// Use all available sources
    #[arg(long = "all")]
    pub use_all_sources: bool,

    /// Keep only sources that tolerate deeper-level domains
    #[arg(long = "recursive-only")]
    pub recursive_only: bool,

    /// List available sources and exit
    #[arg(long = "list-sources")]
    pub list_sources: bool,

    /// Regex patterns a host must match to be kept
    #[arg(short = 'm', long = "match", value_delimiter = ',')]
    pub match_patterns: Vec<String>,

    /// Regex patterns that drop a host when matched
    #[arg(short = 'f', long = "filter", value_delimiter = ',')]
    pub filter_patterns: Vec<String>,

    /// Global rate limit in requests per second
    #[arg(long = "rate-limit", value_name = "N")]
    pub rate_limit: Option<u32>,

    /// Per-source rate limits, e.g. shodan=1/s,github=83/m
    #[arg(long = "rate-limits", value_delimiter = ',')]
    pub rate_limits: Vec<String>,

    /// HTTP request timeout in seconds
    #[arg(short = 't', long = "timeout", default_value = "30")]
    pub timeout: u64,

    /// Maximum time in minutes to spend enumerating one domain
    #[arg(long = "max-time", default_value = "10")]
    pub max_enumeration_time: u64,

    /// HTTP proxy URL
    #[arg(long = "proxy")]
    pub proxy: Option<String>,

    /// Custom recursive resolvers (host:port)
    #[arg(short = 'r', long = "resolvers", value_delimiter = ',')]
    pub resolvers: Vec<String>,

    /// Resolve accepted hosts and drop wildcard-induced results
    #[arg(long = "remove-wildcard")]
    pub remove_wildcard: bool,

    /// Enable wordlist brute force
    #[arg(long = "brute")]
    pub brute_force: bool,

    /// Enable permutation expansion of discovered names
    #[arg(long = "permutations")]
    pub permutations: bool,

    /// Enable recursive expansion of discovered names
    #[arg(long = "recursive")]
    pub recursive: bool,

    /// Wordlist file for brute force
    #[arg(short = 'w', long = "wordlist", value_name = "FILE")]
    pub wordlist: Option<PathBuf>,

    /// Directory of wordlist files (*.txt, *.list, *.wordlist)
    #[arg(long = "wordlist-dir", value_name = "DIR")]
    pub wordlist_dir: Option<PathBuf>,

    /// URLs to download wordlists from
    #[arg(long = "wordlist-url")]
    pub wordlist_urls: Vec<String>,

    /// Concurrent workers for active DNS stages
    #[arg(long = "active-threads", default_value = "50")]
    pub active_threads: usize,

    /// Maximum recursion depth for recursive expansion
    #[arg(long = "max-depth", default_value = "1")]
    pub max_depth: usize,

    /// Enable the on-disk result cache
    #[arg(long = "cache")]
    pub cache: bool,

    /// Cache directory (defaults to ~/.cache/subscout)
    #[arg(long = "cache-dir", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Cache entry TTL in hours
    #[arg(long = "cache-ttl", default_value = "24")]
    pub cache_ttl: u64,

    /// Provider credential file (YAML)
    #[arg(long = "provider-config", value_name = "FILE")]
    pub provider_config: Option<PathBuf>,

    /// Print per-source statistics after each domain
    #[arg(long = "stats")]
    pub stats: bool,

    /// Verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Print discovered hostnames only
    #[arg(long = "silent")]
    pub silent: bool,
}

impl Args {
    pub fn use_stdin(&self) -> bool {
        self.domain.is_empty() && self.domains_file.is_none() && !atty::is(atty::Stream::Stdin)
    }
}
