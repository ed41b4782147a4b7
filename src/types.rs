// src/types.rs
use crate::error::SubScoutError;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::net::IpAddr;
use std::time::Duration;

/// One record on a source's result stream. Producers emit either a candidate
/// hostname or an error; the aggregator is the only consumer.
#[derive(Debug)]
pub struct SourceResult {
    pub source: String,
    pub kind: SourceResultKind,
}

#[derive(Debug)]
pub enum SourceResultKind {
    Subdomain(String),
    Error(SubScoutError),
}

impl SourceResult {
    pub fn subdomain(source: &str, value: String) -> Self {
        Self {
            source: source.to_string(),
            kind: SourceResultKind::Subdomain(value),
        }
    }

    pub fn error(source: &str, error: SubScoutError) -> Self {
        Self {
            source: source.to_string(),
            kind: SourceResultKind::Error(error),
        }
    }
}

/// An accepted hostname together with the first source that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostEntry {
    pub domain: String,
    pub host: String,
    pub source: String,
}

/// A hostname that survived DNS resolution (and, when enabled, the wildcard
/// filter).
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedHost {
    pub host: String,
    pub addresses: Vec<IpAddr>,
    pub source: String,
}

/// Per-source counters, snapshotted after the source's stream has closed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SourceStatistics {
    pub results: usize,
    pub errors: usize,
    pub elapsed: Duration,
}

/// Everything a single domain's enumeration produced.
#[derive(Debug)]
pub struct DomainReport {
    pub domain: String,
    pub hosts: Vec<HostEntry>,
    pub attribution: HashMap<String, BTreeSet<String>>,
    pub resolved: HashMap<String, ResolvedHost>,
    pub stats: HashMap<String, SourceStatistics>,
    pub duration: Duration,
}

impl DomainReport {
    pub fn host_names(&self) -> Vec<&str> {
        self.hosts.iter().map(|h| h.host.as_str()).collect()
    }
}

/// Static description of a source, used by `--list-sources`.
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub name: &'static str,
    pub is_default: bool,
    pub needs_key: bool,
    pub has_recursive_support: bool,
}
