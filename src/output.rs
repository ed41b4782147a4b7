// src/output.rs
use crate::config::{OutputConfig, OutputFormat};
use crate::error::{Result, SubScoutError};
use crate::types::{DomainReport, SourceStatistics};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

#[derive(Serialize)]
struct JsonHost<'a> {
    host: &'a str,
    input: &'a str,
    source: &'a str,
}

#[derive(Serialize)]
struct JsonHostIp<'a> {
    host: &'a str,
    input: &'a str,
    ip: String,
    source: &'a str,
}

#[derive(Serialize)]
struct JsonSourcedHost<'a> {
    host: &'a str,
    input: &'a str,
    sources: Vec<&'a str>,
}

/// Writes accepted hosts in one of three shapes: a plain list, JSON Lines
/// with first-source attribution (optionally per resolved address), or
/// source-tagged JSON Lines carrying every reporting source.
pub struct OutputManager {
    config: OutputConfig,
    file: Option<File>,
}

impl OutputManager {
    /// Opens the sink up front; an unwritable path is a hard error before
    /// any enumeration starts.
    pub fn new(config: OutputConfig) -> Result<Self> {
        let file = match &config.file {
            Some(path) => {
                if let Some(parent) = Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent).map_err(|e| {
                            SubScoutError::Output(format!(
                                "failed to create {}: {}",
                                parent.display(),
                                e
                            ))
                        })?;
                    }
                }
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|e| {
                        SubScoutError::Output(format!("failed to open {}: {}", path.display(), e))
                    })?;
                Some(file)
            }
            None => None,
        };

        Ok(Self { config, file })
    }

    pub fn write_report(&mut self, report: &DomainReport) -> Result<()> {
        let config = &self.config;
        match &mut self.file {
            Some(file) => {
                write_output(config, file, report)?;
                file.flush()
                    .map_err(|e| SubScoutError::Output(e.to_string()))
            }
            None => {
                let stdout = std::io::stdout();
                let mut handle = stdout.lock();
                write_output(config, &mut handle, report)
            }
        }
    }
}

fn write_output<W: Write>(
    config: &OutputConfig,
    writer: &mut W,
    report: &DomainReport,
) -> Result<()> {
    match config.format {
        OutputFormat::Plain => write_plain(config, writer, report),
        OutputFormat::Json => write_json(config, writer, report),
    }
}

fn write_plain<W: Write>(
    config: &OutputConfig,
    writer: &mut W,
    report: &DomainReport,
) -> Result<()> {
    for entry in &report.hosts {
        let line = if config.host_ip {
            match report.resolved.get(&entry.host) {
                Some(resolved) if !resolved.addresses.is_empty() => {
                    let ips: Vec<String> =
                        resolved.addresses.iter().map(|ip| ip.to_string()).collect();
                    format!("{},{}", entry.host, ips.join(","))
                }
                _ => entry.host.clone(),
            }
        } else {
            entry.host.clone()
        };
        writeln!(writer, "{}", line).map_err(|e| SubScoutError::Output(e.to_string()))?;
    }
    Ok(())
}

fn write_json<W: Write>(
    config: &OutputConfig,
    writer: &mut W,
    report: &DomainReport,
) -> Result<()> {
    for entry in &report.hosts {
        let line = if config.collect_sources {
            let sources = report
                .attribution
                .get(&entry.host)
                .map(|set| set.iter().map(String::as_str).collect())
                .unwrap_or_default();
            serde_json::to_string(&JsonSourcedHost {
                host: &entry.host,
                input: &report.domain,
                sources,
            })
        } else if config.host_ip {
            match report.resolved.get(&entry.host) {
                Some(resolved) if !resolved.addresses.is_empty() => {
                    for address in &resolved.addresses {
                        let line = serde_json::to_string(&JsonHostIp {
                            host: &entry.host,
                            input: &report.domain,
                            ip: address.to_string(),
                            source: &entry.source,
                        })
                        .map_err(|e| SubScoutError::Output(e.to_string()))?;
                        writeln!(writer, "{}", line)
                            .map_err(|e| SubScoutError::Output(e.to_string()))?;
                    }
                    continue;
                }
                _ => serde_json::to_string(&JsonHost {
                    host: &entry.host,
                    input: &report.domain,
                    source: &entry.source,
                }),
            }
        } else {
            serde_json::to_string(&JsonHost {
                host: &entry.host,
                input: &report.domain,
                source: &entry.source,
            })
        };

        let line = line.map_err(|e| SubScoutError::Output(e.to_string()))?;
        writeln!(writer, "{}", line).map_err(|e| SubScoutError::Output(e.to_string()))?;
    }
    Ok(())
}

/// Per-source table printed by `--stats` after reconciliation.
pub fn print_statistics(domain: &str, stats: &HashMap<String, SourceStatistics>) {
    let mut names: Vec<_> = stats.keys().collect();
    names.sort();

    let width = names.iter().map(|n| n.len()).max().unwrap_or(6).max(6);
    eprintln!("\nsource statistics for {}", domain);
    eprintln!("{:width$}  {:>8}  {:>7}  {:>9}", "source", "results", "errors", "elapsed");
    for name in names {
        let entry = &stats[name];
        eprintln!(
            "{:width$}  {:>8}  {:>7}  {:>8.2}s",
            name,
            entry.results,
            entry.errors,
            entry.elapsed.as_secs_f64()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HostEntry, ResolvedHost};
    use std::collections::BTreeSet;
    use std::time::Duration;

    fn report() -> DomainReport {
        let entry = |host: &str, source: &str| HostEntry {
            domain: "example.com".to_string(),
            host: host.to_string(),
            source: source.to_string(),
        };

        let mut attribution = HashMap::new();
        attribution.insert(
            "api.example.com".to_string(),
            BTreeSet::from(["crtsh".to_string(), "wayback".to_string()]),
        );
        attribution.insert(
            "www.example.com".to_string(),
            BTreeSet::from(["crtsh".to_string()]),
        );

        let mut resolved = HashMap::new();
        resolved.insert(
            "api.example.com".to_string(),
            ResolvedHost {
                host: "api.example.com".to_string(),
                addresses: vec!["9.9.9.9".parse().unwrap()],
                source: "crtsh".to_string(),
            },
        );

        DomainReport {
            domain: "example.com".to_string(),
            hosts: vec![
                entry("api.example.com", "crtsh"),
                entry("www.example.com", "crtsh"),
            ],
            attribution,
            resolved,
            stats: HashMap::new(),
            duration: Duration::from_secs(1),
        }
    }

    fn render(config: OutputConfig) -> String {
        let mut buffer = Vec::new();
        write_output(&config, &mut buffer, &report()).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_plain_output() {
        let rendered = render(OutputConfig::default());
        assert_eq!(rendered, "api.example.com\nwww.example.com\n");
    }

    #[test]
    fn test_plain_output_with_ips() {
        let config = OutputConfig {
            host_ip: true,
            ..OutputConfig::default()
        };
        let rendered = render(config);
        assert_eq!(rendered, "api.example.com,9.9.9.9\nwww.example.com\n");
    }

    #[test]
    fn test_json_output() {
        let config = OutputConfig {
            format: OutputFormat::Json,
            ..OutputConfig::default()
        };
        let rendered = render(config);
        let first: serde_json::Value =
            serde_json::from_str(rendered.lines().next().unwrap()).unwrap();
        assert_eq!(first["host"], "api.example.com");
        assert_eq!(first["input"], "example.com");
        assert_eq!(first["source"], "crtsh");
        assert!(first.get("ip").is_none());
    }

    #[test]
    fn test_json_output_with_ip() {
        let config = OutputConfig {
            format: OutputFormat::Json,
            host_ip: true,
            ..OutputConfig::default()
        };
        let rendered = render(config);
        let first: serde_json::Value =
            serde_json::from_str(rendered.lines().next().unwrap()).unwrap();
        assert_eq!(first["ip"], "9.9.9.9");
    }

    #[test]
    fn test_source_tagged_output() {
        let config = OutputConfig {
            format: OutputFormat::Json,
            collect_sources: true,
            ..OutputConfig::default()
        };
        let rendered = render(config);
        let first: serde_json::Value =
            serde_json::from_str(rendered.lines().next().unwrap()).unwrap();
        assert_eq!(
            first["sources"],
            serde_json::json!(["crtsh", "wayback"])
        );
    }

    #[test]
    fn test_unwritable_sink_is_output_error() {
        let config = OutputConfig {
            file: Some("/dev/null/definitely/not/writable".into()),
            ..OutputConfig::default()
        };
        assert!(matches!(
            OutputManager::new(config),
            Err(SubScoutError::Output(_))
        ));
    }
}
