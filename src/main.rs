// src/main.rs
use anyhow::Result;
use clap::Parser;
use log::error;
use std::io::{self, BufRead};
use std::process;

mod agent;
mod aggregator;
mod brute;
mod cache;
mod cli;
mod config;
mod engine;
mod error;
mod output;
mod permute;
mod recursive;
mod resolve;
mod session;
mod sources;
mod types;
mod utils;
mod wordlist;

use cli::Args;
use engine::SubScoutEngine;

const BANNER: &str = r#"
   _____       __   _____                 __
  / ___/__  __/ /_ / ___/_________  __  __/ /_
  \__ \/ / / / __ \\__ \/ ___/ __ \/ / / / __/
 ___/ / /_/ / /_/ /__/ / /__/ /_/ / /_/ / /_
/____/\__,_/_.___/____/\___/\____/\__,_/\__/

      Subdomain enumeration, passive and active
"#;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.silent {
        log::LevelFilter::Error
    } else if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    if !args.silent {
        eprintln!("{}", BANNER);
    }

    if args.list_sources {
        list_sources();
        return Ok(());
    }

    let domains = collect_domains(&args);
    if domains.is_empty() {
        error!("no input provided: use -d <domain>, -l <file>, or pipe domains to stdin");
        process::exit(1);
    }

    let config = match config::build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };

    let mut engine = match SubScoutEngine::new(config) {
        Ok(engine) => engine,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };

    match engine.run(domains).await {
        Ok(summary) => {
            if !args.silent {
                log::info!(
                    "enumeration completed: {} subdomains across {} domains in {:.2}s",
                    summary.total_hosts,
                    summary.domains,
                    summary.duration.as_secs_f64()
                );
            }
            Ok(())
        }
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    }
}

fn list_sources() {
    let mut default_sources = Vec::new();
    let mut keyed_sources = Vec::new();
    let mut extra_sources = Vec::new();

    for source in sources::all_sources() {
        let info = source.info();
        let marker = if info.needs_key { " *" } else { "" };
        let line = format!("{}{}", info.name, marker);

        if info.is_default {
            if info.needs_key {
                keyed_sources.push(line);
            } else {
                default_sources.push(line);
            }
        } else {
            extra_sources.push(line);
        }
    }

    println!("Default sources ({})", default_sources.len());
    for line in default_sources {
        println!("  {}", line);
    }

    println!("\nAPI sources ({})", keyed_sources.len());
    for line in keyed_sources {
        println!("  {}", line);
    }

    println!("\nAdditional sources ({})", extra_sources.len());
    for line in extra_sources {
        println!("  {}", line);
    }

    println!("\n* = requires API key");
    println!("\nConfigure API keys in ~/.config/subscout/provider-config.yaml");
}

fn collect_domains(args: &Args) -> Vec<String> {
    let mut domains = Vec::new();
    domains.extend(args.domain.iter().map(|d| d.trim().to_string()));

    if let Some(path) = &args.domains_file {
        match utils::read_lines(path) {
            Ok(lines) => {
                domains.extend(
                    lines
                        .iter()
                        .map(|line| line.trim().to_string())
                        .filter(|line| !line.is_empty()),
                );
            }
            Err(e) => {
                error!("failed to read domains from {}: {}", path.display(), e);
            }
        }
    }

    if args.use_stdin() {
        let stdin = io::stdin();
        for line in stdin.lock().lines().map_while(|l| l.ok()) {
            let domain = line.trim().to_string();
            if !domain.is_empty() {
                domains.push(domain);
            }
        }
    }

    domains
}
