// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 authwatch contributors

//! authwatch — failed-login statistics from the system auth log.
//!
//! This is the main entry point. It handles CLI argument parsing and
//! orchestrates the async runtime that spawns the subsystems:
//!
//! - **extract**: matches raw auth.log lines against failure patterns
//! - **allowlist**: derives known addresses from host session history
//! - **stats**: folds events into top-users / top-ips / hourly views
//! - **publish**: periodic recompute + fan-out to subscribers
//! - **api**: HTTP endpoints serving the same snapshots on demand
//!
//! The architecture is deliberately stateless: every trigger re-reads the
//! log and returns a fresh immutable snapshot, so the push and pull paths
//! can never disagree about anything but timing.

mod allowlist;
mod api;
mod config;
mod extract;
mod publish;
mod stats;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use config::Config;
use publish::{Broadcaster, Pipeline};

fn print_help() {
    eprintln!(
        r#"authwatch — failed-login statistics from the system auth log

USAGE:
    authwatch [COMMAND] [CONFIG]

COMMANDS:
    run [config.toml]    Start the API server and periodic publisher (default)
    once [config.toml]   Compute one snapshot, print it as JSON, and exit
    help                 Show this help message
    version              Show version info

EXAMPLES:
    authwatch                          Run with /etc/authwatch/config.toml (or defaults)
    authwatch run ./config.toml        Run with an explicit config
    authwatch once                     One-shot snapshot to stdout

CONFIG:
    Default config path: /etc/authwatch/config.toml
    Missing file = built-in defaults (log at /var/log/auth.log, API on 127.0.0.1:8791)
"#
    );
}

fn print_version() {
    eprintln!("authwatch v{}", env!("CARGO_PKG_VERSION"));
}

fn config_path_from(args: &[String]) -> PathBuf {
    args.iter()
        .find(|a| !a.starts_with("--"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/etc/authwatch/config.toml"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let subcommand = args.get(1).map(|s| s.as_str()).unwrap_or("run");
    let rest_args: Vec<String> = args.iter().skip(2).cloned().collect();

    match subcommand {
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        "version" | "--version" | "-V" => {
            print_version();
            Ok(())
        }
        "once" => {
            let config = Config::load_or_default(&config_path_from(&rest_args))?;
            let pipeline = Pipeline::new(&config);
            let snapshot = pipeline.snapshot();
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            Ok(())
        }
        "run" => run(&rest_args).await,
        _ => {
            // `authwatch /path/to/config.toml` shorthand
            let rest: Vec<String> = args.iter().skip(1).cloned().collect();
            run(&rest).await
        }
    }
}

async fn run(args: &[String]) -> Result<()> {
    let config = Config::load_or_default(&config_path_from(args))?;
    eprintln!("Watching {}", config.general.log_path);

    let pipeline = Arc::new(Pipeline::new(&config));
    let broadcaster = Arc::new(Broadcaster::new());

    if config.api.enabled {
        let pipeline = pipeline.clone();
        let bind = config.api.bind.clone();
        let port = config.api.port;
        tokio::spawn(async move {
            if let Err(e) = api::run_api_server(&bind, port, pipeline).await {
                eprintln!("API server error: {}", e);
            }
        });
    }

    {
        let pipeline = pipeline.clone();
        let broadcaster = broadcaster.clone();
        let interval = Duration::from_secs(config.publish.interval_secs.max(1));
        tokio::spawn(async move {
            publish::run_publisher(pipeline, broadcaster, interval).await;
        });
    }

    // The console is just another subscriber: one immediate snapshot on
    // connect, then one per broadcast cycle.
    let initial = Arc::new(pipeline.snapshot());
    let mut updates = broadcaster.subscribe(initial).await;
    while let Some(snapshot) = updates.recv().await {
        let total: u64 = snapshot.top_users.iter().map(|u| u.count).sum();
        eprintln!(
            "snapshot: {} top users, {} top ips, {} hour buckets ({} failures in top users)",
            snapshot.top_users.len(),
            snapshot.top_ips.len(),
            snapshot.hourly.len(),
            total
        );
    }

    Ok(())
}
