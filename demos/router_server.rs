//! NDI router example
//!
//! Run with: cargo run --example router_server [CONFIG]
//!
//! Examples:
//!   cargo run --example router_server                          # reads config/channels.toml
//!   cargo run --example router_server /etc/ndi-router.toml     # custom config
//!
//! The NDI runtime is looked up at startup. Set NDI_RUNTIME_DIR_V6 (or _V5)
//! if it lives somewhere unusual.
//!
//! Every router event is printed as one JSON line on stdout, the same shape
//! a web client would receive. Type a command on stdin to drive the router:
//!
//!   route A HOST (Camera 1)
//!   clear A
//!   channels
//!   sources

use std::sync::Arc;

use ndi_router::{NdiRuntime, RouterConfig, RouterService};
use tokio::io::{AsyncBufReadExt, BufReader};

const DEFAULT_CONFIG: &str = "config/channels.toml";

fn print_usage() {
    eprintln!("Usage: router_server [CONFIG]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  CONFIG    Channel config file (default: {DEFAULT_CONFIG})");
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{line}"),
        Err(e) => eprintln!("Failed to encode output: {e}"),
    }
}

async fn handle_command(service: &RouterService, line: &str) {
    let line = line.trim();
    let (command, rest) = line.split_once(' ').unwrap_or((line, ""));

    match command {
        "route" => {
            let Some((id, source)) = rest.trim().split_once(' ') else {
                eprintln!("usage: route <channel> <source name>");
                return;
            };
            match service.route_channel(id, source.trim()).await {
                Ok(outcome) => print_json(&outcome),
                Err(e) => eprintln!("Error: {e}"),
            }
        }
        "clear" => match service.clear_channel(rest.trim()).await {
            Ok(outcome) => print_json(&outcome),
            Err(e) => eprintln!("Error: {e}"),
        },
        "channels" => print_json(&service.channels().await),
        "sources" => print_json(&service.sources().await),
        "health" => print_json(&service.health().await),
        "" => {}
        other => eprintln!("Unknown command: {other}"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ndi_router=info".parse()?)
                .add_directive("router_server=info".parse()?),
        )
        .init();

    let config_path = args.get(1).map(String::as_str).unwrap_or(DEFAULT_CONFIG);
    let config = RouterConfig::load(config_path)?;
    tracing::info!(
        path = config_path,
        channels = config.channels.len(),
        group = %config.group,
        "Loaded config"
    );

    let service = RouterService::start(config, NdiRuntime::shared()?).await?;

    // Observers get a full snapshot first, then incremental events.
    let mut events = service.subscribe();
    print_json(&service.channels_sync().await);
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => print_json(&event),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event printer lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let commands = Arc::clone(&service);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            handle_command(&commands, &line).await;
        }
    });

    service
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;

    Ok(())
}
