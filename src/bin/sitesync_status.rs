//! SiteSync queue inspector
//!
//! Prints the device's pending write queue as JSON.
//!
//! ```text
//! sitesync-status [--config <file.toml>] [--drain]
//! ```
//!
//! `--drain` probes the server and, if it answers, runs one reconciliation
//! cycle before printing. Configuration comes from the optional TOML file and
//! the `SITESYNC_*` environment variables.

use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use sitesync::client::api_client::HttpSiteApi;
use sitesync::client::config::Config;
use sitesync::client::local_db::LocalDatabase;
use sitesync::client::offline::OfflineEngine;
use sitesync::client::sync::ConnectivityMonitor;

struct Args {
    config: Option<PathBuf>,
    drain: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        config: None,
        drain: false,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--drain" => args.drain = true,
            "--config" => {
                let path = iter.next().ok_or("--config needs a path")?;
                args.config = Some(PathBuf::from(path));
            }
            "-h" | "--help" => {
                return Err("usage: sitesync-status [--config <file.toml>] [--drain]".to_string());
            }
            other => return Err(format!("unknown argument '{}'", other)),
        }
    }
    Ok(args)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    sitesync::logging::init("sitesync=info");

    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}", message);
            std::process::exit(2);
        }
    };

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::from_env()?,
    };

    let store = Arc::new(LocalDatabase::open_in(config.sync().data_dir.as_deref()).await?);
    let api = Arc::new(HttpSiteApi::new(config.clone())?);
    // One-shot tool: no debounce on the probe result
    let connectivity = ConnectivityMonitor::new(false, Duration::ZERO);
    let engine = OfflineEngine::with_parts(config.sync(), store.clone(), api.clone(), connectivity).await?;

    let drain = if args.drain {
        if engine.connectivity().probe(&*api).await {
            Some(engine.reconciler().drain().await?)
        } else {
            tracing::warn!(server = config.server_url(), "server unreachable, not draining");
            None
        }
    } else {
        None
    };

    let output = json!({
        "store": store.path().display().to_string(),
        "server": config.server_url(),
        "summary": engine.queue().summary().await,
        "records": engine.queue().list().await,
        "drain": drain,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    store.close().await;
    Ok(())
}
