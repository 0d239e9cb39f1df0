//! offline-cache - command-line host for the offline cache worker.
//!
//! Plays the part of the host runtime: `install` fires the install event
//! (priming the region), `fetch` fires one fetch event, and `status`
//! describes what the region currently holds.

use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use offline_cache_core::{Config, Request, Worker};

const USAGE: &str = "\
Usage: offline-cache <command>

Commands:
  install                          Prime the cache region with the asset list
  fetch <url> [--method M] [--header 'Name: value']...
                                   Resolve one request, cache first
  status                           Show what the cache region holds

Environment:
  OFFLINE_CACHE_ORIGIN   Origin assets and relative URLs resolve against
  OFFLINE_CACHE_DIR      Directory holding cache regions
  RUST_LOG               Log filter (default: warn)";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        eprintln!("{}", USAGE);
        return Ok(());
    };

    if matches!(command.as_str(), "-h" | "--help" | "help") {
        eprintln!("{}", USAGE);
        return Ok(());
    }

    let config = Config::load().context("Failed to load configuration")?;
    let worker = Worker::from_config(&config).context("Failed to set up worker")?;

    match command.as_str() {
        "install" => install(&worker).await,
        "fetch" => fetch(&worker, &config, &args[1..]).await,
        "status" => status(&worker).await,
        other => bail!("Unknown command: {}\n\n{}", other, USAGE),
    }
}

async fn install(worker: &Worker) -> Result<()> {
    info!(region = worker.region_name(), assets = worker.assets().len(), "Installing");

    let region = worker.on_install().await.context("Install failed")?;

    eprintln!(
        "Installed {} assets into region '{}'",
        region.len().await,
        region.name()
    );
    Ok(())
}

struct FetchArgs {
    url: String,
    method: String,
    headers: Vec<(String, String)>,
}

fn parse_fetch_args(args: &[String]) -> Result<FetchArgs> {
    let mut url = None;
    let mut method = "GET".to_string();
    let mut headers = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--method" | "-X" => {
                method = iter.next().context("--method needs a value")?.clone();
            }
            "--header" | "-H" => {
                let raw = iter.next().context("--header needs a value")?;
                let (name, value) = raw
                    .split_once(':')
                    .with_context(|| format!("Header must look like 'Name: value': {}", raw))?;
                headers.push((name.trim().to_string(), value.trim().to_string()));
            }
            other if url.is_none() => url = Some(other.to_string()),
            other => bail!("Unexpected argument: {}", other),
        }
    }

    Ok(FetchArgs {
        url: url.context("fetch needs a URL")?,
        method,
        headers,
    })
}

async fn fetch(worker: &Worker, config: &Config, args: &[String]) -> Result<()> {
    let args = parse_fetch_args(args)?;

    // Relative URLs resolve against the configured origin
    let url = config
        .origin_url()?
        .join(&args.url)
        .with_context(|| format!("Invalid URL: {}", args.url))?;

    let mut request = Request::new(&args.method, url.as_str())?;
    for (name, value) in args.headers {
        request = request.with_header(name, value);
    }

    let resolved = worker.on_fetch(&request).await?;
    let response = &resolved.response;

    eprintln!(
        "{} {} -> {} ({})",
        request.method,
        request.url,
        response.status,
        if resolved.from_cache() { "cache" } else { "network" }
    );

    let mut stdout = io::stdout().lock();
    stdout.write_all(&response.body)?;
    stdout.flush()?;
    Ok(())
}

async fn status(worker: &Worker) -> Result<()> {
    println!("Region:  {}", worker.region_name());

    let Some(region) = worker.region().await? else {
        println!("Entries: 0");
        println!("Primed:  never");
        return Ok(());
    };

    println!("Entries: {}", region.len().await);
    println!(
        "Primed:  {}",
        region
            .age_display()
            .await
            .unwrap_or_else(|| "never".to_string())
    );
    for key in region.keys().await {
        println!("  {}", key);
    }
    Ok(())
}
