//! # Harvester CLI Entry Point
//!
//! Main binary for the harvester scraping system. Starts either service or
//! fires a one-shot scrape against a running orchestrator.
//!
//! ## Usage
//!
//! ```bash
//! # Start the worker service (CPU-bound task pool)
//! harvester worker -b 0.0.0.0:9000 --pool-size 4
//!
//! # Start the orchestrator, pointing at the worker
//! harvester orchestrator -b 0.0.0.0:8080 -w 127.0.0.1:9000
//!
//! # Scrape a page through a running orchestrator (outputs raw JSON)
//! harvester scrape http://127.0.0.1:8080 https://example.com
//! ```

use anyhow::Result;
use argh::FromArgs;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use harvester_orchestrator::{HttpServer, Orchestrator, OrchestratorConfig};
use harvester_worker::pool::{PoolConfig, WorkerPool};
use harvester_worker::service::WorkerService;
use harvester_worker::tasks;

/// Validates that a URL string starts with http:// or https://.
fn validate_http_url(url: &str, description: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "Invalid {}: '{}' must start with http:// or https://",
            description,
            url
        ))
    }
}

#[derive(FromArgs)]
/// Harvester - distributed web scraping system
struct Cli {
    #[argh(subcommand)]
    command: Commands,
}

/// Available CLI subcommands.
///
/// - **Worker**: start the TCP worker service that executes CPU-bound tasks
/// - **Orchestrator**: start the async scraping orchestrator (HTTP surface)
/// - **Scrape**: scrape one URL through a running orchestrator
#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Worker(WorkerArgs),
    Orchestrator(OrchestratorArgs),
    Scrape(ScrapeArgs),
}

/// Arguments for starting the worker service.
///
/// The worker accepts framed task requests over TCP and executes them on a
/// fixed pool of threads. Screenshot capture requires a Chromium or Chrome
/// binary on the PATH; without one, screenshot tasks degrade to `null`.
#[derive(FromArgs)]
#[argh(subcommand, name = "worker")]
/// start the harvester worker service
struct WorkerArgs {
    /// address to bind the worker's TCP listener to
    ///
    /// Defaults to "0.0.0.0:9000", the address the orchestrator expects.
    #[argh(option, short = 'b', default = "\"0.0.0.0:9000\".into()")]
    bind: String,

    /// number of worker threads in the task pool
    ///
    /// Defaults to the host's core count. The pool is fixed for the life
    /// of the process.
    #[argh(option, long = "pool-size")]
    pool_size: Option<usize>,
}

/// Arguments for starting the orchestrator.
///
/// The orchestrator serves `GET /scrape?url=...` and `GET /health` over
/// HTTP, fetching pages itself and delegating screenshot, performance, and
/// thumbnail work to the worker service.
#[derive(FromArgs)]
#[argh(subcommand, name = "orchestrator")]
/// start the harvester orchestrator
struct OrchestratorArgs {
    /// address to bind the orchestrator's HTTP server to
    ///
    /// Clients send scrape requests here. Defaults to "0.0.0.0:8080".
    #[argh(option, short = 'b', default = "\"0.0.0.0:8080\".into()")]
    bind: String,

    /// address of the worker service
    ///
    /// Plain host:port, no scheme. Defaults to "127.0.0.1:9000".
    #[argh(option, short = 'w', long = "worker", default = "\"127.0.0.1:9000\".into()")]
    worker: String,

    /// per-sub-task budget in milliseconds
    ///
    /// Bounds each of the three parallel worker calls. A sub-task that
    /// exceeds it degrades to its placeholder value. Defaults to 30000ms.
    #[argh(option, long = "subcall-timeout-ms", default = "30000")]
    subcall_timeout_ms: u64,

    /// maximum image URLs forwarded for thumbnail generation
    ///
    /// Defaults to 5.
    #[argh(option, long = "max-images", default = "5")]
    max_images: usize,
}

/// Arguments for a one-shot scrape.
///
/// Outputs the raw JSON aggregate to stdout, suitable for piping into
/// `jq`. Errors go to stderr with a non-zero exit code.
#[derive(FromArgs)]
#[argh(subcommand, name = "scrape")]
/// scrape a URL through a running orchestrator
struct ScrapeArgs {
    /// address of the orchestrator
    ///
    /// Must include the http:// or https:// prefix
    /// (e.g., http://127.0.0.1:8080).
    #[argh(positional)]
    server_address: String,

    /// URL of the page to scrape
    #[argh(positional)]
    url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    // Keep scrape output clean for unix tool usage (piping to jq, etc.).
    if !matches!(cli.command, Commands::Scrape(_)) {
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .init();
    }

    match cli.command {
        Commands::Worker(args) => run_worker(args).await,
        Commands::Orchestrator(args) => run_orchestrator(args).await,
        Commands::Scrape(args) => run_scrape(args).await,
    }
}

/// Starts the worker service and blocks until it stops.
async fn run_worker(args: WorkerArgs) -> Result<()> {
    let config = match args.pool_size {
        Some(pool_size) => PoolConfig { pool_size },
        None => PoolConfig::default(),
    };
    tracing::info!("Starting harvester worker");
    tracing::info!("Binding to: {}", args.bind);
    tracing::info!("Pool size: {}", config.pool_size);

    let pool = Arc::new(WorkerPool::new(config, Arc::new(tasks::dispatch)));
    let service = WorkerService::bind(&args.bind, pool)?;

    // The accept loop is blocking; keep it off the async runtime threads.
    tokio::task::spawn_blocking(move || service.run()).await??;
    Ok(())
}

/// Starts the orchestrator HTTP server and blocks until it stops.
async fn run_orchestrator(args: OrchestratorArgs) -> Result<()> {
    tracing::info!("Starting harvester orchestrator");
    tracing::info!("Binding to: {}", args.bind);
    tracing::info!("Worker service: {}", args.worker);

    let config = OrchestratorConfig {
        worker_addr: args.worker,
        subcall_timeout: Duration::from_millis(args.subcall_timeout_ms),
        max_images: args.max_images,
    };
    let orchestrator = Arc::new(Orchestrator::new(config)?);

    let addr: SocketAddr = args
        .bind
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid bind address {}: {}", args.bind, e))?;
    HttpServer::new(orchestrator).run(addr).await?;
    Ok(())
}

/// Builds the orchestrator's scrape endpoint with the target URL carried
/// as an encoded query parameter, so `?` and `&` inside the target cannot
/// bleed into the outer query string.
fn scrape_endpoint(server_address: &str, url: &str) -> Result<reqwest::Url> {
    reqwest::Url::parse_with_params(&format!("{}/scrape", server_address), &[("url", url)])
        .map_err(|e| anyhow::anyhow!("Invalid server address {}: {}", server_address, e))
}

/// Executes the `scrape` subcommand: one HTTP call, raw JSON to stdout.
async fn run_scrape(args: ScrapeArgs) -> Result<()> {
    validate_http_url(&args.server_address, "server address")?;

    let endpoint = scrape_endpoint(&args.server_address, &args.url)?;
    let response = reqwest::get(endpoint).await?;
    let status = response.status();
    let body = response.text().await?;

    println!("{}", body);

    if !status.is_success() {
        anyhow::bail!("scrape failed with status {}", status);
    }
    Ok(())
}

/// CLI argument parsing tests.
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_worker_defaults() {
        let args: Cli = Cli::from_args(&["harvester"], &["worker"]).unwrap();
        match args.command {
            Commands::Worker(WorkerArgs { bind, pool_size }) => {
                assert_eq!(bind, "0.0.0.0:9000");
                assert!(pool_size.is_none());
            }
            _ => panic!("Expected Worker command"),
        }
    }

    #[test]
    fn parse_worker_with_pool_size() {
        let args: Cli =
            Cli::from_args(&["harvester"], &["worker", "-b", "0.0.0.0:9100", "--pool-size", "8"])
                .unwrap();
        match args.command {
            Commands::Worker(WorkerArgs { bind, pool_size }) => {
                assert_eq!(bind, "0.0.0.0:9100");
                assert_eq!(pool_size, Some(8));
            }
            _ => panic!("Expected Worker command"),
        }
    }

    #[test]
    fn parse_orchestrator_defaults() {
        let args: Cli = Cli::from_args(&["harvester"], &["orchestrator"]).unwrap();
        match args.command {
            Commands::Orchestrator(OrchestratorArgs {
                bind,
                worker,
                subcall_timeout_ms,
                max_images,
            }) => {
                assert_eq!(bind, "0.0.0.0:8080");
                assert_eq!(worker, "127.0.0.1:9000");
                assert_eq!(subcall_timeout_ms, 30000);
                assert_eq!(max_images, 5);
            }
            _ => panic!("Expected Orchestrator command"),
        }
    }

    #[test]
    fn parse_orchestrator_with_worker() {
        let args: Cli = Cli::from_args(
            &["harvester"],
            &["orchestrator", "-w", "127.0.0.1:9100", "--max-images", "3"],
        )
        .unwrap();
        match args.command {
            Commands::Orchestrator(OrchestratorArgs {
                worker, max_images, ..
            }) => {
                assert_eq!(worker, "127.0.0.1:9100");
                assert_eq!(max_images, 3);
            }
            _ => panic!("Expected Orchestrator command"),
        }
    }

    #[test]
    fn parse_scrape() {
        let args: Cli = Cli::from_args(
            &["harvester"],
            &["scrape", "http://127.0.0.1:8080", "https://example.com"],
        )
        .unwrap();
        match args.command {
            Commands::Scrape(ScrapeArgs {
                server_address,
                url,
            }) => {
                assert_eq!(server_address, "http://127.0.0.1:8080");
                assert_eq!(url, "https://example.com");
            }
            _ => panic!("Expected Scrape command"),
        }
    }

    #[test]
    fn scrape_endpoint_encodes_the_target_url() {
        let endpoint = scrape_endpoint(
            "http://127.0.0.1:8080",
            "https://example.com/page?a=1&b=2",
        )
        .unwrap();

        // The whole target survives as the single `url` parameter; its
        // `&` must not split it into extra outer parameters.
        let pairs: Vec<(String, String)> = endpoint.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![(
                "url".to_string(),
                "https://example.com/page?a=1&b=2".to_string()
            )]
        );
        assert_eq!(endpoint.path(), "/scrape");
    }

    #[test]
    fn http_url_validation() {
        assert!(validate_http_url("http://127.0.0.1:8080", "server address").is_ok());
        assert!(validate_http_url("https://example.com", "server address").is_ok());
        assert!(validate_http_url("127.0.0.1:8080", "server address").is_err());
    }
}
