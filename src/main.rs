//! travelbase server
//!
//! ```bash
//! travelbase --data /tmp/data/data.zip --options /tmp/data/options.txt --port 80
//! ```

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use travelbase::api::handlers::Api;
use travelbase::api::router::Router;
use travelbase::core::config::{Config, ReferenceTime};
use travelbase::core::error::Result;
use travelbase::parallel::bundle::Bundle;
use travelbase::parallel::loader::BulkLoader;
use travelbase::server::reactor::Server;
use travelbase::storage::store::Store;

#[derive(Parser)]
#[command(name = "travelbase")]
#[command(about = "In-memory travel records API over a bulk-loaded dataset")]
#[command(version)]
struct Cli {
    /// Dataset bundle: zip archive or directory of JSON members
    #[arg(short, long, default_value = "/tmp/data/data.zip")]
    data: PathBuf,

    /// Options file; first line is the reference epoch timestamp
    #[arg(short, long, default_value = "/tmp/data/options.txt")]
    options: PathBuf,

    /// Server port
    #[arg(short, long, default_value = "80")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: IpAddr,

    /// Reactor pairs (defaults to the number of CPUs)
    #[arg(long)]
    reactors: Option<usize>,

    /// Bulk load worker threads
    #[arg(long, default_value = "4")]
    loader_workers: usize,

    /// Largest accepted request, headers included
    #[arg(long, default_value = "16384")]
    max_request_bytes: usize,

    /// Milliseconds a connection may stay open
    #[arg(long, default_value = "5000")]
    connection_timeout_ms: u64,
}

impl Cli {
    fn into_config(self) -> Config {
        let defaults = Config::default();
        Config {
            listen_addr: SocketAddr::new(self.host, self.port),
            data_path: self.data,
            options_path: self.options,
            reactors: self.reactors.unwrap_or(defaults.reactors),
            max_request_bytes: self.max_request_bytes,
            connection_timeout: Duration::from_millis(self.connection_timeout_ms),
            loader_workers: self.loader_workers,
            loader_queue: self.loader_workers,
            ..defaults
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_config();

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "Server stopped");
            ExitCode::FAILURE
        }
    }
}

fn run(config: Config) -> Result<()> {
    let reference = ReferenceTime::load(&config.options_path)?;
    info!(timestamp = reference.timestamp, "Reference time loaded");

    // Nothing is bound until the dataset is fully in memory
    let store = Arc::new(Store::new());
    let bundle = Bundle::open(&config.data_path)?;
    BulkLoader::new(store.clone(), config.loader_workers)
        .with_queue(config.loader_queue)
        .load(&bundle)?;

    let stats = store.stats();
    info!(users = stats.users, locations = stats.locations, visits = stats.visits, "Store ready");

    let router = Arc::new(Router::new(Api::new(store, reference)));
    Server::bind(config, router)?.run()
}
