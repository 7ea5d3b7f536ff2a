//! Hashlink node CLI
//!
//! Runs a ledger node behind its HTTP API, or solves a single proof offline.

use clap::{Parser, Subcommand};
use hashlink::api::{create_router, ApiState};
use hashlink::mining::{find_proof, DEFAULT_DIFFICULTY, MAX_DIFFICULTY};
use hashlink::network::{Node, NodeConfig, DEFAULT_MAX_CONCURRENT_FETCHES};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "hashlink")]
#[command(version = "0.1.0")]
#[command(about = "A minimal proof-of-work ledger node", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a node and its HTTP API
    Start {
        /// Address to bind
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value = "5000")]
        port: u16,

        /// Proof-of-work difficulty (leading zero hex digits)
        #[arg(
            short,
            long,
            default_value_t = DEFAULT_DIFFICULTY as u8,
            value_parser = clap::value_parser!(u8).range(0..=MAX_DIFFICULTY as i64)
        )]
        difficulty: u8,

        /// Identity that receives mining rewards (random if omitted)
        #[arg(long)]
        node_id: Option<String>,

        /// Peers to register at startup (comma-separated)
        #[arg(long)]
        peers: Option<String>,

        /// Resolve conflicts every N seconds
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        resolve_interval: Option<u64>,

        /// Seconds to wait for a peer's chain
        #[arg(long, default_value = "5")]
        peer_timeout: u64,

        /// Peers queried at the same time during resolution
        #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENT_FETCHES)]
        max_fetches: usize,
    },

    /// Solve one proof of work and print it
    Proof {
        /// Proof of the previous block
        #[arg(short, long)]
        last_proof: u64,

        /// Proof-of-work difficulty (leading zero hex digits)
        #[arg(
            short,
            long,
            default_value_t = DEFAULT_DIFFICULTY as u8,
            value_parser = clap::value_parser!(u8).range(0..=MAX_DIFFICULTY as i64)
        )]
        difficulty: u8,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start {
            host,
            port,
            difficulty,
            node_id,
            peers,
            resolve_interval,
            peer_timeout,
            max_fetches,
        } => {
            let bootstrap_peers: Vec<String> = peers
                .map(|p| {
                    p.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default();

            let config = NodeConfig {
                host,
                port,
                difficulty: usize::from(difficulty),
                node_id,
                bootstrap_peers,
                peer_timeout: Duration::from_secs(peer_timeout),
                max_concurrent_fetches: max_fetches,
                resolve_interval: resolve_interval.map(Duration::from_secs),
            };

            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_node(config))?;
        }

        Commands::Proof {
            last_proof,
            difficulty,
        } => {
            let start = Instant::now();
            let difficulty = usize::from(difficulty);
            let proof = find_proof(last_proof, difficulty);
            println!(
                "Proof for {} at difficulty {}: {} ({} ms)",
                last_proof,
                difficulty,
                proof,
                start.elapsed().as_millis()
            );
        }
    }

    Ok(())
}

async fn run_node(config: NodeConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.host, config.port);
    let resolve_interval = config.resolve_interval;

    let node = Arc::new(Node::new(config).await?);
    log::info!("Node identifier: {}", node.node_id());

    let consensus_loop = resolve_interval.map(|interval| {
        log::info!("Resolving conflicts every {}s", interval.as_secs());
        node.spawn_consensus_loop(interval)
    });

    let app = create_router(ApiState::new(node.clone()));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("REST API listening on http://{}", addr);

    let shutdown_node = node.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
            log::info!("Shutting down node...");
            shutdown_node.shutdown();
        })
        .await?;

    if let Some(handle) = consensus_loop {
        handle.abort();
    }

    log::info!("Node stopped");
    Ok(())
}
