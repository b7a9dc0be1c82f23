//! DevChain node binary: starts the JSON-RPC server with the configured
//! chain, applying any command-line overrides on top of `config.toml`.

use clap::Parser;
use devchain::config::load_config;
use devchain::node::Node;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "devchain-node", about = "Run a local development chain node")]
struct Cli {
    /// Port for the JSON-RPC server
    #[arg(long)]
    port: Option<u16>,

    /// Chain id reported by eth_chainId
    #[arg(long)]
    chain_id: Option<u64>,

    /// Disable sealing a block after every transaction; blocks are then
    /// produced only by anvil_mine
    #[arg(long)]
    no_auto_mine: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let mut config = load_config()?;
    if let Some(port) = cli.port {
        config.rpc.port = port;
    }
    if let Some(chain_id) = cli.chain_id {
        config.chain.chain_id = chain_id;
    }
    if cli.no_auto_mine {
        config.chain.auto_mine = false;
    }

    let node = Arc::new(Node::init(config)?);
    node.start().await
}
