//! Node orchestrator: loads configuration, seeds the chain, and starts the
//! JSON-RPC server.

use crate::blockchain::Blockchain;
use crate::config::Config;
use crate::types::address_to_hex;
use std::net::TcpListener;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeState {
    Booting,
    Ready,
}

pub struct Node {
    pub config: Config,
    pub blockchain: Arc<RwLock<Blockchain>>,
    pub state: Arc<RwLock<NodeState>>,
}

impl Node {
    pub fn init(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        info!(
            chain_id = config.chain.chain_id,
            auto_mine = config.chain.auto_mine,
            "starting DevChain node"
        );

        let blockchain = Blockchain::new(config.chain.chain_id, config.chain.auto_mine)
            .map_err(|e| format!("failed to create blockchain: {}", e))?;

        // Print the seeded accounts so developers can pick one up directly.
        for (index, address) in blockchain.rich_accounts().iter().enumerate() {
            info!(
                "rich account #{}: {} (10000 ETH)",
                index,
                address_to_hex(address)
            );
        }

        Ok(Self {
            config,
            blockchain: Arc::new(RwLock::new(blockchain)),
            state: Arc::new(RwLock::new(NodeState::Booting)),
        })
    }

    pub async fn start(self: Arc<Self>) -> Result<(), Box<dyn std::error::Error>> {
        // Fail fast when the port is taken rather than inside axum::serve.
        let port = self.config.rpc.port;
        let bind = format!("0.0.0.0:{}", port);
        TcpListener::bind(&bind).map_err(|e| format!("RPC port {} unavailable: {}", port, e))?;

        {
            let mut s = self.state.write().await;
            *s = NodeState::Ready;
        }

        let api_node = crate::api::Node::new_shared(self.blockchain.clone(), Some(self.state.clone()));

        crate::api::run_api_server(Arc::new(api_node), port).await?;
        Ok(())
    }
}
