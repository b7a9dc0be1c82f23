//! JSON-RPC API server for DevChain
//!
//! Exposes the standard `eth_*` chain methods together with the
//! `anvil_*`/`hardhat_*` testing-control extensions over a single HTTP
//! endpoint. No business logic lives here: the handlers marshal hex
//! parameters, take the chain lock, and translate errors into JSON-RPC
//! error objects.

use axum::{
    extract::{Request, State},
    http::{self, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::blockchain::{Block, Blockchain};
use crate::error::NodeError;
use crate::executor::{Receipt, TxStatus};
use crate::transaction::Transaction;
use crate::types::{
    address_to_hex, h256_to_hex, parse_address, parse_bytes, parse_h256, parse_quantity,
    parse_quantity_u64, quantity_to_hex, u64_to_hex, U256,
};

/// Shared server state: the chain behind a single lock plus request
/// statistics. Write-path methods take the write half, pure reads the read
/// half, which serializes every read-then-write operation as the engine
/// requires.
#[derive(Clone)]
pub struct Node {
    pub blockchain: Arc<RwLock<Blockchain>>,
    // Optional shared orchestrator state (NodeState) for health checks and logging
    pub state: Option<Arc<RwLock<crate::node::NodeState>>>,
    api_stats: Arc<RwLock<ApiStats>>,
}

/// API statistics and monitoring
#[derive(Debug, Default)]
struct ApiStats {
    total_requests: u64,
    successful_requests: u64,
    failed_requests: u64,
    transactions_submitted: u64,
    blocks_mined: u64,
    start_time: Option<Instant>,
}

impl ApiStats {
    fn new() -> Self {
        ApiStats {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    fn record_request(&mut self, success: bool) {
        self.total_requests += 1;
        if success {
            self.successful_requests += 1;
        } else {
            self.failed_requests += 1;
        }
    }
}

impl Node {
    /// Create a new API node owning a fresh lock around the given chain.
    pub fn new(blockchain: Blockchain) -> Self {
        Self {
            blockchain: Arc::new(RwLock::new(blockchain)),
            state: None,
            api_stats: Arc::new(RwLock::new(ApiStats::new())),
        }
    }

    /// Create an API node that shares the provided chain and orchestrator
    /// state, so the RPC server and the node orchestrator observe the same
    /// in-memory chain.
    pub fn new_shared(
        blockchain: Arc<RwLock<Blockchain>>,
        state: Option<Arc<RwLock<crate::node::NodeState>>>,
    ) -> Self {
        Self {
            blockchain,
            state,
            api_stats: Arc::new(RwLock::new(ApiStats::new())),
        }
    }

    pub async fn get_stats(&self) -> ApiStatsResponse {
        let stats = self.api_stats.read().await;
        let uptime = stats.start_time.map(|t| t.elapsed().as_secs()).unwrap_or(0);

        ApiStatsResponse {
            total_requests: stats.total_requests,
            successful_requests: stats.successful_requests,
            failed_requests: stats.failed_requests,
            transactions_submitted: stats.transactions_submitted,
            blocks_mined: stats.blocks_mined,
            uptime_seconds: uptime,
        }
    }
}

#[derive(serde::Serialize)]
pub struct ApiStatsResponse {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub transactions_submitted: u64,
    pub blocks_mined: u64,
    pub uptime_seconds: u64,
}

// ============================================================================
// JSON-RPC plumbing
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    #[allow(dead_code)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// A JSON-RPC error object. Each `NodeError` variant keeps its own code so
/// clients can tell a rejected authorization from a malformed request.
#[derive(Debug)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    fn method_not_found(method: &str) -> Self {
        RpcError {
            code: -32601,
            message: format!("method {:?} not found", method),
        }
    }
}

impl From<NodeError> for RpcError {
    fn from(err: NodeError) -> Self {
        let code = match err {
            NodeError::Validation(_) => -32602,
            NodeError::Authorization(_) => -32000,
            NodeError::Execution(_) => -32003,
            NodeError::Internal(_) => -32603,
        };
        RpcError {
            code,
            message: err.to_string(),
        }
    }
}

fn param(params: &Value, index: usize) -> Option<&Value> {
    params.as_array().and_then(|list| list.get(index))
}

fn required_str<'a>(params: &'a Value, index: usize, name: &str) -> Result<&'a str, NodeError> {
    param(params, index)
        .and_then(Value::as_str)
        .ok_or_else(|| NodeError::Validation(format!("missing or non-string parameter {}", name)))
}

/// Optional hex-quantity parameter: absent (or null) takes the default, but
/// a present non-string value is a malformed request, not an absence.
fn optional_quantity_u64(
    params: &Value,
    index: usize,
    name: &str,
    default: u64,
) -> Result<u64, NodeError> {
    match param(params, index) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::String(s)) => parse_quantity_u64(s),
        Some(other) => Err(NodeError::Validation(format!(
            "parameter {} must be a hex string, got {}",
            name, other
        ))),
    }
}

/// Transaction object as submitted over `eth_sendTransaction`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionRequest {
    from: String,
    #[serde(default)]
    to: Option<String>,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    nonce: Option<String>,
    #[serde(default)]
    gas_price: Option<String>,
    // Accepted for wallet compatibility; execution derives its own cost.
    #[serde(default)]
    #[allow(dead_code)]
    gas: Option<String>,
}

impl TransactionRequest {
    fn into_transaction(self) -> Result<Transaction, NodeError> {
        let from = parse_address(&self.from)?;
        let to = self.to.as_deref().map(parse_address).transpose()?;
        let value = self
            .value
            .as_deref()
            .map(parse_quantity)
            .transpose()?
            .unwrap_or_default();
        let data = self
            .data
            .as_deref()
            .map(parse_bytes)
            .transpose()?
            .unwrap_or_default();
        let nonce = self
            .nonce
            .as_deref()
            .map(parse_quantity_u64)
            .transpose()?;
        let gas_price = self
            .gas_price
            .as_deref()
            .map(parse_quantity)
            .transpose()?
            .unwrap_or_default();

        Ok(Transaction {
            from,
            to,
            value,
            data,
            nonce,
            gas_price,
            signature: None,
            public_key: None,
        })
    }
}

fn receipt_to_json(receipt: &Receipt) -> Value {
    json!({
        "transactionHash": h256_to_hex(&receipt.transaction_hash),
        "transactionIndex": u64_to_hex(receipt.transaction_index),
        "blockNumber": receipt.block_number.map(u64_to_hex),
        "blockHash": receipt.block_hash.as_ref().map(h256_to_hex),
        "from": address_to_hex(&receipt.from),
        "to": receipt.to.as_ref().map(address_to_hex),
        "contractAddress": receipt.contract_address.as_ref().map(address_to_hex),
        "gasUsed": u64_to_hex(receipt.gas_used),
        "status": match receipt.status {
            TxStatus::Success => "0x1",
            TxStatus::Reverted => "0x0",
        },
        "logs": receipt.logs.iter().map(|log| json!({
            "address": address_to_hex(&log.address),
            "topics": log.topics.iter().map(h256_to_hex).collect::<Vec<_>>(),
            "data": format!("0x{}", hex::encode(&log.data)),
        })).collect::<Vec<_>>(),
    })
}

fn block_to_json(block: &Block) -> Value {
    json!({
        "number": u64_to_hex(block.header.number),
        "hash": h256_to_hex(&block.hash()),
        "parentHash": h256_to_hex(&block.header.parent_hash),
        "timestamp": u64_to_hex(block.header.timestamp),
        "transactionsRoot": h256_to_hex(&block.header.transactions_root),
        "transactions": block.transactions.iter().map(h256_to_hex).collect::<Vec<_>>(),
    })
}

// ============================================================================
// Method dispatch
// ============================================================================

async fn dispatch(node: &Node, method: &str, params: &Value) -> Result<Value, RpcError> {
    match method {
        "anvil_setBalance" | "hardhat_setBalance" => {
            let address = parse_address(required_str(params, 0, "address")?)?;
            let balance = parse_quantity(required_str(params, 1, "balance")?)?;
            node.blockchain.write().await.set_balance(address, balance);
            Ok(json!(true))
        }
        "anvil_setNonce" | "hardhat_setNonce" => {
            let address = parse_address(required_str(params, 0, "address")?)?;
            let nonce = parse_quantity_u64(required_str(params, 1, "nonce")?)?;
            node.blockchain.write().await.set_nonce(address, nonce);
            Ok(json!(true))
        }
        "anvil_mine" | "hardhat_mine" => {
            // Both parameters default to 1 when absent.
            let count = optional_quantity_u64(params, 0, "count", 1)?;
            let interval = optional_quantity_u64(params, 1, "interval", 1)?;
            node.blockchain.write().await.mine_blocks(count, interval)?;
            node.api_stats.write().await.blocks_mined += count;
            Ok(json!(true))
        }
        "anvil_impersonateAccount" | "hardhat_impersonateAccount" => {
            let address = parse_address(required_str(params, 0, "address")?)?;
            node.blockchain.write().await.impersonation.grant(address);
            Ok(json!(true))
        }
        "anvil_stopImpersonatingAccount" | "hardhat_stopImpersonatingAccount" => {
            let address = parse_address(required_str(params, 0, "address")?)?;
            let was_impersonated = node
                .blockchain
                .write()
                .await
                .impersonation
                .revoke(&address);
            Ok(json!(was_impersonated))
        }
        "eth_accounts" => {
            let blockchain = node.blockchain.read().await;
            let accounts: Vec<String> = blockchain
                .rich_accounts()
                .iter()
                .map(address_to_hex)
                .collect();
            Ok(json!(accounts))
        }
        "eth_chainId" => {
            let blockchain = node.blockchain.read().await;
            Ok(json!(u64_to_hex(blockchain.chain_id())))
        }
        "eth_blockNumber" => {
            let blockchain = node.blockchain.read().await;
            Ok(json!(u64_to_hex(blockchain.latest_number())))
        }
        "eth_gasPrice" => Ok(json!(quantity_to_hex(U256::zero()))),
        "eth_getBalance" => {
            let address = parse_address(required_str(params, 0, "address")?)?;
            let blockchain = node.blockchain.read().await;
            Ok(json!(quantity_to_hex(blockchain.state.balance_of(&address))))
        }
        "eth_getTransactionCount" => {
            let address = parse_address(required_str(params, 0, "address")?)?;
            let blockchain = node.blockchain.read().await;
            Ok(json!(u64_to_hex(blockchain.state.nonce_of(&address))))
        }
        "eth_sendTransaction" => {
            let raw = param(params, 0)
                .cloned()
                .ok_or_else(|| NodeError::Validation("missing transaction object".to_string()))?;
            let request: TransactionRequest = serde_json::from_value(raw).map_err(|e| {
                NodeError::Validation(format!("malformed transaction object: {}", e))
            })?;
            let tx = request.into_transaction()?;
            let hash = node.blockchain.write().await.submit_transaction(tx)?;
            node.api_stats.write().await.transactions_submitted += 1;
            Ok(json!(h256_to_hex(&hash)))
        }
        "eth_getTransactionReceipt" => {
            let hash = parse_h256(required_str(params, 0, "transaction hash")?)?;
            let blockchain = node.blockchain.read().await;
            Ok(blockchain
                .receipt(&hash)
                .map(receipt_to_json)
                .unwrap_or(Value::Null))
        }
        "eth_getBlockByNumber" => {
            let tag = required_str(params, 0, "block tag")?;
            let blockchain = node.blockchain.read().await;
            let number = match tag {
                "latest" | "pending" => blockchain.latest_number(),
                "earliest" => 0,
                hex => parse_quantity_u64(hex)?,
            };
            Ok(blockchain
                .block_by_number(number)
                .map(block_to_json)
                .unwrap_or(Value::Null))
        }
        "config_getCurrentTimestamp" => {
            let blockchain = node.blockchain.read().await;
            // Raw number, not hex: test-support namespace convention.
            Ok(json!(blockchain.current_timestamp()))
        }
        _ => Err(RpcError::method_not_found(method)),
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Detailed request logging middleware. Logs method, path, status, duration
/// and current `NodeState` (when available).
async fn logging_middleware(State(node): State<Arc<Node>>, req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    let duration = start.elapsed();
    let status = response.status();

    let node_state = if let Some(s) = &node.state {
        format!("{:?}", s.read().await.clone())
    } else {
        "unknown".to_string()
    };

    tracing::info!(
        method = %method,
        path = %path,
        status = %status.as_u16(),
        duration_ms = %duration.as_millis(),
        node_state = %node_state,
        "api.request"
    );

    response
}

// ============================================================================
// Route handlers
// ============================================================================

async fn handle_rpc(State(node): State<Arc<Node>>, Json(request): Json<RpcRequest>) -> Json<Value> {
    let result = dispatch(&node, &request.method, &request.params).await;

    {
        let mut stats = node.api_stats.write().await;
        stats.record_request(result.is_ok());
    }

    match result {
        Ok(value) => Json(json!({
            "jsonrpc": "2.0",
            "id": request.id,
            "result": value,
        })),
        Err(err) => {
            tracing::warn!(method = %request.method, code = err.code, message = %err.message, "rpc error");
            Json(json!({
                "jsonrpc": "2.0",
                "id": request.id,
                "error": { "code": err.code, "message": err.message },
            }))
        }
    }
}

async fn health_check(State(node): State<Arc<Node>>) -> impl IntoResponse {
    // If the orchestrator provided a `NodeState`, use it to determine health.
    if let Some(s) = &node.state {
        let state = s.read().await.clone();
        match state {
            crate::node::NodeState::Ready => (
                StatusCode::OK,
                Json(json!({
                    "status": "healthy",
                    "node_state": format!("{:?}", state),
                    "timestamp": chrono::Utc::now().to_rfc3339(),
                })),
            )
                .into_response(),
            _ => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "node_state": format!("{:?}", state),
                    "timestamp": chrono::Utc::now().to_rfc3339(),
                })),
            )
                .into_response(),
        }
    } else {
        (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "timestamp": chrono::Utc::now().to_rfc3339(),
            })),
        )
            .into_response()
    }
}

async fn get_api_stats(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let stats = node.get_stats().await;
    Json(stats)
}

// ============================================================================
// API Server
// ============================================================================

/// Build the API router with all endpoints (for testing)
pub fn build_api_router(node: Arc<Node>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(vec![
            http::Method::GET,
            http::Method::POST,
            http::Method::OPTIONS,
        ])
        .allow_headers(vec![http::header::CONTENT_TYPE])
        .allow_credentials(true);

    Router::new()
        .route("/", post(handle_rpc))
        .route("/health", get(health_check))
        .route("/stats", get(get_api_stats))
        .layer(middleware::from_fn_with_state(
            node.clone(),
            logging_middleware,
        ))
        .with_state(node)
        .layer(cors)
}

/// Run the API server on the given port.
pub async fn run_api_server(node: Arc<Node>, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_api_router(node);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("JSON-RPC server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
