//! Integration tests for the DevChain JSON-RPC surface
//!
//! These drive the full axum router over HTTP semantics: hex marshaling,
//! dispatch, chain locking, and error translation included.

use axum_test::TestServer;
use devchain::api::{build_api_router, Node};
use devchain::blockchain::Blockchain;
use devchain::genesis;
use devchain::types::{quantity_to_hex, u64_to_hex, U256};
use serde_json::{json, Value};
use std::sync::Arc;

fn test_server(auto_mine: bool) -> TestServer {
    let blockchain = Blockchain::new(260, auto_mine).expect("failed to create blockchain");
    let node = Arc::new(Node::new(blockchain));
    TestServer::new(build_api_router(node)).expect("failed to create test server")
}

async fn rpc(server: &TestServer, method: &str, params: Value) -> Value {
    let response = server
        .post("/")
        .json(&json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        }))
        .await;
    assert_eq!(response.status_code(), 200);
    response.json()
}

async fn rpc_result(server: &TestServer, method: &str, params: Value) -> Value {
    let body = rpc(server, method, params).await;
    assert!(
        body["error"].is_null(),
        "unexpected rpc error from {}: {}",
        method,
        body["error"]
    );
    body["result"].clone()
}

fn ether(amount: u64) -> U256 {
    U256::from(amount) * U256::exp10(18)
}

#[tokio::test]
async fn test_set_balance_updates_account() {
    let server = test_server(true);
    let address = "0x36615cf349d7f6344891b1e7ca7c72883f5dc049";
    let new_balance = ether(42);

    let result = rpc_result(
        &server,
        "anvil_setBalance",
        json!([address, quantity_to_hex(new_balance)]),
    )
    .await;
    assert_eq!(result, json!(true));

    let balance = rpc_result(&server, "eth_getBalance", json!([address, "latest"])).await;
    assert_eq!(balance, json!(quantity_to_hex(new_balance)));
}

#[tokio::test]
async fn test_set_nonce_updates_account() {
    let server = test_server(true);
    let address = "0x36615cf349d7f6344891b1e7ca7c72883f5dc049";

    rpc_result(&server, "anvil_setNonce", json!([address, "0x2a"])).await;

    let nonce = rpc_result(&server, "eth_getTransactionCount", json!([address, "latest"])).await;
    assert_eq!(nonce, json!("0x2a"));
}

#[tokio::test]
async fn test_mine_advances_number_and_timestamp() {
    let server = test_server(true);
    let number_of_blocks = 100u64;
    let interval_seconds = 60u64;

    let starting_number = rpc_result(&server, "eth_blockNumber", json!([])).await;
    let starting_number =
        u64::from_str_radix(starting_number.as_str().unwrap().trim_start_matches("0x"), 16)
            .unwrap();
    let starting_timestamp = rpc_result(&server, "config_getCurrentTimestamp", json!([]))
        .await
        .as_u64()
        .unwrap();

    rpc_result(
        &server,
        "anvil_mine",
        json!([u64_to_hex(number_of_blocks), u64_to_hex(interval_seconds)]),
    )
    .await;

    let latest = rpc_result(&server, "eth_getBlockByNumber", json!(["latest", false])).await;
    let latest_number =
        u64::from_str_radix(latest["number"].as_str().unwrap().trim_start_matches("0x"), 16)
            .unwrap();
    let latest_timestamp = u64::from_str_radix(
        latest["timestamp"].as_str().unwrap().trim_start_matches("0x"),
        16,
    )
    .unwrap();

    assert_eq!(latest_number, starting_number + number_of_blocks);
    assert_eq!(
        latest_timestamp,
        starting_timestamp + (number_of_blocks - 1) * interval_seconds * 1000 + 1
    );

    let current = rpc_result(&server, "config_getCurrentTimestamp", json!([]))
        .await
        .as_u64()
        .unwrap();
    assert_eq!(current, latest_timestamp);
}

#[tokio::test]
async fn test_mine_zero_blocks_rejected() {
    let server = test_server(true);
    let body = rpc(&server, "anvil_mine", json!(["0x0", "0x1"])).await;
    assert_eq!(body["error"]["code"], json!(-32602));

    // Chain head untouched.
    let number = rpc_result(&server, "eth_blockNumber", json!([])).await;
    assert_eq!(number, json!("0x0"));
}

#[tokio::test]
async fn test_mine_rejects_numeric_parameters() {
    let server = test_server(true);

    // Bare JSON numbers are malformed; quantities travel as hex strings.
    let body = rpc(&server, "anvil_mine", json!([100, 60])).await;
    assert_eq!(body["error"]["code"], json!(-32602));

    let number = rpc_result(&server, "eth_blockNumber", json!([])).await;
    assert_eq!(number, json!("0x0"));
}

#[tokio::test]
async fn test_mine_defaults_when_parameters_absent() {
    let server = test_server(true);

    rpc_result(&server, "anvil_mine", json!([])).await;

    let number = rpc_result(&server, "eth_blockNumber", json!([])).await;
    assert_eq!(number, json!("0x1"));
}

#[tokio::test]
async fn test_accounts_returns_rich_registry() {
    let server = test_server(true);

    let mut expected: Vec<String> = genesis::rich_accounts()
        .unwrap()
        .iter()
        .map(|a| devchain::types::address_to_hex(&a.address))
        .collect();
    expected.sort();

    let result = rpc_result(&server, "eth_accounts", json!([])).await;
    let mut accounts: Vec<String> = result
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_lowercase())
        .collect();
    accounts.sort();

    assert_eq!(accounts, expected);
}

#[tokio::test]
async fn test_impersonated_transfer_moves_funds() {
    let server = test_server(true);
    let rich = genesis::rich_accounts().unwrap()[5].address;
    let rich_hex = devchain::types::address_to_hex(&rich);
    let recipient = "0x3355df6d4c9c3035724fd0e3914de96a5a83aaf4";
    let value = U256::from(42u64) * U256::exp10(16); // 0.42 ether

    let before = rpc_result(&server, "eth_getBalance", json!([rich_hex, "latest"])).await;
    let before = U256::from_str_radix(before.as_str().unwrap().trim_start_matches("0x"), 16).unwrap();

    rpc_result(&server, "anvil_impersonateAccount", json!([rich_hex])).await;

    let hash = rpc_result(
        &server,
        "eth_sendTransaction",
        json!([{ "from": rich_hex, "to": recipient, "value": quantity_to_hex(value) }]),
    )
    .await;

    let receipt = rpc_result(&server, "eth_getTransactionReceipt", json!([hash])).await;
    assert_eq!(receipt["status"], json!("0x1"));
    assert_eq!(
        receipt["from"].as_str().unwrap().to_lowercase(),
        rich_hex.to_lowercase()
    );
    assert!(receipt["blockNumber"].is_string());

    rpc_result(&server, "anvil_stopImpersonatingAccount", json!([rich_hex])).await;

    let recipient_balance =
        rpc_result(&server, "eth_getBalance", json!([recipient, "latest"])).await;
    assert_eq!(recipient_balance, json!(quantity_to_hex(value)));

    let after = rpc_result(&server, "eth_getBalance", json!([rich_hex, "latest"])).await;
    let after = U256::from_str_radix(after.as_str().unwrap().trim_start_matches("0x"), 16).unwrap();
    assert_eq!(after, before - value);
}

#[tokio::test]
async fn test_send_transaction_fails_without_impersonation() {
    let server = test_server(true);
    // An address the node holds no key for.
    let from = "0xe999bb14881e48934a489cc9b35a4f9449ee87fb";
    let to = "0x3355df6d4c9c3035724fd0e3914de96a5a83aaf4";
    rpc_result(&server, "anvil_setBalance", json!([from, quantity_to_hex(ether(1))])).await;

    let body = rpc(
        &server,
        "eth_sendTransaction",
        json!([{ "from": from, "to": to, "value": "0x0" }]),
    )
    .await;

    assert_eq!(body["error"]["code"], json!(-32000));
    assert!(body["result"].is_null());
}

#[tokio::test]
async fn test_impersonation_grant_and_revoke_are_idempotent() {
    let server = test_server(true);
    let from = "0xe999bb14881e48934a489cc9b35a4f9449ee87fb";
    rpc_result(&server, "anvil_setBalance", json!([from, quantity_to_hex(ether(1))])).await;

    // Granting twice behaves like granting once.
    rpc_result(&server, "anvil_impersonateAccount", json!([from])).await;
    rpc_result(&server, "anvil_impersonateAccount", json!([from])).await;

    // A single revoke fully removes the grant.
    let was = rpc_result(&server, "anvil_stopImpersonatingAccount", json!([from])).await;
    assert_eq!(was, json!(true));
    let was = rpc_result(&server, "anvil_stopImpersonatingAccount", json!([from])).await;
    assert_eq!(was, json!(false));

    let body = rpc(
        &server,
        "eth_sendTransaction",
        json!([{ "from": from, "to": "0x3355df6d4c9c3035724fd0e3914de96a5a83aaf4", "value": "0x1" }]),
    )
    .await;
    assert_eq!(body["error"]["code"], json!(-32000));
}

#[tokio::test]
async fn test_receipt_is_null_until_sealed() {
    let server = test_server(false); // manual mining
    let rich = devchain::types::address_to_hex(&genesis::rich_accounts().unwrap()[0].address);

    let hash = rpc_result(
        &server,
        "eth_sendTransaction",
        json!([{ "from": rich, "to": "0x3355df6d4c9c3035724fd0e3914de96a5a83aaf4", "value": "0x1" }]),
    )
    .await;

    let receipt = rpc_result(&server, "eth_getTransactionReceipt", json!([hash])).await;
    assert!(receipt.is_null());

    rpc_result(&server, "anvil_mine", json!(["0x1", "0x1"])).await;

    let receipt = rpc_result(&server, "eth_getTransactionReceipt", json!([hash])).await;
    assert_eq!(receipt["status"], json!("0x1"));
    assert_eq!(receipt["transactionHash"], hash);
}

#[tokio::test]
async fn test_hardhat_aliases_dispatch_to_same_operations() {
    let server = test_server(true);
    let address = "0x36615cf349d7f6344891b1e7ca7c72883f5dc049";

    rpc_result(&server, "hardhat_setBalance", json!([address, "0x64"])).await;
    let balance = rpc_result(&server, "eth_getBalance", json!([address, "latest"])).await;
    assert_eq!(balance, json!("0x64"));

    rpc_result(&server, "hardhat_mine", json!(["0x2", "0x1"])).await;
    let number = rpc_result(&server, "eth_blockNumber", json!([])).await;
    assert_eq!(number, json!("0x2"));
}

#[tokio::test]
async fn test_malformed_parameters_rejected_before_state_changes() {
    let server = test_server(true);

    let body = rpc(&server, "anvil_setBalance", json!(["not an address", "0x1"])).await;
    assert_eq!(body["error"]["code"], json!(-32602));

    let body = rpc(&server, "anvil_setNonce", json!([])).await;
    assert_eq!(body["error"]["code"], json!(-32602));
}

#[tokio::test]
async fn test_unknown_method_reports_not_found() {
    let server = test_server(true);
    let body = rpc(&server, "eth_doesNotExist", json!([])).await;
    assert_eq!(body["error"]["code"], json!(-32601));
}

#[tokio::test]
async fn test_chain_id_and_health() {
    let server = test_server(true);

    let chain_id = rpc_result(&server, "eth_chainId", json!([])).await;
    assert_eq!(chain_id, json!("0x104"));

    let response = server.get("/health").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["status"], "healthy");
    assert!(json["timestamp"].is_string());

    let response = server.get("/stats").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert!(json["total_requests"].is_number());
    assert!(json["successful_requests"].is_number());
    assert!(json["failed_requests"].is_number());
}
